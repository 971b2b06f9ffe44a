use octet::{decode_value, encode_value, Decode, Encode};

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
#[octet(id = 30)]
struct Tagged {
	values: Vec<String>,
}

#[test]
fn repeated_strings_round_trip_and_shrink_relative_to_unique_strings() {
	let repeated = Tagged { values: vec!["duplicate".to_owned(); 8] };
	let unique =
		Tagged { values: (0..8).map(|i| format!("duplicate-{i}-padding-so-lengths-are-comparable")).collect() };

	let repeated_bytes = encode_value(&repeated).unwrap();
	let unique_bytes = encode_value(&unique).unwrap();

	let decoded: Tagged = decode_value(&repeated_bytes).unwrap();
	assert_eq!(decoded, repeated);

	// Every repeat after the first costs only a STRING_REF + a small varint,
	// so eight repeats of the same string must be smaller on the wire than
	// eight distinct strings of comparable length.
	assert!(repeated_bytes.len() < unique_bytes.len());
}

#[test]
fn wire_length_is_non_increasing_as_duplicate_count_grows() {
	let mut previous_per_item = f64::MAX;
	for count in [1usize, 4, 16] {
		let tagged = Tagged { values: vec!["same-every-time".to_owned(); count] };
		let bytes = encode_value(&tagged).unwrap();
		let per_item = bytes.len() as f64 / count as f64;
		assert!(per_item <= previous_per_item + f64::EPSILON);
		previous_per_item = per_item;
	}
}
