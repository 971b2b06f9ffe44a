use octet::{decode_value, encode_value, Decode, Encode};

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
#[octet(id = 1)]
struct Point {
	x: i32,
	y: i32,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
#[octet(id = 2)]
struct Polygon {
	name: String,
	vertices: Vec<Point>,
	closed: bool,
	label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
#[octet(id = 3)]
enum Direction {
	North,
	East,
	South,
	West,
}

#[test]
fn struct_round_trips() {
	let point = Point { x: -17, y: 300 };
	let bytes = encode_value(&point).unwrap();
	let decoded: Point = decode_value(&bytes).unwrap();
	assert_eq!(point, decoded);
}

#[test]
fn nested_struct_with_collections_and_options_round_trips() {
	let polygon = Polygon {
		name: "triangle".to_owned(),
		vertices: vec![Point { x: 0, y: 0 }, Point { x: 1, y: 0 }, Point { x: 0, y: 1 }],
		closed: true,
		label: None,
	};
	let bytes = encode_value(&polygon).unwrap();
	let decoded: Polygon = decode_value(&bytes).unwrap();
	assert_eq!(polygon, decoded);
}

#[test]
fn enum_round_trips_every_variant() {
	for direction in [Direction::North, Direction::East, Direction::South, Direction::West] {
		let bytes = encode_value(&direction).unwrap();
		let decoded: Direction = decode_value(&bytes).unwrap();
		assert_eq!(direction, decoded);
	}
}

#[test]
fn repeated_encode_calls_are_deterministic() {
	let polygon = Polygon {
		name: "square".to_owned(),
		vertices: vec![Point { x: 0, y: 0 }, Point { x: 1, y: 1 }],
		closed: false,
		label: Some("demo".to_owned()),
	};
	let first = encode_value(&polygon).unwrap();
	let second = encode_value(&polygon).unwrap();
	assert_eq!(first, second);
}
