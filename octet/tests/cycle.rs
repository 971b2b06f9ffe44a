use std::cell::RefCell;
use std::rc::Rc;

use octet::{decode_value, encode_value, Decode, Encode};

#[derive(Encode, Decode)]
#[octet(id = 20)]
struct Node {
	value: i32,
	next: Option<Rc<RefCell<Node>>>,
}

#[derive(Encode, Decode)]
#[octet(id = 21)]
struct Pair {
	left: Rc<RefCell<Node>>,
	right: Rc<RefCell<Node>>,
}

#[test]
fn two_node_cycle_round_trips_with_identity_preserved() {
	let a = Rc::new(RefCell::new(Node { value: 1, next: None }));
	let b = Rc::new(RefCell::new(Node { value: 2, next: Some(a.clone()) }));
	a.borrow_mut().next = Some(b.clone());

	let bytes = encode_value(&a).unwrap();
	let decoded: Rc<RefCell<Node>> = decode_value(&bytes).unwrap();

	assert_eq!(decoded.borrow().value, 1);
	let decoded_b = decoded.borrow().next.clone().expect("a should point at b");
	assert_eq!(decoded_b.borrow().value, 2);
	let back_to_a = decoded_b.borrow().next.clone().expect("b should point back at a");
	assert!(Rc::ptr_eq(&decoded, &back_to_a), "decoded cycle should restore pointer identity");
}

#[test]
fn shared_but_acyclic_reference_is_deduplicated_on_the_wire() {
	let shared = Rc::new(RefCell::new(Node { value: 99, next: None }));
	let pair = Pair { left: shared.clone(), right: shared.clone() };

	let bytes = encode_value(&pair).unwrap();
	let decoded: Pair = decode_value(&bytes).unwrap();
	assert!(Rc::ptr_eq(&decoded.left, &decoded.right), "both fields should resolve to the same instance");
	assert_eq!(decoded.left.borrow().value, 99);
}

#[test]
fn self_referential_node_round_trips() {
	let a = Rc::new(RefCell::new(Node { value: 7, next: None }));
	a.borrow_mut().next = Some(a.clone());

	let bytes = encode_value(&a).unwrap();
	let decoded: Rc<RefCell<Node>> = decode_value(&bytes).unwrap();
	let looped = decoded.borrow().next.clone().unwrap();
	assert!(Rc::ptr_eq(&decoded, &looped));
}
