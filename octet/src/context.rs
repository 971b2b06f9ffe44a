use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use fxhash::FxHashMap;
use nohash_hasher::BuildNoHashHasher;

use crate::config::CodecConfig;
use crate::error::CodecError;

/// Per-encode-call state: the cycle table, the string intern table, and the
/// depth counter. Owned exclusively by one in-flight top-level call, rather
/// than shared process-wide state.
pub struct SerialContext {
	identity_table: HashMap<usize, u64, BuildNoHashHasher<usize>>,
	string_intern: FxHashMap<Rc<str>, u64>,
	next_ref_id: u64,
	next_string_id: u64,
	depth: usize,
	config: CodecConfig,
}

impl SerialContext {
	pub fn new(config: CodecConfig) -> Self {
		Self {
			identity_table: HashMap::default(),
			string_intern: FxHashMap::default(),
			next_ref_id: 1,
			next_string_id: 1,
			depth: 0,
			config,
		}
	}

	/// Checks the identity table for `ptr` (a composite's address). Returns
	/// `Some(id)` if already seen, otherwise assigns and records the next id.
	pub fn identity(&mut self, ptr: usize) -> IdentityLookup {
		if let Some(&id) = self.identity_table.get(&ptr) {
			#[cfg(feature = "tracing")]
			tracing::event!(tracing::Level::TRACE, id, "resolved shared reference");
			return IdentityLookup::AlreadySeen(id);
		}
		let id = self.next_ref_id;
		self.next_ref_id += 1;
		self.identity_table.insert(ptr, id);
		IdentityLookup::FirstSeen(id)
	}

	/// Interns `s` by content, mirroring `schema::heaps::StringHeap::intern`'s
	/// content-keyed `FxHashMap` lookup (here without the bump-arena copy,
	/// since the string already lives on the heap for the call's duration).
	pub fn intern_string(&mut self, s: &str) -> StringLookup {
		if let Some(&id) = self.string_intern.get(s) {
			return StringLookup::AlreadySeen(id);
		}
		let id = self.next_string_id;
		self.next_string_id += 1;
		self.string_intern.insert(Rc::from(s), id);
		StringLookup::FirstSeen(id)
	}

	pub fn enter_depth(&mut self) -> Result<(), CodecError> {
		self.depth += 1;
		if self.depth > self.config.max_depth() {
			return Err(CodecError::DepthLimitExceeded { max_depth: self.config.max_depth() });
		}
		Ok(())
	}

	pub fn exit_depth(&mut self) {
		self.depth -= 1;
	}

	pub fn config(&self) -> &CodecConfig {
		&self.config
	}
}

pub enum IdentityLookup {
	FirstSeen(u64),
	AlreadySeen(u64),
}

pub enum StringLookup {
	FirstSeen(u64),
	AlreadySeen(u64),
}

/// Mirror of [`SerialContext`] for decode. `id_to_ref` stores type-erased
/// placeholders so a `REF` encountered while a composite is still being
/// filled resolves to the same, not-yet-complete instance.
pub struct DeserialContext {
	id_to_ref: HashMap<u64, Rc<dyn Any>, BuildNoHashHasher<u64>>,
	id_to_string: HashMap<u64, Rc<str>, BuildNoHashHasher<u64>>,
	next_ref_id: u64,
	next_string_id: u64,
	depth: usize,
	config: CodecConfig,
}

impl DeserialContext {
	pub fn new(config: CodecConfig) -> Self {
		Self {
			id_to_ref: HashMap::default(),
			id_to_string: HashMap::default(),
			next_ref_id: 1,
			next_string_id: 1,
			depth: 0,
			config,
		}
	}

	/// Allocates the id a not-yet-decoded composite will be registered
	/// under. The caller must immediately follow with [`insert_placeholder`]
	/// using the returned id before recursing into the composite's fields,
	/// so a `REF` nested inside it resolves to the right placeholder.
	pub fn reserve_ref_id(&mut self) -> u64 {
		let id = self.next_ref_id;
		self.next_ref_id += 1;
		id
	}

	pub fn insert_placeholder(&mut self, id: u64, value: Rc<dyn Any>) {
		self.id_to_ref.insert(id, value);
	}

	pub fn resolve_ref(&self, id: u64) -> Option<Rc<dyn Any>> {
		self.id_to_ref.get(&id).cloned()
	}

	/// Allocates the id under which the next first-seen string will be
	/// stored, mirroring `SerialContext::intern_string`'s counter.
	pub fn next_string_id(&mut self) -> u64 {
		let id = self.next_string_id;
		self.next_string_id += 1;
		id
	}

	pub fn insert_string(&mut self, id: u64, value: Rc<str>) {
		self.id_to_string.insert(id, value);
	}

	pub fn resolve_string(&self, id: u64) -> Option<Rc<str>> {
		self.id_to_string.get(&id).cloned()
	}

	pub fn enter_depth(&mut self) -> Result<(), CodecError> {
		self.depth += 1;
		if self.depth > self.config.max_depth() {
			return Err(CodecError::DepthLimitExceeded { max_depth: self.config.max_depth() });
		}
		Ok(())
	}

	pub fn exit_depth(&mut self) {
		self.depth -= 1;
	}

	pub fn config(&self) -> &CodecConfig {
		&self.config
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identity_is_assigned_once_per_pointer() {
		let mut ctx = SerialContext::new(CodecConfig::new());
		let ptr = 0x1000usize;
		match ctx.identity(ptr) {
			IdentityLookup::FirstSeen(id) => assert_eq!(id, 1),
			IdentityLookup::AlreadySeen(_) => panic!("expected first sighting"),
		}
		match ctx.identity(ptr) {
			IdentityLookup::AlreadySeen(id) => assert_eq!(id, 1),
			IdentityLookup::FirstSeen(_) => panic!("expected repeat sighting"),
		}
	}

	#[test]
	fn string_interning_is_by_content() {
		let mut ctx = SerialContext::new(CodecConfig::new());
		let a = ctx.intern_string("x");
		let b = ctx.intern_string("x");
		assert!(matches!(a, StringLookup::FirstSeen(1)));
		assert!(matches!(b, StringLookup::AlreadySeen(1)));
	}

	#[test]
	fn depth_limit_is_enforced() {
		let mut ctx = SerialContext::new(CodecConfig::new().with_max_depth(2));
		ctx.enter_depth().unwrap();
		ctx.enter_depth().unwrap();
		assert!(ctx.enter_depth().is_err());
	}
}
