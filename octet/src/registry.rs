use std::any::{Any, TypeId};
use std::sync::{OnceLock, RwLock};

use fxhash::FxHashMap;

use crate::descriptor::TypeDescriptor;
use crate::error::CodecError;

/// Global table of registered types, guarded by a single lock.
///
/// Writes (`register`, `register_descriptor`, `precompile`) happen once at
/// process startup in the common case; reads happen on every encode/decode
/// that touches the dynamic path, against a single stable-id/`TypeId`-keyed
/// registry with explicit initialization and snapshotted reads.
pub struct Registry {
	claimed_ids: FxHashMap<u64, &'static str>,
	descriptors: FxHashMap<u64, TypeDescriptor>,
	stable_id_by_type: FxHashMap<TypeId, u64>,
	specialized: FxHashMap<TypeId, ()>,
}

impl Registry {
	fn new() -> Self {
		Self {
			claimed_ids: FxHashMap::default(),
			descriptors: FxHashMap::default(),
			stable_id_by_type: FxHashMap::default(),
			specialized: FxHashMap::default(),
		}
	}

	fn claim(&mut self, type_id: TypeId, stable_id: u64, type_name: &'static str) -> Result<(), CodecError> {
		if self.claimed_ids.contains_key(&stable_id) {
			return Err(CodecError::DuplicateRegistration { stable_id, type_name });
		}
		self.claimed_ids.insert(stable_id, type_name);
		self.stable_id_by_type.insert(type_id, stable_id);
		Ok(())
	}

	fn insert_descriptor(&mut self, type_id: TypeId, descriptor: TypeDescriptor) -> Result<(), CodecError> {
		self.claim(type_id, descriptor.stable_id, descriptor.type_name)?;
		self.descriptors.insert(descriptor.stable_id, descriptor);
		Ok(())
	}

	fn by_id(&self, stable_id: u64) -> Option<&TypeDescriptor> {
		self.descriptors.get(&stable_id)
	}

	fn stable_id_of(&self, type_id: TypeId) -> Option<u64> {
		self.stable_id_by_type.get(&type_id).copied()
	}

	fn mark_precompiled(&mut self, type_id: TypeId) {
		self.specialized.insert(type_id, ());
	}

	fn is_precompiled(&self, type_id: TypeId) -> bool {
		self.specialized.contains_key(&type_id)
	}
}

fn global() -> &'static RwLock<Registry> {
	static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
	REGISTRY.get_or_init(|| RwLock::new(Registry::new()))
}

/// Claims `stable_id` for `T` on the specialized path. This is all a type
/// needs if it only ever goes through `encode_value`/`decode_value`: no
/// field layout is recorded, since the derive-generated `Encode`/`Decode`
/// impls already know their own fields.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(stable_id, type_name = std::any::type_name::<T>())))]
pub fn register<T: Any>(stable_id: u64) -> Result<(), CodecError> {
	let type_id = TypeId::of::<T>();
	let result = global().write().expect("registry lock poisoned").claim(type_id, stable_id, std::any::type_name::<T>());
	#[cfg(feature = "tracing")]
	if let Err(err) = &result {
		tracing::event!(tracing::Level::DEBUG, %err, "registration rejected");
	}
	result
}

/// Registers `T` together with a full [`TypeDescriptor`], making it
/// available to the dynamic/`Value` path (`encode_dyn`/`decode_dyn`).
/// `#[derive(Encode, Decode)]` calls this from a generated
/// `fn register_descriptor()` the caller invokes once, rather than
/// automatically at load time; registration is always an explicit call.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(stable_id = descriptor.stable_id, type_name = descriptor.type_name)))]
pub fn register_descriptor<T: Any>(descriptor: TypeDescriptor) -> Result<(), CodecError> {
	let type_id = TypeId::of::<T>();
	let result = global().write().expect("registry lock poisoned").insert_descriptor(type_id, descriptor);
	#[cfg(feature = "tracing")]
	if let Err(err) = &result {
		tracing::event!(tracing::Level::DEBUG, %err, "descriptor registration rejected");
	}
	result
}

pub fn resolve_stable_id<T: Any>() -> Option<u64> {
	let registry = global().read().expect("registry lock poisoned");
	registry.stable_id_of(TypeId::of::<T>())
}

/// Runs `f` with a read lock held and the descriptor for `stable_id`, so
/// callers never hold a borrow across lock release: readers only ever see
/// a snapshot taken under the lock.
pub fn with_descriptor<R>(stable_id: u64, f: impl FnOnce(&TypeDescriptor) -> R) -> Result<R, CodecError> {
	let registry = global().read().expect("registry lock poisoned");
	let descriptor = registry.by_id(stable_id).ok_or(CodecError::UnknownType(stable_id))?;
	Ok(f(descriptor))
}

/// Marks `T` as eligible for the specialized encode/decode path ahead of
/// time. Most callers never need this explicitly: `#[derive(Encode, Decode)]`
/// already emits direct, monomorphized code, so `precompile` exists for the
/// dynamic/`Value` path to skip re-deriving field layout on first use.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(type_name = std::any::type_name::<T>())))]
pub fn precompile<T: Any>() {
	let type_id = TypeId::of::<T>();
	global().write().expect("registry lock poisoned").mark_precompiled(type_id);
}

pub fn is_precompiled<T: Any>() -> bool {
	let type_id = TypeId::of::<T>();
	global().read().expect("registry lock poisoned").is_precompiled(type_id)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::descriptor::{DescriptorState, TypeKind};

	struct Marker;

	fn descriptor(stable_id: u64) -> TypeDescriptor {
		TypeDescriptor {
			stable_id,
			type_name: "Marker",
			kind: TypeKind::Struct,
			fields: Vec::new(),
			construct_default: Box::new(|| Box::new(Marker)),
			state: DescriptorState::Initialized,
		}
	}

	#[test]
	fn registering_twice_under_the_same_stable_id_fails() {
		struct LocalA;
		struct LocalB;
		register::<LocalA>(9001).unwrap();
		let err = register::<LocalB>(9001).unwrap_err();
		assert!(matches!(err, CodecError::DuplicateRegistration { stable_id: 9001, .. }));
	}

	#[test]
	fn register_descriptor_conflicts_with_a_plain_register() {
		struct LocalD;
		struct LocalE;
		register::<LocalD>(9100).unwrap();
		let err = register_descriptor::<LocalE>(descriptor(9100)).unwrap_err();
		assert!(matches!(err, CodecError::DuplicateRegistration { stable_id: 9100, .. }));
	}

	#[test]
	fn precompile_is_observable() {
		struct LocalC;
		assert!(!is_precompiled::<LocalC>());
		precompile::<LocalC>();
		assert!(is_precompiled::<LocalC>());
	}
}
