//! A compact, self-describing binary object codec with a precompiled
//! specialization path.
//!
//! Two ways to move a value to and from the wire:
//!
//! - The **specialized** path (`encode_value`/`decode_value`) dispatches
//!   directly to a concrete type's [`Encode`]/[`Decode`] implementation,
//!   generated by `#[derive(Encode, Decode)]` or handwritten for primitives
//!   and containers. No registry lookup is involved.
//! - The **dynamic** path (`encode_dyn`/`decode_dyn`) walks a [`Value`] tree,
//!   consulting a type's registered [`TypeDescriptor`] for field order and
//!   narrowing coercions. This is how code that doesn't know a concrete
//!   Rust type at compile time (a generic inspector, a bridge to another
//!   runtime) still reads and writes the same wire format.

pub mod buffer;
pub mod codec;
pub mod config;
pub mod context;
pub mod cursor;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod tag;
pub mod value;
pub mod varint;

mod api;

pub use api::{
	decode_dyn, decode_value, decode_value_with_config, encode_dyn, encode_value, encode_value_with_config,
	precompile, register, register_descriptor,
};
pub use buffer::{ByteBuffer, Output, SizeCalculator};
pub use codec::{Decode, DecodeInPlace, Encode};
pub use config::CodecConfig;
pub use context::{DeserialContext, SerialContext};
pub use cursor::{Input, SliceCursor};
pub use descriptor::{DescriptorState, FieldAccessor, FieldDescriptor, TypeDescriptor, TypeKind};
pub use error::CodecError;
pub use tag::Tag;
pub use value::{ObjectValue, Value};

#[cfg(feature = "derive")]
pub use octet_derive::{Decode, Encode};

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn primitive_roundtrip_through_public_api() {
		let bytes = encode_value(&42i32).unwrap();
		let value: i32 = decode_value(&bytes).unwrap();
		assert_eq!(value, 42);
	}

	#[test]
	fn long_into_declared_int_field_succeeds_but_byte_overflows() {
		use crate::value::Value;
		let fits = Value::Long(300).coerce_to_i32("int");
		assert!(fits.is_ok());
		let overflows = Value::Long(300).coerce_to_i8("byte");
		assert!(overflows.is_err());
	}
}
