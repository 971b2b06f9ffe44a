//! Public entry points. The specialized path (`encode_value`/`decode_value`)
//! dispatches straight to a concrete type's `Encode`/`Decode` impl, generated
//! by `#[derive(Encode, Decode)]` or handwritten for a primitive. The
//! dynamic path (`encode_dyn`/`decode_dyn`) walks a [`Value`] tree using a
//! type's registered [`TypeDescriptor`] to find field order, without the
//! caller naming a compile-time row type.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::buffer::Output;
use crate::codec::{Decode, Encode};
use crate::config::CodecConfig;
use crate::context::{DeserialContext, IdentityLookup, SerialContext};
use crate::cursor::{Input, SliceCursor};
use crate::error::CodecError;
use crate::registry;
use crate::tag::Tag;
use crate::value::{ObjectValue, Value};
use crate::varint::{read_varint_u64, write_varint_u64};

pub fn encode_value<T: Encode>(value: &T) -> Result<Vec<u8>, CodecError> {
	encode_value_with_config(value, CodecConfig::new())
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn encode_value_with_config<T: Encode>(value: &T, config: CodecConfig) -> Result<Vec<u8>, CodecError> {
	let mut ctx = SerialContext::new(config);
	let mut out = Vec::new();
	let result = value.encode(&mut ctx, &mut out);
	#[cfg(feature = "tracing")]
	if let Err(err) = &result {
		tracing::event!(tracing::Level::DEBUG, %err, "encode failed");
	}
	result?;
	Ok(out)
}

pub fn decode_value<T: Decode>(bytes: &[u8]) -> Result<T, CodecError> {
	decode_value_with_config(bytes, CodecConfig::new())
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(input_len = bytes.len())))]
pub fn decode_value_with_config<T: Decode>(bytes: &[u8], config: CodecConfig) -> Result<T, CodecError> {
	let mut ctx = DeserialContext::new(config);
	let mut cursor = SliceCursor::new(bytes);
	let result = T::decode(&mut ctx, &mut cursor);
	#[cfg(feature = "tracing")]
	if let Err(err) = &result {
		tracing::event!(tracing::Level::DEBUG, %err, "decode failed");
	}
	result
}

pub use registry::{precompile, register, register_descriptor};

/// Encodes an arbitrary [`Value`] tree, looking up object field order from
/// the registry on every `Value::Object` encountered.
pub fn encode_dyn<O: Output + ?Sized>(value: &Value, ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
	ctx.enter_depth()?;
	let result = encode_dyn_inner(value, ctx, out);
	ctx.exit_depth();
	result
}

fn encode_dyn_inner<O: Output + ?Sized>(value: &Value, ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
	match value {
		Value::Null => {
			out.put_byte(Tag::Null.byte());
			Ok(())
		},
		Value::Bool(v) => v.encode(ctx, out),
		Value::Byte(v) => v.encode(ctx, out),
		Value::Short(v) => v.encode(ctx, out),
		Value::Int(v) => v.encode(ctx, out),
		Value::Long(v) => v.encode(ctx, out),
		Value::Float(v) => v.encode(ctx, out),
		Value::Double(v) => v.encode(ctx, out),
		Value::Str(s) => s.to_string().encode(ctx, out),
		Value::List(items) => {
			let ptr = Rc::as_ptr(items) as *const () as usize;
			if let IdentityLookup::AlreadySeen(id) = ctx.identity(ptr) {
				out.put_byte(Tag::Ref.byte());
				write_varint_u64(out, id);
				return Ok(());
			}
			out.put_byte(Tag::List.byte());
			write_varint_u64(out, 0);
			let items = items.borrow();
			write_varint_u64(out, items.len() as u64);
			for item in items.iter() {
				encode_dyn_inner(item, ctx, out)?;
			}
			Ok(())
		},
		Value::Map(entries) => {
			let ptr = Rc::as_ptr(entries) as *const () as usize;
			if let IdentityLookup::AlreadySeen(id) = ctx.identity(ptr) {
				out.put_byte(Tag::Ref.byte());
				write_varint_u64(out, id);
				return Ok(());
			}
			out.put_byte(Tag::Map.byte());
			write_varint_u64(out, 0);
			write_varint_u64(out, 0);
			let entries = entries.borrow();
			write_varint_u64(out, entries.len() as u64);
			for (key, value) in entries.iter() {
				encode_dyn_inner(key, ctx, out)?;
				encode_dyn_inner(value, ctx, out)?;
			}
			Ok(())
		},
		Value::Object(object) => {
			let ptr = Rc::as_ptr(object) as *const () as usize;
			if let IdentityLookup::AlreadySeen(id) = ctx.identity(ptr) {
				out.put_byte(Tag::Ref.byte());
				write_varint_u64(out, id);
				return Ok(());
			}
			let object = object.borrow();
			out.put_byte(Tag::Object.byte());
			write_varint_u64(out, object.stable_id);
			registry::with_descriptor(object.stable_id, |descriptor| -> Result<(), CodecError> {
				write_varint_u64(out, descriptor.fields.len() as u64);
				for field in &descriptor.fields {
					let field_value = object.get(field.name).cloned().unwrap_or(Value::Null);
					encode_dyn_inner(&field_value, ctx, out)?;
				}
				Ok(())
			})?
		},
		Value::Enum { stable_id, ordinal } => {
			out.put_byte(Tag::Enum.byte());
			write_varint_u64(out, *stable_id);
			write_varint_u64(out, *ordinal);
			Ok(())
		},
	}
}

/// Decodes a wire value into a [`Value`] tree without naming a concrete
/// Rust type, driven entirely by the stable id embedded in `OBJECT` tags.
pub fn decode_dyn<I: Input + ?Sized>(ctx: &mut DeserialContext, input: &mut I) -> Result<Value, CodecError> {
	ctx.enter_depth()?;
	let result = decode_dyn_inner(ctx, input);
	ctx.exit_depth();
	result
}

fn decode_dyn_inner<I: Input + ?Sized>(ctx: &mut DeserialContext, input: &mut I) -> Result<Value, CodecError> {
	let offset = input.position();
	let tag = Tag::try_from(input.peek_byte()?)?;
	match tag {
		Tag::Null => {
			input.read_byte()?;
			Ok(Value::Null)
		},
		Tag::True | Tag::False => Ok(Value::Bool(bool::decode(ctx, input)?)),
		Tag::Byte => Ok(Value::Byte(i8::decode(ctx, input)?)),
		Tag::Short => Ok(Value::Short(i16::decode(ctx, input)?)),
		Tag::IntPos | Tag::IntNeg => Ok(Value::Int(i32::decode(ctx, input)?)),
		Tag::LongPos | Tag::LongNeg => Ok(Value::Long(i64::decode(ctx, input)?)),
		Tag::Float => Ok(Value::Float(f32::decode(ctx, input)?)),
		Tag::Double => Ok(Value::Double(f64::decode(ctx, input)?)),
		Tag::String | Tag::StringRef => Ok(Value::Str(std::rc::Rc::from(String::decode(ctx, input)?.as_str()))),
		Tag::Array | Tag::List => {
			input.read_byte()?;
			let _element_type_id = read_varint_u64(input)?;
			let len = read_varint_u64(input)? as usize;
			let id = ctx.reserve_ref_id();
			let placeholder = Rc::new(RefCell::new(Vec::with_capacity(len.min(1 << 20))));
			ctx.insert_placeholder(id, placeholder.clone() as Rc<dyn Any>);
			for _ in 0..len {
				let item = decode_dyn_inner(ctx, input)?;
				placeholder.borrow_mut().push(item);
			}
			Ok(Value::List(placeholder))
		},
		Tag::Map => {
			input.read_byte()?;
			let _key_type_id = read_varint_u64(input)?;
			let _value_type_id = read_varint_u64(input)?;
			let len = read_varint_u64(input)? as usize;
			let id = ctx.reserve_ref_id();
			let placeholder = Rc::new(RefCell::new(Vec::with_capacity(len.min(1 << 20))));
			ctx.insert_placeholder(id, placeholder.clone() as Rc<dyn Any>);
			for _ in 0..len {
				let key = decode_dyn_inner(ctx, input)?;
				let value = decode_dyn_inner(ctx, input)?;
				placeholder.borrow_mut().push((key, value));
			}
			Ok(Value::Map(placeholder))
		},
		Tag::Object => {
			input.read_byte()?;
			let stable_id = read_varint_u64(input)?;
			let field_count = read_varint_u64(input)? as usize;
			let field_names = registry::with_descriptor(stable_id, |descriptor| -> Result<Vec<&'static str>, CodecError> {
				if descriptor.fields.len() != field_count {
					return Err(CodecError::TypeMismatch { expected: descriptor.type_name, offset });
				}
				Ok(descriptor.fields.iter().map(|f| f.name).collect())
			})??;
			let id = ctx.reserve_ref_id();
			let placeholder = Rc::new(RefCell::new(ObjectValue::new(stable_id)));
			ctx.insert_placeholder(id, placeholder.clone() as Rc<dyn Any>);
			for name in field_names {
				let value = decode_dyn_inner(ctx, input)?;
				placeholder.borrow_mut().set(name, value);
			}
			Ok(Value::Object(placeholder))
		},
		Tag::Enum => {
			input.read_byte()?;
			let stable_id = read_varint_u64(input)?;
			let ordinal = read_varint_u64(input)?;
			Ok(Value::Enum { stable_id, ordinal })
		},
		Tag::Ref => {
			input.read_byte()?;
			let id = read_varint_u64(input)?;
			let any = ctx.resolve_ref(id).ok_or(CodecError::TypeMismatch { expected: "known reference id", offset })?;
			let any = match any.downcast::<RefCell<Vec<Value>>>() {
				Ok(list) => return Ok(Value::List(list)),
				Err(any) => any,
			};
			let any = match any.downcast::<RefCell<Vec<(Value, Value)>>>() {
				Ok(map) => return Ok(Value::Map(map)),
				Err(any) => any,
			};
			match any.downcast::<RefCell<ObjectValue>>() {
				Ok(object) => Ok(Value::Object(object)),
				Err(_) => Err(CodecError::TypeMismatch { expected: "known reference id", offset }),
			}
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dynamic_list_roundtrips() {
		let value = Value::List(std::rc::Rc::new(std::cell::RefCell::new(vec![Value::Int(1), Value::Int(2)])));
		let mut ctx = SerialContext::new(CodecConfig::new());
		let mut out = Vec::new();
		encode_dyn(&value, &mut ctx, &mut out).unwrap();

		let mut dctx = DeserialContext::new(CodecConfig::new());
		let mut cursor = SliceCursor::new(&out);
		let decoded = decode_dyn(&mut dctx, &mut cursor).unwrap();
		match decoded {
			Value::List(items) => assert_eq!(items.borrow().len(), 2),
			_ => panic!("expected list"),
		}
	}

	#[test]
	fn dynamic_enum_roundtrips() {
		let value = Value::Enum { stable_id: 77, ordinal: 2 };
		let mut ctx = SerialContext::new(CodecConfig::new());
		let mut out = Vec::new();
		encode_dyn(&value, &mut ctx, &mut out).unwrap();

		let mut dctx = DeserialContext::new(CodecConfig::new());
		let mut cursor = SliceCursor::new(&out);
		let decoded = decode_dyn(&mut dctx, &mut cursor).unwrap();
		assert!(matches!(decoded, Value::Enum { stable_id: 77, ordinal: 2 }));
	}

	#[test]
	fn dynamic_self_referential_list_roundtrips_without_recursing_forever() {
		let outer = Rc::new(RefCell::new(Vec::new()));
		outer.borrow_mut().push(Value::Int(5));
		outer.borrow_mut().push(Value::List(outer.clone()));
		let value = Value::List(outer);

		let mut ctx = SerialContext::new(CodecConfig::new());
		let mut out = Vec::new();
		encode_dyn(&value, &mut ctx, &mut out).unwrap();

		let mut dctx = DeserialContext::new(CodecConfig::new());
		let mut cursor = SliceCursor::new(&out);
		let decoded = decode_dyn(&mut dctx, &mut cursor).unwrap();
		let Value::List(items) = decoded else { panic!("expected list") };
		assert_eq!(items.borrow().len(), 2);
		let borrowed = items.borrow();
		match &borrowed[1] {
			Value::List(inner) => assert!(Rc::ptr_eq(inner, &items)),
			_ => panic!("expected self-referential list"),
		}
	}
}
