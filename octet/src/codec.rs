use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::buffer::Output;
use crate::context::{DeserialContext, IdentityLookup, SerialContext, StringLookup};
use crate::cursor::Input;
use crate::error::CodecError;
use crate::tag::Tag;
use crate::varint::{read_varint_u64, read_zigzag, write_varint_u64, write_zigzag};

/// Implemented by every type that can appear on the wire. Field-level
/// routines for primitives and containers live here; object routines
/// are generated per type by `#[derive(Encode)]`.
pub trait Encode {
	fn encode<O: Output + ?Sized>(&self, ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError>;
}

/// The decode counterpart of [`Encode`]. `decode` always produces a
/// fully-formed value; composite types that need to support being the target
/// of a `REF` additionally implement [`DecodeInPlace`].
pub trait Decode: Sized {
	fn decode<I: Input + ?Sized>(ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError>;
}

/// Fills an already-allocated instance field by field. Exists so a
/// `Rc<RefCell<T>>` placeholder can be registered under its reference id
/// *before* its fields are decoded, so that a `REF` to the enclosing
/// instance resolves correctly. `#[derive(Decode)]` emits this for
/// every struct alongside `Decode::decode`.
pub trait DecodeInPlace {
	fn decode_into<I: Input + ?Sized>(&mut self, ctx: &mut DeserialContext, input: &mut I) -> Result<(), CodecError>;
}

fn expect_tag<I: Input + ?Sized>(input: &mut I, expected: Tag, what: &'static str) -> Result<(), CodecError> {
	let offset = input.position();
	let tag = Tag::try_from(input.read_byte()?)?;
	if tag != expected {
		return Err(CodecError::TypeMismatch { expected: what, offset });
	}
	Ok(())
}

macro_rules! impl_signed_int {
	($ty: ty, $pos_tag: expr, $neg_tag: expr, $name: literal) => {
		impl Encode for $ty {
			fn encode<O: Output + ?Sized>(&self, _ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
				if *self < 0 {
					out.put_byte($neg_tag.byte());
					write_varint_u64(out, (-(*self as i128)) as u64);
				} else {
					out.put_byte($pos_tag.byte());
					write_varint_u64(out, *self as u64);
				}
				Ok(())
			}
		}

		impl Decode for $ty {
			fn decode<I: Input + ?Sized>(_ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
				let offset = input.position();
				let tag = Tag::try_from(input.read_byte()?)?;
				let magnitude = read_varint_u64(input)? as i128;
				let value = match tag {
					t if t == $pos_tag => magnitude,
					t if t == $neg_tag => -magnitude,
					_ => return Err(CodecError::TypeMismatch { expected: $name, offset }),
				};
				if value < <$ty>::MIN as i128 || value > <$ty>::MAX as i128 {
					return Err(CodecError::RangeError { value, declared_type: $name });
				}
				Ok(value as $ty)
			}
		}
	};
}

macro_rules! impl_unsigned_int {
	($ty: ty, $pos_tag: expr, $neg_tag: expr, $name: literal) => {
		impl Encode for $ty {
			fn encode<O: Output + ?Sized>(&self, _ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
				out.put_byte($pos_tag.byte());
				write_varint_u64(out, *self as u64);
				Ok(())
			}
		}

		impl Decode for $ty {
			fn decode<I: Input + ?Sized>(_ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
				let offset = input.position();
				let tag = Tag::try_from(input.read_byte()?)?;
				let magnitude = read_varint_u64(input)? as i128;
				let value = match tag {
					t if t == $pos_tag => magnitude,
					t if t == $neg_tag => return Err(CodecError::RangeError { value: -magnitude, declared_type: $name }),
					_ => return Err(CodecError::TypeMismatch { expected: $name, offset }),
				};
				if value > <$ty>::MAX as i128 {
					return Err(CodecError::RangeError { value, declared_type: $name });
				}
				Ok(value as $ty)
			}
		}
	};
}

impl_signed_int!(i32, Tag::IntPos, Tag::IntNeg, "int");
impl_unsigned_int!(u32, Tag::IntPos, Tag::IntNeg, "uint");
impl_signed_int!(i64, Tag::LongPos, Tag::LongNeg, "long");
impl_unsigned_int!(u64, Tag::LongPos, Tag::LongNeg, "ulong");

impl Encode for u8 {
	fn encode<O: Output + ?Sized>(&self, _ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		out.put_byte(Tag::Byte.byte());
		out.put_byte(*self);
		Ok(())
	}
}

impl Decode for u8 {
	fn decode<I: Input + ?Sized>(_ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		expect_tag(input, Tag::Byte, "byte")?;
		input.read_byte()
	}
}

impl Encode for i8 {
	fn encode<O: Output + ?Sized>(&self, _ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		out.put_byte(Tag::Byte.byte());
		out.put_byte(*self as u8);
		Ok(())
	}
}

impl Decode for i8 {
	fn decode<I: Input + ?Sized>(_ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		expect_tag(input, Tag::Byte, "sbyte")?;
		Ok(input.read_byte()? as i8)
	}
}

impl Encode for i16 {
	fn encode<O: Output + ?Sized>(&self, _ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		out.put_byte(Tag::Short.byte());
		write_zigzag(out, *self as i64);
		Ok(())
	}
}

impl Decode for i16 {
	fn decode<I: Input + ?Sized>(_ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		expect_tag(input, Tag::Short, "short")?;
		let value = read_zigzag(input)?;
		i16::try_from(value).map_err(|_| CodecError::RangeError { value: value as i128, declared_type: "short" })
	}
}

impl Encode for u16 {
	fn encode<O: Output + ?Sized>(&self, _ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		out.put_byte(Tag::Short.byte());
		write_varint_u64(out, *self as u64);
		Ok(())
	}
}

impl Decode for u16 {
	fn decode<I: Input + ?Sized>(_ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		expect_tag(input, Tag::Short, "ushort")?;
		let value = read_varint_u64(input)?;
		u16::try_from(value).map_err(|_| CodecError::RangeError { value: value as i128, declared_type: "ushort" })
	}
}

impl Encode for bool {
	fn encode<O: Output + ?Sized>(&self, _ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		out.put_byte(if *self { Tag::True.byte() } else { Tag::False.byte() });
		Ok(())
	}
}

impl Decode for bool {
	fn decode<I: Input + ?Sized>(_ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		let offset = input.position();
		match Tag::try_from(input.read_byte()?)? {
			Tag::True => Ok(true),
			Tag::False => Ok(false),
			_ => Err(CodecError::TypeMismatch { expected: "bool", offset }),
		}
	}
}

impl Encode for f32 {
	fn encode<O: Output + ?Sized>(&self, _ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		out.put_byte(Tag::Float.byte());
		out.put_bytes(&self.to_le_bytes());
		Ok(())
	}
}

impl Decode for f32 {
	fn decode<I: Input + ?Sized>(_ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		expect_tag(input, Tag::Float, "float")?;
		let bytes = input.read_bytes(4)?;
		Ok(f32::from_le_bytes(bytes.try_into().unwrap()))
	}
}

impl Encode for f64 {
	fn encode<O: Output + ?Sized>(&self, _ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		out.put_byte(Tag::Double.byte());
		out.put_bytes(&self.to_le_bytes());
		Ok(())
	}
}

impl Decode for f64 {
	fn decode<I: Input + ?Sized>(_ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		expect_tag(input, Tag::Double, "double")?;
		let bytes = input.read_bytes(8)?;
		Ok(f64::from_le_bytes(bytes.try_into().unwrap()))
	}
}

impl Encode for String {
	fn encode<O: Output + ?Sized>(&self, ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		match ctx.intern_string(self) {
			StringLookup::FirstSeen(_id) => {
				out.put_byte(Tag::String.byte());
				let bytes = self.as_bytes();
				write_varint_u64(out, bytes.len() as u64);
				out.put_bytes(bytes);
			},
			StringLookup::AlreadySeen(id) => {
				out.put_byte(Tag::StringRef.byte());
				write_varint_u64(out, id);
			},
		}
		Ok(())
	}
}

impl Decode for String {
	fn decode<I: Input + ?Sized>(ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		let offset = input.position();
		match Tag::try_from(input.read_byte()?)? {
			Tag::String => {
				let len = read_varint_u64(input)? as usize;
				let bytes = input.read_bytes(len)?;
				let s = std::str::from_utf8(bytes)
					.map_err(|_| CodecError::TypeMismatch { expected: "utf-8 string", offset })?
					.to_owned();
				let id = ctx.next_string_id();
				ctx.insert_string(id, Rc::from(s.as_str()));
				Ok(s)
			},
			Tag::StringRef => {
				let id = read_varint_u64(input)?;
				let s = ctx
					.resolve_string(id)
					.ok_or(CodecError::TypeMismatch { expected: "previously interned string", offset })?;
				Ok(s.to_string())
			},
			_ => Err(CodecError::TypeMismatch { expected: "string", offset }),
		}
	}
}

impl<T: Encode> Encode for Option<T> {
	fn encode<O: Output + ?Sized>(&self, ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		match self {
			None => {
				out.put_byte(Tag::Null.byte());
				Ok(())
			},
			Some(value) => value.encode(ctx, out),
		}
	}
}

impl<T: Decode> Decode for Option<T> {
	fn decode<I: Input + ?Sized>(ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		if input.peek_byte()? == Tag::Null.byte() {
			input.read_byte()?;
			return Ok(None);
		}
		Ok(Some(T::decode(ctx, input)?))
	}
}

impl<T: Encode> Encode for Vec<T> {
	fn encode<O: Output + ?Sized>(&self, ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		ctx.enter_depth()?;
		out.put_byte(Tag::List.byte());
		write_varint_u64(out, 0); // element type id: 0 == dynamic per element
		write_varint_u64(out, self.len() as u64);
		for item in self {
			if let Err(err) = item.encode(ctx, out) {
				ctx.exit_depth();
				return Err(err);
			}
		}
		ctx.exit_depth();
		Ok(())
	}
}

impl<T: Decode> Decode for Vec<T> {
	fn decode<I: Input + ?Sized>(ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		ctx.enter_depth()?;
		let result = decode_vec_body(ctx, input);
		ctx.exit_depth();
		result
	}
}

fn decode_vec_body<T: Decode, I: Input + ?Sized>(ctx: &mut DeserialContext, input: &mut I) -> Result<Vec<T>, CodecError> {
	let offset = input.position();
	match Tag::try_from(input.read_byte()?)? {
		Tag::List | Tag::Array => {},
		_ => return Err(CodecError::TypeMismatch { expected: "list", offset }),
	}
	let _element_type_id = read_varint_u64(input)?;
	let len = read_varint_u64(input)? as usize;
	let mut items = Vec::with_capacity(len.min(1 << 20));
	for _ in 0..len {
		items.push(T::decode(ctx, input)?);
	}
	Ok(items)
}

impl<K: Encode, V: Encode> Encode for HashMap<K, V> {
	fn encode<O: Output + ?Sized>(&self, ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		ctx.enter_depth()?;
		out.put_byte(Tag::Map.byte());
		write_varint_u64(out, 0); // key type id: dynamic
		write_varint_u64(out, 0); // value type id: dynamic
		write_varint_u64(out, self.len() as u64);
		for (key, value) in self {
			if let Err(err) = key.encode(ctx, out).and_then(|_| value.encode(ctx, out)) {
				ctx.exit_depth();
				return Err(err);
			}
		}
		ctx.exit_depth();
		Ok(())
	}
}

impl<K, V> Decode for HashMap<K, V>
where
	K: Decode + std::hash::Hash + Eq,
	V: Decode,
{
	fn decode<I: Input + ?Sized>(ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		ctx.enter_depth()?;
		let result = decode_map_body(ctx, input);
		ctx.exit_depth();
		result
	}
}

fn decode_map_body<K, V, I: Input + ?Sized>(ctx: &mut DeserialContext, input: &mut I) -> Result<HashMap<K, V>, CodecError>
where
	K: Decode + std::hash::Hash + Eq,
	V: Decode,
{
	let offset = input.position();
	match Tag::try_from(input.read_byte()?)? {
		Tag::Map => {},
		_ => return Err(CodecError::TypeMismatch { expected: "map", offset }),
	}
	let _key_type_id = read_varint_u64(input)?;
	let _value_type_id = read_varint_u64(input)?;
	let len = read_varint_u64(input)? as usize;
	let mut map = HashMap::with_capacity(len.min(1 << 20));
	for _ in 0..len {
		let key = K::decode(ctx, input)?;
		let value = V::decode(ctx, input)?;
		map.insert(key, value);
	}
	Ok(map)
}

/// Shared-ownership wrapper used for any composite that participates in
/// cycles or repeated references. Identity is tracked by pointer address,
/// i.e. reference-equality on the application instance; plain owned
/// values (structs, `Vec`, etc. not behind an `Rc`) have no stable identity
/// in Rust and are therefore always inlined rather than `REF`-ed, which is
/// the only sound behavior without shared ownership.
impl<T: Encode + 'static> Encode for Rc<RefCell<T>> {
	fn encode<O: Output + ?Sized>(&self, ctx: &mut SerialContext, out: &mut O) -> Result<(), CodecError> {
		let ptr = Rc::as_ptr(self) as *const () as usize;
		match ctx.identity(ptr) {
			IdentityLookup::AlreadySeen(id) => {
				out.put_byte(Tag::Ref.byte());
				write_varint_u64(out, id);
				Ok(())
			},
			IdentityLookup::FirstSeen(_id) => self.borrow().encode(ctx, out),
		}
	}
}

impl<T: DecodeInPlace + Default + 'static> Decode for Rc<RefCell<T>> {
	fn decode<I: Input + ?Sized>(ctx: &mut DeserialContext, input: &mut I) -> Result<Self, CodecError> {
		let offset = input.position();
		if input.peek_byte()? == Tag::Ref.byte() {
			input.read_byte()?;
			let id = read_varint_u64(input)?;
			let any = ctx.resolve_ref(id).ok_or(CodecError::TypeMismatch { expected: "known reference id", offset })?;
			return any
				.downcast::<RefCell<T>>()
				.map_err(|_| CodecError::UnsupportedCycle { stable_id: 0 });
		}

		let id = ctx.reserve_ref_id();
		let placeholder = Rc::new(RefCell::new(T::default()));
		ctx.insert_placeholder(id, placeholder.clone() as Rc<dyn Any>);
		placeholder.borrow_mut().decode_into(ctx, input)?;
		Ok(placeholder)
	}
}
