mod attr;
mod decode;
mod encode;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Emits a straight-line, per-field `Encode` impl bound directly to the
/// annotated struct's (or field-less enum's) fields. Requires
/// `#[octet(id = N)]` on the item for the stable id written into `OBJECT`/
/// `ENUM` payloads.
#[proc_macro_derive(Encode, attributes(octet))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);
	encode::derive(input).into()
}

/// Counterpart to [`derive_encode`]. For structs, also emits `Default` and
/// `DecodeInPlace` so the type can be decoded behind `Rc<RefCell<T>>` and
/// take part in cycles.
#[proc_macro_derive(Decode, attributes(octet))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);
	decode::derive(input).into()
}
