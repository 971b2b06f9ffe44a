use syn::{Attribute, LitInt};

/// Reads `#[octet(id = N)]` off a struct or enum's attribute list. Required:
/// every derived type needs a stable id to register under.
pub fn stable_id(attrs: &[Attribute]) -> u64 {
	for attr in attrs {
		if !attr.path().is_ident("octet") {
			continue;
		}
		let mut found = None;
		attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("id") {
				let lit: LitInt = meta.value()?.parse()?;
				found = Some(lit.base10_parse::<u64>()?);
			}
			Ok(())
		})
		.expect("malformed `#[octet(...)]` attribute");
		if let Some(id) = found {
			return id;
		}
	}
	panic!("derived types require `#[octet(id = N)]` with a unique stable id");
}
