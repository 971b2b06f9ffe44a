use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DataStruct, DeriveInput, Fields, Index};

use crate::attr::stable_id;

/// Emits a straight-line, field-by-field `Encode` impl: no name lookup, no
/// per-field kind dispatch at the call site, just one generated `encode`
/// call per field in declaration order rather than iterating a runtime
/// field list.
pub fn derive(input: DeriveInput) -> TokenStream {
	let ident = input.ident;
	let stable_id = stable_id(&input.attrs);
	let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

	match input.data {
		Data::Struct(data) => derive_struct(&ident, stable_id, data, impl_generics, ty_generics, where_clause),
		Data::Enum(data) => derive_enum(&ident, stable_id, data, impl_generics, ty_generics, where_clause),
		Data::Union(_) => panic!("`Encode` cannot be derived for unions"),
	}
}

fn derive_struct(
	ident: &syn::Ident,
	stable_id: u64,
	data: DataStruct,
	impl_generics: syn::ImplGenerics,
	ty_generics: syn::TypeGenerics,
	where_clause: Option<&syn::WhereClause>,
) -> TokenStream {
	let field_count = data.fields.len();
	let field_encodes = data.fields.iter().enumerate().map(|(i, field)| match &field.ident {
		Some(name) => quote!(self.#name.encode(ctx, out)?;),
		None => {
			let index = Index::from(i);
			quote!(self.#index.encode(ctx, out)?;)
		},
	});

	quote! {
		impl #impl_generics ::octet::Encode for #ident #ty_generics #where_clause {
			fn encode<O: ::octet::Output + ?Sized>(
				&self,
				ctx: &mut ::octet::SerialContext,
				out: &mut O,
			) -> Result<(), ::octet::CodecError> {
				ctx.enter_depth()?;
				out.put_byte(::octet::Tag::Object.byte());
				::octet::varint::write_varint_u64(out, #stable_id);
				::octet::varint::write_varint_u64(out, #field_count as u64);
				let result: Result<(), ::octet::CodecError> = (|| {
					#(#field_encodes)*
					Ok(())
				})();
				ctx.exit_depth();
				result
			}
		}

		impl #impl_generics #ident #ty_generics #where_clause {
			/// Claims this type's stable id on the specialized registry.
			/// Call once, typically at process startup; `encode_value`/
			/// `decode_value` do not require it, but `precompile` and
			/// cross-checks against a `DuplicateRegistration` do.
			pub fn register() -> Result<(), ::octet::CodecError> {
				::octet::register::<Self>(#stable_id)
			}
		}
	}
}

fn derive_enum(
	ident: &syn::Ident,
	stable_id: u64,
	data: DataEnum,
	impl_generics: syn::ImplGenerics,
	ty_generics: syn::TypeGenerics,
	where_clause: Option<&syn::WhereClause>,
) -> TokenStream {
	let arms = data.variants.iter().enumerate().map(|(ordinal, variant)| {
		if !matches!(variant.fields, Fields::Unit) {
			panic!("`Encode`/`Decode` enums must be field-less; `{}` carries data", variant.ident);
		}
		let variant_ident = &variant.ident;
		let ordinal = ordinal as u64;
		quote!(Self::#variant_ident => #ordinal,)
	});

	quote! {
		impl #impl_generics ::octet::Encode for #ident #ty_generics #where_clause {
			fn encode<O: ::octet::Output + ?Sized>(
				&self,
				_ctx: &mut ::octet::SerialContext,
				out: &mut O,
			) -> Result<(), ::octet::CodecError> {
				let ordinal: u64 = match self {
					#(#arms)*
				};
				out.put_byte(::octet::Tag::Enum.byte());
				::octet::varint::write_varint_u64(out, #stable_id);
				::octet::varint::write_varint_u64(out, ordinal);
				Ok(())
			}
		}

		impl #impl_generics #ident #ty_generics #where_clause {
			/// Claims this type's stable id on the specialized registry.
			pub fn register() -> Result<(), ::octet::CodecError> {
				::octet::register::<Self>(#stable_id)
			}
		}
	}
}
