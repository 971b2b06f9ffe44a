use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DataStruct, DeriveInput, Fields, Index};

use crate::attr::stable_id;

/// Emits `Decode`, plus `Default` and `DecodeInPlace` for structs so they
/// can sit behind `Rc<RefCell<T>>` and participate in cycles via a
/// placeholder-then-fill decode. Enums are field-less and decode in one
/// shot, so they implement `Decode` only.
pub fn derive(input: DeriveInput) -> TokenStream {
	let ident = input.ident;
	let stable_id = stable_id(&input.attrs);
	let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

	match input.data {
		Data::Struct(data) => derive_struct(&ident, stable_id, data, impl_generics, ty_generics, where_clause),
		Data::Enum(data) => derive_enum(&ident, stable_id, data, impl_generics, ty_generics, where_clause),
		Data::Union(_) => panic!("`Decode` cannot be derived for unions"),
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
	let type_name = ident.to_string();
	let field_count = data.fields.len();
	let named = matches!(data.fields, Fields::Named(_));

	let field_idents: Vec<TokenStream> = data
		.fields
		.iter()
		.enumerate()
		.map(|(i, field)| match &field.ident {
			Some(name) => quote!(#name),
			None => {
				let index = Index::from(i);
				quote!(#index)
			},
		})
		.collect();

	let construct_fields = field_idents.iter().map(|name| {
		quote!(#name: ::octet::Decode::decode(ctx, input)?,)
	});
	let construct = if named {
		quote!(Self { #(#construct_fields)* })
	} else {
		quote!(Self( #(#construct_fields)* ))
	};

	let default_fields = field_idents.iter().map(|name| quote!(#name: ::std::default::Default::default(),));
	let default_construct = if named {
		quote!(Self { #(#default_fields)* })
	} else {
		quote!(Self( #(#default_fields)* ))
	};

	let fill_fields = field_idents.iter().map(|name| {
		quote!(self.#name = ::octet::Decode::decode(ctx, input)?;)
	});

	let header_check = quote! {
		let offset = input.position();
		match ::octet::Tag::try_from(input.read_byte()?)? {
			::octet::Tag::Object => {},
			_ => return Err(::octet::CodecError::TypeMismatch { expected: #type_name, offset }),
		}
		let wire_stable_id = ::octet::varint::read_varint_u64(input)?;
		if wire_stable_id != #stable_id {
			return Err(::octet::CodecError::TypeMismatch { expected: #type_name, offset });
		}
		let wire_field_count = ::octet::varint::read_varint_u64(input)? as usize;
		if wire_field_count != #field_count {
			return Err(::octet::CodecError::TypeMismatch { expected: #type_name, offset });
		}
	};

	quote! {
		impl #impl_generics ::octet::Decode for #ident #ty_generics #where_clause {
			fn decode<I: ::octet::Input + ?Sized>(
				ctx: &mut ::octet::DeserialContext,
				input: &mut I,
			) -> Result<Self, ::octet::CodecError> {
				ctx.enter_depth()?;
				let result: Result<Self, ::octet::CodecError> = (|| {
					#header_check
					Ok(#construct)
				})();
				ctx.exit_depth();
				result
			}
		}

		impl #impl_generics ::std::default::Default for #ident #ty_generics #where_clause {
			fn default() -> Self {
				#default_construct
			}
		}

		impl #impl_generics ::octet::DecodeInPlace for #ident #ty_generics #where_clause {
			fn decode_into<I: ::octet::Input + ?Sized>(
				&mut self,
				ctx: &mut ::octet::DeserialContext,
				input: &mut I,
			) -> Result<(), ::octet::CodecError> {
				ctx.enter_depth()?;
				let result: Result<(), ::octet::CodecError> = (|| {
					#header_check
					#(#fill_fields)*
					Ok(())
				})();
				ctx.exit_depth();
				result
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
	let type_name = ident.to_string();
	let arms = data.variants.iter().enumerate().map(|(ordinal, variant)| {
		if !matches!(variant.fields, Fields::Unit) {
			panic!("`Encode`/`Decode` enums must be field-less; `{}` carries data", variant.ident);
		}
		let variant_ident = &variant.ident;
		let ordinal = ordinal as u64;
		quote!(#ordinal => Ok(Self::#variant_ident),)
	});

	quote! {
		impl #impl_generics ::octet::Decode for #ident #ty_generics #where_clause {
			fn decode<I: ::octet::Input + ?Sized>(
				_ctx: &mut ::octet::DeserialContext,
				input: &mut I,
			) -> Result<Self, ::octet::CodecError> {
				let offset = input.position();
				match ::octet::Tag::try_from(input.read_byte()?)? {
					::octet::Tag::Enum => {},
					_ => return Err(::octet::CodecError::TypeMismatch { expected: #type_name, offset }),
				}
				let wire_stable_id = ::octet::varint::read_varint_u64(input)?;
				if wire_stable_id != #stable_id {
					return Err(::octet::CodecError::TypeMismatch { expected: #type_name, offset });
				}
				let ordinal = ::octet::varint::read_varint_u64(input)?;
				match ordinal {
					#(#arms)*
					_ => Err(::octet::CodecError::TypeMismatch { expected: #type_name, offset }),
				}
			}
		}
	}
}
