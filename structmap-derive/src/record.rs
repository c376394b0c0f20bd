use crate::attr::{ContainerAttrs, FieldAttrs};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Type};

pub fn derive_record(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Err(Error::new_spanned(
                    other,
                    "Record can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new_spanned(
                ident,
                "Record can only be derived for structs with named fields",
            ))
        }
    };

    let container = ContainerAttrs::from_ast(&input.attrs)?;
    let record_name = container.record_name(ident);
    let table_name = container.table_name(&record_name);

    let mut id_field = None;
    let mut idents = Vec::with_capacity(fields.len());
    let mut columns = Vec::with_capacity(fields.len());
    let mut descriptors = Vec::with_capacity(fields.len());

    for field in fields {
        let field_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;
        let attrs = FieldAttrs::from_ast(&field.attrs)?;
        let column = attrs
            .column
            .clone()
            .unwrap_or_else(|| field_ident.to_string().trim_start_matches("r#").to_string());
        let ty = &field.ty;

        if is_db_id(ty) {
            if id_field.is_some() {
                return Err(Error::new_spanned(
                    field,
                    "a record has exactly one `DbId` field",
                ));
            }
            id_field = Some((field_ident, ty));

            let strategy = match attrs.auto.as_ref().map(|lit| lit.value()) {
                Some(s) if s == "ulid" => quote!(Some(::structmap::AutoIdStrategy::Ulid)),
                Some(s) if s == "uuid" => quote!(Some(::structmap::AutoIdStrategy::Uuid)),
                Some(_) => quote!(Some(::structmap::AutoIdStrategy::Nanoid)),
                None => quote!(None),
            };
            descriptors.push(quote! {
                ::structmap::FieldDescriptor::identifier::<
                    <#ty as ::structmap::IdField>::Id
                >(#column, #strategy)
            });
        } else {
            if let Some(auto) = &attrs.auto {
                return Err(Error::new_spanned(
                    auto,
                    "`auto` only applies to the `DbId` field",
                ));
            }
            descriptors.push(quote! {
                ::structmap::FieldDescriptor::column::<#ty>(#column)
            });
        }

        idents.push(field_ident);
        columns.push(column);
    }

    let (id_ident, id_ty) = id_field.ok_or_else(|| {
        Error::new_spanned(ident, "Record needs one identifier field of type `DbId<_>`")
    })?;
    let indexes = 0..idents.len();

    Ok(quote! {
        impl #impl_generics ::structmap::Record for #ident #ty_generics #where_clause {
            type Id = <#id_ty as ::structmap::IdField>::Id;

            const NAME: &'static str = #record_name;
            const TABLE: &'static str = #table_name;

            fn fields() -> ::std::vec::Vec<::structmap::FieldDescriptor> {
                ::std::vec![#(#descriptors),*]
            }

            fn id(&self) -> ::std::option::Option<&Self::Id> {
                self.#id_ident.get()
            }

            fn set_id(&mut self, id: ::std::option::Option<Self::Id>) {
                self.#id_ident.set(id)
            }

            fn value_at(&self, index: usize) -> ::structmap::Result<::structmap::Value> {
                match index {
                    #(#indexes => ::structmap::Column::to_value(&self.#idents),)*
                    _ => ::std::result::Result::Err(::structmap::StructMapError::Schema(
                        ::std::format!("{} has no field at index {}", #record_name, index),
                    )),
                }
            }

            fn from_row(
                row: &mut ::structmap::RowReader<'_, '_>,
            ) -> ::structmap::Result<Self> {
                ::std::result::Result::Ok(Self {
                    #(#idents: row.next(#columns)?,)*
                })
            }
        }
    })
}

fn is_db_id(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "DbId"),
        _ => false,
    }
}
