use heck::ToSnakeCase;
use syn::{Attribute, Ident, LitStr};

#[derive(Debug, Default)]
pub(crate) struct ContainerAttrs {
    pub(crate) name: Option<String>,
    pub(crate) table: Option<String>,
    pub(crate) snake_case: bool,
}

impl ContainerAttrs {
    pub(crate) fn from_ast(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = ContainerAttrs::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("structmap")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else if meta.path.is_ident("table") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.table = Some(value.value());
                } else if meta.path.is_ident("snake_case") {
                    result.snake_case = true;
                } else {
                    return Err(meta.error("expected `name`, `table` or `snake_case`"));
                }
                Ok(())
            })?;
        }

        if result.snake_case && result.table.is_some() {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "`snake_case` and `table` cannot be combined",
            ));
        }

        Ok(result)
    }

    pub(crate) fn record_name(&self, ident: &Ident) -> String {
        self.name.clone().unwrap_or_else(|| ident.to_string())
    }

    pub(crate) fn table_name(&self, record_name: &str) -> String {
        match &self.table {
            Some(table) => table.clone(),
            None if self.snake_case => record_name.to_snake_case(),
            None => record_name.to_string(),
        }
    }
}

#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub(crate) column: Option<String>,
    pub(crate) auto: Option<LitStr>,
}

impl FieldAttrs {
    pub(crate) fn from_ast(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = FieldAttrs::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("structmap")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("column") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.column = Some(value.value());
                } else if meta.path.is_ident("auto") {
                    let value: LitStr = meta.value()?.parse()?;
                    match value.value().as_str() {
                        "ulid" | "uuid" | "nanoid" => result.auto = Some(value),
                        _ => {
                            return Err(syn::Error::new_spanned(
                                &value,
                                "expected \"ulid\", \"uuid\" or \"nanoid\"",
                            ))
                        }
                    }
                } else {
                    return Err(meta.error("expected `column` or `auto`"));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}
