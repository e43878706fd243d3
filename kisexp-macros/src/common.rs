use syn::{Attribute, LitStr};

#[derive(Debug, Default)]
pub struct FieldData {
    /// Label of a named field, `None` for positional fields.
    pub label: Option<String>,
    pub multi: bool,
    pub flat: bool,
    pub skip: bool,
}

/// Parse the `sexp` attributes on a field.
pub fn parse_sexp_attributes(attrs: &[Attribute], field_name: &str) -> syn::Result<FieldData> {
    let mut field_data = FieldData::default();

    for attr in attrs {
        if !attr.path().is_ident("sexp") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("named") {
                field_data.label.get_or_insert_with(|| field_name.to_string());
                Ok(())
            } else if path.is_ident("rename") {
                let value = meta.value()?;
                let label: LitStr = value.parse()?;
                field_data.label = Some(label.value());
                Ok(())
            } else if path.is_ident("multi") {
                field_data.multi = true;
                Ok(())
            } else if path.is_ident("flat") {
                field_data.flat = true;
                Ok(())
            } else if path.is_ident("skip") {
                field_data.skip = true;
                Ok(())
            } else {
                Err(meta.error("unrecognized sexp attribute"))
            }
        })?;
    }

    Ok(field_data)
}
