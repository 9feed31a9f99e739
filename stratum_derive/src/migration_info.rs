//! Derive macro for migration metadata.
//!
//! This module provides the `MigrationInfo` derive macro that implements
//! `stratum_core::MigrationInfo` from a `#[migration(...)]` attribute.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Data, DeriveInput, LitStr};

/// Converts a PascalCase or camelCase identifier to snake_case.
///
/// Examples:
/// - `CreateAccounts` -> `create_accounts`
/// - `AddMfaFlag` -> `add_mfa_flag`
/// - `BackfillTOTPSecrets` -> `backfill_totp_secrets`
fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_was_lowercase = false;
    let mut prev_was_uppercase = false;

    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            // Insert an underscore before uppercase if:
            // - Not at the start
            // - Previous char was lowercase (camelCase boundary), OR
            // - Previous char was uppercase and next char is lowercase (end of acronym)
            if i > 0 {
                let next_is_lowercase =
                    s.chars().nth(i + 1).is_some_and(|next| next.is_lowercase());
                if prev_was_lowercase || (prev_was_uppercase && next_is_lowercase) {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
            prev_was_uppercase = true;
            prev_was_lowercase = false;
        } else {
            result.push(c);
            prev_was_lowercase = c.is_lowercase() || c.is_ascii_digit();
            prev_was_uppercase = false;
        }
    }

    result
}

/// Checks the `major.minor.patch` shape the runtime parser accepts.
fn validate_version(version: &str) -> Result<(), &'static str> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 3 {
        return Err("version must have three components, like \"1.4.0\"");
    }
    for part in parts {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err("version components must be non-negative integers");
        }
        if part.parse::<u32>().is_err() {
            return Err("version component does not fit in 32 bits");
        }
    }
    Ok(())
}

/// Implementation of the `MigrationInfo` derive macro.
///
/// # Attributes
///
/// - `version = "1.4.0"` (required) - checked at compile time.
/// - `name = "..."` - defaults to the struct name in snake_case.
/// - `description = "..."` - defaults to an empty string.
/// - `irreversible` - marks the migration as not supporting `down`.
pub fn migration_info_impl(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let item_tokens: TokenStream = item.into();
    let input = match syn::parse2::<DeriveInput>(item_tokens) {
        Ok(tree) => tree,
        Err(e) => return e.to_compile_error().into(),
    };

    if !matches!(input.data, Data::Struct(_)) {
        return syn::Error::new_spanned(&input, "MigrationInfo can only be derived for structs")
            .to_compile_error()
            .into();
    }

    let struct_name = &input.ident;
    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    let mut version: Option<LitStr> = None;
    let mut name: Option<String> = None;
    let mut description = String::new();
    let mut reversible = true;

    for attr in &input.attrs {
        if !attr.path().is_ident("migration") {
            continue;
        }

        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("version") {
                version = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("description") {
                let value: LitStr = meta.value()?.parse()?;
                description = value.value();
                Ok(())
            } else if meta.path.is_ident("irreversible") {
                reversible = false;
                Ok(())
            } else {
                Err(meta.error("expected `version`, `name`, `description` or `irreversible`"))
            }
        });

        if let Err(e) = result {
            return e.to_compile_error().into();
        }
    }

    let Some(version) = version else {
        return syn::Error::new(
            Span::call_site(),
            "missing `#[migration(version = \"major.minor.patch\")]`",
        )
        .to_compile_error()
        .into();
    };

    if let Err(reason) = validate_version(&version.value()) {
        return syn::Error::new(version.span(), reason)
            .to_compile_error()
            .into();
    }

    let version = version.value();
    let name = name.unwrap_or_else(|| to_snake_case(&struct_name.to_string()));

    let expanded = quote! {
        impl #impl_generics ::stratum_core::MigrationInfo for #struct_name #type_generics #where_clause {
            fn version(&self) -> &'static str {
                #version
            }

            fn name(&self) -> &'static str {
                #name
            }

            fn description(&self) -> &'static str {
                #description
            }

            fn reversible(&self) -> bool {
                #reversible
            }
        }
    };

    expanded.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_snake_case_simple() {
        assert_eq!(to_snake_case("CreateAccounts"), "create_accounts");
        assert_eq!(to_snake_case("AddMfaFlag"), "add_mfa_flag");
        assert_eq!(to_snake_case("Test"), "test");
    }

    #[test]
    fn to_snake_case_acronyms() {
        assert_eq!(to_snake_case("BackfillTOTPSecrets"), "backfill_totp_secrets");
        assert_eq!(to_snake_case("DropMFA"), "drop_mfa");
    }

    #[test]
    fn to_snake_case_digits() {
        assert_eq!(to_snake_case("Samples2Index"), "samples2_index");
    }

    #[test]
    fn accepts_well_formed_versions() {
        assert!(validate_version("1.0.0").is_ok());
        assert!(validate_version("2.10.3").is_ok());
    }

    #[test]
    fn rejects_malformed_versions() {
        assert!(validate_version("1.5").is_err());
        assert!(validate_version("1.5.x").is_err());
        assert!(validate_version("1.5.0-rc1").is_err());
        assert!(validate_version("99999999999.0.0").is_err());
    }
}
