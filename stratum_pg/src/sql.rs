//! Identifier handling shared by the postgres backends.

/// Prefix of the table backing a collection.
pub(crate) const COLLECTION_TABLE_PREFIX: &str = "stratum_doc_";

/// Prefix of the physical name of a secondary index.
pub(crate) const INDEX_PREFIX: &str = "stratum_idx_";

/// Postgres truncates identifiers longer than this many bytes.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Quotes an identifier. Callers only pass names accepted by [`is_valid_name`].
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quotes a string literal for statements that can't take bind parameters.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Collection and index names: ASCII letters, digits, `_` and `-`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Whether `prefix` + the given parts still fit in a postgres identifier.
pub(crate) fn fits_identifier(prefix: &str, parts: &[&str]) -> bool {
    prefix.len() + parts.iter().map(|p| p.len()).sum::<usize>() + parts.len().saturating_sub(1)
        <= MAX_IDENTIFIER_LEN
}

pub(crate) fn collection_table(collection: &str) -> String {
    format!("{COLLECTION_TABLE_PREFIX}{collection}")
}

/// `stratum_idx_<collection length>_<collection>_<index>`.
///
/// Both names may contain `_`, so the collection length keeps the split
/// unambiguous.
pub(crate) fn physical_index(collection: &str, index: &str) -> String {
    format!("{INDEX_PREFIX}{}_{collection}_{index}", collection.len())
}

/// Whether the physical name of an index still fits in a postgres identifier.
pub(crate) fn index_fits(collection: &str, index: &str) -> bool {
    physical_index(collection, index).len() <= MAX_IDENTIFIER_LEN
}
