//! Shared pieces of the filtered list queries: free-text search and
//! client-selected ordering restricted to an allow-list.

use sqlx::{Postgres, QueryBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SortKey {
    pub(crate) column: &'static str,
    pub(crate) descending: bool,
}

/// Parses `ordering=title,-created_at`. Fields outside `allowed` are dropped;
/// `allowed` maps the public field name to its column.
pub(crate) fn parse_ordering(
    raw: Option<&str>,
    allowed: &[(&str, &'static str)],
) -> Vec<SortKey> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let mut keys: Vec<SortKey> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let (name, descending) = match part.strip_prefix('-') {
            Some(name) => (name, true),
            None => (part, false),
        };
        let Some((_, column)) = allowed.iter().find(|(field, _)| *field == name) else {
            continue;
        };
        if keys.iter().any(|key| key.column == *column) {
            continue;
        }
        keys.push(SortKey { column, descending });
    }
    keys
}

/// Splits a search string into terms, each turned into an escaped ILIKE pattern.
pub(crate) fn search_patterns(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(|term| format!("%{}%", escape_like(term)))
        .collect()
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Every term must match at least one of `columns`.
pub(crate) fn push_search(
    builder: &mut QueryBuilder<'_, Postgres>,
    columns: &[&str],
    patterns: Vec<String>,
) {
    for pattern in patterns {
        builder.push(" AND (");
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                builder.push(" OR ");
            }
            builder.push(*column);
            builder.push(" ILIKE ");
            builder.push_bind(pattern.clone());
        }
        builder.push(")");
    }
}

/// Appends `ORDER BY`, falling back to `default` when no key was requested.
/// `id` always closes the list so paging through equal keys stays stable.
pub(crate) fn push_order_by(
    builder: &mut QueryBuilder<'_, Postgres>,
    keys: &[SortKey],
    default: &str,
) {
    builder.push(" ORDER BY ");
    if keys.is_empty() {
        builder.push(default);
        return;
    }
    for key in keys {
        builder.push(key.column);
        builder.push(if key.descending { " DESC, " } else { " ASC, " });
    }
    builder.push("id ASC");
}
