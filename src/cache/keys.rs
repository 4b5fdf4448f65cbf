//! Logical cache keys and invalidation patterns.
//!
//! Keys produced here are *logical*: the tiered cache prepends the configured prefix before
//! touching a tier. Key builders and pattern builders share the same literal segments, so
//! every key produced by a builder is matched by its pattern.

use std::fmt::Display;

use serde::Deserialize;

use crate::hashing::digest_parts_hex;

/// Trailing wildcard accepted by [`matches_pattern`].
pub const WILDCARD: char = '*';

const ID_SEGMENT: &str = "id";
const LIST_SEGMENT: &str = "list";
const SEARCH_SEGMENT: &str = "search";
const ABSENT_TOKEN: &str = "null";

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page, page size and sort order of a listing or search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: Option<String>,
    pub descending: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            descending: false,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    pub fn sorted_by(mut self, field: &str, descending: bool) -> Self {
        self.sort_by = Some(field.to_string());
        self.descending = descending;
        self
    }

    /// Number of items to skip; pages are 1-based and page 0 is treated as page 1.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.page_size as usize
    }

    fn direction(&self) -> &'static str {
        if self.descending { "desc" } else { "asc" }
    }
}

/// Builds keys for one entity namespace (e.g. `customers`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCodec {
    namespace: &'static str,
    default_sort: &'static str,
}

impl KeyCodec {
    pub const fn new(namespace: &'static str, default_sort: &'static str) -> Self {
        Self {
            namespace,
            default_sort,
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// `{ns}:id:{id}`
    pub fn entity_key(&self, id: impl Display) -> String {
        format!("{}:{}:{}", self.namespace, ID_SEGMENT, id)
    }

    /// `{ns}:list:{page}:{page_size}:{sort}:{asc|desc}`
    pub fn list_key(&self, pagination: &Pagination) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.namespace,
            LIST_SEGMENT,
            pagination.page,
            pagination.page_size,
            self.sort_field(pagination),
            pagination.direction()
        )
    }

    /// `{ns}:search:{digest}` over the canonical filter + pagination tuple.
    ///
    /// Filters are ordered by field name before hashing, so call-site order does not matter.
    /// An absent filter is encoded as `field:null`; a present one as `field={len}:{value}`,
    /// which keeps absent, empty and literal `"null"` values apart.
    pub fn search_key(&self, filters: &[(&str, Option<&str>)], pagination: &Pagination) -> String {
        let mut ordered: Vec<&(&str, Option<&str>)> = filters.iter().collect();
        ordered.sort_by(|a, b| a.0.cmp(b.0));

        let mut parts: Vec<String> = ordered
            .into_iter()
            .map(|(field, value)| match value {
                Some(v) => format!("{}={}:{}", field, v.len(), v),
                None => format!("{}:{}", field, ABSENT_TOKEN),
            })
            .collect();
        parts.push(format!("page:{}", pagination.page));
        parts.push(format!("size:{}", pagination.page_size));
        parts.push(format!("sort:{}", self.sort_field(pagination)));
        parts.push(format!("desc:{}", pagination.descending));

        let digest = digest_parts_hex(parts.iter().map(String::as_str));
        format!("{}:{}:{}", self.namespace, SEARCH_SEGMENT, digest)
    }

    /// `{ns}:id:*`
    pub fn entity_pattern(&self) -> String {
        format!("{}:{}:{}", self.namespace, ID_SEGMENT, WILDCARD)
    }

    /// `{ns}:list:*`
    pub fn list_pattern(&self) -> String {
        format!("{}:{}:{}", self.namespace, LIST_SEGMENT, WILDCARD)
    }

    /// `{ns}:search:*`
    pub fn search_pattern(&self) -> String {
        format!("{}:{}:{}", self.namespace, SEARCH_SEGMENT, WILDCARD)
    }

    /// `{ns}:*`
    pub fn all_pattern(&self) -> String {
        format!("{}:{}", self.namespace, WILDCARD)
    }

    fn sort_field(&self, pagination: &Pagination) -> String {
        match pagination.sort_by.as_deref().map(str::trim) {
            Some(field) if !field.is_empty() => field.to_lowercase(),
            _ => self.default_sort.to_string(),
        }
    }
}

/// Literal portion of a pattern (the pattern with its trailing wildcard removed).
pub fn pattern_prefix(pattern: &str) -> &str {
    pattern.strip_suffix(WILDCARD).unwrap_or(pattern)
}

/// Prefix match up to a trailing `*`; a pattern without a wildcard matches only itself.
pub fn matches_pattern(key: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    match pattern.strip_suffix(WILDCARD) {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}
