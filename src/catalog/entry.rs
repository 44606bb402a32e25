//! Catalog identifiers and resolved entries

use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Length of a store item identifier
pub const ITEM_ID_LEN: usize = 32;

/// Longest display name kept in the catalog (in characters)
pub const MAX_NAME_CHARS: usize = 200;

/// Opaque store key: exactly 32 ASCII alphanumeric characters
///
/// Ordering is plain lexicographic on the string, which is the order of the
/// published catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Parses and validates an identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use cws_lister::ItemId;
    ///
    /// assert!(ItemId::parse("aapbdbdomjkkjkaonfhkkikfgjllcleb").is_ok());
    /// assert!(ItemId::parse("too-short").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, UrlError> {
        if value.len() != ITEM_ID_LEN || !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(UrlError::InvalidItemId(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = UrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

/// Reasons a resolved record is rejected before entering the catalog
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("display name is empty")]
    EmptyName,

    #[error("invalid page URL: {0}")]
    InvalidPage(String),

    #[error("invalid download URL: {0}")]
    InvalidFile(String),
}

/// One published catalog record
///
/// Field names are the artifact's compatibility contract: `id`, `name`,
/// `page`, `file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ItemId,
    pub name: String,
    pub page: String,
    pub file: String,
}

impl CatalogEntry {
    /// Builds a validated entry; the name is cleaned with [`sanitize_name`]
    pub fn new(id: ItemId, name: &str, page: String, file: String) -> Result<Self, EntryError> {
        let name = sanitize_name(name).ok_or(EntryError::EmptyName)?;

        if !is_http_url(&page) {
            return Err(EntryError::InvalidPage(page));
        }
        if !is_http_url(&file) {
            return Err(EntryError::InvalidFile(file));
        }

        Ok(Self {
            id,
            name,
            page,
            file,
        })
    }
}

/// Strips markup, collapses whitespace and caps the length of a display name
///
/// Only `<` followed by a letter, `/` or `!` opens a tag, and a tag that is
/// never closed is kept as text, so names like "I <3 Cats" survive.
///
/// Returns `None` if nothing printable is left.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let mut stripped = String::with_capacity(raw.len());
    // Text since an opening `<`, dropped once `>` closes it
    let mut pending_tag: Option<String> = None;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(tag) = pending_tag.as_mut() {
            match c {
                '>' => {
                    pending_tag = None;
                    continue;
                }
                '<' => {
                    tag.chars().for_each(|t| push_text(&mut stripped, t));
                    pending_tag = None;
                }
                _ => {
                    tag.push(c);
                    continue;
                }
            }
        }

        if c == '<' && opens_tag(chars.peek()) {
            pending_tag = Some(String::from(c));
        } else {
            push_text(&mut stripped, c);
        }
    }
    if let Some(tag) = pending_tag {
        tag.chars().for_each(|t| push_text(&mut stripped, t));
    }

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_NAME_CHARS).collect();
    let name = truncated.trim_end().to_string();

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn opens_tag(next: Option<&char>) -> bool {
    next.is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!'))
}

fn push_text(out: &mut String, c: char) {
    out.push(if c.is_control() { ' ' } else { c });
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}
