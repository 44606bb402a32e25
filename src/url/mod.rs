//! URL handling
//!
//! Normalization of listing URLs into frontier keys, host keys for the
//! interval gate, and construction/recognition of store detail URLs.

mod detail;
mod domain;
mod normalize;

pub use detail::{
    detail_url, download_url, is_detail_url_for, parse_detail_str, parse_detail_url,
    slug_to_name, DetailRef, DETAIL_SEGMENT,
};
pub use domain::host_key;
pub use normalize::normalize_url;
