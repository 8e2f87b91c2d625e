//! URL normalization and crawl-scope rules
//!
//! Discovered links are normalized before deduplication so that trivially
//! different spellings of the same page (trailing slash, fragment, tracking
//! query parameters, host case) collapse to one fetch. Scope rules keep a
//! site's crawl inside the seed's domain.

mod normalize;
mod scope;

pub use normalize::normalize_url;
pub use scope::{extract_domain, in_scope};
