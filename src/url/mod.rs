//! URL handling for Earnings-Ripple
//!
//! Domain extraction, allowed-domain matching, and the small amount of link
//! arithmetic the site handlers need (resolving listing hrefs, appending a
//! follow-up path to a quote URL).

mod domain;
mod matcher;
mod resolve;

pub use domain::{extract_domain, parse_http_url, require_domain};
pub use matcher::{is_domain_allowed, matches_wildcard};
pub use resolve::{append_path, resolve_href};
