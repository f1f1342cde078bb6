//! Embedded JSON extraction
//!
//! Pages carry a large JSON store inside a `<script>` element, surrounded by
//! JavaScript that is not JSON. Extraction happens in three isolated steps:
//! locating the fragment between two literal markers, decoding it into a
//! generic [`serde_json::Value`] tree, and reading fields at fixed paths with
//! a total lookup that never panics.

mod embedded;

pub use embedded::{
    decode, extract_between, locate_fragment, lookup, lookup_str, BoundaryStrategy,
    ExtractError, MissingPath, PathSegment,
};
