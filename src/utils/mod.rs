//! Shared utilities.

pub mod deadline;
pub mod text;
pub mod urls;

pub use deadline::Deadline;
pub use text::{format_timestamp, normalize_claim, sample_segments, truncate_utf8};
pub use urls::{domain_of, normalize_url};
