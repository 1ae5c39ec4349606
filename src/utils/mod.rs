pub mod logging;
pub mod text;

pub use text::{normalize_for_dedup, strip_html, truncate_text};
