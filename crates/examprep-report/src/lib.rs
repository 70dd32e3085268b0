//! examprep-report: Static HTML rendering of progress reports.

pub mod html;

pub use html::{generate_html, write_html_report};
