//! Concrete adapters, one external service per file.

pub mod deploy;
pub mod images;
pub mod notify;
pub mod render;
pub mod scrape;
pub mod search;
