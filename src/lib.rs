pub mod app;
pub mod cleaner;
pub mod config;
pub mod encoding;
pub mod error;
pub mod fallback;
pub mod fs_scan;
pub mod pipeline;
pub mod report;
pub mod tag_store;
pub mod types;
