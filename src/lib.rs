pub mod annotate;
pub mod cli;
pub mod collector;
pub mod config;
pub mod diff;
pub mod error;
pub mod incremental;
pub mod model;
pub mod report;
pub mod store;
pub mod summary;
pub mod tree;
pub mod writer;
