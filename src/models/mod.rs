//! Data models for Inkline

pub mod commit;
pub mod document;
pub mod repository;
pub mod tree;

pub use commit::*;
pub use document::*;
pub use repository::*;
pub use tree::*;
