pub mod catalog;
pub mod document;

pub use document::*;
