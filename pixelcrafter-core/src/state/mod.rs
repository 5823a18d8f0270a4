pub mod document;
pub mod layers;
pub mod selection;
pub mod transform;

pub use document::{Document, DocumentState};
