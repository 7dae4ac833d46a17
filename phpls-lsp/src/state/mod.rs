//! Open documents and the registry that holds them

mod document;
mod registry;

pub use document::{ClassProperty, DeclaredClass, SyntaxDocument};
pub use registry::DocumentRegistry;
