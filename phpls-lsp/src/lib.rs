//! phpls-lsp library
//!
//! Language intelligence for PHP documents: a registry of parsed documents,
//! reflection over the classes they declare, type inference for
//! expressions, and member completion.

pub mod cache;
pub mod completion;
pub mod config;
pub mod diagnostics;
pub mod docblock;
mod error;
pub mod reflection;
pub mod resolve;
pub mod state;

pub use cache::UsageAwareCache;
pub use completion::{Completer, CompletionItem, CompletionItemKind, ProviderRegistry};
pub use config::Config;
pub use error::Error;
pub use reflection::{ReflectedClass, Reflector, SourceLocator};
pub use resolve::{ResolvedType, Scalar, TypeResolver};
pub use state::{DocumentRegistry, SyntaxDocument};
