//! Completion items for the expression under the cursor.
//!
//! A [`ProviderRegistry`] holds a fixed, ordered list of
//! [`CompletionProvider`]s. Every provider whose `supports` accepts the
//! expression contributes its items, and items are concatenated in provider
//! order:
//!
//! 1. [`InstanceMethodProvider`]
//! 2. [`InstancePropertyProvider`]
//! 3. [`PropertyDocTagProvider`]
//! 4. [`StaticMethodProvider`]
//! 5. [`StaticPropertyProvider`]
//! 6. [`ClassConstantProvider`]
//! 7. [`CTagsProvider`]
//!
//! [`Completer`] ties this to documents: it extracts the target at a cursor,
//! infers and reflects the receiver, then dispatches.

pub use lsp_types::{CompletionItem, CompletionItemKind};
use phpls_parser::Expr;
use tracing::instrument;

use crate::reflection::ReflectedClass;
use crate::state::SyntaxDocument;

mod completer;
mod constants;
mod ctags;
mod doc_tags;
mod methods;
mod properties;
mod scope;

pub use completer::Completer;
pub use constants::ClassConstantProvider;
pub use ctags::CTagsProvider;
pub use doc_tags::PropertyDocTagProvider;
pub use methods::{InstanceMethodProvider, StaticMethodProvider};
pub use properties::{InstancePropertyProvider, StaticPropertyProvider};
pub use scope::StaticScope;

/// What a provider sees for one completion.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub document: &'a SyntaxDocument,
    /// The expression being completed, e.g. `$this->` with an empty member.
    pub expression: &'a Expr,
    /// The reflected class of the expression's receiver, when it resolved.
    pub receiver: Option<&'a ReflectedClass>,
}

pub trait CompletionProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn supports(&self, expression: &Expr) -> bool;

    fn complete(&self, request: &CompletionRequest<'_>) -> Vec<CompletionItem>;
}

pub struct ProviderRegistry {
    providers: Vec<Box<dyn CompletionProvider>>,
}

impl ProviderRegistry {
    /// The built-in providers in their fixed order. `ctags` goes last.
    #[must_use]
    pub fn new(ctags: CTagsProvider) -> Self {
        Self {
            providers: vec![
                Box::new(InstanceMethodProvider),
                Box::new(InstancePropertyProvider),
                Box::new(PropertyDocTagProvider),
                Box::new(StaticMethodProvider),
                Box::new(StaticPropertyProvider),
                Box::new(ClassConstantProvider),
                Box::new(ctags),
            ],
        }
    }

    /// A registry with exactly `providers`, in the given order.
    #[must_use]
    pub fn with_providers(providers: Vec<Box<dyn CompletionProvider>>) -> Self {
        Self { providers }
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    #[instrument(level = "debug", skip_all, fields(span = ?request.expression.span))]
    pub fn complete(&self, request: &CompletionRequest<'_>) -> Vec<CompletionItem> {
        let mut items = Vec::new();
        for provider in &self.providers {
            if !provider.supports(request.expression) {
                continue;
            }
            let found = provider.complete(request);
            tracing::trace!(provider = provider.name(), count = found.len(), "provider done");
            items.extend(found);
        }
        items
    }
}

/// Reflected types are stored with a leading `\`; completion details show
/// them without it.
pub(crate) fn display_type(text: &str) -> String {
    text.split('|')
        .map(|member| {
            let (nullable, member) = member
                .strip_prefix('?')
                .map_or((false, member), |inner| (true, inner));
            let member = member.trim_start_matches('\\');
            if nullable {
                format!("?{member}")
            } else {
                member.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}
