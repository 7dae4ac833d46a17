use lsp_types::Documentation;
use phpls_parser::Expr;

use super::scope::instance_receiver;
use super::{CompletionItem, CompletionItemKind, CompletionProvider, CompletionRequest};

/// Virtual properties declared with `@property` tags on the receiver's
/// class. Types are shown as written in the tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyDocTagProvider;

impl CompletionProvider for PropertyDocTagProvider {
    fn name(&self) -> &'static str {
        "property-doc-tag"
    }

    fn supports(&self, expression: &Expr) -> bool {
        instance_receiver(expression).is_some()
    }

    fn complete(&self, request: &CompletionRequest<'_>) -> Vec<CompletionItem> {
        let Some(class) = request.receiver else {
            return Vec::new();
        };
        class
            .property_tags()
            .into_iter()
            .map(|tag| CompletionItem {
                label: tag.variable,
                kind: Some(CompletionItemKind::PROPERTY),
                detail: Some(tag.type_text),
                documentation: Some(Documentation::String(tag.description)),
                ..Default::default()
            })
            .collect()
    }
}
