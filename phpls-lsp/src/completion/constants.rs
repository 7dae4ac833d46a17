use lsp_types::Documentation;
use phpls_parser::Expr;

use super::scope::class_member_access;
use super::{CompletionItem, CompletionItemKind, CompletionProvider, CompletionRequest, StaticScope};

/// Class constants after `::`, limited by [`StaticScope`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassConstantProvider;

impl CompletionProvider for ClassConstantProvider {
    fn name(&self) -> &'static str {
        "class-constant"
    }

    fn supports(&self, expression: &Expr) -> bool {
        class_member_access(expression)
    }

    fn complete(&self, request: &CompletionRequest<'_>) -> Vec<CompletionItem> {
        let (Some(class), Some(scope)) = (request.receiver, StaticScope::of(request)) else {
            return Vec::new();
        };
        class
            .constants
            .iter()
            .filter(|constant| scope.admits(constant.visibility()))
            .map(|constant| CompletionItem {
                label: constant.name.clone(),
                kind: Some(CompletionItemKind::CONSTANT),
                detail: Some(constant.declaring_class.clone()),
                documentation: constant.doc_comment.clone().map(Documentation::String),
                ..Default::default()
            })
            .collect()
    }
}
