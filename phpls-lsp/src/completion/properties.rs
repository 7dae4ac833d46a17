use lsp_types::Documentation;
use phpls_parser::Expr;

use super::scope::{instance_receiver, static_class};
use super::{CompletionItem, CompletionItemKind, CompletionProvider, CompletionRequest, StaticScope, display_type};
use crate::reflection::ReflectedProperty;

/// Non-static properties after `->`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstancePropertyProvider;

impl CompletionProvider for InstancePropertyProvider {
    fn name(&self) -> &'static str {
        "instance-property"
    }

    fn supports(&self, expression: &Expr) -> bool {
        instance_receiver(expression).is_some()
    }

    fn complete(&self, request: &CompletionRequest<'_>) -> Vec<CompletionItem> {
        let Some(class) = request.receiver else {
            return Vec::new();
        };
        class
            .properties
            .iter()
            .filter(|property| !property.modifiers.is_static)
            .map(property_item)
            .collect()
    }
}

/// Static properties after `::`, limited by [`StaticScope`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPropertyProvider;

impl CompletionProvider for StaticPropertyProvider {
    fn name(&self) -> &'static str {
        "static-property"
    }

    fn supports(&self, expression: &Expr) -> bool {
        static_class(expression).is_some()
    }

    fn complete(&self, request: &CompletionRequest<'_>) -> Vec<CompletionItem> {
        let (Some(class), Some(scope)) = (request.receiver, StaticScope::of(request)) else {
            return Vec::new();
        };
        class
            .properties
            .iter()
            .filter(|property| property.modifiers.is_static && scope.admits(property.visibility()))
            .map(property_item)
            .collect()
    }
}

fn property_item(property: &ReflectedProperty) -> CompletionItem {
    CompletionItem {
        label: property.name.clone(),
        kind: Some(CompletionItemKind::PROPERTY),
        detail: Some(property_type(property)),
        documentation: property.doc_comment.clone().map(Documentation::String),
        ..Default::default()
    }
}

fn property_type(property: &ReflectedProperty) -> String {
    if let Some(declared) = &property.declared_type {
        return display_type(declared);
    }
    if property.doc_types.is_empty() {
        return "mixed".to_string();
    }
    display_type(&property.doc_types.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn doc_types_make_the_detail() {
        let property = ReflectedProperty {
            name: "testProperty".into(),
            modifiers: phpls_parser::Modifiers::default(),
            declared_type: None,
            doc_types: vec!["string".into(), "null".into()],
            doc_comment: Some("testDocumentation".into()),
            declaring_class: "Foo".into(),
        };
        let item = property_item(&property);
        assert_eq!(item.kind, Some(CompletionItemKind::PROPERTY));
        assert_eq!(item.label, "testProperty");
        assert_eq!(item.detail.as_deref(), Some("string|null"));
        assert_eq!(
            item.documentation,
            Some(Documentation::String("testDocumentation".into()))
        );
        assert_eq!(item.insert_text, None);
    }

    #[test]
    fn untyped_properties_are_mixed() {
        let property = ReflectedProperty {
            name: "bag".into(),
            modifiers: phpls_parser::Modifiers::default(),
            declared_type: None,
            doc_types: Vec::new(),
            doc_comment: None,
            declaring_class: "Foo".into(),
        };
        assert_eq!(property_item(&property).detail.as_deref(), Some("mixed"));
    }
}
