use lsp_types::{Documentation, InsertTextFormat};
use phpls_parser::{Expr, Modifiers};

use super::scope::{class_member_access, instance_receiver};
use super::{CompletionItem, CompletionItemKind, CompletionProvider, CompletionRequest, StaticScope, display_type};
use crate::reflection::{ReflectedMethod, ReflectedParameter};

/// Non-static methods after `->`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceMethodProvider;

impl CompletionProvider for InstanceMethodProvider {
    fn name(&self) -> &'static str {
        "instance-method"
    }

    fn supports(&self, expression: &Expr) -> bool {
        instance_receiver(expression).is_some()
    }

    fn complete(&self, request: &CompletionRequest<'_>) -> Vec<CompletionItem> {
        let Some(class) = request.receiver else {
            return Vec::new();
        };
        class
            .methods
            .iter()
            .filter(|method| !method.is_constructor() && !method.modifiers.is_static)
            .map(method_item)
            .collect()
    }
}

/// Static methods after `::`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticMethodProvider;

impl CompletionProvider for StaticMethodProvider {
    fn name(&self) -> &'static str {
        "static-method"
    }

    fn supports(&self, expression: &Expr) -> bool {
        class_member_access(expression)
    }

    fn complete(&self, request: &CompletionRequest<'_>) -> Vec<CompletionItem> {
        let (Some(class), Some(scope)) = (request.receiver, StaticScope::of(request)) else {
            return Vec::new();
        };
        class
            .methods
            .iter()
            .filter(|method| {
                !method.is_constructor()
                    && method.modifiers.is_static
                    && scope.admits(method.visibility())
            })
            .map(method_item)
            .collect()
    }
}

fn method_item(method: &ReflectedMethod) -> CompletionItem {
    CompletionItem {
        label: method.name.clone(),
        kind: Some(CompletionItemKind::METHOD),
        detail: Some(signature(method)),
        documentation: method.doc_comment.clone().map(Documentation::String),
        insert_text: Some(method.name.clone()),
        insert_text_format: Some(InsertTextFormat::PLAIN_TEXT),
        ..Default::default()
    }
}

/// `final public static name(Type $a, $b): ret`
pub(crate) fn signature(method: &ReflectedMethod) -> String {
    let params = method
        .params
        .iter()
        .map(parameter)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} {}({params}): {}",
        modifier_names(method.modifiers),
        method.name,
        return_type(method)
    )
}

fn modifier_names(modifiers: Modifiers) -> String {
    let mut names = Vec::new();
    if modifiers.is_abstract {
        names.push("abstract");
    }
    if modifiers.is_final {
        names.push("final");
    }
    names.push(modifiers.visibility().as_str());
    if modifiers.is_static {
        names.push("static");
    }
    names.join(" ")
}

fn return_type(method: &ReflectedMethod) -> String {
    if let Some(declared) = &method.return_type {
        return display_type(declared);
    }
    if method.doc_return_types.is_empty() {
        return "mixed".to_string();
    }
    display_type(&method.doc_return_types.join("|"))
}

fn parameter(param: &ReflectedParameter) -> String {
    let type_text = param
        .type_hint
        .as_deref()
        .map(display_type)
        .or_else(|| (!param.doc_types.is_empty()).then(|| display_type(&param.doc_types.join("|"))));
    let variadic = if param.variadic { "..." } else { "" };
    match type_text {
        Some(type_text) => format!("{type_text} {variadic}${}", param.name),
        None => format!("{variadic}${}", param.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phpls_parser::Visibility;
    use pretty_assertions::assert_eq;

    fn method(name: &str, modifiers: Modifiers) -> ReflectedMethod {
        ReflectedMethod {
            name: name.to_string(),
            modifiers,
            params: Vec::new(),
            return_type: None,
            doc_return_types: Vec::new(),
            doc_comment: Some("testDocumentation".to_string()),
            declaring_class: "Foo".to_string(),
        }
    }

    #[test]
    fn modifiers_in_reflection_order() {
        let modifiers = Modifiers {
            visibility: Some(Visibility::Public),
            is_static: true,
            is_final: true,
            ..Modifiers::default()
        };
        let item = method_item(&method("testMethod", modifiers));
        assert_eq!(item.detail.as_deref(), Some("final public static testMethod(): mixed"));
        assert_eq!(item.label, "testMethod");
        assert_eq!(item.kind, Some(CompletionItemKind::METHOD));
        assert_eq!(
            item.documentation,
            Some(Documentation::String("testDocumentation".into()))
        );
        assert_eq!(item.insert_text.as_deref(), Some("testMethod"));
        assert_eq!(item.insert_text_format, Some(InsertTextFormat::PLAIN_TEXT));
    }

    #[test]
    fn doc_return_types_join_with_pipe() {
        let mut reflected = method("testMethod", Modifiers::default());
        reflected.doc_return_types = vec!["int".into(), "float".into()];
        assert_eq!(signature(&reflected), "public testMethod(): int|float");
    }

    #[test]
    fn declared_types_win_and_untyped_params_show_the_name() {
        let mut reflected = method("find", Modifiers::default());
        reflected.return_type = Some("?\\App\\User".into());
        reflected.doc_return_types = vec!["\\App\\Admin".into()];
        reflected.params = vec![
            ReflectedParameter {
                name: "id".into(),
                type_hint: Some("int".into()),
                doc_types: Vec::new(),
                by_ref: false,
                variadic: false,
                has_default: false,
            },
            ReflectedParameter {
                name: "options".into(),
                type_hint: None,
                doc_types: vec!["array".into()],
                by_ref: false,
                variadic: false,
                has_default: true,
            },
            ReflectedParameter {
                name: "rest".into(),
                type_hint: None,
                doc_types: Vec::new(),
                by_ref: false,
                variadic: true,
                has_default: false,
            },
        ];
        assert_eq!(
            signature(&reflected),
            "public find(int $id, array $options, ...$rest): ?App\\User"
        );
    }
}
