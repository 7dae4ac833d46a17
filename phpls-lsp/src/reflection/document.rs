//! Reflection of the classes declared in a single document

use phpls_parser::{ClassDecl, ClassKind, Member, MemberKind, MethodDecl, Name, Param, TypeHint};

use super::{
    ReflectedClass, ReflectedConstant, ReflectedMethod, ReflectedParameter, ReflectedProperty,
    SourceLocator,
};
use crate::docblock::{DocBlock, split_union};
use crate::resolve::names::{is_builtin_type, resolve_class_name, resolve_class_text};
use crate::state::{DeclaredClass, SyntaxDocument};

/// Locates the classes declared in one document.
#[derive(Debug, Clone)]
pub struct DocumentSourceLocator {
    document: SyntaxDocument,
}

impl DocumentSourceLocator {
    #[must_use]
    pub fn new(document: SyntaxDocument) -> Self {
        Self { document }
    }
}

impl SourceLocator for DocumentSourceLocator {
    fn locate(&self, name: &str) -> Option<ReflectedClass> {
        let wanted = name.trim_start_matches('\\');
        self.document
            .class_declarations()
            .into_iter()
            .find(|declared| declared.name().eq_ignore_ascii_case(wanted))
            .map(|declared| reflect_declaration(&self.document, declared))
    }
}

fn reflect_declaration(document: &SyntaxDocument, declared: DeclaredClass<'_>) -> ReflectedClass {
    let class = declared.declaration;
    let name = declared.name();
    let resolve_all = |names: &[Name]| -> Vec<String> {
        names
            .iter()
            .filter_map(|name| resolve_class_name(document, name))
            .collect()
    };

    let (parent, interfaces) = match class.kind {
        ClassKind::Class => (
            class
                .extends
                .first()
                .and_then(|parent| resolve_class_name(document, parent)),
            resolve_all(&class.implements),
        ),
        ClassKind::Interface => (None, resolve_all(&class.extends)),
        ClassKind::Trait => (None, Vec::new()),
    };

    let mut reflected = ReflectedClass {
        name: name.clone(),
        kind: class.kind,
        modifiers: class.modifiers,
        parent,
        interfaces,
        traits: Vec::new(),
        doc_comment: class.doc_comment.clone(),
        methods: Vec::new(),
        properties: Vec::new(),
        constants: Vec::new(),
        origin: Some(document.clone()),
    };

    for member in &class.members {
        reflect_member(document, &name, member, &mut reflected);
    }
    add_promoted_properties(&name, class, &mut reflected);
    reflected
}

fn reflect_member(
    document: &SyntaxDocument,
    class_name: &str,
    member: &Member,
    reflected: &mut ReflectedClass,
) {
    let doc = member.doc_comment.as_deref().map(DocBlock::parse);
    match &member.kind {
        MemberKind::Property(property) => {
            let doc_types = doc
                .as_ref()
                .map(|doc| canonical_doc_types(document, &doc.var_types()))
                .unwrap_or_default();
            for item in &property.items {
                reflected.properties.push(ReflectedProperty {
                    name: item.name.name.clone(),
                    modifiers: property.modifiers,
                    declared_type: property
                        .type_hint
                        .as_ref()
                        .map(|hint| canonical_type_hint(document, hint)),
                    doc_types: doc_types.clone(),
                    doc_comment: member.doc_comment.clone(),
                    declaring_class: class_name.to_string(),
                });
            }
        }
        MemberKind::Method(method) => {
            reflected
                .methods
                .push(reflect_method(document, class_name, method, member, doc.as_ref()));
        }
        MemberKind::Constant(constant) => {
            for item in &constant.items {
                reflected.constants.push(ReflectedConstant {
                    name: item.name.name.clone(),
                    modifiers: constant.modifiers,
                    doc_comment: member.doc_comment.clone(),
                    declaring_class: class_name.to_string(),
                });
            }
        }
        MemberKind::TraitUse(names) => {
            reflected
                .traits
                .extend(names.iter().filter_map(|name| resolve_class_name(document, name)));
        }
    }
}

fn reflect_method(
    document: &SyntaxDocument,
    class_name: &str,
    method: &MethodDecl,
    member: &Member,
    doc: Option<&DocBlock>,
) -> ReflectedMethod {
    ReflectedMethod {
        name: method.name.name.clone(),
        modifiers: method.modifiers,
        params: method
            .params
            .iter()
            .map(|param| reflect_parameter(document, param, doc))
            .collect(),
        return_type: method
            .return_type
            .as_ref()
            .map(|hint| canonical_type_hint(document, hint)),
        doc_return_types: doc
            .map(|doc| canonical_doc_types(document, &doc.return_types()))
            .unwrap_or_default(),
        doc_comment: member.doc_comment.clone(),
        declaring_class: class_name.to_string(),
    }
}

fn reflect_parameter(
    document: &SyntaxDocument,
    param: &Param,
    doc: Option<&DocBlock>,
) -> ReflectedParameter {
    ReflectedParameter {
        name: param.name.name.clone(),
        type_hint: param
            .type_hint
            .as_ref()
            .map(|hint| canonical_type_hint(document, hint)),
        doc_types: doc
            .map(|doc| canonical_doc_types(document, &doc.param_types(&param.name.name)))
            .unwrap_or_default(),
        by_ref: param.by_ref,
        variadic: param.variadic,
        has_default: param.default.is_some(),
    }
}

/// Constructor parameters with a visibility modifier are properties too.
fn add_promoted_properties(
    class_name: &str,
    class: &ClassDecl,
    reflected: &mut ReflectedClass,
) {
    let Some(constructor) = class.constructor() else {
        return;
    };
    let Some(method) = reflected.method("__construct") else {
        return;
    };
    let promoted: Vec<ReflectedProperty> = constructor
        .params
        .iter()
        .zip(&method.params)
        .filter_map(|(param, reflected_param)| {
            let modifiers = param.promoted?;
            Some(ReflectedProperty {
                name: param.name.name.clone(),
                modifiers,
                declared_type: reflected_param.type_hint.clone(),
                doc_types: reflected_param.doc_types.clone(),
                doc_comment: None,
                declaring_class: class_name.to_string(),
            })
        })
        .collect();
    for property in promoted {
        if reflected.property(&property.name).is_none() {
            reflected.properties.push(property);
        }
    }
}

/// Canonical text of a declared type: built-in types lower-cased, class names
/// fully qualified with a leading `\`, `self`/`static`/`parent` kept.
#[must_use]
pub(crate) fn canonical_type_hint(document: &SyntaxDocument, hint: &TypeHint) -> String {
    match hint {
        TypeHint::Identifier(identifier) => identifier.name.to_ascii_lowercase(),
        TypeHint::Name(name) => {
            if name.is_unqualified() && is_builtin_type(name.last()) {
                name.last().to_ascii_lowercase()
            } else {
                resolve_class_name(document, name)
                    .map_or_else(|| name.to_string(), |fqn| format!("\\{fqn}"))
            }
        }
        TypeHint::Nullable { inner, .. } => format!("?{}", canonical_type_hint(document, inner)),
        TypeHint::Union { types, .. } => types
            .iter()
            .map(|member| canonical_type_hint(document, member))
            .collect::<Vec<_>>()
            .join("|"),
    }
}

/// Canonical text of one doc comment type. Generic and array shapes such as
/// `Foo[]` or `array<int, Foo>` are kept as written.
#[must_use]
pub(crate) fn canonical_doc_type(document: &SyntaxDocument, text: &str) -> String {
    let text = text.trim();
    if is_builtin_type(text) {
        return text.to_ascii_lowercase();
    }
    if let Some(inner) = text.strip_prefix('?') {
        return format!("?{}", canonical_doc_type(document, inner));
    }
    if text.contains(|ch: char| "<[({$ ".contains(ch)) {
        return text.to_string();
    }
    resolve_class_text(document, text).map_or_else(|| text.to_string(), |fqn| format!("\\{fqn}"))
}

fn canonical_doc_types(document: &SyntaxDocument, types: &[String]) -> Vec<String> {
    types
        .iter()
        .flat_map(|text| split_union(text))
        .map(|member| canonical_doc_type(document, &member))
        .collect()
}
