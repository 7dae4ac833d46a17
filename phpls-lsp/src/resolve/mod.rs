//! Type inference for expressions.
//!
//! [`TypeResolver::resolve`] dispatches on the kind of node it is given and
//! recurses through receivers, assignments and parameters until it reaches a
//! class name, a scalar, or gives up with [`ResolvedType::Unresolved`].
//! Variables are resolved with a lexical approximation of scope: the nearest
//! assignment or parameter of the same name that ends before the reference.
//! There is no control-flow analysis.

use std::fmt;
use std::sync::Arc;

use phpls_parser::{ClassRef, Expr, ExprKind, Name, Node, StmtKind, TypeHint};
use rustc_hash::FxHashSet;
use tracing::{debug, instrument};

use crate::cache::UsageAwareCache;
use crate::docblock::split_union;
use crate::reflection::{ReflectedClass, Reflector, canonical_doc_type};
use crate::state::SyntaxDocument;

pub mod names;

use names::{is_builtin_type, resolve_class_name, resolve_class_text};

/// Nesting limit for one resolution. Self-referencing constructor
/// assignments would otherwise recurse forever.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Int,
    Void,
    Bool,
    Float,
    Array,
    Object,
    String,
    Iterable,
    Callable,
}

impl Scalar {
    /// The scalar named `text`, ignoring case.
    #[must_use]
    pub fn from_name(text: &str) -> Option<Self> {
        Some(match text.to_ascii_lowercase().as_str() {
            "int" => Self::Int,
            "void" => Self::Void,
            "bool" => Self::Bool,
            "float" => Self::Float,
            "array" => Self::Array,
            "object" => Self::Object,
            "string" => Self::String,
            "iterable" => Self::Iterable,
            "callable" => Self::Callable,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::Array => "array",
            Self::Object => "object",
            Self::String => "string",
            Self::Iterable => "iterable",
            Self::Callable => "callable",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of inferring the type of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    /// Fully qualified class name, without a leading `\`.
    Class(String),
    Scalar(Scalar),
    /// Several possible types, each a class name or a built-in type.
    Union(Vec<String>),
    Unresolved,
}

impl ResolvedType {
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::Class(name) => Some(name),
            Self::Scalar(_) | Self::Union(_) | Self::Unresolved => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    /// The rendered type, `None` when unresolved.
    #[must_use]
    pub fn identifier(&self) -> Option<String> {
        self.is_resolved().then(|| self.to_string())
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(name) => f.write_str(name),
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::Union(members) => f.write_str(&members.join("|")),
            Self::Unresolved => f.write_str("unresolved"),
        }
    }
}

/// Memo key: reflector generation, document id, node kind and span.
type MemoKey = (u64, u64, &'static str, usize, usize);

fn node_kind(node: Node<'_>) -> &'static str {
    match node {
        Node::Stmt(_) => "stmt",
        Node::Expr(_) => "expr",
        Node::Param(_) => "param",
        Node::Member(_) => "member",
        Node::Name(_) => "name",
        Node::Type(_) => "type",
    }
}

pub struct TypeResolver {
    reflector: Arc<Reflector>,
    memo: UsageAwareCache<MemoKey, ResolvedType>,
}

impl TypeResolver {
    #[must_use]
    pub fn new(reflector: Arc<Reflector>) -> Self {
        Self {
            reflector,
            memo: UsageAwareCache::new(),
        }
    }

    #[must_use]
    pub fn reflector(&self) -> &Reflector {
        &self.reflector
    }

    /// Infer the type of `node`, a node of `document`.
    ///
    /// Results are memoized per parsed document and registry generation.
    #[instrument(level = "debug", skip_all, fields(uri = document.uri(), span = ?node.span()))]
    pub fn resolve(&self, document: &SyntaxDocument, node: Node<'_>) -> ResolvedType {
        let span = node.span();
        let key = (
            self.reflector.generation(),
            document.id(),
            node_kind(node),
            span.start,
            span.end,
        );
        if let Some(resolved) = self.memo.get(&key) {
            return resolved;
        }
        let resolved = self.infer(document, node);
        self.memo.set(key, resolved.clone());
        resolved
    }

    /// Like [`resolve`](Self::resolve) without memoization, for nodes that do
    /// not belong to `document`'s tree, such as a completion target parsed
    /// from an edited buffer.
    #[must_use]
    pub fn infer(&self, document: &SyntaxDocument, node: Node<'_>) -> ResolvedType {
        let resolved = self.node(document, node, 0);
        if !resolved.is_resolved() {
            debug!(span = ?node.span(), "unresolved");
        }
        resolved
    }

    #[must_use]
    pub fn resolve_expr(&self, document: &SyntaxDocument, expr: &Expr) -> ResolvedType {
        self.resolve(document, Node::Expr(expr))
    }

    /// Type of the innermost expression at `offset`.
    #[must_use]
    pub fn type_at(&self, document: &SyntaxDocument, offset: usize) -> ResolvedType {
        document
            .node_at(offset)
            .map_or(ResolvedType::Unresolved, |expr| {
                self.resolve_expr(document, expr)
            })
    }

    /// Purge memoized types and classes that have not been used for a while.
    pub fn clean_cache(&self) -> usize {
        self.memo.clean() + self.reflector.clean_cache()
    }

    fn node(&self, document: &SyntaxDocument, node: Node<'_>, depth: usize) -> ResolvedType {
        if depth > MAX_DEPTH {
            debug!(span = ?node.span(), "resolution depth exceeded");
            return ResolvedType::Unresolved;
        }
        match node {
            Node::Expr(expr) => self.expr(document, expr, depth),
            Node::Name(name) => class_name(document, name),
            Node::Type(hint) => type_hint(document, hint),
            Node::Param(param) => param
                .type_hint
                .as_ref()
                .map_or(ResolvedType::Unresolved, |hint| type_hint(document, hint)),
            Node::Stmt(_) | Node::Member(_) => ResolvedType::Unresolved,
        }
    }

    fn expr(&self, document: &SyntaxDocument, expr: &Expr, depth: usize) -> ResolvedType {
        let depth = depth + 1;
        if depth > MAX_DEPTH {
            debug!(span = ?expr.span, "resolution depth exceeded");
            return ResolvedType::Unresolved;
        }
        match &expr.kind {
            ExprKind::Variable(name) => self.variable(document, name, expr, depth),
            ExprKind::StaticPropertyFetch { class, .. }
            | ExprKind::ClassConstFetch { class, .. }
            | ExprKind::StaticCall { class, .. }
            | ExprKind::New { class, .. } => self.class_ref(document, class, depth),
            ExprKind::Assign { value, .. } => self.expr(document, value, depth),
            ExprKind::MethodCall {
                receiver, name, ..
            } => {
                let receiver = self.expr(document, receiver, depth);
                self.return_type(document, &receiver, &name.name)
            }
            ExprKind::PropertyFetch {
                receiver, name, ..
            } => self.property_type(document, receiver, &name.name, depth),
            ExprKind::CompoundAssign { .. }
            | ExprKind::FunctionCall { .. }
            | ExprKind::Invoke { .. }
            | ExprKind::ConstFetch(_)
            | ExprKind::Literal(_)
            | ExprKind::Array(_)
            | ExprKind::ArrayDimFetch { .. }
            | ExprKind::Binary { .. }
            | ExprKind::Unary { .. }
            | ExprKind::Ternary { .. }
            | ExprKind::Instanceof { .. }
            | ExprKind::Cast { .. }
            | ExprKind::Clone(_)
            | ExprKind::Throw(_)
            | ExprKind::Include(_)
            | ExprKind::Isset(_)
            | ExprKind::Empty(_)
            | ExprKind::Closure(_)
            | ExprKind::ArrowFunction(_) => ResolvedType::Unresolved,
        }
    }

    fn class_ref(&self, document: &SyntaxDocument, class: &ClassRef, depth: usize) -> ResolvedType {
        match class {
            ClassRef::Named(name) => class_name(document, name),
            ClassRef::Dynamic(expr) => self.expr(document, expr, depth),
        }
    }

    /// `$this` is the document's class. Any other variable takes the type of
    /// its nearest preceding binding.
    fn variable(
        &self,
        document: &SyntaxDocument,
        name: &str,
        reference: &Expr,
        depth: usize,
    ) -> ResolvedType {
        if name == "this" {
            return document
                .class_name()
                .map_or(ResolvedType::Unresolved, |class| {
                    ResolvedType::Class(class.to_string())
                });
        }

        let binding = document
            .search_nodes(|node| binds_variable(node, name))
            .into_iter()
            .filter(|node| {
                let span = node.span();
                span.end <= reference.span.end && !span.encloses(reference.span)
            })
            .max_by_key(|node| node.span().end);

        match binding {
            Some(node) => self.node(document, node, depth),
            None => {
                debug!(variable = name, "no preceding binding");
                ResolvedType::Unresolved
            }
        }
    }

    fn reflect(&self, document: &SyntaxDocument, receiver: &ResolvedType) -> Option<Arc<ReflectedClass>> {
        let name = receiver.class_name()?;
        match self.reflector.reflect_from(document, name) {
            Ok(class) => Some(class),
            Err(error) => {
                debug!(%error, "receiver not reflectable");
                None
            }
        }
    }

    /// Declared return type of `method`, else its `@return` types.
    fn return_type(&self, document: &SyntaxDocument, receiver: &ResolvedType, method: &str) -> ResolvedType {
        let Some(class) = self.reflect(document, receiver) else {
            return ResolvedType::Unresolved;
        };
        let Some(reflected) = class.method(method) else {
            debug!(class = class.name, method, "no such method");
            return ResolvedType::Unresolved;
        };
        let text = reflected
            .return_type
            .clone()
            .unwrap_or_else(|| reflected.doc_return_types.join("|"));
        type_text(document, &class, &text)
    }

    /// The first of these that yields a type wins: a simple declared type,
    /// the last `@var` type, a matching `@property` tag of the class, and the
    /// type assigned to `$this->name` in the constructor.
    fn property_type(
        &self,
        document: &SyntaxDocument,
        receiver: &Expr,
        name: &str,
        depth: usize,
    ) -> ResolvedType {
        let receiver = self.expr(document, receiver, depth);
        let Some(class) = self.reflect(document, &receiver) else {
            return ResolvedType::Unresolved;
        };

        if let Some(property) = class.property(name) {
            if let Some(declared) = property.simple_declared_type() {
                let resolved = type_text(document, &class, declared);
                if resolved.is_resolved() {
                    return resolved;
                }
            }
            if let Some(last) = property.doc_types.last() {
                let resolved = type_text(document, &class, last);
                if resolved.is_resolved() {
                    return resolved;
                }
            }
        }

        if let Some(tag) = class
            .property_tags()
            .into_iter()
            .find(|tag| tag.variable == name && !tag.type_text.is_empty())
        {
            let context = class.origin.as_ref().unwrap_or(document);
            let canonical = split_union(&tag.type_text)
                .iter()
                .map(|member| canonical_doc_type(context, member))
                .collect::<Vec<_>>()
                .join("|");
            let resolved = type_text(document, &class, &canonical);
            if resolved.is_resolved() {
                return resolved;
            }
        }

        self.constructor_assignment(document, &class, name, depth)
    }

    fn constructor_assignment(
        &self,
        document: &SyntaxDocument,
        class: &ReflectedClass,
        name: &str,
        depth: usize,
    ) -> ResolvedType {
        let Some(constructor) = class.method("__construct") else {
            return ResolvedType::Unresolved;
        };
        let owner = if constructor.declaring_class == class.name {
            class.origin.clone()
        } else {
            self.reflector
                .reflect_from(document, &constructor.declaring_class)
                .ok()
                .and_then(|owner| owner.origin.clone())
        };
        let Some(owner) = owner else {
            return ResolvedType::Unresolved;
        };

        let declarations = owner.class_declarations();
        let Some(body) = declarations
            .iter()
            .find(|declared| declared.name().eq_ignore_ascii_case(&constructor.declaring_class))
            .and_then(|declared| declared.declaration.constructor())
            .and_then(|method| method.body.as_ref())
        else {
            return ResolvedType::Unresolved;
        };

        let assigned = body.iter().find_map(|statement| {
            let StmtKind::Expression(expr) = &statement.kind else {
                return None;
            };
            let ExprKind::Assign { target, value, .. } = &expr.kind else {
                return None;
            };
            let ExprKind::PropertyFetch {
                receiver,
                name: property,
                ..
            } = &target.kind
            else {
                return None;
            };
            (receiver.as_variable() == Some("this") && property.name == name).then_some(value)
        });

        match assigned {
            Some(value) => self.expr(&owner, value, depth),
            None => {
                debug!(class = class.name, property = name, "no type for property");
                ResolvedType::Unresolved
            }
        }
    }
}

fn binds_variable(node: &Node<'_>, name: &str) -> bool {
    match node {
        Node::Expr(expr) => {
            if let ExprKind::Assign { target, .. } = &expr.kind {
                target.as_variable() == Some(name)
            } else {
                false
            }
        }
        Node::Param(param) => param.name.name == name,
        Node::Stmt(_) | Node::Member(_) | Node::Name(_) | Node::Type(_) => false,
    }
}

fn class_name(document: &SyntaxDocument, name: &Name) -> ResolvedType {
    resolve_class_name(document, name).map_or(ResolvedType::Unresolved, ResolvedType::Class)
}

fn type_hint(document: &SyntaxDocument, hint: &TypeHint) -> ResolvedType {
    match hint {
        TypeHint::Identifier(identifier) => {
            Scalar::from_name(&identifier.name).map_or(ResolvedType::Unresolved, ResolvedType::Scalar)
        }
        TypeHint::Name(name) => class_name(document, name),
        TypeHint::Nullable { inner, .. } => type_hint(document, inner),
        TypeHint::Union { types, .. } => {
            let members: Vec<String> = types
                .iter()
                .filter_map(|member| match type_hint(document, member) {
                    ResolvedType::Unresolved => match member {
                        TypeHint::Identifier(identifier) => Some(identifier.name.to_ascii_lowercase()),
                        TypeHint::Name(_) | TypeHint::Nullable { .. } | TypeHint::Union { .. } => None,
                    },
                    resolved => Some(resolved.to_string()),
                })
                .collect();
            union(members)
        }
    }
}

fn union(members: Vec<String>) -> ResolvedType {
    let mut seen = FxHashSet::default();
    let mut members: Vec<String> = members
        .into_iter()
        .filter(|member| seen.insert(member.clone()))
        .collect();
    match members.len() {
        0 => ResolvedType::Unresolved,
        1 => members
            .pop()
            .map_or(ResolvedType::Unresolved, |member| {
                Scalar::from_name(&member).map_or(ResolvedType::Class(member), ResolvedType::Scalar)
            }),
        _ => ResolvedType::Union(members),
    }
}

/// Resolve a reflected type string in the context of `class`.
///
/// `self`, `static` and `$this` name the reflected class and `parent` its
/// parent. A leading `?` is dropped.
fn type_text(document: &SyntaxDocument, class: &ReflectedClass, text: &str) -> ResolvedType {
    let text = text.trim();
    let text = text.strip_prefix('?').unwrap_or(text);
    let members = split_union(text);
    if members.len() > 1 {
        let members: Vec<String> = members
            .iter()
            .filter_map(|member| union_member(document, class, member))
            .collect();
        return match members.as_slice() {
            [single] => type_text(document, class, single),
            _ => union(members),
        };
    }
    if text.is_empty() {
        return ResolvedType::Unresolved;
    }

    let lower = text.to_ascii_lowercase();
    match lower.as_str() {
        "self" | "static" | "$this" | "this" => return ResolvedType::Class(class.name.clone()),
        "parent" => {
            return class
                .parent
                .clone()
                .map_or(ResolvedType::Unresolved, ResolvedType::Class);
        }
        _ => {}
    }
    if let Some(scalar) = Scalar::from_name(&lower) {
        return ResolvedType::Scalar(scalar);
    }
    if is_array_shape(&lower) {
        return ResolvedType::Scalar(Scalar::Array);
    }
    if is_builtin_type(&lower) || text.contains(|ch: char| "<({$ ".contains(ch)) {
        return ResolvedType::Unresolved;
    }
    let context = class.origin.as_ref().unwrap_or(document);
    resolve_class_text(context, text).map_or(ResolvedType::Unresolved, ResolvedType::Class)
}

fn union_member(document: &SyntaxDocument, class: &ReflectedClass, member: &str) -> Option<String> {
    let lower = member.to_ascii_lowercase();
    match type_text(document, class, member) {
        ResolvedType::Unresolved => is_builtin_type(&lower).then_some(lower),
        resolved => Some(resolved.to_string()),
    }
}

fn is_array_shape(lower: &str) -> bool {
    lower.ends_with("[]")
        || lower.starts_with("array<")
        || lower.starts_with("array{")
        || lower.starts_with("list<")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("int", Some(Scalar::Int))]
    #[case("VOID", Some(Scalar::Void))]
    #[case("bool", Some(Scalar::Bool))]
    #[case("float", Some(Scalar::Float))]
    #[case("array", Some(Scalar::Array))]
    #[case("object", Some(Scalar::Object))]
    #[case("String", Some(Scalar::String))]
    #[case("iterable", Some(Scalar::Iterable))]
    #[case("callable", Some(Scalar::Callable))]
    #[case("mixed", None)]
    #[case("null", None)]
    #[case("Foo", None)]
    fn scalar_set(#[case] text: &str, #[case] expected: Option<Scalar>) {
        assert_eq!(Scalar::from_name(text), expected);
    }

    #[test]
    fn display() {
        assert_eq!(ResolvedType::Class("App\\User".into()).to_string(), "App\\User");
        assert_eq!(ResolvedType::Scalar(Scalar::Int).to_string(), "int");
        assert_eq!(
            ResolvedType::Union(vec!["int".into(), "float".into()]).to_string(),
            "int|float"
        );
        assert_eq!(ResolvedType::Unresolved.identifier(), None);
    }

    #[test]
    fn union_collapses_single_members() {
        assert_eq!(union(vec!["int".into()]), ResolvedType::Scalar(Scalar::Int));
        assert_eq!(union(vec!["Foo".into()]), ResolvedType::Class("Foo".into()));
        assert_eq!(union(Vec::new()), ResolvedType::Unresolved);
    }

    #[test]
    fn union_drops_repeated_members() {
        assert_eq!(
            union(vec!["int".into(), "string".into(), "int".into()]),
            ResolvedType::Union(vec!["int".into(), "string".into()])
        );
        assert_eq!(
            union(vec!["Foo".into(), "int".into(), "Foo".into(), "int".into()]),
            ResolvedType::Union(vec!["Foo".into(), "int".into()])
        );
        assert_eq!(
            union(vec!["int".into(), "bool".into(), "int".into(), "bool".into()]).to_string(),
            "int|bool"
        );
    }
}
