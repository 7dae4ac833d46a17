//! Syntax tree for the PHP subset the language server reasons about.
//!
//! Every node carries a [`Span`] of absolute byte offsets into the source it
//! was parsed from. Node kinds are closed enums so that consumers match them
//! exhaustively.

use std::fmt;

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether `offset` falls inside the span. The end is inclusive here so a
    /// cursor sitting right after a token still counts as "on" it.
    #[must_use]
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Whether `other` lies completely within this span.
    #[must_use]
    pub fn encloses(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A bare identifier: method, property, constant or parameter name.
///
/// Property and parameter names are stored without the leading `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    #[must_use]
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// `Foo`
    Unqualified,
    /// `Foo\Bar`
    Qualified,
    /// `\Foo\Bar`
    FullyQualified,
}

/// A (possibly namespaced) class, function or constant name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub parts: Vec<String>,
    pub kind: NameKind,
    pub span: Span,
}

impl Name {
    /// Build a name from its textual form, e.g. `\App\Models\User`.
    ///
    /// Returns `None` for text that has no name segments at all.
    #[must_use]
    pub fn parse(text: &str, span: Span) -> Option<Self> {
        let trimmed = text.trim();
        let (kind, body) = match trimmed.strip_prefix('\\') {
            Some(rest) => (NameKind::FullyQualified, rest),
            None => (NameKind::Unqualified, trimmed),
        };
        let parts: Vec<String> = body
            .split('\\')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        if parts.is_empty() {
            return None;
        }
        let kind = if kind == NameKind::Unqualified && parts.len() > 1 {
            NameKind::Qualified
        } else {
            kind
        };
        Some(Self { parts, kind, span })
    }

    /// Last segment, `User` for `App\Models\User`.
    #[must_use]
    pub fn last(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    #[must_use]
    pub fn first(&self) -> &str {
        self.parts.first().map_or("", String::as_str)
    }

    #[must_use]
    pub fn is_unqualified(&self) -> bool {
        self.kind == NameKind::Unqualified
    }

    #[must_use]
    pub fn is_fully_qualified(&self) -> bool {
        self.kind == NameKind::FullyQualified
    }

    /// Segments joined with `\`, without any leading separator.
    #[must_use]
    pub fn joined(&self) -> String {
        self.parts.join("\\")
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fully_qualified() {
            write!(f, "\\")?;
        }
        write!(f, "{}", self.joined())
    }
}

/// A declared type: parameter, property or return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHint {
    /// Built-in type keyword such as `int`, `array` or `mixed`.
    Identifier(Identifier),
    /// Class-like type, including `self`, `static` and `parent`.
    Name(Name),
    Nullable { inner: Box<TypeHint>, span: Span },
    Union { types: Vec<TypeHint>, span: Span },
}

impl TypeHint {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Identifier(identifier) => identifier.span,
            Self::Name(name) => name.span,
            Self::Nullable { span, .. } | Self::Union { span, .. } => *span,
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(identifier) => write!(f, "{}", identifier.name),
            Self::Name(name) => write!(f, "{name}"),
            Self::Nullable { inner, .. } => write!(f, "?{inner}"),
            Self::Union { types, .. } => {
                let rendered: Vec<String> = types.iter().map(ToString::to_string).collect();
                write!(f, "{}", rendered.join("|"))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}

/// Declaration modifiers. A missing visibility means implicitly public.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_readonly: bool,
}

impl Modifiers {
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility.unwrap_or(Visibility::Public)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Abstract,
    Final,
    Readonly,
    /// Legacy `var`, an alias for `public`.
    Var,
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut modifiers = Self::default();
        for modifier in iter {
            match modifier {
                Modifier::Public | Modifier::Var => {
                    modifiers.visibility = Some(Visibility::Public);
                }
                Modifier::Protected => modifiers.visibility = Some(Visibility::Protected),
                Modifier::Private => modifiers.visibility = Some(Visibility::Private),
                Modifier::Static => modifiers.is_static = true,
                Modifier::Abstract => modifiers.is_abstract = true,
                Modifier::Final => modifiers.is_final = true,
                Modifier::Readonly => modifiers.is_readonly = true,
            }
        }
        modifiers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    /// `namespace Foo;` (body `None`) or `namespace Foo { ... }`.
    Namespace {
        name: Option<Name>,
        body: Option<Vec<Stmt>>,
    },
    Use {
        kind: UseKind,
        items: Vec<UseItem>,
    },
    ClassLike(Box<ClassDecl>),
    Function(Box<FunctionDecl>),
    Const(Vec<ConstItem>),
    Expression(Expr),
    Return(Option<Expr>),
    Echo(Vec<Expr>),
    If {
        condition: Expr,
        then: Vec<Stmt>,
        else_ifs: Vec<ElseIf>,
        otherwise: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        condition: Expr,
    },
    For {
        init: Vec<Expr>,
        condition: Vec<Expr>,
        step: Vec<Expr>,
        body: Vec<Stmt>,
    },
    Foreach {
        subject: Expr,
        key: Option<Expr>,
        value: Expr,
        body: Vec<Stmt>,
    },
    Switch {
        subject: Expr,
        cases: Vec<Case>,
    },
    Try {
        body: Vec<Stmt>,
        catches: Vec<Catch>,
        finally: Option<Vec<Stmt>>,
    },
    Block(Vec<Stmt>),
    Global(Vec<Identifier>),
    Static(Vec<StaticVar>),
    Break,
    Continue,
    /// Empty statement or a `declare(...)` directive.
    Nop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind {
    Normal,
    Function,
    Const,
}

/// One imported name of a `use` statement, group imports already expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseItem {
    pub name: Name,
    pub alias: Option<Identifier>,
    pub span: Span,
}

impl UseItem {
    /// The name the import is visible as inside the file.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.alias
            .as_ref()
            .map_or_else(|| self.name.last(), |alias| alias.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElseIf {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    /// `None` for `default:`.
    pub condition: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catch {
    pub types: Vec<Name>,
    pub variable: Option<Identifier>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticVar {
    pub name: Identifier,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub kind: ClassKind,
    pub name: Identifier,
    pub modifiers: Modifiers,
    /// Parent class for classes; parent interfaces for interfaces.
    pub extends: Vec<Name>,
    pub implements: Vec<Name>,
    pub members: Vec<Member>,
    pub doc_comment: Option<String>,
}

impl ClassDecl {
    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|member| match &member.kind {
            MemberKind::Method(method) => Some(method),
            MemberKind::Property(_) | MemberKind::Constant(_) | MemberKind::TraitUse(_) => None,
        })
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods()
            .find(|method| method.name.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn constructor(&self) -> Option<&MethodDecl> {
        self.method("__construct")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub kind: MemberKind,
    pub span: Span,
    pub doc_comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    Property(PropertyDecl),
    Method(MethodDecl),
    Constant(ConstantDecl),
    TraitUse(Vec<Name>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDecl {
    pub modifiers: Modifiers,
    pub type_hint: Option<TypeHint>,
    pub items: Vec<PropertyItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyItem {
    pub name: Identifier,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    pub name: Identifier,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    /// `None` for abstract and interface methods.
    pub body: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantDecl {
    pub modifiers: Modifiers,
    pub items: Vec<ConstItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstItem {
    pub name: Identifier,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: Identifier,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    pub body: Vec<Stmt>,
    pub doc_comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Variable name without the `$`.
    pub name: Identifier,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
    pub by_ref: bool,
    pub variadic: bool,
    /// Set for promoted constructor parameters (`private Foo $foo`).
    pub promoted: Option<Modifiers>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The variable name if this is a plain `$name` reference.
    #[must_use]
    pub fn as_variable(&self) -> Option<&str> {
        if let ExprKind::Variable(name) = &self.kind {
            Some(name)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// `$name`, stored without the `$`.
    Variable(String),
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        by_ref: bool,
    },
    CompoundAssign {
        op: BinaryOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    New {
        class: ClassRef,
        args: Vec<Argument>,
    },
    MethodCall {
        receiver: Box<Expr>,
        name: Identifier,
        args: Vec<Argument>,
        nullsafe: bool,
    },
    /// `$receiver->name`. During completion `name` may be empty.
    PropertyFetch {
        receiver: Box<Expr>,
        name: Identifier,
        nullsafe: bool,
    },
    StaticCall {
        class: ClassRef,
        name: Identifier,
        args: Vec<Argument>,
    },
    /// `Foo::$name`, `name` stored without the `$`.
    StaticPropertyFetch {
        class: ClassRef,
        name: Identifier,
    },
    /// `Foo::NAME`, also `Foo::class`.
    ClassConstFetch {
        class: ClassRef,
        name: Identifier,
    },
    FunctionCall {
        name: Name,
        args: Vec<Argument>,
    },
    /// Call of an arbitrary callable expression, `$fn()`.
    Invoke {
        callee: Box<Expr>,
        args: Vec<Argument>,
    },
    /// Bare name in expression position: constants, `true`, `null`.
    ConstFetch(Name),
    Literal(Literal),
    Array(Vec<ArrayItem>),
    ArrayDimFetch {
        array: Box<Expr>,
        index: Option<Box<Expr>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then: Option<Box<Expr>>,
        otherwise: Box<Expr>,
    },
    Instanceof {
        expr: Box<Expr>,
        class: ClassRef,
    },
    Cast {
        to: String,
        expr: Box<Expr>,
    },
    Clone(Box<Expr>),
    Throw(Box<Expr>),
    Include(Box<Expr>),
    Isset(Vec<Expr>),
    Empty(Box<Expr>),
    Closure(Box<Closure>),
    ArrowFunction(Box<ArrowFunction>),
}

/// The class operand of `new`, `::` and `instanceof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassRef {
    Named(Name),
    Dynamic(Box<Expr>),
}

impl ClassRef {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Named(name) => name.span,
            Self::Dynamic(expr) => expr.span,
        }
    }

    #[must_use]
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Self::Named(name) => Some(name),
            Self::Dynamic(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub value: Expr,
    pub spread: bool,
    pub name: Option<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
    pub by_ref: bool,
    pub spread: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// String contents without the quotes, escapes left as written.
    String(String),
    /// Numeric literal as written.
    Number(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Coalesce,
    BooleanOr,
    BooleanAnd,
    LogicalOr,
    LogicalAnd,
    LogicalXor,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Spaceship,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    ShiftLeft,
    ShiftRight,
    Concat,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    BitwiseNot,
    Silence,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    pub is_static: bool,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub uses: Vec<ClosureUse>,
    pub return_type: Option<TypeHint>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureUse {
    pub name: Identifier,
    pub by_ref: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrowFunction {
    pub is_static: bool,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    pub body: Expr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_parse_detects_kind() {
        let span = Span::default();
        let fq = Name::parse("\\App\\User", span);
        assert_eq!(fq.as_ref().map(|n| n.kind), Some(NameKind::FullyQualified));
        assert_eq!(fq.as_ref().map(Name::last), Some("User"));
        assert_eq!(fq.map(|n| n.to_string()), Some("\\App\\User".to_string()));

        let qualified = Name::parse("App\\User", span);
        assert_eq!(qualified.map(|n| n.kind), Some(NameKind::Qualified));

        let unqualified = Name::parse("User", span);
        assert_eq!(unqualified.map(|n| n.kind), Some(NameKind::Unqualified));

        assert!(Name::parse("\\", span).is_none());
    }

    #[test]
    fn span_touches_is_end_inclusive() {
        let span = Span::new(4, 8);
        assert!(span.touches(4));
        assert!(span.touches(8));
        assert!(!span.touches(9));
        assert!(span.encloses(Span::new(5, 8)));
        assert!(!span.encloses(Span::new(3, 8)));
    }

    #[test]
    fn modifiers_collect_from_keywords() {
        let modifiers: Modifiers = [Modifier::Final, Modifier::Protected, Modifier::Static]
            .into_iter()
            .collect();
        assert!(modifiers.is_final);
        assert!(modifiers.is_static);
        assert_eq!(modifiers.visibility(), Visibility::Protected);
        assert_eq!(Modifiers::default().visibility(), Visibility::Public);
    }
}
