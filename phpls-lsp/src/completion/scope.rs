use phpls_parser::{ClassRef, Expr, ExprKind, Visibility};

use super::CompletionRequest;

/// Which members a `::` access may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticScope {
    /// `self::`, `static::` or the current class by name.
    All,
    /// `parent::`: public and protected.
    Inherited,
    /// Any other class.
    Public,
}

impl StaticScope {
    /// Scope of a static fetch, `None` for any other expression.
    #[must_use]
    pub fn of(request: &CompletionRequest<'_>) -> Option<Self> {
        let class = static_class(request.expression)?;
        let scope = match class {
            ClassRef::Named(name) if name.is_unqualified() => {
                match name.last().to_ascii_lowercase().as_str() {
                    "self" | "static" => Self::All,
                    "parent" => Self::Inherited,
                    _ => Self::by_receiver(request),
                }
            }
            ClassRef::Named(_) | ClassRef::Dynamic(_) => Self::by_receiver(request),
        };
        Some(scope)
    }

    fn by_receiver(request: &CompletionRequest<'_>) -> Self {
        let current = request.document.class_name();
        let own_class = request
            .receiver
            .zip(current)
            .is_some_and(|(receiver, current)| receiver.name.eq_ignore_ascii_case(current));
        if own_class { Self::All } else { Self::Public }
    }

    #[must_use]
    pub fn admits(self, visibility: Visibility) -> bool {
        match self {
            Self::All => true,
            Self::Inherited => visibility != Visibility::Private,
            Self::Public => visibility == Visibility::Public,
        }
    }
}

/// Class operand of `Foo::` and `Foo::$`.
pub(crate) fn static_class(expression: &Expr) -> Option<&ClassRef> {
    match &expression.kind {
        ExprKind::ClassConstFetch { class, .. } | ExprKind::StaticPropertyFetch { class, .. } => {
            Some(class)
        }
        ExprKind::Variable(_)
        | ExprKind::Assign { .. }
        | ExprKind::CompoundAssign { .. }
        | ExprKind::New { .. }
        | ExprKind::MethodCall { .. }
        | ExprKind::PropertyFetch { .. }
        | ExprKind::StaticCall { .. }
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
        | ExprKind::ArrowFunction(_) => None,
    }
}

/// `Foo::name`, where a method or constant may follow. `Foo::$` only
/// leads to static properties.
pub(crate) fn class_member_access(expression: &Expr) -> bool {
    matches!(expression.kind, ExprKind::ClassConstFetch { .. })
}

/// Receiver of `$recv->`, including `$a->b()->`.
pub(crate) fn instance_receiver(expression: &Expr) -> Option<&Expr> {
    if let ExprKind::PropertyFetch { receiver, .. } = &expression.kind {
        Some(receiver)
    } else {
        None
    }
}
