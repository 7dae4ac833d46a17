//! Pre-order traversal over the syntax tree.
//!
//! [`walk`] hands every statement, expression, parameter, class member, name
//! and type hint to a [`Visitor`], parents before children and siblings in
//! source order.

use crate::ast::{
    Argument, ArrayItem, ClassRef, Expr, ExprKind, Member, MemberKind, Name, Param, Span, Stmt,
    StmtKind, TypeHint,
};

/// A borrowed view of any node the walker visits.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Param(&'a Param),
    Member(&'a Member),
    Name(&'a Name),
    Type(&'a TypeHint),
}

impl Node<'_> {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Node::Stmt(stmt) => stmt.span,
            Node::Expr(expr) => expr.span,
            Node::Param(param) => param.span,
            Node::Member(member) => member.span,
            Node::Name(name) => name.span,
            Node::Type(type_hint) => type_hint.span(),
        }
    }
}

pub trait Visitor<'a> {
    /// Called once per node. Returning `false` skips the node's children.
    fn enter(&mut self, node: Node<'a>) -> bool;
}

impl<'a, F> Visitor<'a> for F
where
    F: FnMut(Node<'a>) -> bool,
{
    fn enter(&mut self, node: Node<'a>) -> bool {
        self(node)
    }
}

pub fn walk<'a, V: Visitor<'a> + ?Sized>(statements: &'a [Stmt], visitor: &mut V) {
    for statement in statements {
        walk_stmt(statement, visitor);
    }
}

pub fn walk_stmt<'a, V: Visitor<'a> + ?Sized>(statement: &'a Stmt, visitor: &mut V) {
    if !visitor.enter(Node::Stmt(statement)) {
        return;
    }
    match &statement.kind {
        StmtKind::Namespace { body, .. } => {
            if let Some(body) = body {
                walk(body, visitor);
            }
        }
        StmtKind::ClassLike(class) => {
            for name in class.extends.iter().chain(&class.implements) {
                visitor.enter(Node::Name(name));
            }
            for member in &class.members {
                walk_member(member, visitor);
            }
        }
        StmtKind::Function(function) => {
            walk_params(&function.params, visitor);
            if let Some(return_type) = &function.return_type {
                walk_type(return_type, visitor);
            }
            walk(&function.body, visitor);
        }
        StmtKind::Const(items) => {
            for item in items {
                walk_expr(&item.value, visitor);
            }
        }
        StmtKind::Expression(expr) => walk_expr(expr, visitor),
        StmtKind::Return(value) => {
            if let Some(value) = value {
                walk_expr(value, visitor);
            }
        }
        StmtKind::Echo(values) => walk_exprs(values, visitor),
        StmtKind::If {
            condition,
            then,
            else_ifs,
            otherwise,
        } => {
            walk_expr(condition, visitor);
            walk(then, visitor);
            for else_if in else_ifs {
                walk_expr(&else_if.condition, visitor);
                walk(&else_if.body, visitor);
            }
            if let Some(otherwise) = otherwise {
                walk(otherwise, visitor);
            }
        }
        StmtKind::While { condition, body } => {
            walk_expr(condition, visitor);
            walk(body, visitor);
        }
        StmtKind::DoWhile { body, condition } => {
            walk(body, visitor);
            walk_expr(condition, visitor);
        }
        StmtKind::For {
            init,
            condition,
            step,
            body,
        } => {
            walk_exprs(init, visitor);
            walk_exprs(condition, visitor);
            walk_exprs(step, visitor);
            walk(body, visitor);
        }
        StmtKind::Foreach {
            subject,
            key,
            value,
            body,
        } => {
            walk_expr(subject, visitor);
            if let Some(key) = key {
                walk_expr(key, visitor);
            }
            walk_expr(value, visitor);
            walk(body, visitor);
        }
        StmtKind::Switch { subject, cases } => {
            walk_expr(subject, visitor);
            for case in cases {
                if let Some(condition) = &case.condition {
                    walk_expr(condition, visitor);
                }
                walk(&case.body, visitor);
            }
        }
        StmtKind::Try {
            body,
            catches,
            finally,
        } => {
            walk(body, visitor);
            for catch in catches {
                for name in &catch.types {
                    visitor.enter(Node::Name(name));
                }
                walk(&catch.body, visitor);
            }
            if let Some(finally) = finally {
                walk(finally, visitor);
            }
        }
        StmtKind::Block(body) => walk(body, visitor),
        StmtKind::Static(vars) => {
            for var in vars {
                if let Some(default) = &var.default {
                    walk_expr(default, visitor);
                }
            }
        }
        StmtKind::Use { .. }
        | StmtKind::Global(_)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Nop => {}
    }
}

fn walk_member<'a, V: Visitor<'a> + ?Sized>(member: &'a Member, visitor: &mut V) {
    if !visitor.enter(Node::Member(member)) {
        return;
    }
    match &member.kind {
        MemberKind::Property(property) => {
            if let Some(type_hint) = &property.type_hint {
                walk_type(type_hint, visitor);
            }
            for item in &property.items {
                if let Some(default) = &item.default {
                    walk_expr(default, visitor);
                }
            }
        }
        MemberKind::Method(method) => {
            walk_params(&method.params, visitor);
            if let Some(return_type) = &method.return_type {
                walk_type(return_type, visitor);
            }
            if let Some(body) = &method.body {
                walk(body, visitor);
            }
        }
        MemberKind::Constant(constant) => {
            for item in &constant.items {
                walk_expr(&item.value, visitor);
            }
        }
        MemberKind::TraitUse(names) => {
            for name in names {
                visitor.enter(Node::Name(name));
            }
        }
    }
}

fn walk_params<'a, V: Visitor<'a> + ?Sized>(params: &'a [Param], visitor: &mut V) {
    for param in params {
        if !visitor.enter(Node::Param(param)) {
            continue;
        }
        if let Some(type_hint) = &param.type_hint {
            walk_type(type_hint, visitor);
        }
        if let Some(default) = &param.default {
            walk_expr(default, visitor);
        }
    }
}

fn walk_type<'a, V: Visitor<'a> + ?Sized>(type_hint: &'a TypeHint, visitor: &mut V) {
    if !visitor.enter(Node::Type(type_hint)) {
        return;
    }
    match type_hint {
        TypeHint::Identifier(_) => {}
        TypeHint::Name(name) => {
            visitor.enter(Node::Name(name));
        }
        TypeHint::Nullable { inner, .. } => walk_type(inner, visitor),
        TypeHint::Union { types, .. } => {
            for member in types {
                walk_type(member, visitor);
            }
        }
    }
}

fn walk_exprs<'a, V: Visitor<'a> + ?Sized>(exprs: &'a [Expr], visitor: &mut V) {
    for expr in exprs {
        walk_expr(expr, visitor);
    }
}

fn walk_args<'a, V: Visitor<'a> + ?Sized>(args: &'a [Argument], visitor: &mut V) {
    for arg in args {
        walk_expr(&arg.value, visitor);
    }
}

fn walk_class_ref<'a, V: Visitor<'a> + ?Sized>(class: &'a ClassRef, visitor: &mut V) {
    match class {
        ClassRef::Named(name) => {
            visitor.enter(Node::Name(name));
        }
        ClassRef::Dynamic(expr) => walk_expr(expr, visitor),
    }
}

fn walk_array_items<'a, V: Visitor<'a> + ?Sized>(items: &'a [ArrayItem], visitor: &mut V) {
    for item in items {
        if let Some(key) = &item.key {
            walk_expr(key, visitor);
        }
        walk_expr(&item.value, visitor);
    }
}

pub fn walk_expr<'a, V: Visitor<'a> + ?Sized>(expr: &'a Expr, visitor: &mut V) {
    if !visitor.enter(Node::Expr(expr)) {
        return;
    }
    match &expr.kind {
        ExprKind::Variable(_) | ExprKind::Literal(_) => {}
        ExprKind::ConstFetch(name) => {
            visitor.enter(Node::Name(name));
        }
        ExprKind::Assign { target, value, .. } | ExprKind::CompoundAssign { target, value, .. } => {
            walk_expr(target, visitor);
            walk_expr(value, visitor);
        }
        ExprKind::New { class, args } | ExprKind::StaticCall { class, args, .. } => {
            walk_class_ref(class, visitor);
            walk_args(args, visitor);
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            walk_expr(receiver, visitor);
            walk_args(args, visitor);
        }
        ExprKind::PropertyFetch { receiver, .. } => walk_expr(receiver, visitor),
        ExprKind::StaticPropertyFetch { class, .. } | ExprKind::ClassConstFetch { class, .. } => {
            walk_class_ref(class, visitor);
        }
        ExprKind::FunctionCall { name, args } => {
            visitor.enter(Node::Name(name));
            walk_args(args, visitor);
        }
        ExprKind::Invoke { callee, args } => {
            walk_expr(callee, visitor);
            walk_args(args, visitor);
        }
        ExprKind::Array(items) => walk_array_items(items, visitor),
        ExprKind::ArrayDimFetch { array, index } => {
            walk_expr(array, visitor);
            if let Some(index) = index {
                walk_expr(index, visitor);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, visitor);
            walk_expr(right, visitor);
        }
        ExprKind::Unary { operand, .. }
        | ExprKind::Cast { expr: operand, .. }
        | ExprKind::Clone(operand)
        | ExprKind::Throw(operand)
        | ExprKind::Include(operand)
        | ExprKind::Empty(operand) => walk_expr(operand, visitor),
        ExprKind::Ternary {
            condition,
            then,
            otherwise,
        } => {
            walk_expr(condition, visitor);
            if let Some(then) = then {
                walk_expr(then, visitor);
            }
            walk_expr(otherwise, visitor);
        }
        ExprKind::Instanceof { expr, class } => {
            walk_expr(expr, visitor);
            walk_class_ref(class, visitor);
        }
        ExprKind::Isset(items) => walk_exprs(items, visitor),
        ExprKind::Closure(closure) => {
            walk_params(&closure.params, visitor);
            if let Some(return_type) = &closure.return_type {
                walk_type(return_type, visitor);
            }
            walk(&closure.body, visitor);
        }
        ExprKind::ArrowFunction(arrow) => {
            walk_params(&arrow.params, visitor);
            if let Some(return_type) = &arrow.return_type {
                walk_type(return_type, visitor);
            }
            walk_expr(&arrow.body, visitor);
        }
    }
}
