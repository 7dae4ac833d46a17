use crate::ast::{
    ArrayItem, Argument, ArrowFunction, BinaryOp, Case, Catch, ClassDecl, ClassKind, ClassRef,
    Closure, ClosureUse, ConstItem, ConstantDecl, ElseIf, Expr, ExprKind, FunctionDecl,
    Identifier, Literal, Member, MemberKind, MethodDecl, Modifier, Modifiers, Name, NameKind,
    Param, PropertyDecl, PropertyItem, Span, StaticVar, Stmt, StmtKind, TypeHint, UnaryOp,
    UseItem, UseKind,
};

/// Words that never start a constant or function name in expression position.
const RESERVED: &[&str] = &[
    "abstract",
    "and",
    "as",
    "break",
    "case",
    "catch",
    "class",
    "clone",
    "const",
    "continue",
    "declare",
    "default",
    "do",
    "echo",
    "else",
    "elseif",
    "empty",
    "enddeclare",
    "endfor",
    "endforeach",
    "endif",
    "endswitch",
    "endwhile",
    "extends",
    "final",
    "finally",
    "fn",
    "for",
    "foreach",
    "function",
    "global",
    "goto",
    "if",
    "implements",
    "include",
    "include_once",
    "instanceof",
    "insteadof",
    "interface",
    "isset",
    "namespace",
    "new",
    "or",
    "private",
    "protected",
    "public",
    "require",
    "require_once",
    "return",
    "switch",
    "throw",
    "trait",
    "try",
    "use",
    "var",
    "while",
    "xor",
    "yield",
];

const CAST_TYPES: &[&str] = &[
    "int", "integer", "bool", "boolean", "float", "double", "real", "string", "array", "object",
    "unset", "binary",
];

/// Type keywords that are represented as [`TypeHint::Identifier`].
const BUILTIN_TYPES: &[&str] = &[
    "int", "float", "bool", "string", "array", "object", "iterable", "callable", "void", "mixed",
    "null", "never", "false", "true",
];

// Used purely in the grammar to represent one link of a member access chain.
#[derive(Debug)]
enum Suffix {
    Member {
        name: Identifier,
        nullsafe: bool,
        args: Option<Vec<Argument>>,
    },
    StaticProperty(Identifier),
    StaticMember {
        name: Identifier,
        args: Option<Vec<Argument>>,
    },
    Dim(Option<Expr>),
    Call(Vec<Argument>),
}

// Used purely in the grammar for the right hand side of an assignment.
#[derive(Debug)]
enum AssignTail {
    Assign { value: Expr, by_ref: bool },
    Compound { op: BinaryOp, value: Expr },
}

impl AssignTail {
    fn apply(self, target: Expr) -> Expr {
        match self {
            Self::Assign { value, by_ref } => {
                let span = Span::new(target.span.start, value.span.end);
                Expr::new(
                    ExprKind::Assign {
                        target: Box::new(target),
                        value: Box::new(value),
                        by_ref,
                    },
                    span,
                )
            }
            Self::Compound { op, value } => {
                let span = Span::new(target.span.start, value.span.end);
                Expr::new(
                    ExprKind::CompoundAssign {
                        op,
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    span,
                )
            }
        }
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED
        .iter()
        .any(|reserved| word.eq_ignore_ascii_case(reserved))
}

fn build_name(fully_qualified: bool, first: &str, rest: Vec<&str>, span: Span) -> Name {
    let mut parts = Vec::with_capacity(rest.len() + 1);
    parts.push(first.to_string());
    parts.extend(rest.into_iter().map(str::to_string));
    let kind = if fully_qualified {
        NameKind::FullyQualified
    } else if parts.len() > 1 {
        NameKind::Qualified
    } else {
        NameKind::Unqualified
    };
    Name { parts, kind, span }
}

fn type_from_name(name: Name) -> TypeHint {
    if name.is_unqualified() && BUILTIN_TYPES.contains(&name.last().to_ascii_lowercase().as_str())
    {
        TypeHint::Identifier(Identifier::new(name.last(), name.span))
    } else {
        TypeHint::Name(name)
    }
}

fn prefixed_use(prefix: &Name, item: UseItem) -> UseItem {
    let mut parts = prefix.parts.clone();
    parts.extend(item.name.parts);
    let kind = if prefix.is_fully_qualified() {
        NameKind::FullyQualified
    } else {
        NameKind::Qualified
    };
    UseItem {
        name: Name {
            parts,
            kind,
            span: item.name.span,
        },
        alias: item.alias,
        span: item.span,
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = Span::new(left.span.start, right.span.end);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn prefix(start: usize, operand: Expr, kind: impl FnOnce(Box<Expr>) -> ExprKind) -> Expr {
    let span = Span::new(start, operand.span.end);
    Expr::new(kind(Box::new(operand)), span)
}

fn unary(start: usize, op: UnaryOp, operand: Expr) -> Expr {
    prefix(start, operand, |operand| ExprKind::Unary { op, operand })
}

fn postfix_unary(op: UnaryOp, operand: Expr, end: usize) -> Expr {
    let span = Span::new(operand.span.start, end);
    Expr::new(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        span,
    )
}

fn class_ref(expr: Expr) -> ClassRef {
    let Expr { kind, span } = expr;
    if let ExprKind::ConstFetch(name) = kind {
        ClassRef::Named(name)
    } else {
        ClassRef::Dynamic(Box::new(Expr::new(kind, span)))
    }
}

fn apply_suffix(base: Expr, suffix: Suffix, end: usize) -> Expr {
    let span = Span::new(base.span.start, end);
    let kind = match suffix {
        Suffix::Member {
            name,
            nullsafe,
            args: Some(args),
        } => ExprKind::MethodCall {
            receiver: Box::new(base),
            name,
            args,
            nullsafe,
        },
        Suffix::Member {
            name,
            nullsafe,
            args: None,
        } => ExprKind::PropertyFetch {
            receiver: Box::new(base),
            name,
            nullsafe,
        },
        Suffix::StaticProperty(name) => ExprKind::StaticPropertyFetch {
            class: class_ref(base),
            name,
        },
        Suffix::StaticMember {
            name,
            args: Some(args),
        } => ExprKind::StaticCall {
            class: class_ref(base),
            name,
            args,
        },
        Suffix::StaticMember { name, args: None } => ExprKind::ClassConstFetch {
            class: class_ref(base),
            name,
        },
        Suffix::Dim(index) => ExprKind::ArrayDimFetch {
            array: Box::new(base),
            index: index.map(Box::new),
        },
        Suffix::Call(args) => {
            let Expr {
                kind: callee,
                span: callee_span,
            } = base;
            if let ExprKind::ConstFetch(name) = callee {
                ExprKind::FunctionCall { name, args }
            } else {
                ExprKind::Invoke {
                    callee: Box::new(Expr::new(callee, callee_span)),
                    args,
                }
            }
        }
    };
    Expr::new(kind, span)
}

fn fold_suffixes(head: Expr, suffixes: Vec<(Suffix, usize)>) -> Expr {
    suffixes
        .into_iter()
        .fold(head, |expr, (suffix, end)| apply_suffix(expr, suffix, end))
}

fn heredoc_body(raw: &str) -> String {
    raw.strip_prefix("\r\n")
        .or_else(|| raw.strip_prefix('\n'))
        .unwrap_or(raw)
        .to_string()
}

peg::parser! {
    pub(crate) grammar php_parser(base: usize) for str {

        // Offsets are reported relative to `base` so fragments of a larger
        // source produce absolute spans.
        rule pos() -> usize = p:position!() { p + base }

        pub(crate) rule file() -> Vec<Stmt>
            = "\u{feff}"? _ "<?php" !ident_char() statements:statement_list() _ ("?>" [_]*)? ![_] {
                statements
            }

        pub(crate) rule completion_target() -> Expr
            = _ target:completion_chain() _ ![_] { target }

        rule completion_chain() -> Expr
            = head:completion_head() suffixes:(_ s:suffix() { s })* partial:(_ p:partial_suffix() { p })? {
                let expr = fold_suffixes(head, suffixes);
                match partial {
                    Some((suffix, end)) => apply_suffix(expr, suffix, end),
                    None => expr,
                }
            }

        // A name being typed may still spell a keyword, as in `Abstract`
        // on its way to `AbstractLogger`.
        rule completion_head() -> Expr
            = primary()
            / start:pos() name:name() end:pos() {
                Expr::new(ExprKind::ConstFetch(name), Span::new(start, end))
            }

        // A member operator with the member name not typed yet.
        rule partial_suffix() -> (Suffix, usize)
            = nullsafe:member_operator() at:pos() {
                (Suffix::Member { name: Identifier::new("", Span::new(at, at)), nullsafe, args: None }, at)
            }
            / "::" start:pos() "$" end:pos() {
                (Suffix::StaticProperty(Identifier::new("", Span::new(start, end))), end)
            }
            / "::" at:pos() {
                (Suffix::StaticMember { name: Identifier::new("", Span::new(at, at)), args: None }, at)
            }

        // Trivia

        rule _() = quiet!{ (whitespace() / comment())* }

        rule whitespace() = [' ' | '\t' | '\n' | '\r']+

        rule eol() = "\r\n" / "\n"

        rule comment()
            = "/*" (!"*/" [_])* "*/"
            / "//" (!(eol() / "?>") [_])*
            / "#[" attribute_body() "]"
            / "#" (!(eol() / "?>") [_])*

        rule attribute_body() = ("[" attribute_body() "]" / string_literal() {} / [^ '[' | ']'])*

        // Words and names

        rule ident_start() = ['a'..='z' | 'A'..='Z' | '_' | '\u{80}'..='\u{10ffff}']

        rule ident_char() = ident_start() / ['0'..='9']

        rule identifier_text() -> &'input str = $(ident_start() ident_char()*)

        rule kw(keyword: &'static str)
            = word:identifier_text() {?
                if word.eq_ignore_ascii_case(keyword) { Ok(()) } else { Err(keyword) }
            }

        rule reserved()
            = word:identifier_text() {?
                if is_reserved(word) { Ok(()) } else { Err("reserved word") }
            }

        rule identifier() -> Identifier
            = start:pos() name:identifier_text() end:pos() {
                Identifier::new(name, Span::new(start, end))
            }

        rule variable_name() -> Identifier
            = start:pos() "$" name:identifier_text() end:pos() {
                Identifier::new(name, Span::new(start, end))
            }

        rule name() -> Name
            = start:pos() fq:"\\"? first:identifier_text() rest:("\\" part:identifier_text() { part })* end:pos() {
                build_name(fq.is_some(), first, rest, Span::new(start, end))
            }

        rule name_list() -> Vec<Name> = names:(name() ++ (_ "," _)) { names }

        // Statements

        rule statement_list() -> Vec<Stmt> = statements:(_ s:statement() { s })* { statements }

        rule block() -> Vec<Stmt> = "{" statements:statement_list() _ "}" { statements }

        rule body() -> Vec<Stmt> = block() / s:statement() { vec![s] }

        rule statement() -> Stmt
            = start:pos() kind:statement_kind() end:pos() {
                Stmt { kind, span: Span::new(start, end) }
            }

        rule statement_end() = ";" / &"?>"

        rule statement_kind() -> StmtKind
            = namespace_statement()
            / use_statement()
            / class:class_like() { StmtKind::ClassLike(Box::new(class)) }
            / function:function_declaration() { StmtKind::Function(Box::new(function)) }
            / kw("const") _ items:const_items() _ ";" { StmtKind::Const(items) }
            / kw("declare") _ "(" _ (identifier() _ "=" _ expr()) ** (_ "," _) _ ")" _ ";" { StmtKind::Nop }
            / kw("if") _ "(" _ condition:expr() _ ")" _ then:body()
              else_ifs:(_ kw("elseif") _ "(" _ c:expr() _ ")" _ b:body() { ElseIf { condition: c, body: b } })*
              otherwise:(_ kw("else") _ b:body() { b })? {
                StmtKind::If { condition, then, else_ifs, otherwise }
            }
            / kw("while") _ "(" _ condition:expr() _ ")" _ body:body() {
                StmtKind::While { condition, body }
            }
            / kw("do") _ body:body() _ kw("while") _ "(" _ condition:expr() _ ")" _ statement_end() {
                StmtKind::DoWhile { body, condition }
            }
            / kw("for") _ "(" _ init:expr_list() _ ";" _ condition:expr_list() _ ";" _ step:expr_list() _ ")" _ body:body() {
                StmtKind::For { init, condition, step, body }
            }
            / kw("foreach") _ "(" _ subject:expr() _ kw("as") _ first:foreach_target() second:(_ "=>" _ v:foreach_target() { v })? _ ")" _ body:body() {
                let (key, value) = match second {
                    Some(value) => (Some(first), value),
                    None => (None, first),
                };
                StmtKind::Foreach { subject, key, value, body }
            }
            / kw("switch") _ "(" _ subject:expr() _ ")" _ "{" cases:(_ c:case() { c })* _ "}" {
                StmtKind::Switch { subject, cases }
            }
            / kw("try") _ body:block() catches:(_ c:catch() { c })* finally:(_ kw("finally") _ b:block() { b })? {
                StmtKind::Try { body, catches, finally }
            }
            / kw("return") _ value:expr()? _ statement_end() { StmtKind::Return(value) }
            / kw("echo") _ values:(expr() ++ (_ "," _)) _ statement_end() { StmtKind::Echo(values) }
            / kw("global") _ names:(variable_name() ++ (_ "," _)) _ statement_end() { StmtKind::Global(names) }
            / kw("static") _ &"$" vars:(static_var() ++ (_ "," _)) _ statement_end() { StmtKind::Static(vars) }
            / kw("break") (_ number())? _ statement_end() { StmtKind::Break }
            / kw("continue") (_ number())? _ statement_end() { StmtKind::Continue }
            / statements:block() { StmtKind::Block(statements) }
            / ";" { StmtKind::Nop }
            / e:expr() _ statement_end() { StmtKind::Expression(e) }

        rule namespace_statement() -> StmtKind
            = kw("namespace") _ name:name() _ ";" {
                StmtKind::Namespace { name: Some(name), body: None }
            }
            / kw("namespace") _ name:(n:name() _ { n })? body:block() {
                StmtKind::Namespace { name, body: Some(body) }
            }

        rule use_statement() -> StmtKind
            = kw("use") _ kind:use_kind()? items:use_clause() _ ";" {
                StmtKind::Use { kind: kind.unwrap_or(UseKind::Normal), items }
            }

        rule use_kind() -> UseKind
            = kw("function") _ { UseKind::Function }
            / kw("const") _ { UseKind::Const }

        rule use_clause() -> Vec<UseItem>
            = prefix:name() "\\" _ "{" _ items:(use_item() ++ (_ "," _)) (_ ",")? _ "}" {
                items.into_iter().map(|item| prefixed_use(&prefix, item)).collect()
            }
            / items:(use_item() ++ (_ "," _)) { items }

        rule use_item() -> UseItem
            = start:pos() name:name() alias:(_ kw("as") _ a:identifier() { a })? end:pos() {
                UseItem { name, alias, span: Span::new(start, end) }
            }

        rule expr_list() -> Vec<Expr> = exprs:(expr() ** (_ "," _)) { exprs }

        rule foreach_target() -> Expr = ("&" _)? target:postfix() { target }

        rule case() -> Case
            = kw("case") _ condition:expr() _ [':' | ';'] body:statement_list() {
                Case { condition: Some(condition), body }
            }
            / kw("default") _ [':' | ';'] body:statement_list() {
                Case { condition: None, body }
            }

        rule catch() -> Catch
            = kw("catch") _ "(" _ types:(name() ++ (_ "|" _)) _ variable:variable_name()? _ ")" _ body:block() {
                Catch { types, variable, body }
            }

        rule static_var() -> StaticVar
            = name:variable_name() default:(_ "=" _ e:expr() { e })? { StaticVar { name, default } }

        rule function_declaration() -> FunctionDecl
            = kw("function") _ by_ref:("&" _)? name:identifier() _ params:parameters() return_type:(_ t:return_type() { t })? _ body:block() {
                FunctionDecl { name, by_ref: by_ref.is_some(), params, return_type, body, doc_comment: None }
            }

        // Class-likes

        rule class_like() -> ClassDecl
            = modifiers:class_modifiers() kw("class") _ name:identifier()
              extends:(_ kw("extends") _ parent:name() { vec![parent] })?
              implements:(_ kw("implements") _ names:name_list() { names })?
              _ members:class_body() {
                ClassDecl {
                    kind: ClassKind::Class,
                    name,
                    modifiers,
                    extends: extends.unwrap_or_default(),
                    implements: implements.unwrap_or_default(),
                    members,
                    doc_comment: None,
                }
            }
            / kw("interface") _ name:identifier() extends:(_ kw("extends") _ names:name_list() { names })? _ members:class_body() {
                ClassDecl {
                    kind: ClassKind::Interface,
                    name,
                    modifiers: Modifiers::default(),
                    extends: extends.unwrap_or_default(),
                    implements: Vec::new(),
                    members,
                    doc_comment: None,
                }
            }
            / kw("trait") _ name:identifier() _ members:class_body() {
                ClassDecl {
                    kind: ClassKind::Trait,
                    name,
                    modifiers: Modifiers::default(),
                    extends: Vec::new(),
                    implements: Vec::new(),
                    members,
                    doc_comment: None,
                }
            }

        rule class_modifiers() -> Modifiers
            = modifiers:(m:class_modifier() _ { m })* { modifiers.into_iter().collect() }

        rule class_modifier() -> Modifier
            = kw("abstract") { Modifier::Abstract }
            / kw("final") { Modifier::Final }
            / kw("readonly") { Modifier::Readonly }

        rule class_body() -> Vec<Member> = "{" members:(_ m:member() { m })* _ "}" { members }

        rule member() -> Member
            = start:pos() kind:member_kind() end:pos() {
                Member { kind, span: Span::new(start, end), doc_comment: None }
            }

        rule member_kind() -> MemberKind
            = kw("use") _ traits:name_list() _ (";" / "{" (!"}" [_])* "}") { MemberKind::TraitUse(traits) }
            / modifiers:modifiers() kw("function") _ by_ref:("&" _)? name:identifier() _ params:parameters()
              return_type:(_ t:return_type() { t })? _ body:method_body() {
                MemberKind::Method(MethodDecl {
                    modifiers,
                    name,
                    by_ref: by_ref.is_some(),
                    params,
                    return_type,
                    body,
                })
            }
            / modifiers:modifiers() kw("const") _ items:const_items() _ ";" {
                MemberKind::Constant(ConstantDecl { modifiers, items })
            }
            / modifiers:modifiers() type_hint:(t:type_hint() _ { t })? items:(property_item() ++ (_ "," _)) _ ";" {?
                if modifiers.is_empty() {
                    Err("property modifier")
                } else {
                    Ok(MemberKind::Property(PropertyDecl { modifiers, type_hint, items }))
                }
            }

        rule method_body() -> Option<Vec<Stmt>>
            = statements:block() { Some(statements) }
            / ";" { None }

        rule modifiers() -> Modifiers
            = modifiers:(m:modifier() _ { m })* { modifiers.into_iter().collect() }

        rule modifier() -> Modifier
            = kw("public") { Modifier::Public }
            / kw("protected") { Modifier::Protected }
            / kw("private") { Modifier::Private }
            / kw("static") { Modifier::Static }
            / kw("abstract") { Modifier::Abstract }
            / kw("final") { Modifier::Final }
            / kw("readonly") { Modifier::Readonly }
            / kw("var") { Modifier::Var }

        rule const_items() -> Vec<ConstItem> = items:(const_item() ++ (_ "," _)) { items }

        rule const_item() -> ConstItem
            = name:identifier() _ "=" _ value:expr() { ConstItem { name, value } }

        rule property_item() -> PropertyItem
            = start:pos() name:variable_name() default:(_ "=" _ e:expr() { e })? end:pos() {
                PropertyItem { name, default, span: Span::new(start, end) }
            }

        rule parameters() -> Vec<Param>
            = "(" _ params:(parameter() ** (_ "," _)) (_ ",")? _ ")" { params }

        rule parameter() -> Param
            = start:pos() modifiers:modifiers() type_hint:(t:type_hint() _ { t })? by_ref:("&" _)? variadic:("..." _)?
              name:variable_name() default:(_ "=" _ e:expr() { e })? end:pos() {
                Param {
                    name,
                    type_hint,
                    default,
                    by_ref: by_ref.is_some(),
                    variadic: variadic.is_some(),
                    promoted: (!modifiers.is_empty()).then_some(modifiers),
                    span: Span::new(start, end),
                }
            }

        rule return_type() -> TypeHint = ":" _ t:type_hint() { t }

        rule type_hint() -> TypeHint
            = start:pos() "?" _ inner:single_type() end:pos() {
                TypeHint::Nullable { inner: Box::new(inner), span: Span::new(start, end) }
            }
            / start:pos() first:single_type() rest:(_ "|" !"|" _ t:single_type() { t })* end:pos() {
                if rest.is_empty() {
                    first
                } else {
                    let mut types = vec![first];
                    types.extend(rest);
                    TypeHint::Union { types, span: Span::new(start, end) }
                }
            }

        rule single_type() -> TypeHint = name:name() { type_from_name(name) }

        // Expressions

        rule expr() -> Expr = precedence!{
            x:(@) _ kw("or") _ y:@ { binary(BinaryOp::LogicalOr, x, y) }
            --
            x:(@) _ kw("xor") _ y:@ { binary(BinaryOp::LogicalXor, x, y) }
            --
            x:(@) _ kw("and") _ y:@ { binary(BinaryOp::LogicalAnd, x, y) }
            --
            t:ternary() { t }
        }

        rule ternary() -> Expr
            = condition:binary() tail:(_ "?" !"?" !"->" _ then:expr()? _ ":" !":" _ otherwise:ternary() { (then, otherwise) })? {
                match tail {
                    Some((then, otherwise)) => {
                        let span = Span::new(condition.span.start, otherwise.span.end);
                        Expr::new(
                            ExprKind::Ternary {
                                condition: Box::new(condition),
                                then: then.map(Box::new),
                                otherwise: Box::new(otherwise),
                            },
                            span,
                        )
                    }
                    None => condition,
                }
            }

        rule binary() -> Expr = precedence!{
            start:pos() kw("throw") _ x:@ { prefix(start, x, ExprKind::Throw) }
            --
            x:@ _ "??" !"=" _ y:(@) { binary(BinaryOp::Coalesce, x, y) }
            --
            x:(@) _ "||" _ y:@ { binary(BinaryOp::BooleanOr, x, y) }
            --
            x:(@) _ "&&" _ y:@ { binary(BinaryOp::BooleanAnd, x, y) }
            --
            x:(@) _ "|" !['|' | '='] _ y:@ { binary(BinaryOp::BitwiseOr, x, y) }
            --
            x:(@) _ "^" !"=" _ y:@ { binary(BinaryOp::BitwiseXor, x, y) }
            --
            x:(@) _ "&" !['&' | '='] _ y:@ { binary(BinaryOp::BitwiseAnd, x, y) }
            --
            x:(@) _ "===" _ y:@ { binary(BinaryOp::Identical, x, y) }
            x:(@) _ "!==" _ y:@ { binary(BinaryOp::NotIdentical, x, y) }
            x:(@) _ "==" _ y:@ { binary(BinaryOp::Equal, x, y) }
            x:(@) _ ("!=" / "<>") _ y:@ { binary(BinaryOp::NotEqual, x, y) }
            x:(@) _ "<=>" _ y:@ { binary(BinaryOp::Spaceship, x, y) }
            --
            x:(@) _ "<=" _ y:@ { binary(BinaryOp::LessOrEqual, x, y) }
            x:(@) _ ">=" _ y:@ { binary(BinaryOp::GreaterOrEqual, x, y) }
            x:(@) _ "<" !"<" _ y:@ { binary(BinaryOp::Less, x, y) }
            x:(@) _ ">" !">" _ y:@ { binary(BinaryOp::Greater, x, y) }
            --
            x:(@) _ "." !['.' | '='] _ y:@ { binary(BinaryOp::Concat, x, y) }
            --
            x:(@) _ "<<" !"=" _ y:@ { binary(BinaryOp::ShiftLeft, x, y) }
            x:(@) _ ">>" !"=" _ y:@ { binary(BinaryOp::ShiftRight, x, y) }
            --
            x:(@) _ "+" !['+' | '='] _ y:@ { binary(BinaryOp::Plus, x, y) }
            x:(@) _ "-" !['-' | '=' | '>'] _ y:@ { binary(BinaryOp::Minus, x, y) }
            --
            x:(@) _ "*" !['*' | '='] _ y:@ { binary(BinaryOp::Mul, x, y) }
            x:(@) _ "/" !['/' | '*' | '='] _ y:@ { binary(BinaryOp::Div, x, y) }
            x:(@) _ "%" !"=" _ y:@ { binary(BinaryOp::Mod, x, y) }
            --
            start:pos() "!" _ x:@ { unary(start, UnaryOp::Not, x) }
            --
            x:@ _ kw("instanceof") _ class:instanceof_class() end:pos() {
                let span = Span::new(x.span.start, end);
                Expr::new(ExprKind::Instanceof { expr: Box::new(x), class }, span)
            }
            --
            start:pos() "++" _ x:@ { unary(start, UnaryOp::PreIncrement, x) }
            start:pos() "--" _ x:@ { unary(start, UnaryOp::PreDecrement, x) }
            start:pos() "-" _ x:@ { unary(start, UnaryOp::Minus, x) }
            start:pos() "+" _ x:@ { unary(start, UnaryOp::Plus, x) }
            start:pos() "~" _ x:@ { unary(start, UnaryOp::BitwiseNot, x) }
            start:pos() "@" _ x:@ { unary(start, UnaryOp::Silence, x) }
            start:pos() "(" _ to:cast_type() _ ")" _ x:@ { prefix(start, x, |expr| ExprKind::Cast { to, expr }) }
            start:pos() kw("clone") _ x:@ { prefix(start, x, ExprKind::Clone) }
            start:pos() include_keyword() _ x:@ { prefix(start, x, ExprKind::Include) }
            --
            x:@ _ "**" !"=" _ y:(@) { binary(BinaryOp::Pow, x, y) }
            --
            x:@ _ "++" end:pos() { postfix_unary(UnaryOp::PostIncrement, x, end) }
            x:@ _ "--" end:pos() { postfix_unary(UnaryOp::PostDecrement, x, end) }
            --
            a:atom() { a }
        }

        rule include_keyword()
            = kw("require_once") / kw("require") / kw("include_once") / kw("include")

        rule cast_type() -> String
            = word:identifier_text() {?
                let lower = word.to_ascii_lowercase();
                if CAST_TYPES.contains(&lower.as_str()) { Ok(lower) } else { Err("cast type") }
            }

        rule instanceof_class() -> ClassRef
            = !reserved() name:name() { ClassRef::Named(name) }
            / start:pos() name:variable_name() end:pos() {
                ClassRef::Dynamic(Box::new(Expr::new(ExprKind::Variable(name.name), Span::new(start, end))))
            }

        rule atom() -> Expr
            = target:postfix() tail:(_ t:assignment_tail() { t })? {
                match tail {
                    Some(tail) => tail.apply(target),
                    None => target,
                }
            }

        rule assignment_tail() -> AssignTail
            = "=" !['=' | '>'] _ by_ref:("&" _)? value:expr() {
                AssignTail::Assign { value, by_ref: by_ref.is_some() }
            }
            / op:compound_operator() _ value:expr() { AssignTail::Compound { op, value } }

        rule compound_operator() -> BinaryOp
            = "??=" { BinaryOp::Coalesce }
            / "**=" { BinaryOp::Pow }
            / "<<=" { BinaryOp::ShiftLeft }
            / ">>=" { BinaryOp::ShiftRight }
            / ".=" { BinaryOp::Concat }
            / "+=" { BinaryOp::Plus }
            / "-=" { BinaryOp::Minus }
            / "*=" { BinaryOp::Mul }
            / "/=" { BinaryOp::Div }
            / "%=" { BinaryOp::Mod }
            / "&=" { BinaryOp::BitwiseAnd }
            / "|=" { BinaryOp::BitwiseOr }
            / "^=" { BinaryOp::BitwiseXor }

        rule postfix() -> Expr
            = head:primary() suffixes:(_ s:suffix() { s })* { fold_suffixes(head, suffixes) }

        rule suffix() -> (Suffix, usize)
            = nullsafe:member_operator() _ name:member_name() args:(_ a:arguments() { a })? end:pos() {
                (Suffix::Member { name, nullsafe, args }, end)
            }
            / "::" _ name:variable_name() end:pos() { (Suffix::StaticProperty(name), end) }
            / "::" _ name:identifier() args:(_ a:arguments() { a })? end:pos() {
                (Suffix::StaticMember { name, args }, end)
            }
            / "[" _ index:expr()? _ "]" end:pos() { (Suffix::Dim(index), end) }
            / args:arguments() end:pos() { (Suffix::Call(args), end) }

        rule member_operator() -> bool = "?->" { true } / "->" { false }

        // Dynamic member names keep their raw text.
        rule member_name() -> Identifier
            = identifier()
            / start:pos() text:$("$" identifier_text() / "{" _ expr() _ "}") end:pos() {
                Identifier::new(text, Span::new(start, end))
            }

        rule arguments() -> Vec<Argument>
            = "(" _ args:(argument() ** (_ "," _)) (_ ",")? _ ")" { args }

        rule argument() -> Argument
            = "..." _ value:expr() { Argument { value, spread: true, name: None } }
            / name:identifier() _ ":" !":" _ value:expr() { Argument { value, spread: false, name: Some(name) } }
            / value:expr() { Argument { value, spread: false, name: None } }

        rule primary() -> Expr
            = start:pos() name:variable_name() end:pos() {
                Expr::new(ExprKind::Variable(name.name), Span::new(start, end))
            }
            / new_expression()
            / closure()
            / arrow_function()
            / start:pos() value:string_literal() end:pos() {
                Expr::new(ExprKind::Literal(Literal::String(value)), Span::new(start, end))
            }
            / start:pos() value:number() end:pos() {
                Expr::new(ExprKind::Literal(Literal::Number(value.to_string())), Span::new(start, end))
            }
            / array_literal()
            / start:pos() kw("isset") _ "(" _ items:(expr() ++ (_ "," _)) (_ ",")? _ ")" end:pos() {
                Expr::new(ExprKind::Isset(items), Span::new(start, end))
            }
            / start:pos() kw("empty") _ "(" _ e:expr() _ ")" end:pos() {
                Expr::new(ExprKind::Empty(Box::new(e)), Span::new(start, end))
            }
            / start:pos() "(" _ e:expr() _ ")" end:pos() { Expr::new(e.kind, Span::new(start, end)) }
            / start:pos() !reserved() name:name() end:pos() {
                Expr::new(ExprKind::ConstFetch(name), Span::new(start, end))
            }

        rule new_expression() -> Expr
            = start:pos() kw("new") _ class:new_class() args:(_ a:arguments() { a })? end:pos() {
                Expr::new(ExprKind::New { class, args: args.unwrap_or_default() }, Span::new(start, end))
            }

        rule new_class() -> ClassRef
            = !reserved() name:name() { ClassRef::Named(name) }
            / start:pos() name:variable_name() end:pos() {
                ClassRef::Dynamic(Box::new(Expr::new(ExprKind::Variable(name.name), Span::new(start, end))))
            }
            / "(" _ e:expr() _ ")" { ClassRef::Dynamic(Box::new(e)) }

        rule closure() -> Expr
            = start:pos() is_static:(kw("static") _)? kw("function") _ by_ref:("&" _)? params:parameters()
              uses:(_ u:closure_uses() { u })? return_type:(_ t:return_type() { t })? _ body:block() end:pos() {
                let closure = Closure {
                    is_static: is_static.is_some(),
                    by_ref: by_ref.is_some(),
                    params,
                    uses: uses.unwrap_or_default(),
                    return_type,
                    body,
                };
                Expr::new(ExprKind::Closure(Box::new(closure)), Span::new(start, end))
            }

        rule closure_uses() -> Vec<ClosureUse>
            = kw("use") _ "(" _ uses:(closure_use() ++ (_ "," _)) (_ ",")? _ ")" { uses }

        rule closure_use() -> ClosureUse
            = by_ref:("&" _)? name:variable_name() { ClosureUse { name, by_ref: by_ref.is_some() } }

        rule arrow_function() -> Expr
            = start:pos() is_static:(kw("static") _)? kw("fn") _ by_ref:("&" _)? params:parameters()
              return_type:(_ t:return_type() { t })? _ "=>" _ body:expr() end:pos() {
                let arrow = ArrowFunction {
                    is_static: is_static.is_some(),
                    by_ref: by_ref.is_some(),
                    params,
                    return_type,
                    body,
                };
                Expr::new(ExprKind::ArrowFunction(Box::new(arrow)), Span::new(start, end))
            }

        rule array_literal() -> Expr
            = start:pos() "[" _ items:array_items() _ "]" end:pos() {
                Expr::new(ExprKind::Array(items), Span::new(start, end))
            }
            / start:pos() kw("array") _ "(" _ items:array_items() _ ")" end:pos() {
                Expr::new(ExprKind::Array(items), Span::new(start, end))
            }

        rule array_items() -> Vec<ArrayItem>
            = items:(array_item() ** (_ "," _)) (_ ",")? { items }

        rule array_item() -> ArrayItem
            = "..." _ value:expr() { ArrayItem { key: None, value, by_ref: false, spread: true } }
            / "&" _ value:expr() { ArrayItem { key: None, value, by_ref: true, spread: false } }
            / first:expr() tail:(_ "=>" _ by_ref:("&" _)? v:expr() { (by_ref.is_some(), v) })? {
                match tail {
                    Some((by_ref, value)) => ArrayItem { key: Some(first), value, by_ref, spread: false },
                    None => ArrayItem { key: None, value: first, by_ref: false, spread: false },
                }
            }

        // Literals

        rule string_literal() -> String
            = "'" s:$(("\\" [_] / [^ '\'' | '\\'])*) "'" { s.to_string() }
            / "\"" s:$(("\\" [_] / [^ '"' | '\\'])*) "\"" { s.to_string() }
            / "<<<" [' ' | '\t']* ['"' | '\'']? label:identifier_text() ['"' | '\'']?
              raw:$((!heredoc_end(label) [_])*) heredoc_end(label) { heredoc_body(raw) }

        rule heredoc_end(label: &str)
            = eol() [' ' | '\t']* word:identifier_text() {?
                if word == label { Ok(()) } else { Err("heredoc terminator") }
            }

        rule number() -> &'input str
            = $("0" ['x' | 'X'] ['0'..='9' | 'a'..='f' | 'A'..='F' | '_']+)
            / $("0" ['b' | 'B'] ['0' | '1' | '_']+)
            / $(['0'..='9'] ['0'..='9' | '_']* ("." ['0'..='9'] ['0'..='9' | '_']*)? exponent()?)
            / $("." ['0'..='9']+ exponent()?)

        rule exponent() = ['e' | 'E'] ['+' | '-']? ['0'..='9']+
    }
}
