//! Parser for the PHP subset used by the phpls language intelligence core.
//!
//! [`parse`] turns a whole file into a list of [`Stmt`]s carrying absolute
//! byte spans. [`parse_completion_target`] parses just the member-access
//! chain that ends at a cursor, which is how an incomplete line such as
//! `$this->` becomes an expression with an empty member name.

use tracing::instrument;

mod ast;
mod doc_comment;
mod error;
mod grammar;
mod target;
mod visit;

pub use ast::{
    ArrayItem, Argument, ArrowFunction, BinaryOp, Case, Catch, ClassDecl, ClassKind, ClassRef,
    Closure, ClosureUse, ConstItem, ConstantDecl, ElseIf, Expr, ExprKind, FunctionDecl,
    Identifier, Literal, Member, MemberKind, MethodDecl, Modifier, Modifiers, Name, NameKind,
    Param, PropertyDecl, PropertyItem, Span, StaticVar, Stmt, StmtKind, TypeHint, UnaryOp,
    UseItem, UseKind, Visibility,
};
pub use doc_comment::doc_comment_before;
pub use error::Error;
pub use visit::{Node, Visitor, walk, walk_expr, walk_stmt};

/// Parse a complete PHP file, `<?php` open tag included.
///
/// # Errors
///
/// Returns [`Error::Parse`] with the location of the first syntax error.
#[instrument(level = "trace", skip_all, fields(len = source.len()))]
pub fn parse(source: &str) -> Result<Vec<Stmt>, Error> {
    let mut statements = grammar::php_parser::file(source, 0).map_err(|error| {
        tracing::debug!(%error, "failed to parse source");
        Error::from(error)
    })?;
    doc_comment::attach(&mut statements, source);
    Ok(statements)
}

/// Parse the expression being completed at `cursor`.
///
/// A trailing `->`, `?->` or `::` yields a fetch whose member name is empty.
/// Spans in the result are absolute offsets into `source`.
#[must_use]
#[instrument(level = "trace", skip(source))]
pub fn parse_completion_target(source: &str, cursor: usize) -> Option<Expr> {
    let start = target::completion_target_start(source, cursor)?;
    let fragment = source.get(start..cursor)?;
    if fragment.is_empty() {
        return None;
    }
    match grammar::php_parser::completion_target(fragment, start) {
        Ok(target) => Some(target),
        Err(error) => {
            tracing::trace!(%error, fragment, "no completion target at cursor");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn syntax_errors_are_logged() {
        assert!(matches!(parse("<?php\nclass {"), Err(Error::Parse { .. })));
        assert!(logs_contain("failed to parse source"));
    }
}
