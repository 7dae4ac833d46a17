use crate::ast::{Stmt, StmtKind};

/// Fill in `doc_comment` on classes, their members and functions.
///
/// Doc comments are skipped as trivia by the grammar, so they are recovered
/// from the source text immediately preceding each declaration.
pub(crate) fn attach(statements: &mut [Stmt], source: &str) {
    for statement in statements {
        let start = statement.span.start;
        if let StmtKind::ClassLike(class) = &mut statement.kind {
            class.doc_comment = doc_comment_before(source, start);
            for member in &mut class.members {
                member.doc_comment = doc_comment_before(source, member.span.start);
            }
        } else if let StmtKind::Function(function) = &mut statement.kind {
            function.doc_comment = doc_comment_before(source, start);
        } else if let StmtKind::Namespace {
            body: Some(body), ..
        } = &mut statement.kind
        {
            attach(body, source);
        } else if let StmtKind::Block(body) = &mut statement.kind {
            attach(body, source);
        }
    }
}

/// The `/** ... */` comment ending right before `offset`, whitespace aside.
#[must_use]
pub fn doc_comment_before(source: &str, offset: usize) -> Option<String> {
    let preceding = source.get(..offset)?.trim_end();
    let body = preceding.strip_suffix("*/")?;
    let start = body.rfind("/*")?;
    let comment = preceding.get(start..)?;
    // `/**/` is an empty plain comment, not a doc block.
    if comment.starts_with("/**") && comment.len() > "/**/".len() {
        Some(comment.to_string())
    } else {
        None
    }
}
