//! Single document state

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use phpls_parser::{
    ClassDecl, Expr, Member, MemberKind, MethodDecl, Modifiers, Name, Node, Param, PropertyDecl,
    PropertyItem, Stmt, StmtKind, TypeHint, UseItem, UseKind, walk,
};
use rustc_hash::FxHashMap;
use tracing::instrument;

use crate::Error;

/// A parsed source file.
///
/// Documents never change after parsing: an edit produces a new document that
/// replaces the old one in the [`DocumentRegistry`](super::DocumentRegistry).
/// Cloning is cheap and shares the tree.
#[derive(Debug, Clone)]
pub struct SyntaxDocument {
    inner: Arc<Inner>,
}

/// Source of [`SyntaxDocument::id`]s.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
struct Inner {
    id: u64,
    uri: String,
    source: String,
    version: i32,
    statements: Vec<Stmt>,
    facts: Facts,
}

/// Derived facts, each computed on first use.
#[derive(Debug, Default)]
struct Facts {
    namespace: OnceLock<Option<String>>,
    class_name: OnceLock<Option<String>>,
    use_statements: OnceLock<Vec<UseItem>>,
    constructor: OnceLock<Option<usize>>,
    properties: OnceLock<FxHashMap<String, PropertySlot>>,
    line_starts: OnceLock<Vec<usize>>,
}

/// Where a property of the first class lives, as indices into its members.
#[derive(Debug, Clone, Copy)]
enum PropertySlot {
    Declared { member: usize, item: usize },
    Promoted { member: usize, param: usize },
}

/// A class-like declaration together with the namespace it was declared in.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredClass<'a> {
    pub namespace: Option<&'a Name>,
    pub declaration: &'a ClassDecl,
}

impl DeclaredClass<'_> {
    /// Fully qualified name, without a leading `\`.
    #[must_use]
    pub fn name(&self) -> String {
        match self.namespace {
            Some(namespace) => format!("{}\\{}", namespace.joined(), self.declaration.name.name),
            None => self.declaration.name.name.clone(),
        }
    }
}

/// A property of the document's class, either declared in the class body or
/// promoted from a constructor parameter.
#[derive(Debug, Clone, Copy)]
pub enum ClassProperty<'a> {
    Declared {
        member: &'a Member,
        declaration: &'a PropertyDecl,
        item: &'a PropertyItem,
    },
    Promoted {
        param: &'a Param,
        modifiers: Modifiers,
    },
}

impl<'a> ClassProperty<'a> {
    #[must_use]
    pub fn name(&self) -> &'a str {
        match *self {
            Self::Declared { item, .. } => &item.name.name,
            Self::Promoted { param, .. } => &param.name.name,
        }
    }

    #[must_use]
    pub fn type_hint(&self) -> Option<&'a TypeHint> {
        match *self {
            Self::Declared { declaration, .. } => declaration.type_hint.as_ref(),
            Self::Promoted { param, .. } => param.type_hint.as_ref(),
        }
    }

    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        match *self {
            Self::Declared { declaration, .. } => declaration.modifiers,
            Self::Promoted { modifiers, .. } => modifiers,
        }
    }

    #[must_use]
    pub fn doc_comment(&self) -> Option<&'a str> {
        match *self {
            Self::Declared { member, .. } => member.doc_comment.as_deref(),
            Self::Promoted { .. } => None,
        }
    }
}

impl SyntaxDocument {
    /// Parse `source` into a new document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the source is not valid PHP. No partial
    /// document is produced.
    #[instrument(level = "debug", skip_all, fields(version = version, len = source.len()))]
    pub fn parse(uri: impl Into<String>, source: &str, version: i32) -> Result<Self, Error> {
        let statements = phpls_parser::parse(source)?;
        Ok(Self {
            inner: Arc::new(Inner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                uri: uri.into(),
                source: source.to_string(),
                version,
                statements,
                facts: Facts::default(),
            }),
        })
    }

    /// Identity of this parse. Clones share it, reparsing the same text
    /// does not.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.inner.version
    }

    #[must_use]
    pub fn statements(&self) -> &[Stmt] {
        &self.inner.statements
    }

    /// Every node matching `predicate`, in document order.
    pub fn search_nodes<'a>(&'a self, mut predicate: impl FnMut(&Node<'a>) -> bool) -> Vec<Node<'a>> {
        let mut found = Vec::new();
        walk(self.statements(), &mut |node: Node<'a>| {
            if predicate(&node) {
                found.push(node);
            }
            true
        });
        found
    }

    /// Name of the first namespace declared in the file.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.inner
            .facts
            .namespace
            .get_or_init(|| {
                self.statements().iter().find_map(|statement| {
                    if let StmtKind::Namespace { name, .. } = &statement.kind {
                        name.as_ref().map(Name::joined)
                    } else {
                        None
                    }
                })
            })
            .as_deref()
    }

    /// Fully qualified name of the first class-like declaration.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        self.inner
            .facts
            .class_name
            .get_or_init(|| self.class_declarations().first().map(DeclaredClass::name))
            .as_deref()
    }

    /// Class imports (`use Foo\Bar;`), group imports expanded. Function and
    /// constant imports are not included.
    #[must_use]
    pub fn use_statements(&self) -> &[UseItem] {
        self.inner.facts.use_statements.get_or_init(|| {
            let mut imports = Vec::new();
            collect_imports(self.statements(), &mut imports);
            imports
        })
    }

    /// All class-likes declared at the top level or inside namespace blocks.
    #[must_use]
    pub fn class_declarations(&self) -> Vec<DeclaredClass<'_>> {
        let mut found = Vec::new();
        let mut current: Option<&Name> = None;
        for statement in self.statements() {
            match &statement.kind {
                StmtKind::Namespace { name, body: None } => current = name.as_ref(),
                StmtKind::Namespace {
                    name,
                    body: Some(body),
                } => {
                    for inner in body {
                        if let StmtKind::ClassLike(class) = &inner.kind {
                            found.push(DeclaredClass {
                                namespace: name.as_ref(),
                                declaration: class,
                            });
                        }
                    }
                }
                StmtKind::ClassLike(class) => found.push(DeclaredClass {
                    namespace: current,
                    declaration: class,
                }),
                StmtKind::Use { .. }
                | StmtKind::Function(_)
                | StmtKind::Const(_)
                | StmtKind::Expression(_)
                | StmtKind::Return(_)
                | StmtKind::Echo(_)
                | StmtKind::If { .. }
                | StmtKind::While { .. }
                | StmtKind::DoWhile { .. }
                | StmtKind::For { .. }
                | StmtKind::Foreach { .. }
                | StmtKind::Switch { .. }
                | StmtKind::Try { .. }
                | StmtKind::Block(_)
                | StmtKind::Global(_)
                | StmtKind::Static(_)
                | StmtKind::Break
                | StmtKind::Continue
                | StmtKind::Nop => {}
            }
        }
        found
    }

    /// The first class-like declaration in the file.
    #[must_use]
    pub fn class_declaration(&self) -> Option<&ClassDecl> {
        self.class_declarations()
            .first()
            .map(|declared| declared.declaration)
    }

    #[must_use]
    pub fn constructor_node(&self) -> Option<&MethodDecl> {
        let class = self.class_declaration()?;
        let index = self.inner.facts.constructor.get_or_init(|| {
            class.members.iter().position(|member| {
                matches!(&member.kind, MemberKind::Method(method)
                    if method.name.name.eq_ignore_ascii_case("__construct"))
            })
        });
        match &class.members.get((*index)?)?.kind {
            MemberKind::Method(method) => Some(method),
            MemberKind::Property(_) | MemberKind::Constant(_) | MemberKind::TraitUse(_) => None,
        }
    }

    /// A property of the first class, looked up by name without `$`.
    ///
    /// Promoted constructor parameters count as properties.
    #[must_use]
    pub fn class_property(&self, name: &str) -> Option<ClassProperty<'_>> {
        let class = self.class_declaration()?;
        let slots = self
            .inner
            .facts
            .properties
            .get_or_init(|| index_properties(class));
        match *slots.get(name)? {
            PropertySlot::Declared { member, item } => {
                let member = class.members.get(member)?;
                let MemberKind::Property(declaration) = &member.kind else {
                    return None;
                };
                Some(ClassProperty::Declared {
                    member,
                    declaration,
                    item: declaration.items.get(item)?,
                })
            }
            PropertySlot::Promoted { member, param } => {
                let MemberKind::Method(constructor) = &class.members.get(member)?.kind else {
                    return None;
                };
                let param = constructor.params.get(param)?;
                Some(ClassProperty::Promoted {
                    param,
                    modifiers: param.promoted?,
                })
            }
        }
    }

    /// Innermost expression whose span contains `offset`.
    #[must_use]
    pub fn node_at<'a>(&'a self, offset: usize) -> Option<&'a Expr> {
        let mut best: Option<&'a Expr> = None;
        walk(self.statements(), &mut |node: Node<'a>| {
            if !node.span().touches(offset) {
                return false;
            }
            if let Node::Expr(expr) = node {
                if best.is_none_or(|current| expr.span.len() <= current.span.len()) {
                    best = Some(expr);
                }
            }
            true
        });
        best
    }

    fn line_starts(&self) -> &[usize] {
        self.inner.facts.line_starts.get_or_init(|| {
            std::iter::once(0)
                .chain(
                    self.source()
                        .match_indices('\n')
                        .map(|(index, _)| index + 1),
                )
                .collect()
        })
    }

    fn line_text(&self, line: usize) -> Option<&str> {
        let starts = self.line_starts();
        let start = *starts.get(line)?;
        let end = starts
            .get(line + 1)
            .map_or(self.source().len(), |next| next - 1);
        let text = self.source().get(start..end)?;
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    /// Columns of the first non-whitespace character of a zero-based line and
    /// of the position just after its last one, counted in characters.
    ///
    /// A blank line yields `(0, 0)`; a line past the end yields `None`.
    #[must_use]
    pub fn column_positions(&self, line: usize) -> Option<(usize, usize)> {
        let text = self.line_text(line)?;
        let start = text.chars().take_while(|ch| ch.is_whitespace()).count();
        let trimmed = text.trim_end().chars().count();
        if trimmed <= start {
            return Some((0, 0));
        }
        Some((start, trimmed))
    }

    /// Byte offset of a zero-based line and character column.
    ///
    /// Columns past the end of the line clamp to the line end.
    #[must_use]
    pub fn offset_at(&self, line: usize, character: usize) -> Option<usize> {
        let start = *self.line_starts().get(line)?;
        let text = self.line_text(line)?;
        let within = text
            .char_indices()
            .nth(character)
            .map_or(text.len(), |(index, _)| index);
        Some(start + within)
    }
}

fn collect_imports(statements: &[Stmt], imports: &mut Vec<UseItem>) {
    for statement in statements {
        if let StmtKind::Use {
            kind: UseKind::Normal,
            items,
        } = &statement.kind
        {
            imports.extend(items.iter().cloned());
        } else if let StmtKind::Namespace {
            body: Some(body), ..
        } = &statement.kind
        {
            collect_imports(body, imports);
        }
    }
}

fn index_properties(class: &ClassDecl) -> FxHashMap<String, PropertySlot> {
    let mut slots = FxHashMap::default();
    for (member_index, member) in class.members.iter().enumerate() {
        if let MemberKind::Property(property) = &member.kind {
            for (item, declared) in property.items.iter().enumerate() {
                slots
                    .entry(declared.name.name.clone())
                    .or_insert(PropertySlot::Declared {
                        member: member_index,
                        item,
                    });
            }
        } else if let MemberKind::Method(method) = &member.kind {
            if !method.name.name.eq_ignore_ascii_case("__construct") {
                continue;
            }
            for (param, declared) in method.params.iter().enumerate() {
                if declared.promoted.is_some() {
                    slots
                        .entry(declared.name.name.clone())
                        .or_insert(PropertySlot::Promoted {
                            member: member_index,
                            param,
                        });
                }
            }
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "<?php

namespace App\\Http;

use App\\Models\\User;
use function strlen;

class Controller extends Base
{
    /** @var string */
    protected $name, $title;

    public function __construct(private User $user, $plain)
    {
        $this->name = 'x';
    }
}
";

    fn document() -> Result<SyntaxDocument, Error> {
        SyntaxDocument::parse("file:///tmp/Controller.php", SOURCE, 3)
    }

    #[test]
    fn getters() -> Result<(), Error> {
        let document = document()?;
        assert_eq!(document.uri(), "file:///tmp/Controller.php");
        assert_eq!(document.source(), SOURCE);
        assert_eq!(document.version(), 3);
        Ok(())
    }

    #[test]
    fn derived_facts() -> Result<(), Error> {
        let document = document()?;
        assert_eq!(document.namespace(), Some("App\\Http"));
        assert_eq!(document.class_name(), Some("App\\Http\\Controller"));
        let imports: Vec<_> = document
            .use_statements()
            .iter()
            .map(|item| item.name.joined())
            .collect();
        assert_eq!(imports, vec!["App\\Models\\User"]);
        assert!(document.constructor_node().is_some());
        Ok(())
    }

    #[test]
    fn class_properties_include_promoted_parameters() -> Result<(), Error> {
        let document = document()?;
        let title = document.class_property("title");
        assert!(matches!(title, Some(ClassProperty::Declared { .. })));
        assert_eq!(title.and_then(|p| p.doc_comment()), Some("/** @var string */"));

        let user = document.class_property("user");
        assert!(matches!(user, Some(ClassProperty::Promoted { .. })));
        assert_eq!(
            user.and_then(|p| p.type_hint()).map(ToString::to_string).as_deref(),
            Some("User")
        );
        assert!(document.class_property("plain").is_none());
        assert!(document.class_property("missing").is_none());
        Ok(())
    }

    #[test]
    fn missing_facts_are_absent() -> Result<(), Error> {
        let document = SyntaxDocument::parse("file:///tmp/script.php", "<?php\n$a = 1;\n", 0)?;
        assert_eq!(document.namespace(), None);
        assert_eq!(document.class_name(), None);
        assert!(document.use_statements().is_empty());
        assert!(document.constructor_node().is_none());
        assert!(document.class_property("a").is_none());
        Ok(())
    }

    #[test]
    fn column_positions() -> Result<(), Error> {
        let document = SyntaxDocument::parse("file:///tmp/a.php", "<?php\n\n    $ä = 1;  \n", 0)?;
        assert_eq!(document.column_positions(0), Some((0, 5)));
        assert_eq!(document.column_positions(1), Some((0, 0)));
        assert_eq!(document.column_positions(2), Some((4, 11)));
        assert_eq!(document.column_positions(3), Some((0, 0)));
        assert_eq!(document.column_positions(4), None);
        Ok(())
    }

    #[test]
    fn node_at_finds_innermost_expression() -> Result<(), Error> {
        let source = "<?php\n$user->profile->name;\n";
        let document = SyntaxDocument::parse("file:///tmp/a.php", source, 0)?;
        let offset = source.find("profile").map(|at| at + 2);
        let node = offset.and_then(|offset| document.node_at(offset));
        assert_eq!(
            node.and_then(|expr| source.get(expr.span.start..expr.span.end)),
            Some("$user->profile")
        );
        Ok(())
    }

    #[test]
    fn offset_at_counts_characters() -> Result<(), Error> {
        let source = "<?php\n$ä = 1;\n";
        let document = SyntaxDocument::parse("file:///tmp/a.php", source, 0)?;
        assert_eq!(document.offset_at(1, 2), Some(9));
        assert_eq!(document.offset_at(1, 100), Some(14));
        assert_eq!(document.offset_at(9, 0), None);
        Ok(())
    }
}
