//! Class-name canonicalization against a document's namespace and imports

use phpls_parser::{Name, Span};

use crate::state::SyntaxDocument;

/// Types that never name a class. Doc comments and declarations keep these
/// lower-cased and unqualified.
const BUILTIN_TYPES: &[&str] = &[
    "int", "integer", "float", "double", "bool", "boolean", "string", "array", "object",
    "iterable", "callable", "void", "mixed", "null", "false", "true", "never", "resource",
    "self", "static", "parent", "$this",
];

#[must_use]
pub fn is_builtin_type(text: &str) -> bool {
    BUILTIN_TYPES
        .iter()
        .any(|builtin| builtin.eq_ignore_ascii_case(text))
}

fn is_keyword(name: &Name, keyword: &str) -> bool {
    name.is_unqualified() && name.last().eq_ignore_ascii_case(keyword)
}

/// Fully qualified form of `name` as seen from `document`, without a leading
/// `\`.
///
/// `self` and `static` map to the document's class and `parent` to that
/// class's parent; those yield `None` when the document has no such class.
/// Unqualified names go through the imports (the last matching import wins)
/// and otherwise land in the document's namespace. Qualified names are only
/// rewritten when their first segment is an import alias.
#[must_use]
pub fn resolve_class_name(document: &SyntaxDocument, name: &Name) -> Option<String> {
    if name.is_fully_qualified() {
        return Some(name.joined());
    }
    if is_keyword(name, "self") || is_keyword(name, "static") {
        return document.class_name().map(str::to_string);
    }
    if is_keyword(name, "parent") {
        return parent_class_name(document);
    }

    let imported = document
        .use_statements()
        .iter()
        .rev()
        .find(|import| import.local_name().eq_ignore_ascii_case(name.first()));

    if name.is_unqualified() {
        if let Some(import) = imported {
            return Some(import.name.joined());
        }
        return Some(match document.namespace() {
            Some(namespace) => format!("{namespace}\\{}", name.last()),
            None => name.last().to_string(),
        });
    }

    match imported {
        Some(import) => {
            let mut parts = import.name.parts.clone();
            parts.extend(name.parts.iter().skip(1).cloned());
            Some(parts.join("\\"))
        }
        None => Some(name.joined()),
    }
}

/// Like [`resolve_class_name`] for a name given as text, e.g. from a doc
/// comment.
#[must_use]
pub fn resolve_class_text(document: &SyntaxDocument, text: &str) -> Option<String> {
    Name::parse(text, Span::default()).and_then(|name| resolve_class_name(document, &name))
}

/// Fully qualified parent of the document's first class.
#[must_use]
pub fn parent_class_name(document: &SyntaxDocument) -> Option<String> {
    let class = document.class_declaration()?;
    if class.kind != phpls_parser::ClassKind::Class {
        return None;
    }
    let parent = class.extends.first()?;
    if ["self", "static", "parent"]
        .iter()
        .any(|keyword| is_keyword(parent, keyword))
    {
        return None;
    }
    resolve_class_name(document, parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const SOURCE: &str = "<?php
namespace App\\Http;

use App\\Models\\User;
use Psr\\Log\\LoggerInterface as Logger;
use Vendor\\Pkg;

class Controller extends Base {}
";

    #[rstest]
    #[case::self_name("self", Some("App\\Http\\Controller"))]
    #[case::static_name("static", Some("App\\Http\\Controller"))]
    #[case::parent_name("parent", Some("App\\Http\\Base"))]
    #[case::imported("User", Some("App\\Models\\User"))]
    #[case::aliased("Logger", Some("Psr\\Log\\LoggerInterface"))]
    #[case::same_namespace("Request", Some("App\\Http\\Request"))]
    #[case::fully_qualified("\\DateTime", Some("DateTime"))]
    #[case::qualified_through_import("Pkg\\Client", Some("Vendor\\Pkg\\Client"))]
    #[case::qualified("Other\\Thing", Some("Other\\Thing"))]
    fn canonical_names(
        #[case] text: &str,
        #[case] expected: Option<&str>,
    ) -> Result<(), Error> {
        let document = SyntaxDocument::parse("file:///tmp/Controller.php", SOURCE, 0)?;
        assert_eq!(resolve_class_text(&document, text).as_deref(), expected);
        Ok(())
    }

    #[test]
    fn global_namespace_and_missing_class() -> Result<(), Error> {
        let document = SyntaxDocument::parse("file:///tmp/a.php", "<?php\n$a = 1;\n", 0)?;
        assert_eq!(resolve_class_text(&document, "Foo").as_deref(), Some("Foo"));
        assert_eq!(resolve_class_text(&document, "self"), None);
        assert_eq!(resolve_class_text(&document, "parent"), None);
        Ok(())
    }

    #[test]
    fn builtin_types_ignore_case() {
        assert!(is_builtin_type("INT"));
        assert!(is_builtin_type("$this"));
        assert!(!is_builtin_type("Foo"));
    }
}
