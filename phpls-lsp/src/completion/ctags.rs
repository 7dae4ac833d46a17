//! Class and interface names from a ctags index.
//!
//! The index is the `tags` file universal-ctags writes at the project root.
//! Each line reads `name<TAB>file<TAB>address;"<TAB>kind<TAB>fields...`,
//! where the fields we read are `kind` and `namespace`.

use std::path::{Path, PathBuf};

use phpls_parser::{Expr, ExprKind};
use tracing::{instrument, warn};

use super::{CompletionItem, CompletionItemKind, CompletionProvider, CompletionRequest};

pub const TAGS_FILE: &str = "tags";

#[derive(Debug, Clone)]
pub struct CTagsProvider {
    tags: Option<PathBuf>,
    keyword_length: usize,
}

impl CTagsProvider {
    /// A provider reading `<root>/tags`, completing names of at least
    /// `keyword_length` characters.
    #[must_use]
    pub fn new(root: impl AsRef<Path>, keyword_length: usize) -> Self {
        Self {
            tags: Some(root.as_ref().join(TAGS_FILE)),
            keyword_length,
        }
    }

    /// A provider that never completes, for sessions without a project root.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tags: None,
            keyword_length: usize::MAX,
        }
    }

    fn index(&self) -> Option<&Path> {
        self.tags.as_deref().filter(|path| path.is_file())
    }

    #[instrument(level = "debug", skip(self))]
    fn lookup(&self, prefix: &str) -> Vec<CompletionItem> {
        let Some(path) = self.index() else {
            return Vec::new();
        };
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) => {
                warn!(path = %path.display(), %error, "unable to read tags file");
                return Vec::new();
            }
        };
        let prefix = prefix.to_lowercase();
        contents
            .lines()
            .filter(|line| !line.starts_with("!_TAG_"))
            .filter_map(parse_line)
            .filter(|tag| tag.name.to_lowercase().starts_with(&prefix))
            .map(|tag| CompletionItem {
                label: tag.name,
                kind: Some(tag.kind),
                detail: Some(tag.namespace),
                ..Default::default()
            })
            .collect()
    }
}

impl CompletionProvider for CTagsProvider {
    fn name(&self) -> &'static str {
        "ctags"
    }

    fn supports(&self, expression: &Expr) -> bool {
        let ExprKind::ConstFetch(name) = &expression.kind else {
            return false;
        };
        name.last().chars().count() >= self.keyword_length && self.index().is_some()
    }

    fn complete(&self, request: &CompletionRequest<'_>) -> Vec<CompletionItem> {
        let ExprKind::ConstFetch(name) = &request.expression.kind else {
            return Vec::new();
        };
        self.lookup(name.last())
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Tag {
    name: String,
    kind: CompletionItemKind,
    namespace: String,
}

/// Class (`c`) and interface (`i`) entries. Anything else is skipped.
fn parse_line(line: &str) -> Option<Tag> {
    let (name, _) = line.split_once('\t')?;
    let (_, fields) = line.split_once(";\"\t")?;
    let mut kind = None;
    let mut namespace = String::new();
    for field in fields.split('\t') {
        match field.split_once(':') {
            Some(("kind", value)) => kind = tag_kind(value),
            Some(("namespace", value)) => namespace = value.replace("\\\\", "\\"),
            Some(_) => {}
            None => kind = tag_kind(field),
        }
    }
    Some(Tag {
        name: name.to_string(),
        kind: kind?,
        namespace,
    })
}

fn tag_kind(value: &str) -> Option<CompletionItemKind> {
    match value {
        "c" | "class" => Some(CompletionItemKind::CLASS),
        "i" | "interface" => Some(CompletionItemKind::INTERFACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    #[test]
    fn class_line() {
        let line = "Repository\tsrc/Repository.php\t/^interface Repository$/;\"\ti\tnamespace:App\\\\Contracts";
        assert_eq!(
            parse_line(line),
            Some(Tag {
                name: "Repository".into(),
                kind: CompletionItemKind::INTERFACE,
                namespace: "App\\Contracts".into(),
            })
        );
    }

    #[test]
    fn long_kind_names_and_other_kinds() {
        let line = "User\tUser.php\t/^class User$/;\"\tkind:class\tline:3";
        assert_eq!(parse_line(line).map(|tag| tag.kind), Some(CompletionItemKind::CLASS));

        let line = "save\tUser.php\t/^    public function save()$/;\"\tf\tclass:User";
        assert_eq!(parse_line(line), None);
    }

    #[test]
    #[traced_test]
    fn unreadable_index_yields_nothing() -> Result<(), crate::Error> {
        let directory = tempfile::tempdir()?;
        std::fs::write(directory.path().join(TAGS_FILE), [0xff, 0xfe, 0x00, 0x41])?;
        let provider = CTagsProvider::new(directory.path(), 3);
        assert!(provider.lookup("Abstract").is_empty());
        assert!(logs_contain("unable to read tags file"));
        Ok(())
    }

    #[test]
    fn disabled_provider_supports_nothing() {
        let name = phpls_parser::Name::parse("Abstract", phpls_parser::Span::default());
        let expression = name.map(|name| Expr::new(ExprKind::ConstFetch(name), phpls_parser::Span::default()));
        assert!(expression.is_some_and(|expression| !CTagsProvider::disabled().supports(&expression)));
    }
}
