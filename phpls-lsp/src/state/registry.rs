//! Process-wide table of the latest document per URI

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::instrument;

use crate::Error;
use crate::state::SyntaxDocument;

#[derive(Debug)]
struct Entry {
    sequence: u64,
    document: SyntaxDocument,
}

/// Latest [`SyntaxDocument`] for every URI.
///
/// Documents are replaced whole on every [`add`](Self::add), never merged,
/// so readers always see either the old or the new document.
#[derive(Debug)]
pub struct DocumentRegistry {
    documents: DashMap<String, Entry>,
    sequence: AtomicU64,
    generation: AtomicU64,
}

impl DocumentRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            sequence: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Insert `document`, replacing any document with the same URI
    #[instrument(level = "debug", skip_all, fields(uri = document.uri(), version = document.version()))]
    pub fn add(&self, document: SyntaxDocument) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.documents
            .insert(document.uri().to_string(), Entry { sequence, document });
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// The current document for `uri`
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentNotFound`] when nothing was added for `uri`.
    pub fn get(&self, uri: &str) -> Result<SyntaxDocument, Error> {
        self.documents
            .get(uri)
            .map(|entry| entry.document.clone())
            .ok_or_else(|| Error::DocumentNotFound(uri.to_string()))
    }

    #[must_use]
    pub fn has(&self, uri: &str) -> bool {
        self.documents.contains_key(uri)
    }

    /// Every document, most recently added first
    #[must_use]
    pub fn get_all(&self) -> Vec<SyntaxDocument> {
        let mut entries: Vec<(u64, SyntaxDocument)> = self
            .documents
            .iter()
            .map(|entry| (entry.sequence, entry.document.clone()))
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        entries.into_iter().map(|(_, document)| document).collect()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn clear(&self) {
        self.documents.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Counter bumped by every `add` and `clear`.
    ///
    /// Anything derived from the registry's contents stays valid for as long
    /// as the generation it was computed under.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn document(uri: &str, version: i32) -> Result<SyntaxDocument, Error> {
        SyntaxDocument::parse(uri, "<?php\nclass Foo {}\n", version)
    }

    #[test]
    fn newest_add_wins() -> Result<(), Error> {
        let registry = DocumentRegistry::new();
        registry.add(document("file:///tmp/Foo.php", 0)?);
        registry.add(document("file:///tmp/Foo.php", 1)?);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("file:///tmp/Foo.php")?.version(), 1);
        Ok(())
    }

    #[test]
    fn missing_document_is_an_error() {
        let registry = DocumentRegistry::default();
        assert!(!registry.has("file:///tmp/missing.php"));
        assert!(matches!(
            registry.get("file:///tmp/missing.php"),
            Err(Error::DocumentNotFound(uri)) if uri == "file:///tmp/missing.php"
        ));
    }

    #[test]
    fn get_all_orders_by_most_recent_add() -> Result<(), Error> {
        let registry = DocumentRegistry::new();
        registry.add(document("file:///a.php", 0)?);
        registry.add(document("file:///b.php", 0)?);
        registry.add(document("file:///a.php", 1)?);

        let uris: Vec<_> = registry
            .get_all()
            .iter()
            .map(|document| document.uri().to_string())
            .collect();
        assert_eq!(uris, vec!["file:///a.php", "file:///b.php"]);
        Ok(())
    }

    #[test]
    fn clear_empties_and_bumps_generation() -> Result<(), Error> {
        let registry = DocumentRegistry::new();
        registry.add(document("file:///a.php", 0)?);
        let before = registry.generation();

        registry.clear();

        assert!(registry.is_empty());
        assert!(!registry.has("file:///a.php"));
        assert!(registry.generation() > before);
        Ok(())
    }
}
