use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use phpls_lsp::{DocumentRegistry, SyntaxDocument};

pub(crate) mod complete;
pub(crate) mod diagnostics;
pub(crate) mod infer;

/// A one-based line and column in a file.
#[derive(clap::Args, Debug)]
pub(crate) struct Location {
    /// The PHP file
    pub file: PathBuf,

    /// Line, starting at 1
    pub line: usize,

    /// Column in characters, starting at 1
    pub column: usize,

    /// Other files or directories whose classes should be known
    #[arg(short = 'I', long = "include")]
    pub includes: Vec<PathBuf>,
}

impl Location {
    /// The file's text and URI.
    pub(crate) fn read(&self) -> Result<(String, String)> {
        let source = fs::read_to_string(&self.file)
            .with_context(|| format!("unable to read {}", self.file.display()))?;
        Ok((source, uri_for(&self.file)))
    }

    /// Byte offset of the location in `source`, clamped to its line.
    pub(crate) fn offset_in(&self, source: &str) -> Result<usize> {
        let line = self.line.saturating_sub(1);
        let column = self.column.saturating_sub(1);
        let mut start = 0;
        for (index, text) in source.split_inclusive('\n').enumerate() {
            if index == line {
                let text = text.trim_end_matches(['\n', '\r']);
                let within = text
                    .char_indices()
                    .nth(column)
                    .map_or(text.len(), |(offset, _)| offset);
                return Ok(start + within);
            }
            start += text.len();
        }
        if line == source.split_inclusive('\n').count() {
            return Ok(source.len());
        }
        anyhow::bail!("line {} is past the end of {}", self.line, self.file.display())
    }

    /// A registry holding every PHP file of the includes.
    pub(crate) fn registry(&self) -> Result<Arc<DocumentRegistry>> {
        let registry = Arc::new(DocumentRegistry::new());
        for path in &self.includes {
            load(&registry, path)?;
        }
        Ok(registry)
    }
}

pub(crate) fn uri_for(path: &Path) -> String {
    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

fn load(registry: &DocumentRegistry, path: &Path) -> Result<()> {
    if path.is_dir() {
        let entries =
            fs::read_dir(path).with_context(|| format!("unable to list {}", path.display()))?;
        for entry in entries {
            load(registry, &entry?.path())?;
        }
        return Ok(());
    }
    if path.extension().is_none_or(|extension| extension != "php") {
        return Ok(());
    }
    let source =
        fs::read_to_string(path).with_context(|| format!("unable to read {}", path.display()))?;
    match SyntaxDocument::parse(uri_for(path), &source, 0) {
        Ok(document) => registry.add(document),
        Err(error) => tracing::warn!(path = %path.display(), %error, "skipping unparsable file"),
    }
    Ok(())
}
