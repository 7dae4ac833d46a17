use std::sync::Arc;

use anyhow::Result;
use phpls_lsp::{Reflector, SyntaxDocument, TypeResolver};

use super::Location;

/// Infer the type of the expression at a position
#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    pub location: Location,
}

pub fn run(args: &Args) -> Result<()> {
    let (source, uri) = args.location.read()?;
    let registry = args.location.registry()?;
    let document = SyntaxDocument::parse(uri, &source, 0)?;
    registry.add(document.clone());

    let offset = args.location.offset_in(&source)?;
    let resolver = TypeResolver::new(Arc::new(Reflector::for_registry(registry)));
    let resolved = resolver.type_at(&document, offset);
    tracing::debug!(offset, %resolved, "resolved");
    println!("{resolved}");
    Ok(())
}
