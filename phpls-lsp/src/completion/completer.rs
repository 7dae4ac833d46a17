use std::sync::Arc;

use phpls_parser::{Expr, Node, parse_completion_target};
use tracing::{debug, instrument};

use super::scope::{instance_receiver, static_class};
use super::{CTagsProvider, CompletionItem, CompletionRequest, ProviderRegistry};
use crate::config::Config;
use crate::reflection::Reflector;
use crate::resolve::{ResolvedType, TypeResolver};
use crate::state::{DocumentRegistry, SyntaxDocument};

/// Completion for documents of a registry.
pub struct Completer {
    registry: Arc<DocumentRegistry>,
    resolver: Arc<TypeResolver>,
    providers: ProviderRegistry,
}

impl Completer {
    #[must_use]
    pub fn new(
        registry: Arc<DocumentRegistry>,
        resolver: Arc<TypeResolver>,
        providers: ProviderRegistry,
    ) -> Self {
        Self {
            registry,
            resolver,
            providers,
        }
    }

    /// The built-in providers over `registry`, with the tags index of
    /// `config.project_root` when one is configured.
    #[must_use]
    pub fn from_config(registry: Arc<DocumentRegistry>, config: &Config) -> Self {
        let reflector = Arc::new(Reflector::for_registry(Arc::clone(&registry)));
        let ctags = config
            .project_root
            .as_ref()
            .map_or_else(CTagsProvider::disabled, |root| {
                CTagsProvider::new(root, config.ctags.completion.keyword_length)
            });
        Self::new(
            registry,
            Arc::new(TypeResolver::new(reflector)),
            ProviderRegistry::new(ctags),
        )
    }

    #[must_use]
    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Items for the expression ending at byte offset `cursor` of `source`,
    /// the current, possibly unsaved, text of the document at `uri`.
    ///
    /// Text being typed rarely parses. When `source` does not, the rest of
    /// the line from the expression onwards is replaced by `null;` and parsed
    /// again. When that fails too, the registered version of the document is
    /// used, and without one only providers that need no context, such as
    /// the tags index, can answer.
    #[instrument(level = "debug", skip(self, source))]
    pub fn complete(&self, uri: &str, source: &str, cursor: usize) -> Vec<CompletionItem> {
        let Some(target) = parse_completion_target(source, cursor) else {
            debug!("nothing to complete");
            return Vec::new();
        };
        let Some(document) = self.document_for(uri, source, &target) else {
            return Vec::new();
        };
        self.complete_in(&document, &target)
    }

    /// Items for `target`, an expression located in `document`.
    #[must_use]
    pub fn complete_in(&self, document: &SyntaxDocument, target: &Expr) -> Vec<CompletionItem> {
        let receiver_type = if let Some(receiver) = instance_receiver(target) {
            self.resolver.infer(document, Node::Expr(receiver))
        } else if static_class(target).is_some() {
            self.resolver.infer(document, Node::Expr(target))
        } else {
            ResolvedType::Unresolved
        };

        let receiver = receiver_type.class_name().and_then(|name| {
            self.resolver
                .reflector()
                .reflect_from(document, name)
                .map_err(|error| debug!(%error, "receiver not reflectable"))
                .ok()
        });

        self.providers.complete(&CompletionRequest {
            document,
            expression: target,
            receiver: receiver.as_deref(),
        })
    }

    fn document_for(&self, uri: &str, source: &str, target: &Expr) -> Option<SyntaxDocument> {
        match SyntaxDocument::parse(uri, source, 0) {
            Ok(document) => return Some(document),
            Err(error) => debug!(%error, "buffer does not parse, repairing"),
        }
        if let Some(repaired) = repair(source, target.span.start) {
            match SyntaxDocument::parse(uri, &repaired, 0) {
                Ok(document) => return Some(document),
                Err(error) => debug!(%error, "repaired buffer does not parse"),
            }
        }
        match self.registry.get(uri) {
            Ok(document) => Some(document),
            Err(error) => {
                debug!(%error, "completing without document context");
                SyntaxDocument::parse(uri, "<?php\n", 0).ok()
            }
        }
    }
}

/// `source` with everything from `start` to the end of its line replaced by
/// `null`, the brackets left open earlier on the line and `;`, padded so
/// later offsets stay put where the line allows it.
fn repair(source: &str, start: usize) -> Option<String> {
    let (head, rest) = source.split_at_checked(start)?;
    let line_len = rest.find('\n').unwrap_or(rest.len());
    let (line, tail) = rest.split_at_checked(line_len)?;
    let line_start = head.rfind('\n').map_or(0, |index| index + 1);
    let filler = format!("null{};", closers(head.get(line_start..)?));
    let padding = line.len().saturating_sub(filler.len());
    Some(format!("{head}{filler}{}{tail}", " ".repeat(padding)))
}

/// Closing brackets for the `(` and `[` still open in `text`, innermost first.
fn closers(text: &str) -> String {
    let mut open = Vec::new();
    for ch in text.chars() {
        match ch {
            '(' => open.push(')'),
            '[' => open.push(']'),
            ')' | ']' if open.last() == Some(&ch) => {
                open.pop();
            }
            _ => {}
        }
    }
    open.into_iter().rev().collect()
}
