//! Class metadata looked up by name.
//!
//! A [`Reflector`] asks its [`SourceLocator`]s, in order, for the class with
//! a given fully qualified name and flattens the inheritance chain of the
//! result. The [`RegistrySourceLocator`] is the bridge that makes classes in
//! open, possibly unsaved, documents visible to these lookups.

use std::sync::Arc;

use phpls_parser::{ClassKind, Modifiers, Visibility};
use tracing::instrument;

use crate::Error;
use crate::cache::UsageAwareCache;
use crate::docblock::{DocBlock, PropertyTag};
use crate::state::{DocumentRegistry, SyntaxDocument};

mod document;
mod registry;

pub(crate) use document::canonical_doc_type;
pub use document::DocumentSourceLocator;
pub use registry::RegistrySourceLocator;

/// A source of class metadata.
pub trait SourceLocator: Send + Sync {
    /// The class named `name` (fully qualified, leading `\` optional), with
    /// its own members only.
    fn locate(&self, name: &str) -> Option<ReflectedClass>;

    /// Changes whenever a previous `locate` might now answer differently.
    fn generation(&self) -> u64 {
        0
    }
}

#[derive(Debug, Clone)]
pub struct ReflectedClass {
    /// Fully qualified, without a leading `\`.
    pub name: String,
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub traits: Vec<String>,
    pub doc_comment: Option<String>,
    pub methods: Vec<ReflectedMethod>,
    pub properties: Vec<ReflectedProperty>,
    pub constants: Vec<ReflectedConstant>,
    /// The document the class was declared in, if it came from one.
    pub origin: Option<SyntaxDocument>,
}

#[derive(Debug, Clone)]
pub struct ReflectedMethod {
    pub name: String,
    pub modifiers: Modifiers,
    pub params: Vec<ReflectedParameter>,
    /// Declared return type in canonical form.
    pub return_type: Option<String>,
    /// `@return` types in canonical form.
    pub doc_return_types: Vec<String>,
    pub doc_comment: Option<String>,
    pub declaring_class: String,
}

#[derive(Debug, Clone)]
pub struct ReflectedParameter {
    pub name: String,
    pub type_hint: Option<String>,
    pub doc_types: Vec<String>,
    pub by_ref: bool,
    pub variadic: bool,
    pub has_default: bool,
}

#[derive(Debug, Clone)]
pub struct ReflectedProperty {
    pub name: String,
    pub modifiers: Modifiers,
    pub declared_type: Option<String>,
    /// `@var` types in canonical form.
    pub doc_types: Vec<String>,
    pub doc_comment: Option<String>,
    pub declaring_class: String,
}

#[derive(Debug, Clone)]
pub struct ReflectedConstant {
    pub name: String,
    pub modifiers: Modifiers,
    pub doc_comment: Option<String>,
    pub declaring_class: String,
}

impl ReflectedMethod {
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.modifiers.visibility()
    }

    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name.eq_ignore_ascii_case("__construct")
    }
}

impl ReflectedProperty {
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.modifiers.visibility()
    }

    /// The declared type when it is a single name, neither nullable nor a
    /// union.
    #[must_use]
    pub fn simple_declared_type(&self) -> Option<&str> {
        self.declared_type
            .as_deref()
            .filter(|declared| !declared.starts_with('?') && !declared.contains('|'))
    }
}

impl ReflectedConstant {
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.modifiers.visibility()
    }
}

impl ReflectedClass {
    /// Method lookup, ignoring case like PHP does.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&ReflectedMethod> {
        self.methods
            .iter()
            .find(|method| method.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&ReflectedProperty> {
        self.properties.iter().find(|property| property.name == name)
    }

    #[must_use]
    pub fn constant(&self, name: &str) -> Option<&ReflectedConstant> {
        self.constants.iter().find(|constant| constant.name == name)
    }

    /// `@property` tags of the class doc comment.
    #[must_use]
    pub fn property_tags(&self) -> Vec<PropertyTag> {
        self.doc_comment
            .as_deref()
            .map(|comment| DocBlock::parse(comment).property_tags())
            .unwrap_or_default()
    }

    /// Copy members of `ancestor` this class does not declare itself.
    ///
    /// Private members are only taken from traits, whose code becomes part of
    /// the using class.
    fn inherit(&mut self, ancestor: &ReflectedClass, include_private: bool) {
        let visible = |modifiers: &Modifiers| {
            include_private || modifiers.visibility() != Visibility::Private
        };
        for method in &ancestor.methods {
            if visible(&method.modifiers) && self.method(&method.name).is_none() {
                self.methods.push(method.clone());
            }
        }
        for property in &ancestor.properties {
            if visible(&property.modifiers) && self.property(&property.name).is_none() {
                self.properties.push(property.clone());
            }
        }
        for constant in &ancestor.constants {
            if visible(&constant.modifiers) && self.constant(&constant.name).is_none() {
                self.constants.push(constant.clone());
            }
        }
    }
}

fn cache_key(generation: u64, name: &str) -> (u64, String) {
    (generation, name.trim_start_matches('\\').to_ascii_lowercase())
}

/// Looks classes up through an ordered list of locators.
pub struct Reflector {
    locators: Vec<Box<dyn SourceLocator>>,
    cache: UsageAwareCache<(u64, String), Arc<ReflectedClass>>,
}

impl Reflector {
    #[must_use]
    pub fn new(locators: Vec<Box<dyn SourceLocator>>) -> Self {
        Self {
            locators,
            cache: UsageAwareCache::new(),
        }
    }

    /// A reflector that sees every document of `registry`.
    #[must_use]
    pub fn for_registry(registry: Arc<DocumentRegistry>) -> Self {
        Self::new(vec![Box::new(RegistrySourceLocator::new(registry))])
    }

    /// Append a locator consulted after the existing ones.
    #[must_use]
    pub fn with_locator(mut self, locator: impl SourceLocator + 'static) -> Self {
        self.locators.push(Box::new(locator));
        self
    }

    /// Combined generation of all locators.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.locators
            .iter()
            .fold(0, |sum, locator| sum.wrapping_add(locator.generation()))
    }

    /// The class named `name`, with inherited members flattened in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] when no locator knows the class.
    #[instrument(level = "debug", skip(self))]
    pub fn reflect(&self, name: &str) -> Result<Arc<ReflectedClass>, Error> {
        let key = cache_key(self.generation(), name);
        if let Some(class) = self.cache.get(&key) {
            return Ok(class);
        }
        let class = self
            .locate(name)
            .ok_or_else(|| Error::ClassNotFound(name.trim_start_matches('\\').to_string()))?;
        let class = Arc::new(self.flatten(class, &mut Vec::new()));
        self.cache.set(key, Arc::clone(&class));
        Ok(class)
    }

    /// Like [`reflect`](Self::reflect), but a class declared in `document`
    /// wins over every locator. Used so the document being edited is seen
    /// as it is now even when the registry holds an older version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] when neither the document nor any
    /// locator knows the class.
    pub fn reflect_from(
        &self,
        document: &SyntaxDocument,
        name: &str,
    ) -> Result<Arc<ReflectedClass>, Error> {
        match DocumentSourceLocator::new(document.clone()).locate(name) {
            Some(class) => Ok(Arc::new(self.flatten(class, &mut Vec::new()))),
            None => self.reflect(name),
        }
    }

    /// Purge memoized classes that have not been used for a while.
    pub fn clean_cache(&self) -> usize {
        self.cache.clean()
    }

    fn locate(&self, name: &str) -> Option<ReflectedClass> {
        self.locators.iter().find_map(|locator| locator.locate(name))
    }

    /// Resolve an ancestor while flattening. `visiting` holds the lower-cased
    /// names on the current inheritance path so cycles stop.
    fn ancestor(&self, name: &str, visiting: &mut Vec<String>) -> Option<Arc<ReflectedClass>> {
        let key = cache_key(self.generation(), name);
        if visiting.contains(&key.1) {
            tracing::debug!(class = name, "cyclic inheritance");
            return None;
        }
        if let Some(class) = self.cache.get(&key) {
            return Some(class);
        }
        let Some(class) = self.locate(name) else {
            tracing::debug!(class = name, "ancestor not found");
            return None;
        };
        Some(Arc::new(self.flatten(class, visiting)))
    }

    fn flatten(&self, mut class: ReflectedClass, visiting: &mut Vec<String>) -> ReflectedClass {
        visiting.push(class.name.to_ascii_lowercase());
        for name in class.traits.clone() {
            if let Some(used) = self.ancestor(&name, visiting) {
                class.inherit(&used, true);
            }
        }
        let supertypes: Vec<String> = class
            .parent
            .iter()
            .chain(&class.interfaces)
            .cloned()
            .collect();
        for name in supertypes {
            if let Some(supertype) = self.ancestor(&name, visiting) {
                class.inherit(&supertype, false);
            }
        }
        visiting.pop();
        class
    }
}
