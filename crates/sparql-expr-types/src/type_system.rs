//! Type lattice
//!
//! The lattice relates every literal datatype the engine knows to its ancestors, up to
//! the universal `term` root. Three aliases group datatypes that functions commonly
//! accept together: `numeric`, `stringly` and `nonlexical`.
//!
//! Datatypes outside the static table are resolved through a [`TypeDiscoverer`] that
//! names their nearest known parent. Results are cached per IRI; a cache entry never
//! changes once written, so concurrent writers computing the same key are harmless.

use crate::vocab::{rdf, xsd};
use indexmap::IndexMap;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name of the universal root type
pub const TERM: &str = "term";

/// Discoverer depth after which an unresolved chain is treated as a direct child of `term`
const MAX_DISCOVERY_DEPTH: usize = 64;

/// Abstract groupings of literal datatypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeAlias {
    Numeric,
    Stringly,
    /// Dispatch type of literals whose lexical form is invalid for their datatype
    NonLexical,
}

impl TypeAlias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Stringly => "stringly",
            Self::NonLexical => "nonlexical",
        }
    }
}

impl fmt::Display for TypeAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A type an overload can be registered against
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverrideType {
    /// The universal root
    Term,
    Alias(TypeAlias),
    /// A concrete literal datatype IRI
    Literal(String),
}

impl OverrideType {
    pub fn literal(iri: impl Into<String>) -> Self {
        Self::Literal(iri.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Term => TERM,
            Self::Alias(alias) => alias.as_str(),
            Self::Literal(iri) => iri,
        }
    }
}

impl From<TypeAlias> for OverrideType {
    fn from(alias: TypeAlias) -> Self {
        Self::Alias(alias)
    }
}

impl fmt::Display for OverrideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every ancestor of a type mapped to its distance from that type (0 = self)
///
/// Entries are kept in ascending distance, so iteration yields the closest ancestor
/// first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperTypes {
    ancestors: IndexMap<String, usize>,
}

impl SuperTypes {
    fn root() -> Self {
        let mut ancestors = IndexMap::new();
        ancestors.insert(TERM.to_string(), 0);
        Self { ancestors }
    }

    /// Super types of `ty`, given the super types of its parent
    fn extend(ty: &str, parent: &SuperTypes) -> Self {
        let mut ancestors = IndexMap::with_capacity(parent.ancestors.len() + 1);
        ancestors.insert(ty.to_string(), 0);
        for (ancestor, depth) in &parent.ancestors {
            ancestors.insert(ancestor.clone(), depth + 1);
        }
        Self { ancestors }
    }

    pub fn depth(&self, ty: &str) -> Option<usize> {
        self.ancestors.get(ty).copied()
    }

    pub fn contains(&self, ty: &str) -> bool {
        self.ancestors.contains_key(ty)
    }

    /// Ancestors ordered closest first, starting with the type itself
    pub fn ancestors(&self) -> impl Iterator<Item = &str> {
        self.ancestors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ancestors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ancestors.is_empty()
    }
}

/// Resolves an unknown datatype IRI to its nearest known parent, or [`TERM`]
pub type TypeDiscoverer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Parent of every statically known type
const PARENTS: &[(&str, &str)] = &[
    // Aliases
    ("numeric", TERM),
    ("stringly", TERM),
    ("nonlexical", TERM),
    // Strings
    (xsd::STRING, "stringly"),
    (rdf::LANG_STRING, "stringly"),
    (xsd::NORMALIZED_STRING, xsd::STRING),
    (xsd::TOKEN, xsd::NORMALIZED_STRING),
    (xsd::LANGUAGE, xsd::TOKEN),
    (xsd::NMTOKEN, xsd::TOKEN),
    (xsd::NAME, xsd::TOKEN),
    (xsd::NCNAME, xsd::NAME),
    (xsd::ENTITY, xsd::NCNAME),
    (xsd::ID, xsd::NCNAME),
    (xsd::IDREF, xsd::NCNAME),
    // Numerics
    (xsd::DECIMAL, "numeric"),
    (xsd::FLOAT, "numeric"),
    (xsd::DOUBLE, "numeric"),
    (xsd::INTEGER, xsd::DECIMAL),
    (xsd::NON_POSITIVE_INTEGER, xsd::INTEGER),
    (xsd::NEGATIVE_INTEGER, xsd::NON_POSITIVE_INTEGER),
    (xsd::LONG, xsd::INTEGER),
    (xsd::INT, xsd::LONG),
    (xsd::SHORT, xsd::INT),
    (xsd::BYTE, xsd::SHORT),
    (xsd::NON_NEGATIVE_INTEGER, xsd::INTEGER),
    (xsd::POSITIVE_INTEGER, xsd::NON_NEGATIVE_INTEGER),
    (xsd::UNSIGNED_LONG, xsd::NON_NEGATIVE_INTEGER),
    (xsd::UNSIGNED_INT, xsd::UNSIGNED_LONG),
    (xsd::UNSIGNED_SHORT, xsd::UNSIGNED_INT),
    (xsd::UNSIGNED_BYTE, xsd::UNSIGNED_SHORT),
    // Temporal
    (xsd::DATE_TIME, TERM),
    (xsd::DATE_TIME_STAMP, xsd::DATE_TIME),
    (xsd::DATE, TERM),
    (xsd::TIME, TERM),
    (xsd::G_MONTH, TERM),
    (xsd::G_MONTH_DAY, TERM),
    (xsd::G_YEAR, TERM),
    (xsd::G_YEAR_MONTH, TERM),
    (xsd::G_DAY, TERM),
    (xsd::DURATION, TERM),
    (xsd::DAY_TIME_DURATION, xsd::DURATION),
    (xsd::YEAR_MONTH_DURATION, xsd::DURATION),
    // Others
    (xsd::BOOLEAN, TERM),
    (xsd::ANY_URI, TERM),
];

/// Static subtype table plus the open-world cache
pub struct TypeLattice {
    known: HashMap<String, Arc<SuperTypes>>,
    discovered: RwLock<HashMap<String, Arc<SuperTypes>>>,
    discoverer: Option<TypeDiscoverer>,
}

impl TypeLattice {
    /// Build the lattice of statically known types
    pub fn new() -> Self {
        let mut known = HashMap::with_capacity(PARENTS.len() + 1);
        known.insert(TERM.to_string(), Arc::new(SuperTypes::root()));
        for (ty, _) in PARENTS {
            Self::resolve_static(ty, &mut known);
        }
        Self {
            known,
            discovered: RwLock::new(HashMap::new()),
            discoverer: None,
        }
    }

    /// Build the lattice with a discoverer for unknown datatypes
    pub fn with_discoverer(discoverer: TypeDiscoverer) -> Self {
        Self {
            discoverer: Some(discoverer),
            ..Self::new()
        }
    }

    fn resolve_static(ty: &str, known: &mut HashMap<String, Arc<SuperTypes>>) -> Arc<SuperTypes> {
        if let Some(existing) = known.get(ty) {
            return existing.clone();
        }
        let parent = PARENTS
            .iter()
            .find(|(child, _)| *child == ty)
            .map_or(TERM, |(_, parent)| *parent);
        let parent_types = Self::resolve_static(parent, known);
        let resolved = Arc::new(SuperTypes::extend(ty, &parent_types));
        known.insert(ty.to_string(), resolved.clone());
        resolved
    }

    /// Whether `ty` is in the static table
    pub fn is_known(&self, ty: &str) -> bool {
        self.known.contains_key(ty)
    }

    /// All ancestors of `ty` with their distances
    ///
    /// Unknown types are resolved through the discoverer (defaulting to a direct child of
    /// `term`) and cached.
    pub fn get_super_types(&self, ty: &str) -> Arc<SuperTypes> {
        self.super_types_at(ty, 0)
    }

    fn super_types_at(&self, ty: &str, depth: usize) -> Arc<SuperTypes> {
        if let Some(known) = self.known.get(ty) {
            return known.clone();
        }
        if let Some(cached) = self.discovered.read().get(ty) {
            return cached.clone();
        }

        let parent = match &self.discoverer {
            Some(discover) if depth < MAX_DISCOVERY_DEPTH => discover(ty),
            _ => TERM.to_string(),
        };
        debug!("Discovered datatype {} with parent {}", ty, parent);

        let parent_types = if parent == ty {
            self.super_types_at(TERM, depth + 1)
        } else {
            self.super_types_at(&parent, depth + 1)
        };
        let resolved = Arc::new(SuperTypes::extend(ty, &parent_types));
        self.discovered
            .write()
            .entry(ty.to_string())
            .or_insert(resolved)
            .clone()
    }

    /// Whether `base` is `target` or one of its descendants; never true for `term`
    pub fn is_sub_type_of(&self, base: &str, target: &str) -> bool {
        if base == TERM {
            return false;
        }
        self.get_super_types(base).contains(target)
    }

    /// Whether `ty` is a known numeric datatype or derives from one
    pub fn is_numeric(&self, ty: &str) -> bool {
        self.is_sub_type_of(ty, TypeAlias::Numeric.as_str())
    }

    /// Number of types resolved through the discoverer so far
    pub fn discovered_len(&self) -> usize {
        self.discovered.read().len()
    }
}

impl Default for TypeLattice {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeLattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeLattice")
            .field("known", &self.known.len())
            .field("discovered", &self.discovered_len())
            .field("has_discoverer", &self.discoverer.is_some())
            .finish()
    }
}
