//! Function registry and overload resolution
//!
//! Every regular function owns an [`OverloadTree`]: a trie keyed positionally by
//! argument type. Each node has buckets for generalized term matches (`term` or one
//! term kind) and a list of literal-type children. Registering an overload also
//! registers every promoted variant of it, tagged with the number of promotions it
//! needs; the variant needing fewer promotions keeps the slot.
//!
//! Lookup walks the trie depth first. A literal argument tries the ancestors of its
//! datatype closest first, then its term kind, then `term`. Successful lookups are
//! memoized in the [`FunctionArgumentsCache`] keyed by function name and the per-argument
//! keys (literal datatype or term kind).

use crate::context::FunctionContext;
use crate::error::{EvalError, EvalResult};
use crate::expression::SpecialForm;
use log::{debug, trace};
use parking_lot::RwLock;
use smallvec::SmallVec;
use sparql_expr_types::{ConversionFn, Term, TermKind, TypeAlias, TypeLattice, promotions_into};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Implementation of one overload
pub type ImplementationFn =
    Arc<dyn Fn(&[Term], &FunctionContext<'_>) -> EvalResult<Term> + Send + Sync>;

/// Per-argument dispatch keys of one call
pub type ArgumentKey = SmallVec<[String; 3]>;

static STANDARD_FUNCTIONS: LazyLock<Arc<FunctionRegistry>> =
    LazyLock::new(|| Arc::new(FunctionRegistry::with_standard_functions()));

/// Type an overload accepts at one argument position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgumentType {
    /// Any term
    Term,
    /// Any term of one kind
    Kind(TermKind),
    /// A literal datatype IRI or type alias
    Type(String),
}

impl ArgumentType {
    pub fn literal(ty: &str) -> Self {
        Self::Type(ty.to_string())
    }
}

impl From<&str> for ArgumentType {
    fn from(ty: &str) -> Self {
        Self::Type(ty.to_string())
    }
}

impl From<TypeAlias> for ArgumentType {
    fn from(alias: TypeAlias) -> Self {
        Self::Type(alias.as_str().to_string())
    }
}

impl From<TermKind> for ArgumentType {
    fn from(kind: TermKind) -> Self {
        Self::Kind(kind)
    }
}

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Self::Exact(n) => count == n,
            Self::Between(min, max) => (min..=max).contains(&count),
            Self::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{}", n),
            Self::Between(min, max) => write!(f, "{} to {}", min, max),
            Self::AtLeast(min) => write!(f, "at least {}", min),
        }
    }
}

/// Dispatch key of one argument
pub fn argument_key(arg: &Term) -> String {
    match arg {
        Term::Literal(literal) => literal.dispatch_type().to_string(),
        other => other.kind().as_str().to_string(),
    }
}

// ============================================================================
// Overload tree
// ============================================================================

#[derive(Clone)]
struct Registered {
    implementation: ImplementationFn,
    promotion_count: usize,
}

#[derive(Default)]
struct OverloadNode {
    implementation: Option<Registered>,
    general: Vec<(ArgumentType, OverloadNode)>,
    literal: Vec<(String, OverloadNode)>,
}

impl OverloadNode {
    fn child_mut(&mut self, ty: &ArgumentType) -> &mut OverloadNode {
        match ty {
            ArgumentType::Type(name) => {
                let index = match self.literal.iter().position(|(n, _)| n == name) {
                    Some(index) => index,
                    None => {
                        self.literal.push((name.clone(), OverloadNode::default()));
                        self.literal.len() - 1
                    }
                };
                &mut self.literal[index].1
            }
            general => {
                let index = match self.general.iter().position(|(t, _)| t == general) {
                    Some(index) => index,
                    None => {
                        self.general.push((general.clone(), OverloadNode::default()));
                        self.general.len() - 1
                    }
                };
                &mut self.general[index].1
            }
        }
    }

    fn general_child(&self, ty: &ArgumentType) -> Option<&OverloadNode> {
        self.general.iter().find(|(t, _)| t == ty).map(|(_, node)| node)
    }

    /// Children matching `arg`, most specific first
    fn candidates(&self, arg: &Term, lattice: &TypeLattice) -> Vec<&OverloadNode> {
        let mut matches = Vec::new();
        if let Term::Literal(literal) = arg {
            if !self.literal.is_empty() {
                let supers = lattice.get_super_types(literal.dispatch_type());
                for ancestor in supers.ancestors() {
                    if let Some((_, node)) = self.literal.iter().find(|(n, _)| n == ancestor) {
                        matches.push(node);
                    }
                }
            }
        }
        if let Some(node) = self.general_child(&ArgumentType::Kind(arg.kind())) {
            matches.push(node);
        }
        if let Some(node) = self.general_child(&ArgumentType::Term) {
            matches.push(node);
        }
        matches
    }
}

/// Type-directed dispatch trie of one function
#[derive(Default)]
pub struct OverloadTree {
    root: OverloadNode,
}

impl OverloadTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation and all of its promoted variants
    pub fn add_overload(&mut self, types: &[ArgumentType], implementation: ImplementationFn) {
        self.add_with_promotions(types, implementation, 0);
    }

    fn add_with_promotions(&mut self, types: &[ArgumentType], implementation: ImplementationFn, promotion_count: usize) {
        let node = types.iter().fold(&mut self.root, |node, ty| node.child_mut(ty));
        let keep_existing = node
            .implementation
            .as_ref()
            .is_some_and(|existing| existing.promotion_count <= promotion_count);
        if !keep_existing {
            node.implementation = Some(Registered {
                implementation: implementation.clone(),
                promotion_count,
            });
        }

        for (position, ty) in types.iter().enumerate() {
            let ArgumentType::Type(target) = ty else {
                continue;
            };
            for promotion in promotions_into(target) {
                let mut promoted = types.to_vec();
                promoted[position] = ArgumentType::literal(promotion.type_to_promote);
                let wrapped = promote_argument(implementation.clone(), position, promotion.conversion);
                self.add_with_promotions(&promoted, wrapped, promotion_count + 1);
            }
        }
    }

    /// Depth-first search for the implementation matching `args`
    pub fn search(&self, args: &[Term], lattice: &TypeLattice) -> Option<ImplementationFn> {
        let mut stack: Vec<(&OverloadNode, usize)> = vec![(&self.root, 0)];
        while let Some((node, depth)) = stack.pop() {
            if depth == args.len() {
                if let Some(registered) = &node.implementation {
                    return Some(registered.implementation.clone());
                }
                continue;
            }
            for child in node.candidates(&args[depth], lattice).into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        None
    }
}

fn promote_argument(implementation: ImplementationFn, position: usize, conversion: ConversionFn) -> ImplementationFn {
    Arc::new(move |args: &[Term], ctx: &FunctionContext<'_>| {
        let mut converted = args.to_vec();
        if let Some(Term::Literal(literal)) = args.get(position) {
            converted[position] = Term::Literal(conversion(literal));
        }
        implementation(&converted, ctx)
    })
}

// ============================================================================
// Resolution cache
// ============================================================================

/// Memo of successful overload resolutions, keyed by function name and argument keys
#[derive(Default)]
pub struct FunctionArgumentsCache {
    entries: RwLock<HashMap<String, HashMap<ArgumentKey, ImplementationFn>>>,
}

impl FunctionArgumentsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, function: &str, key: &ArgumentKey) -> Option<ImplementationFn> {
        self.entries.read().get(function)?.get(key).cloned()
    }

    pub fn insert(&self, function: &str, key: ArgumentKey, implementation: ImplementationFn) {
        self.entries
            .write()
            .entry(function.to_string())
            .or_default()
            .entry(key)
            .or_insert(implementation);
    }

    /// Number of cached resolutions across all functions
    pub fn len(&self) -> usize {
        self.entries.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FunctionArgumentsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionArgumentsCache")
            .field("entries", &self.len())
            .finish()
    }
}

// ============================================================================
// Functions
// ============================================================================

/// A function resolved through its overload tree
pub struct RegularFunction {
    name: String,
    arity: Arity,
    overloads: OverloadTree,
}

impl RegularFunction {
    pub fn new(name: impl Into<String>, arity: Arity, overloads: OverloadTree) -> Self {
        Self {
            name: name.into(),
            arity,
            overloads,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Implementation for the runtime types of `args`, from the cache when possible
    pub fn resolve(&self, args: &[Term], ctx: &FunctionContext<'_>) -> Option<ImplementationFn> {
        let key: ArgumentKey = args.iter().map(argument_key).collect();
        let cache = &ctx.shared.function_cache;
        if let Some(cached) = cache.get(&self.name, &key) {
            return Some(cached);
        }
        debug!("Overload cache miss for {} with ({})", self.name, key.join(", "));
        let found = self.overloads.search(args, &ctx.shared.lattice)?;
        cache.insert(&self.name, key, found.clone());
        Some(found)
    }

    pub fn apply(&self, args: &[Term], ctx: &FunctionContext<'_>) -> EvalResult<Term> {
        let implementation = self
            .resolve(args, ctx)
            .ok_or_else(|| EvalError::invalid_argument_types(&self.name, args))?;
        trace!("Applying {} to {} argument(s)", self.name, args.len());
        implementation(args, ctx)
    }
}

impl fmt::Debug for RegularFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegularFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Catalog of operators, named functions and special forms
#[derive(Default)]
pub struct FunctionRegistry {
    operators: HashMap<String, Arc<RegularFunction>>,
    named: HashMap<String, Arc<RegularFunction>>,
    special: HashMap<&'static str, (SpecialForm, Arity)>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the full built-in catalog
    pub fn with_standard_functions() -> Self {
        let mut registry = Self::new();
        crate::operators::register_standard(&mut registry);
        crate::special::register_special_forms(&mut registry);
        registry
    }

    /// The built-in catalog, built once per process and shared
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD_FUNCTIONS)
    }

    /// Register an operator under its (lowercase) name
    pub fn register_operator(&mut self, function: RegularFunction) {
        self.operators
            .insert(function.name().to_lowercase(), Arc::new(function));
    }

    /// Register a function called by IRI
    pub fn register_named(&mut self, function: RegularFunction) {
        self.named.insert(function.name().to_string(), Arc::new(function));
    }

    pub fn register_special(&mut self, form: SpecialForm, arity: Arity) {
        self.special.insert(form.name(), (form, arity));
    }

    /// Operator by name, case-insensitive
    pub fn operator(&self, name: &str) -> Option<&Arc<RegularFunction>> {
        self.operators.get(&name.to_lowercase())
    }

    pub fn named(&self, iri: &str) -> Option<&Arc<RegularFunction>> {
        self.named.get(iri)
    }

    /// Special form by name, case-insensitive
    pub fn special(&self, name: &str) -> Option<(SpecialForm, Arity)> {
        self.special.get(name.to_lowercase().as_str()).copied()
    }

    /// Apply an operator by name
    pub fn apply(&self, name: &str, args: &[Term], ctx: &FunctionContext<'_>) -> EvalResult<Term> {
        self.operator(name)
            .ok_or_else(|| EvalError::UnknownOperator {
                name: name.to_string(),
            })?
            .apply(args, ctx)
    }

    /// Apply a boolean-valued operator by name
    pub fn test(&self, name: &str, args: &[Term], ctx: &FunctionContext<'_>) -> EvalResult<bool> {
        let result = self.apply(name, args, ctx)?;
        match result.as_literal().map(|l| &l.value) {
            Some(sparql_expr_types::LiteralValue::Boolean(b)) => Ok(*b),
            _ => Err(EvalError::invalid_argument_types(name, args)),
        }
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("operators", &self.operators.len())
            .field("named", &self.named.len())
            .field("special", &self.special.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SharedContext;
    use sparql_expr_types::vocab::xsd;
    use sparql_expr_types::{Literal, LiteralValue};

    fn tag(label: &'static str) -> ImplementationFn {
        Arc::new(move |_: &[Term], _: &FunctionContext<'_>| Ok(Term::from(Literal::string(label))))
    }

    fn echo_second() -> ImplementationFn {
        Arc::new(|args: &[Term], _: &FunctionContext<'_>| Ok(args[1].clone()))
    }

    fn label(term: Option<ImplementationFn>, args: &[Term]) -> String {
        let registry = FunctionRegistry::new();
        let shared = SharedContext::new();
        let ctx = FunctionContext {
            shared: &shared,
            functions: &registry,
        };
        term.map(|f| f(args, &ctx).unwrap().str()).unwrap_or_default()
    }

    fn int(i: i64) -> Term {
        Term::from(Literal::integer(i))
    }

    #[test]
    fn test_most_specific_overload_wins() {
        let mut tree = OverloadTree::new();
        tree.add_overload(&[ArgumentType::Term], tag("term"));
        tree.add_overload(&[TypeAlias::Numeric.into()], tag("numeric"));
        tree.add_overload(&[xsd::INTEGER.into()], tag("integer"));
        let lattice = TypeLattice::new();

        let byte = Term::from(Literal::integer(1).with_datatype(xsd::BYTE));
        assert_eq!(label(tree.search(&[byte.clone()], &lattice), &[byte]), "integer");
        let double = Term::from(Literal::double(1.0));
        assert_eq!(label(tree.search(&[double.clone()], &lattice), &[double]), "numeric");
        let iri = Term::named_node("http://ex/a");
        assert_eq!(label(tree.search(&[iri.clone()], &lattice), &[iri]), "term");
    }

    #[test]
    fn test_search_backtracks() {
        let mut tree = OverloadTree::new();
        tree.add_overload(&[xsd::INTEGER.into(), xsd::INTEGER.into()], tag("int-int"));
        tree.add_overload(&[xsd::DECIMAL.into(), xsd::STRING.into()], tag("dec-str"));
        let lattice = TypeLattice::new();
        let args = [int(1), Term::from(Literal::string("a"))];
        assert_eq!(label(tree.search(&args, &lattice), &args), "dec-str");
        let args = [Term::from(Literal::string("a")), int(1)];
        assert!(tree.search(&args, &lattice).is_none());
    }

    #[test]
    fn test_promotion_converts_argument() {
        let mut tree = OverloadTree::new();
        tree.add_overload(&[xsd::DOUBLE.into(), xsd::DOUBLE.into()], echo_second());
        let lattice = TypeLattice::new();
        let args = [Term::from(Literal::double(1.0)), int(3)];
        let result = tree.search(&args, &lattice);
        let registry = FunctionRegistry::new();
        let shared = SharedContext::new();
        let ctx = FunctionContext {
            shared: &shared,
            functions: &registry,
        };
        let promoted = result.unwrap()(&args, &ctx).unwrap();
        assert_eq!(promoted.as_literal().unwrap().value, LiteralValue::Double(3.0));
    }

    #[test]
    fn test_exact_registration_beats_promotion() {
        let mut tree = OverloadTree::new();
        tree.add_overload(&[xsd::DOUBLE.into(), xsd::DOUBLE.into()], tag("double"));
        tree.add_overload(&[xsd::FLOAT.into(), xsd::FLOAT.into()], tag("float"));
        let lattice = TypeLattice::new();
        let float = Term::from(Literal::float(1.0));
        let decimal = Term::from(Literal::decimal(1.into()));
        let double = Term::from(Literal::double(1.0));

        let args = [float.clone(), float.clone()];
        assert_eq!(label(tree.search(&args, &lattice), &args), "float");
        let args = [decimal.clone(), float];
        assert_eq!(label(tree.search(&args, &lattice), &args), "float");
        let args = [decimal, double];
        assert_eq!(label(tree.search(&args, &lattice), &args), "double");
    }

    #[test]
    fn test_non_lexical_only_matches_general_overloads() {
        let mut tree = OverloadTree::new();
        tree.add_overload(&[xsd::INTEGER.into()], tag("integer"));
        tree.add_overload(&[TermKind::Literal.into()], tag("literal"));
        let lattice = TypeLattice::new();
        let args = [Term::from(Literal::non_lexical("x", xsd::INTEGER, None, true))];
        assert_eq!(label(tree.search(&args, &lattice), &args), "literal");
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Between(2, 3).accepts(4));
        assert!(Arity::AtLeast(1).accepts(7));
        assert_eq!(Arity::Between(2, 3).to_string(), "2 to 3");
    }
}
