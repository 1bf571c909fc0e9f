//! Substitutions: the variable bindings produced by e-matching.
//!
//! Extending a substitution never mutates it: `bind` returns a new value (or
//! the caller's own, when the binding is already present). That functional
//! style is what makes partial matches cheap to deduplicate — substitutions
//! are content-hashed and collected into a set — and it is safe because
//! bindings are short, at most a rule's variable count.
//!
//! A failed binding is not an error. It collapses to the absorbing
//! [`Binding::Bogus`] sentinel, which the set silently discards.

use crate::expr::Value;
use crate::Id;
use core::fmt;
use core::hash::{Hash, Hasher};
use fxhash::{FxBuildHasher, FxHasher};
use indexmap::IndexSet;
use smallvec::SmallVec;

/// What a pattern variable is bound to.
///
/// Atom and app-table rows bind eclass ids; fun-table rows bind analysis
/// values. The two never unify: re-binding a variable across the variants is
/// as inconsistent as re-binding it to a different id.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Bound {
    /// An eclass id.
    Class(Id),
    /// An analysis value out of a fun table row.
    Value(Value),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Class(id) => write!(f, "{id}"),
            Bound::Value(v) => write!(f, "{v}"),
        }
    }
}

/// An immutable map from pattern-variable name to [`Bound`], with a
/// precomputed content hash.
///
/// Bindings are kept sorted by variable name, so the hash is independent of
/// the order in which variables were bound.
#[derive(Clone, Debug)]
pub struct Subst {
    bindings: SmallVec<[(String, Bound); 4]>,
    hash: u64,
}

impl Subst {
    /// The empty substitution.
    pub fn empty() -> Self {
        Self::from_sorted(SmallVec::new())
    }

    fn from_sorted(bindings: SmallVec<[(String, Bound); 4]>) -> Self {
        debug_assert!(bindings.windows(2).all(|w| w[0].0 < w[1].0));
        let mut hasher = FxHasher::default();
        for (var, bound) in &bindings {
            var.hash(&mut hasher);
            bound.hash(&mut hasher);
        }
        let hash = hasher.finish();
        Self { bindings, hash }
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no variables are bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Look up a variable's binding.
    pub fn get(&self, var: &str) -> Option<&Bound> {
        self.search(var).ok().map(|i| &self.bindings[i].1)
    }

    /// Bind `var` to `bound`.
    ///
    /// If `var` is unbound, returns a new substitution extended with the
    /// binding; if it is already bound to `bound`, returns self; any other
    /// existing binding makes the result bogus.
    pub fn bind(&self, var: &str, bound: Bound) -> Binding {
        match self.search(var) {
            Ok(i) => {
                if self.bindings[i].1 == bound {
                    Binding::Ok(self.clone())
                } else {
                    Binding::Bogus
                }
            }
            Err(i) => {
                let mut bindings = self.bindings.clone();
                bindings.insert(i, (var.to_string(), bound));
                Binding::Ok(Self::from_sorted(bindings))
            }
        }
    }

    /// Iterate bindings in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bound)> {
        self.bindings.iter().map(|(v, b)| (v.as_str(), b))
    }

    fn search(&self, var: &str) -> Result<usize, usize> {
        self.bindings
            .binary_search_by(|(v, _)| v.as_str().cmp(var))
    }
}

impl PartialEq for Subst {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.bindings == other.bindings
    }
}

impl Eq for Subst {}

impl Hash for Subst {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for Subst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, bound)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var} -> {bound}")?;
        }
        write!(f, "}}")
    }
}

/// The result of a bind: a consistent substitution, or the absorbing bogus
/// sentinel for an inconsistent one.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Binding {
    /// A consistent (possibly extended) substitution.
    Ok(Subst),
    /// Inconsistent. Absorbs all further binds.
    Bogus,
}

impl Binding {
    /// Chain another bind; bogus stays bogus.
    pub fn bind(self, var: &str, bound: Bound) -> Binding {
        match self {
            Binding::Ok(s) => s.bind(var, bound),
            Binding::Bogus => Binding::Bogus,
        }
    }

    /// Whether this is the bogus sentinel.
    pub fn is_bogus(&self) -> bool {
        matches!(self, Binding::Bogus)
    }

    /// The consistent substitution, panicking on bogus. Test convenience;
    /// engine code matches on the variant instead.
    pub fn unwrap(self) -> Subst {
        match self {
            Binding::Ok(s) => s,
            Binding::Bogus => panic!("bogus substitution"),
        }
    }
}

/// A deduplicating set of substitutions.
///
/// Adding a bogus binding is a no-op. Iteration preserves insertion order,
/// which keeps e-matching deterministic for a fixed term insertion order.
#[derive(Clone, Debug, Default)]
pub struct SubstSet {
    substs: IndexSet<Subst, FxBuildHasher>,
}

impl SubstSet {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The set containing only the empty substitution: the seed for query
    /// evaluation.
    pub fn seed() -> Self {
        let mut set = Self::new();
        set.add(Binding::Ok(Subst::empty()));
        set
    }

    /// Insert a binding, discarding bogus ones.
    pub fn add(&mut self, binding: Binding) {
        if let Binding::Ok(s) = binding {
            self.substs.insert(s);
        }
    }

    /// Number of distinct substitutions.
    pub fn len(&self) -> usize {
        self.substs.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.substs.is_empty()
    }

    /// Whether `s` is in the set.
    pub fn contains(&self, s: &Subst) -> bool {
        self.substs.contains(s)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Subst> {
        self.substs.iter()
    }
}
