//! E-node tables.
//!
//! A table records how one operator maps classes of arguments to a result.
//! App tables map argument tuples to a result class and keep the mapping
//! functional by unioning colliding results; that is where congruence
//! closure comes from. Fun tables map argument tuples to analysis values and
//! keep the mapping functional through a user-supplied lattice join. Unions
//! performed elsewhere silently invalidate a table's keys, so rebuilding
//! re-canonicalizes every row and re-inserts it, letting collisions union or
//! join again.
//!
//! Tables do not hold a reference to the union-find; the single `UnionFind`
//! is owned by the e-graph and passed in explicitly where an operation needs
//! it.

use crate::expr::Value;
use crate::unionfind::UnionFind;
use crate::{trace, Id};
use core::fmt;
use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use smallvec::SmallVec;

/// The argument tuple of a table row. Inline up to four arguments; operator
/// arities beyond that spill to the heap.
pub type IdTuple = SmallVec<[Id; 4]>;

type Rows<V> = IndexMap<IdTuple, V, FxBuildHasher>;

/// A per-operator e-node table: argument tuple → result class.
#[derive(Clone, Debug, Default)]
pub struct AppTab {
    rows: Rows<Id>,
}

impl AppTab {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[Id], Id)> {
        self.rows.iter().map(|(ids, &id)| (ids.as_slice(), id))
    }

    /// The result class stored for `ids`, if any. Does not allocate.
    pub fn lookup(&self, ids: &[Id]) -> Option<Id> {
        self.rows.get(ids).copied()
    }

    /// The result class for `ids`, allocating a fresh class on first use.
    pub fn get(&mut self, uf: &mut UnionFind, ids: &[Id]) -> Id {
        self.debug_assert_arity(ids);
        if let Some(&id) = self.rows.get(ids) {
            return id;
        }
        let id = uf.mkset();
        self.rows.insert(SmallVec::from_slice(ids), id);
        id
    }

    /// Point `ids` at `id`, unioning with any existing result to restore
    /// functional dependency. Returns the winning class.
    pub fn set(&mut self, uf: &mut UnionFind, ids: &[Id], id: Id) -> Id {
        self.debug_assert_arity(ids);
        let id = match self.rows.get(ids) {
            // The union sets the union-find's dirty bit if the two results
            // were distinct classes.
            Some(&old) => uf.union(old, id),
            None => id,
        };
        self.rows.insert(SmallVec::from_slice(ids), id);
        id
    }

    /// One canonicalization pass: re-insert every row under canonical ids.
    /// Keys that collide union their results, dirtying the union-find and
    /// driving another outer rebuild pass.
    pub fn rebuild(&mut self, uf: &mut UnionFind) {
        let old = std::mem::take(&mut self.rows);
        for (ids, id) in old {
            let ids: IdTuple = ids.iter().map(|&i| uf.find(i)).collect();
            let id = uf.find(id);
            self.set(uf, &ids, id);
        }
    }

    fn debug_assert_arity(&self, ids: &[Id]) {
        // Arity is fixed by the first row.
        if let Some((first, _)) = self.rows.first() {
            debug_assert_eq!(first.len(), ids.len(), "operator arity is fixed by first use");
        }
    }
}

/// A per-function analysis table: argument tuple → lattice value.
///
/// The `repair` join must be commutative, associative, and idempotent, and
/// the lattice must have finite ascending chains; a join that keeps
/// producing new values makes rebuild diverge.
pub struct FunTab {
    repair: Box<dyn Fn(&Value, &Value) -> Value>,
    dirty: bool,
    rows: Rows<Value>,
}

impl FunTab {
    /// An empty table with the given join.
    pub fn new(repair: Box<dyn Fn(&Value, &Value) -> Value>) -> Self {
        Self {
            repair,
            dirty: false,
            rows: Rows::default(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[Id], &Value)> {
        self.rows.iter().map(|(ids, val)| (ids.as_slice(), val))
    }

    /// The value stored for `ids`, if any. There is no implicit creation;
    /// the caller decides whether absence is fatal.
    pub fn get(&self, ids: &[Id]) -> Option<&Value> {
        self.rows.get(ids)
    }

    /// Write `val` for `ids`, joining with any existing value. The table is
    /// marked dirty only when the stored value actually changes; fresh
    /// entries and joins that land on the old value leave it alone.
    pub fn set(&mut self, ids: &[Id], val: Value) {
        self.debug_assert_arity(ids);
        let val = match self.rows.get(ids) {
            Some(old) => {
                let joined = (self.repair)(old, &val);
                if joined != *old {
                    trace!("fun row {:?}: {} joins to {}", ids, old, joined);
                    self.dirty = true;
                }
                joined
            }
            None => val,
        };
        self.rows.insert(SmallVec::from_slice(ids), val);
    }

    /// One canonicalization pass: re-insert every row under canonical ids,
    /// routing key collisions through the join.
    pub fn rebuild(&mut self, uf: &mut UnionFind) {
        let old = std::mem::take(&mut self.rows);
        for (ids, val) in old {
            let ids: IdTuple = ids.iter().map(|&i| uf.find(i)).collect();
            self.set(&ids, val);
        }
    }

    /// Whether any stored value changed since
    /// [`clear_dirty`](Self::clear_dirty).
    ///
    /// Unlike unions, value changes are invisible to the union-find, so the
    /// rebuild fixed point needs this separate flag.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reset the dirty flag.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn debug_assert_arity(&self, ids: &[Id]) {
        if let Some((first, _)) = self.rows.first() {
            debug_assert_eq!(first.len(), ids.len(), "function arity is fixed by first use");
        }
    }
}

impl fmt::Debug for FunTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunTab")
            .field("dirty", &self.dirty)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(uf: &mut UnionFind, n: usize) -> Vec<Id> {
        (0..n).map(|_| uf.mkset()).collect()
    }

    #[test]
    fn get_allocates_one_class_per_tuple() {
        let mut uf = UnionFind::new();
        let xs = ids(&mut uf, 3);
        let mut tab = AppTab::new();
        let ec = tab.get(&mut uf, &xs);
        assert_eq!(ec, Id::from_index(3));
        assert_eq!(tab.lookup(&xs), Some(ec));
        // Same tuple, same class; no new allocation.
        assert_eq!(tab.get(&mut uf, &xs), ec);
        assert_eq!(uf.len(), 4);
    }

    #[test]
    fn set_restores_functional_dependency_by_union() {
        let mut uf = UnionFind::new();
        let xs = ids(&mut uf, 3);
        let mut tab = AppTab::new();
        let ec0 = tab.get(&mut uf, &xs);
        let other = uf.mkset();
        let winner = tab.set(&mut uf, &xs, other);
        assert_eq!(uf.find(ec0), uf.find(other));
        assert_eq!(tab.lookup(&xs), Some(winner));
    }

    #[test]
    fn rebuild_merges_congruent_rows() {
        let mut uf = UnionFind::new();
        let xs = ids(&mut uf, 4);
        let mut tab = AppTab::new();
        let ec0 = tab.get(&mut uf, &[xs[0], xs[1], xs[2]]);
        let ec1 = tab.get(&mut uf, &[xs[0], xs[1], xs[3]]);
        assert_ne!(uf.find(ec0), uf.find(ec1));

        // A merge outside this table makes the two keys congruent.
        uf.union(xs[2], xs[3]);
        tab.rebuild(&mut uf);

        assert_eq!(uf.find(ec0), uf.find(ec1));
        assert_eq!(tab.len(), 1);
    }

    fn min_join(a: &Value, b: &Value) -> Value {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => Value::Int(*x.min(y)),
            _ => a.clone(),
        }
    }

    #[test]
    fn fun_set_joins_and_tracks_dirt() {
        let mut uf = UnionFind::new();
        let xs = ids(&mut uf, 1);
        let mut tab = FunTab::new(Box::new(min_join));

        // Fresh entry: stored as-is, not dirty.
        tab.set(&xs, Value::Int(5));
        assert_eq!(tab.get(&xs), Some(&Value::Int(5)));
        assert!(!tab.is_dirty());

        // Joining downward changes the value and dirties the table.
        tab.set(&xs, Value::Int(3));
        assert_eq!(tab.get(&xs), Some(&Value::Int(3)));
        assert!(tab.is_dirty());

        // Joining with something above the current value is a no-op.
        tab.clear_dirty();
        tab.set(&xs, Value::Int(7));
        assert_eq!(tab.get(&xs), Some(&Value::Int(3)));
        assert!(!tab.is_dirty());
    }

    #[test]
    fn fun_rebuild_joins_colliding_keys() {
        let mut uf = UnionFind::new();
        let a = uf.mkset();
        let b = uf.mkset();
        let mut tab = FunTab::new(Box::new(min_join));
        tab.set(&[a], Value::Int(5));
        tab.set(&[b], Value::Int(3));

        uf.union(a, b);
        tab.rebuild(&mut uf);

        assert_eq!(tab.len(), 1);
        let canon = uf.find(a);
        assert_eq!(tab.get(&[canon]), Some(&Value::Int(3)));
        assert!(tab.is_dirty());
    }
}
