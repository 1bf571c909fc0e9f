//! Union-find (disjoint sets) over eclass ids.
//!
//! The forest carries a dirty bit observed by the rebuild loop: any union
//! that actually merges two classes sets it, and rebuilding keeps
//! re-canonicalizing the tables until a whole pass performs no union.

use crate::{trace, Id};

/// A disjoint-set forest over densely allocated [`Id`]s, with write-back
/// path compression.
#[derive(Clone, Debug, Default)]
pub struct UnionFind {
    parent: Vec<Id>,
    dirty: bool,
}

impl UnionFind {
    /// Create an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty forest with space for `cap` ids.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            parent: Vec::with_capacity(cap),
            dirty: false,
        }
    }

    /// Number of ids allocated so far. This counts aliased ids too, so it is
    /// an upper bound on the number of classes.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether no ids have been allocated.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Allocate a fresh singleton class and return its id.
    pub fn mkset(&mut self) -> Id {
        let id = Id::from_index(self.parent.len());
        self.parent.push(id);
        id
    }

    /// The canonical (leader) id of `id`'s class.
    ///
    /// Compresses the visited path, so this is a mutating operation even
    /// though the partition it describes does not change.
    pub fn find(&mut self, id: Id) -> Id {
        // Leaders are the fixed points of the parent function.
        let mut leader = id;
        while self.parent[leader.index()] != leader {
            leader = self.parent[leader.index()];
        }

        // Second pass: point everything on the path straight at the root.
        let mut cur = id;
        while cur != leader {
            let next = self.parent[cur.index()];
            self.parent[cur.index()] = leader;
            cur = next;
        }

        leader
    }

    /// Whether `a` and `b` are in the same class.
    pub fn equiv(&mut self, a: Id, b: Id) -> bool {
        self.find(a) == self.find(b)
    }

    /// Merge the classes of `a` and `b`, returning the winning leader.
    ///
    /// The smaller-numbered leader wins, which keeps canonical ids stable
    /// across runs for a fixed insertion order.
    pub fn union(&mut self, a: Id, b: Id) -> Id {
        let la = self.find(a);
        let lb = self.find(b);

        if la == lb {
            return la;
        }

        // The rebuild loop watches this flag to decide whether the tables
        // need another canonicalization pass.
        self.dirty = true;

        let (winner, loser) = if la <= lb { (la, lb) } else { (lb, la) };
        self.parent[loser.index()] = winner;
        trace!("union: {} <- {}", winner, loser);
        winner
    }

    /// Whether any union merged two classes since the last
    /// [`clear_dirty`](Self::clear_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reset the dirty flag.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[cfg(test)]
    fn parent_of(&self, id: Id) -> Id {
        self.parent[id.index()]
    }
}
