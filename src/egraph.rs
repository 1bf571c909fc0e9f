//! The e-graph: term insertion, e-matching, action execution, rule driving,
//! and the rebuild fixed point.

use crate::action::{Action, ActionExpr, FunRhs};
use crate::error::Error;
use crate::expr::{Expr, Value};
use crate::pattern::{Pattern, Query};
use crate::rule::Rule;
use crate::subst::{Binding, Bound, Subst, SubstSet};
use crate::table::{AppTab, FunTab, IdTuple};
use crate::unionfind::UnionFind;
use crate::{trace, Id};
use core::fmt;
use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use log::debug;
use smallvec::SmallVec;

/// Counters recorded while building and rewriting an e-graph. All counters
/// are monotone; they exist for logging and tests, not for control flow.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    /// Atom literals interned.
    pub atoms_created: u64,
    /// App-table rows created by insertion or action evaluation.
    pub enodes_created: u64,
    /// Unions that actually merged two classes.
    pub unions: u64,
    /// Rules run.
    pub rules_run: u64,
    /// Substitutions an action has been applied under.
    pub substs_applied: u64,
    /// Fun-table writes.
    pub fun_sets: u64,
    /// Inner passes across all rebuilds.
    pub rebuild_passes: u64,
}

/// An e-graph: a union-find over class ids plus the relational tables that
/// define the terms in each class.
///
/// Atoms have no children and can never violate functional dependency, so
/// they live in a single map rather than per-operator tables; their cached
/// ids still go stale after unions and are re-canonicalized on rebuild.
pub struct EGraph {
    uf: UnionFind,
    atoms: IndexMap<Value, Id, FxBuildHasher>,
    app_tabs: IndexMap<String, AppTab, FxBuildHasher>,
    fun_tabs: IndexMap<String, FunTab, FxBuildHasher>,
    /// Counters; see [`Stats`].
    pub stats: Stats,
}

impl Default for EGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl EGraph {
    /// An empty e-graph.
    pub fn new() -> Self {
        Self {
            uf: UnionFind::new(),
            atoms: IndexMap::default(),
            app_tabs: IndexMap::default(),
            fun_tabs: IndexMap::default(),
            stats: Stats::default(),
        }
    }

    // -------- term insertion --------

    /// Intern `value` as an atom, allocating a class on first sight.
    fn atom_class(&mut self, value: &Value) -> Id {
        if let Some(&id) = self.atoms.get(value) {
            return id;
        }
        let id = self.uf.mkset();
        self.atoms.insert(value.clone(), id);
        self.stats.atoms_created += 1;
        trace!("atom {} -> {}", value, id);
        id
    }

    /// The class of the e-node `(op ids…)`, creating the operator's table
    /// and a fresh class as needed.
    pub fn add_enode(&mut self, op: &str, ids: &[Id]) -> Id {
        let tab = self.app_tabs.entry(op.to_string()).or_default();
        let before = tab.len();
        let id = tab.get(&mut self.uf, ids);
        if tab.len() > before {
            self.stats.enodes_created += 1;
            trace!("enode ({} {:?}) -> {}", op, ids, id);
        }
        id
    }

    /// Insert a ground term, returning its class.
    pub fn add_expr(&mut self, e: &Expr) -> Id {
        match e {
            Expr::Atom(v) => self.atom_class(v),
            Expr::App { op, args } => {
                let ids: IdTuple = args.iter().map(|a| self.add_expr(a)).collect();
                self.add_enode(op, &ids)
            }
        }
    }

    // -------- lookup --------

    /// The class cached for an atom literal, if it has been interned.
    pub fn atom_id(&self, value: &Value) -> Option<Id> {
        self.atoms.get(value).copied()
    }

    /// The class a term is stored under, without inserting anything.
    ///
    /// Table keys are canonical as of the last rebuild, so this is meant for
    /// inspection after rebuilding.
    pub fn lookup_expr(&self, e: &Expr) -> Option<Id> {
        match e {
            Expr::Atom(v) => self.atom_id(v),
            Expr::App { op, args } => {
                let tab = self.app_tabs.get(op)?;
                let ids = args
                    .iter()
                    .map(|a| self.lookup_expr(a))
                    .collect::<Option<IdTuple>>()?;
                tab.lookup(&ids)
            }
        }
    }

    /// The app table for `op`, if any.
    pub fn app_tab(&self, op: &str) -> Option<&AppTab> {
        self.app_tabs.get(op)
    }

    /// The fun table for `fun`, if any.
    pub fn fun_tab(&self, fun: &str) -> Option<&FunTab> {
        self.fun_tabs.get(fun)
    }

    // -------- union-find surface --------

    /// The canonical id of `id`'s class.
    pub fn find(&mut self, id: Id) -> Id {
        self.uf.find(id)
    }

    /// Whether two ids name the same class.
    pub fn equiv(&mut self, a: Id, b: Id) -> bool {
        self.uf.equiv(a, b)
    }

    /// Merge two classes, returning the winning leader.
    pub fn union(&mut self, a: Id, b: Id) -> Id {
        let la = self.uf.find(a);
        let lb = self.uf.find(b);
        if la != lb {
            self.stats.unions += 1;
        }
        self.uf.union(la, lb)
    }

    /// Number of ids allocated so far (aliased ids included).
    pub fn num_ids(&self) -> usize {
        self.uf.len()
    }

    // -------- analyses --------

    /// Register a fun table for `name` with the given lattice join.
    ///
    /// Fun tables are explicit: writing to an unregistered function is an
    /// error, while app tables appear on first use.
    pub fn add_fun(
        &mut self,
        name: impl Into<String>,
        repair: impl Fn(&Value, &Value) -> Value + 'static,
    ) {
        self.fun_tabs.insert(name.into(), FunTab::new(Box::new(repair)));
    }

    /// Write an analysis value, joining with any existing entry.
    pub fn set_fun(&mut self, fun: &str, ids: &[Id], val: Value) -> Result<(), Error> {
        let tab = self
            .fun_tabs
            .get_mut(fun)
            .ok_or_else(|| Error::NoSuchFun(fun.to_string()))?;
        tab.set(ids, val);
        self.stats.fun_sets += 1;
        Ok(())
    }

    /// The analysis value stored for `fun` at `ids`.
    pub fn fun_value(&self, fun: &str, ids: &[Id]) -> Result<&Value, Error> {
        let tab = self
            .fun_tabs
            .get(fun)
            .ok_or_else(|| Error::NoSuchFun(fun.to_string()))?;
        tab.get(ids).ok_or_else(|| Error::NoFunEntry {
            fun: fun.to_string(),
            ids: ids.to_vec(),
        })
    }

    /// Insert the argument terms, then read the `fun` entry they key.
    pub fn eval_fun(&mut self, fun: &str, args: &[Expr]) -> Result<Value, Error> {
        let ids: IdTuple = args.iter().map(|a| self.add_expr(a)).collect();
        self.fun_value(fun, &ids).cloned()
    }

    // -------- e-matching --------

    /// All substitutions that satisfy every pattern of `q`.
    ///
    /// This is the naive nested-loop join: each pattern refines the incoming
    /// substitution set against every row of its table. Quadratic, but the
    /// contract is only the resulting set, so a smarter join can replace it
    /// without touching callers.
    pub fn query(&self, q: &Query) -> Result<SubstSet, Error> {
        let mut substs = SubstSet::seed();
        for pat in q.patterns() {
            substs = self.matches(&substs, pat)?;
        }
        Ok(substs)
    }

    /// Refine `substs` by one pattern.
    fn matches(&self, substs: &SubstSet, pat: &Pattern) -> Result<SubstSet, Error> {
        let mut out = SubstSet::new();
        match pat {
            Pattern::Atom { atom, vres } => {
                // No matches if the literal was never interned.
                let Some(&id) = self.atoms.get(atom) else {
                    return Ok(out);
                };
                for s in substs.iter() {
                    out.add(s.bind(vres, Bound::Class(id)));
                }
            }
            Pattern::App { op, vargs, vres } => {
                // A symbol may name an app table or a fun table; app tables
                // take precedence. Unknown symbols match nothing.
                if let Some(tab) = self.app_tabs.get(op) {
                    for s in substs.iter() {
                        for (ids, id) in tab.iter() {
                            out.add(match_row(op, vargs, vres, s, ids, Bound::Class(id))?);
                        }
                    }
                } else if let Some(tab) = self.fun_tabs.get(op) {
                    for s in substs.iter() {
                        for (ids, val) in tab.iter() {
                            out.add(match_row(
                                op,
                                vargs,
                                vres,
                                s,
                                ids,
                                Bound::Value(val.clone()),
                            )?);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    // -------- action execution --------

    /// Evaluate an action expression to a class under `s`. May insert atoms
    /// and e-nodes, allocating fresh classes.
    fn action_class(&mut self, ae: &ActionExpr, s: &Subst) -> Result<Id, Error> {
        match ae {
            ActionExpr::Atom(v) => Ok(self.atom_class(v)),
            ActionExpr::Var(v) => match s.get(v) {
                Some(&Bound::Class(id)) => Ok(id),
                Some(Bound::Value(_)) => Err(Error::NotAClass(v.clone())),
                None => Err(Error::UnboundVar(v.clone())),
            },
            ActionExpr::App { op, args } => {
                let ids = args
                    .iter()
                    .map(|a| self.action_class(a, s))
                    .collect::<Result<IdTuple, _>>()?;
                Ok(self.add_enode(op, &ids))
            }
        }
    }

    /// Execute `action` under the substitution `s`.
    pub fn apply(&mut self, action: &Action, s: &Subst) -> Result<(), Error> {
        match action {
            Action::Nop => Ok(()),
            Action::Seq(a1, a2) => {
                self.apply(a1, s)?;
                self.apply(a2, s)
            }
            Action::Merge(l, r) => {
                let lid = self.action_class(l, s)?;
                let rid = self.action_class(r, s)?;
                self.union(lid, rid);
                Ok(())
            }
            Action::SetFun { fun, args, rhs } => {
                let ids = args
                    .iter()
                    .map(|a| self.action_class(a, s))
                    .collect::<Result<IdTuple, _>>()?;
                let val = match rhs {
                    FunRhs::Literal(v) => v.clone(),
                    FunRhs::Var(v) => match s.get(v) {
                        Some(Bound::Value(val)) => val.clone(),
                        Some(Bound::Class(_)) => return Err(Error::NotAValue(v.clone())),
                        None => return Err(Error::UnboundVar(v.clone())),
                    },
                };
                self.set_fun(fun, &ids, val)
            }
        }
    }

    // -------- rules --------

    /// Run one rule: materialize the substitutions, then apply the action
    /// under each. The snapshot keeps e-nodes inserted by the action from
    /// matching within the same application.
    pub fn run_rule(&mut self, rule: &Rule) -> Result<(), Error> {
        let substs = self.query(rule.query())?;
        debug!(
            "rule [{}] fired under {} substitution(s)",
            rule.action(),
            substs.len()
        );
        self.stats.rules_run += 1;
        for s in substs.iter() {
            trace!("apply {} under {}", rule.action(), s);
            self.apply(rule.action(), s)?;
            self.stats.substs_applied += 1;
        }
        Ok(())
    }

    /// Run rules in list order.
    pub fn run_rules(&mut self, rules: &[Rule]) -> Result<(), Error> {
        for rule in rules {
            self.run_rule(rule)?;
        }
        Ok(())
    }

    // -------- rebuild --------

    fn is_dirty(&self) -> bool {
        self.uf.is_dirty() || self.fun_tabs.values().any(|t| t.is_dirty())
    }

    fn clear_dirty(&mut self) {
        self.uf.clear_dirty();
        for tab in self.fun_tabs.values_mut() {
            tab.clear_dirty();
        }
    }

    /// Restore canonicity, congruence closure, and lattice consistency
    /// after a batch of merges.
    ///
    /// Each pass canonicalizes the atom map and re-inserts every table row;
    /// re-insertion can union further classes or join further values, so
    /// passes repeat until one performs no union and changes no value.
    /// Termination: classes only ever merge and there are finitely many, and
    /// the analysis lattices are assumed to have finite ascending chains.
    pub fn rebuild(&mut self) {
        loop {
            self.clear_dirty();
            self.stats.rebuild_passes += 1;

            // Atoms cannot collide, but their cached ids go stale.
            for id in self.atoms.values_mut() {
                *id = self.uf.find(*id);
            }

            for tab in self.app_tabs.values_mut() {
                tab.rebuild(&mut self.uf);
            }

            for tab in self.fun_tabs.values_mut() {
                tab.rebuild(&mut self.uf);
            }

            if !self.is_dirty() {
                break;
            }
            debug!("rebuild: changes detected, running another pass");
        }
    }
}

/// Extend `s` with the bindings for one table row.
fn match_row(
    op: &str,
    vargs: &[String],
    vres: &str,
    s: &Subst,
    ids: &[Id],
    res: Bound,
) -> Result<Binding, Error> {
    if vargs.len() != ids.len() {
        return Err(Error::ArityMismatch {
            op: op.to_string(),
            pattern: vargs.len(),
            table: ids.len(),
        });
    }
    let mut b = Binding::Ok(s.clone());
    for (v, &id) in vargs.iter().zip(ids) {
        b = b.bind(v, Bound::Class(id));
    }
    Ok(b.bind(vres, res))
}

impl fmt::Display for EGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_rows(f: &mut fmt::Formatter<'_>, mut rows: Vec<(IdTuple, String)>) -> fmt::Result {
            rows.sort();
            for (ids, res) in rows {
                for id in &ids {
                    write!(f, "{id}\t")?;
                }
                writeln!(f, "->\t{res}")?;
            }
            Ok(())
        }

        writeln!(f, "===== ATOMS =====")?;
        let mut atoms: Vec<(String, Id)> = self
            .atoms
            .iter()
            .map(|(v, &id)| (v.to_string(), id))
            .collect();
        atoms.sort();
        for (value, id) in atoms {
            writeln!(f, "{value}\t->\t{id}")?;
        }

        writeln!(f)?;
        writeln!(f, "===== APP TABLES =====")?;
        for (op, tab) in &self.app_tabs {
            writeln!(f)?;
            writeln!(f, "{op}")?;
            let rows = tab
                .iter()
                .map(|(ids, id)| (SmallVec::from_slice(ids), id.to_string()))
                .collect();
            write_rows(f, rows)?;
        }

        writeln!(f)?;
        writeln!(f, "===== FUN TABLES =====")?;
        for (fun, tab) in &self.fun_tabs {
            writeln!(f)?;
            writeln!(f, "{fun}")?;
            let rows = tab
                .iter()
                .map(|(ids, val)| (SmallVec::from_slice(ids), val.to_string()))
                .collect();
            write_rows(f, rows)?;
        }

        Ok(())
    }
}
