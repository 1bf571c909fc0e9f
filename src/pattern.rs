//! Query patterns.
//!
//! A pattern describes one relational constraint over the database: either
//! "this literal's class is `vres`" or "some row of `op`'s table has
//! arguments `vargs` and result `vres`". A [`Query`] is an ordered list of
//! patterns evaluated left to right; the substitutions that survive all of
//! them are the query's matches.

use crate::expr::Value;
use core::fmt;
use std::collections::BTreeSet;

/// One pattern of a query.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Pattern {
    /// Match a literal, binding its class to `vres`.
    Atom {
        /// The literal to look up.
        atom: Value,
        /// Variable bound to the literal's class.
        vres: String,
    },
    /// Match every row of `op`'s table (app or fun), binding each key id to
    /// the corresponding variable and the row's result to `vres`.
    App {
        /// Operator or function symbol.
        op: String,
        /// Variables bound to the row's argument ids, in order.
        vargs: Vec<String>,
        /// Variable bound to the row's result.
        vres: String,
    },
}

impl Pattern {
    /// An atom pattern `atom = vres`.
    pub fn atom(atom: impl Into<Value>, vres: impl Into<String>) -> Pattern {
        Pattern::Atom {
            atom: atom.into(),
            vres: vres.into(),
        }
    }

    /// An application pattern `(op vargs…) = vres`.
    pub fn app(op: impl Into<String>, vargs: &[&str], vres: impl Into<String>) -> Pattern {
        Pattern::App {
            op: op.into(),
            vargs: vargs.iter().map(|v| v.to_string()).collect(),
            vres: vres.into(),
        }
    }

    /// Collect the variables this pattern binds.
    pub fn pvars(&self, out: &mut BTreeSet<String>) {
        match self {
            Pattern::Atom { vres, .. } => {
                out.insert(vres.clone());
            }
            Pattern::App { vargs, vres, .. } => {
                out.extend(vargs.iter().cloned());
                out.insert(vres.clone());
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Atom { atom, vres } => write!(f, "{atom} = {vres}"),
            Pattern::App { op, vargs, vres } => {
                write!(f, "({op}")?;
                for v in vargs {
                    write!(f, " {v}")?;
                }
                write!(f, ") = {vres}")
            }
        }
    }
}

/// An ordered list of patterns: a conjunctive query over the tables.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Query {
    pats: Vec<Pattern>,
}

impl Query {
    /// A query over `pats`, evaluated in order.
    pub fn new(pats: Vec<Pattern>) -> Query {
        Query { pats }
    }

    /// The patterns, in evaluation order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.pats
    }

    /// All variables the query binds.
    pub fn pvars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for pat in &self.pats {
            pat.pvars(&mut out);
        }
        out
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pat) in self.pats.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{pat}")?;
        }
        Ok(())
    }
}
