//! Errors surfaced by the engine.
//!
//! Inconsistent bindings during e-matching are deliberately *not* errors:
//! they collapse to [`Binding::Bogus`](crate::subst::Binding) and are
//! filtered out by the substitution set. Everything here is a programmer
//! error in a rule or an analysis and is reported to the caller.

use crate::Id;

/// The error type for rule construction, e-matching, and action execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An application pattern's variable count disagrees with the arity of
    /// the rows in the table it matched against.
    #[error("arity mismatch for `{op}`: pattern binds {pattern} arguments, table rows have {table}")]
    ArityMismatch {
        /// Operator or function symbol of the pattern.
        op: String,
        /// Number of argument variables in the pattern.
        pattern: usize,
        /// Arity of the table's rows.
        table: usize,
    },

    /// An action referenced a pattern variable absent from the substitution.
    #[error("pattern variable `{0}` is unbound")]
    UnboundVar(String),

    /// An action needed an eclass but the variable is bound to an analysis
    /// value (it matched a fun table row).
    #[error("pattern variable `{0}` is bound to an analysis value, not an eclass")]
    NotAClass(String),

    /// A `SetFun` right-hand side needed an analysis value but the variable
    /// is bound to an eclass.
    #[error("pattern variable `{0}` is bound to an eclass, not an analysis value")]
    NotAValue(String),

    /// A function symbol was used without registering its fun table first.
    /// Fun tables are explicit; app tables appear on first use.
    #[error("no function table registered for `{0}`")]
    NoSuchFun(String),

    /// A fun table read found no entry for the argument tuple.
    #[error("no entry in function table `{fun}` for {ids:?}")]
    NoFunEntry {
        /// Function symbol.
        fun: String,
        /// The argument tuple that was looked up.
        ids: Vec<Id>,
    },

    /// A rule's action mentions pattern variables its query never binds.
    #[error("action uses pattern variables the query never binds: {missing:?}")]
    RuleVars {
        /// The offending variables, sorted.
        missing: Vec<String>,
    },
}
