//! Actions: the constructive side of rules.
//!
//! An action runs once per substitution the query produced. Action
//! expressions evaluate to eclass ids, inserting atoms and e-nodes as
//! needed, so a merge can equate a matched class with a freshly built term.

use crate::expr::Value;
use core::fmt;
use std::collections::BTreeSet;

/// An expression on the action side; evaluates to an eclass id under a
/// substitution.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ActionExpr {
    /// A literal, interned into the atom map if absent.
    Atom(Value),
    /// A pattern variable; must be bound by the rule's query.
    Var(String),
    /// An application; the operator's app table is created on first use.
    App {
        /// Operator name.
        op: String,
        /// Argument expressions.
        args: Vec<ActionExpr>,
    },
}

impl ActionExpr {
    /// A literal.
    pub fn atom(value: impl Into<Value>) -> ActionExpr {
        ActionExpr::Atom(value.into())
    }

    /// A pattern variable.
    pub fn var(name: impl Into<String>) -> ActionExpr {
        ActionExpr::Var(name.into())
    }

    /// An application of `op` to `args`.
    pub fn app(op: impl Into<String>, args: Vec<ActionExpr>) -> ActionExpr {
        ActionExpr::App {
            op: op.into(),
            args,
        }
    }

    /// Collect the pattern variables this expression mentions.
    pub fn pvars(&self, out: &mut BTreeSet<String>) {
        match self {
            ActionExpr::Atom(_) => {}
            ActionExpr::Var(v) => {
                out.insert(v.clone());
            }
            ActionExpr::App { args, .. } => {
                for arg in args {
                    arg.pvars(out);
                }
            }
        }
    }
}

impl fmt::Display for ActionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionExpr::Atom(v) => write!(f, "{v}"),
            ActionExpr::Var(v) => write!(f, "{v}"),
            ActionExpr::App { op, args } => {
                write!(f, "({op}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Right-hand side of a [`Action::SetFun`]: where the written value comes
/// from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FunRhs {
    /// A pattern variable bound to an analysis value by the query.
    Var(String),
    /// A literal value.
    Literal(Value),
}

impl FunRhs {
    /// A pattern variable.
    pub fn var(name: impl Into<String>) -> FunRhs {
        FunRhs::Var(name.into())
    }

    /// A literal value.
    pub fn literal(value: impl Into<Value>) -> FunRhs {
        FunRhs::Literal(value.into())
    }
}

impl fmt::Display for FunRhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunRhs::Var(v) => write!(f, "{v}"),
            FunRhs::Literal(v) => write!(f, "{v}"),
        }
    }
}

/// An action tree, executed under each substitution of a rule's query.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Action {
    /// No effect.
    Nop,
    /// Execute both actions in order.
    Seq(Box<Action>, Box<Action>),
    /// Evaluate both sides and union their classes.
    Merge(ActionExpr, ActionExpr),
    /// Write an entry into a pre-registered fun table.
    SetFun {
        /// Function symbol; its fun table must exist.
        fun: String,
        /// Argument expressions keying the entry.
        args: Vec<ActionExpr>,
        /// The value to write, joined with any existing entry.
        rhs: FunRhs,
    },
}

impl Action {
    /// A sequence of two actions.
    pub fn seq(a1: Action, a2: Action) -> Action {
        Action::Seq(Box::new(a1), Box::new(a2))
    }

    /// A merge of two action expressions.
    pub fn merge(l: ActionExpr, r: ActionExpr) -> Action {
        Action::Merge(l, r)
    }

    /// A fun-table write.
    pub fn set_fun(fun: impl Into<String>, args: Vec<ActionExpr>, rhs: FunRhs) -> Action {
        Action::SetFun {
            fun: fun.into(),
            args,
            rhs,
        }
    }

    /// All pattern variables the action mentions.
    pub fn pvars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_pvars(&mut out);
        out
    }

    fn collect_pvars(&self, out: &mut BTreeSet<String>) {
        match self {
            Action::Nop => {}
            Action::Seq(a1, a2) => {
                a1.collect_pvars(out);
                a2.collect_pvars(out);
            }
            Action::Merge(l, r) => {
                l.pvars(out);
                r.pvars(out);
            }
            Action::SetFun { args, rhs, .. } => {
                for arg in args {
                    arg.pvars(out);
                }
                if let FunRhs::Var(v) = rhs {
                    out.insert(v.clone());
                }
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Nop => write!(f, "nop"),
            Action::Seq(a1, a2) => write!(f, "{a1}; {a2}"),
            Action::Merge(l, r) => write!(f, "{l} = {r}"),
            Action::SetFun { fun, args, rhs } => {
                write!(f, "({fun}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ") = {rhs}")
            }
        }
    }
}
