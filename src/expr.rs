//! Ground terms and the literal value domain.

use core::fmt;

/// A bit-exact floating point literal.
///
/// Stored as raw bits so that [`Value`] has total equality and hashing:
/// distinct NaN payloads are distinct literals, and `-0.0` and `0.0` are
/// distinct literals.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Float(u64);

impl Float {
    /// Create a `Float` from an `f64`.
    pub fn with_f64(x: f64) -> Self {
        Self(x.to_bits())
    }

    /// The wrapped `f64` value.
    pub fn as_f64(self) -> f64 {
        f64::from_bits(self.0)
    }

    /// The raw bit pattern.
    pub fn bits(self) -> u64 {
        self.0
    }
}

impl From<f64> for Float {
    fn from(x: f64) -> Self {
        Self::with_f64(x)
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_f64())
    }
}

impl fmt::Debug for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An atom literal.
///
/// The same domain doubles as the analysis-value domain of fun tables, so a
/// `SetFun` action can write any literal the surface syntax can produce.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Value {
    /// A signed integer literal.
    Int(i64),
    /// A floating point literal.
    Float(Float),
    /// A symbolic name.
    Sym(String),
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Int(x)
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Value::Int(x.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(Float::with_f64(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Sym(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Sym(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Sym(s) => write!(f, "{s}"),
        }
    }
}

/// A ground term: an atom leaf or an operator applied to subterms.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Expr {
    /// A literal leaf.
    Atom(Value),
    /// An operator application.
    App {
        /// Operator name.
        op: String,
        /// Argument subterms.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// An atom leaf.
    pub fn atom(value: impl Into<Value>) -> Expr {
        Expr::Atom(value.into())
    }

    /// An application of `op` to `args`.
    pub fn app(op: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::App {
            op: op.into(),
            args,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Atom(v) => write!(f, "{v}"),
            Expr::App { op, args } => {
                write!(f, "({op}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}
