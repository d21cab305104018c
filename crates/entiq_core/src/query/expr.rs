//! Query condition expressions.

use std::fmt;

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    /// `=`.
    Eq,
    /// `<>`.
    Neq,
    /// `<`.
    Lt,
    /// `>`.
    Gt,
    /// `<=`.
    Lte,
    /// `>=`.
    Gte,
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::Neq => "<>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Lte => "<=",
            Self::Gte => ">=",
        };
        write!(f, "{symbol}")
    }
}

/// Compiled WHERE-clause expression tree.
///
/// Leaves reference properties and positional placeholders as text; the
/// tree only models the boolean structure, which is what rendering needs
/// to parenthesize correctly.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `lhs <op> rhs`.
    Comparison {
        /// Left-hand side, a property reference or function call.
        lhs: String,
        /// The operator.
        op: CompOp,
        /// Right-hand side, a placeholder or literal.
        rhs: String,
    },
    /// `property IS NULL`.
    IsNull(String),
    /// `property IS NOT NULL`.
    IsNotNull(String),
    /// `property LIKE placeholder`.
    Like {
        /// The property reference.
        property: String,
        /// The bound pattern placeholder.
        placeholder: String,
    },
    /// `property IN (placeholder)`.
    In {
        /// The property reference.
        property: String,
        /// The bound values placeholder.
        placeholder: String,
    },
    /// `NOT(inner)`.
    Not(Box<Expr>),
    /// `left AND right`.
    And(Box<Expr>, Box<Expr>),
    /// `left OR right`.
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Builds a comparison.
    pub fn comparison(lhs: impl Into<String>, op: CompOp, rhs: impl Into<String>) -> Self {
        Self::Comparison {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
        }
    }

    /// Builds an equality comparison.
    pub fn eq(lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        Self::comparison(lhs, CompOp::Eq, rhs)
    }

    /// Builds a `LIKE` test.
    pub fn like(property: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self::Like {
            property: property.into(),
            placeholder: placeholder.into(),
        }
    }

    /// Builds an `IN` membership test.
    pub fn in_values(property: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self::In {
            property: property.into(),
            placeholder: placeholder.into(),
        }
    }

    /// Wraps in a negation.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Conjunction.
    #[must_use]
    pub fn and(self, other: Expr) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Disjunction.
    #[must_use]
    pub fn or(self, other: Expr) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    fn is_composite(&self) -> bool {
        matches!(self, Self::And(..) | Self::Or(..))
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_composite() {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison { lhs, op, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Self::IsNull(property) => write!(f, "{property} IS NULL"),
            Self::IsNotNull(property) => write!(f, "{property} IS NOT NULL"),
            Self::Like {
                property,
                placeholder,
            } => write!(f, "{property} LIKE {placeholder}"),
            Self::In {
                property,
                placeholder,
            } => write!(f, "{property} IN ({placeholder})"),
            Self::Not(inner) => write!(f, "NOT({inner})"),
            Self::And(left, right) => {
                left.fmt_operand(f)?;
                write!(f, " AND ")?;
                right.fmt_operand(f)
            }
            Self::Or(left, right) => {
                left.fmt_operand(f)?;
                write!(f, " OR ")?;
                right.fmt_operand(f)
            }
        }
    }
}
