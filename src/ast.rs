//! Expression tree for filter predicates and pipe stages.
//!
//! Trees are immutable once parsed and hold no reference to any image, so a
//! single [`CompiledFilter`] can be shared across threads and evaluated
//! against any number of records concurrently.

use crate::functions::Function;
use crate::sort::SortDirection;
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// `<`, `<=`, `>`, `>=` need ordered operands; `==` and `!=` don't.
    pub fn is_ordering(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    /// Apply the operator to the outcome of comparing two operands.
    ///
    /// `None` means the operands are unordered (NaN): only `!=` holds.
    pub fn test(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (CompareOp::Ne, None) => true,
            (_, None) => false,
            (CompareOp::Eq, Some(o)) => o == Ordering::Equal,
            (CompareOp::Ne, Some(o)) => o != Ordering::Equal,
            (CompareOp::Lt, Some(o)) => o == Ordering::Less,
            (CompareOp::Le, Some(o)) => o != Ordering::Greater,
            (CompareOp::Gt, Some(o)) => o == Ordering::Greater,
            (CompareOp::Ge, Some(o)) => o != Ordering::Less,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        })
    }
}

/// A predicate expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Value),
    /// Dotted property path, split into segments.
    Property(Vec<String>),
    /// Call into the fixed function table. Arity was checked by the parser.
    Call {
        function: Function,
        args: Vec<Node>,
    },
    Not(Box<Node>),
    Compare {
        op: CompareOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// The `all` keyword: matches every image.
    All,
}

/// A `| sort` or `| limit` stage, applied in the order written.
#[derive(Debug, Clone, PartialEq)]
pub enum PipeStage {
    Sort {
        field: Vec<String>,
        direction: SortDirection,
    },
    Limit(usize),
}

/// A parsed filter: the predicate and the pipe stages that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub predicate: Node,
    pub pipeline: Vec<PipeStage>,
}

impl Node {
    /// Visit every property path in the tree, depth first.
    pub fn for_each_property<'a>(&'a self, visit: &mut impl FnMut(&'a [String])) {
        match self {
            Node::Property(path) => visit(path.as_slice()),
            Node::Call { args, .. } => {
                for arg in args {
                    arg.for_each_property(&mut *visit);
                }
            }
            Node::Not(inner) => inner.for_each_property(visit),
            Node::Compare { left, right, .. } | Node::Logical { left, right, .. } => {
                left.for_each_property(&mut *visit);
                right.for_each_property(visit);
            }
            Node::Literal(_) | Node::All => {}
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(v) => write!(f, "{v}"),
            Node::Property(path) => f.write_str(&path.join(".")),
            Node::Call { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            // `not` binds tighter than comparison; logical nodes already print parens
            Node::Not(inner) if matches!(**inner, Node::Compare { .. }) => {
                write!(f, "not ({inner})")
            }
            Node::Not(inner) => write!(f, "not {inner}"),
            Node::Compare { op, left, right } => write!(f, "{left} {op} {right}"),
            Node::Logical { op, left, right } => write!(f, "({left} {op} {right})"),
            Node::All => f.write_str("all"),
        }
    }
}
