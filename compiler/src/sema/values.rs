//! Compile-time values and the constant reducer seam
//!
//! Folding expression trees is not the resolver's job. It asks a
//! `ConstantReducer` for a value wherever the language requires a
//! compile-time constant (enum members, constant initializers, parameter
//! defaults, `require` paths) and stores the answer on the symbol or node.

use super::{NodeId, ScopeGraph, ScopeId, SymbolId};
use crate::ast::{Ast, ConstBinding, Literal, NodeKind};
use serde::Serialize;
use std::fmt;

/// Result of reducing an expression
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Not reducible at compile time
    Undefined,
    None,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(Vec<(Value, Value)>),
    Symbol(SymbolId),
    New { class: SymbolId, args: Vec<Value> },
}

impl Value {
    pub fn is_defined(&self) -> bool {
        !matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "<undefined>"),
            Value::None => write!(f, "none"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) | Value::Tuple(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => write!(f, "{{{} entries}}", entries.len()),
            Value::Symbol(id) => write!(f, "{}", id),
            Value::New { class, .. } => write!(f, "new {}", class),
        }
    }
}

/// Folds an expression subtree into a `Value`.
///
/// Called after the resolver has bound the names inside `node`, so
/// implementations may follow `Node::symbol` to constant variables.
pub trait ConstantReducer {
    fn reduce(
        &mut self,
        ast: &Ast,
        node: NodeId,
        graph: &ScopeGraph,
        scope: ScopeId,
        module: Option<ScopeId>,
    ) -> Value;
}

/// Reducer for literals, constant names, engine constants, unary minus
/// and string/int `+`/`~`. Anything else is `Undefined`.
#[derive(Debug, Default)]
pub struct LiteralReducer;

impl ConstantReducer for LiteralReducer {
    fn reduce(
        &mut self,
        ast: &Ast,
        node: NodeId,
        graph: &ScopeGraph,
        scope: ScopeId,
        module: Option<ScopeId>,
    ) -> Value {
        let current = ast.node(node);
        match &current.kind {
            NodeKind::Literal { value } => match value {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(x) => Value::Float(*x),
                Literal::Str(s) => Value::Str(s.clone()),
            },
            NodeKind::Name { .. } => current
                .symbol
                .map(|id| graph.symbol(id))
                .filter(|sym| sym.is_const())
                .and_then(|sym| sym.as_variable())
                .and_then(|var| var.value.clone())
                .unwrap_or(Value::Undefined),
            NodeKind::EngineConst { .. } => match &current.binding {
                Some(ConstBinding::Bound(value)) => value.clone(),
                _ => Value::Undefined,
            },
            NodeKind::Unary { op, operand } if op == "-" => {
                match self.reduce(ast, *operand, graph, scope, module) {
                    Value::Int(i) => i.checked_neg().map(Value::Int).unwrap_or(Value::Undefined),
                    Value::Float(x) => Value::Float(-x),
                    _ => Value::Undefined,
                }
            }
            NodeKind::Binary { op, lhs, rhs } if op == "+" || op == "~" => {
                let lhs = self.reduce(ast, *lhs, graph, scope, module);
                let rhs = self.reduce(ast, *rhs, graph, scope, module);
                match (op.as_str(), lhs, rhs) {
                    ("+", Value::Int(a), Value::Int(b)) => {
                        a.checked_add(b).map(Value::Int).unwrap_or(Value::Undefined)
                    }
                    (_, Value::Str(a), Value::Str(b)) => Value::Str(a + &b),
                    ("~", Value::Str(a), Value::Int(b)) => Value::Str(format!("{}{}", a, b)),
                    _ => Value::Undefined,
                }
            }
            _ => Value::Undefined,
        }
    }
}
