//! Syntax tree consumed by the resolution engine
//!
//! Nodes live in one arena per unit and point at their children by
//! `NodeId`. The passes annotate nodes in place through the attribute slots
//! on [`Node`]; those slots never appear in the serialized form.

pub mod builder;
pub mod nodes;

pub use builder::AstBuilder;
pub use nodes::*;

use crate::sema::imports::SourceHandle;
use crate::sema::values::Value;
use crate::sema::{NodeId, ScopeId, SymbolId};
use serde::{Deserialize, Serialize};
use source_map::{FileId, SourceSpan};

/// Value slot of an engine-constant node
#[derive(Debug, Clone, PartialEq)]
pub enum ConstBinding {
    Bound(Value),
    /// Copied into a class from a trait; bound by the late pass
    PendingClassContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub span: SourceSpan,

    /// Scope opened by this node
    #[serde(skip)]
    pub scope: Option<ScopeId>,
    /// Declared or referenced symbol
    #[serde(skip)]
    pub symbol: Option<SymbolId>,
    #[serde(skip)]
    pub binding: Option<ConstBinding>,
    /// Reduced value of a `require` path
    #[serde(skip)]
    pub value: Option<Value>,
    #[serde(skip)]
    pub import: Option<SourceHandle>,
}

impl Node {
    pub fn new(kind: NodeKind, span: SourceSpan) -> Self {
        Self {
            kind,
            span,
            scope: None,
            symbol: None,
            binding: None,
            value: None,
            import: None,
        }
    }
}

/// One compilation unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ast {
    /// Path of the unit as given to the driver
    pub file: String,
    #[serde(default)]
    pub source: Option<String>,
    pub nodes: Vec<Node>,
    pub root: NodeId,
}

impl Ast {
    /// Parse and validate a JSON-encoded tree
    pub fn from_json(text: &str) -> Result<Ast, String> {
        let ast: Ast = serde_json::from_str(text).map_err(|e| format!("invalid AST: {}", e))?;
        ast.validate()?;
        Ok(ast)
    }

    /// Check that every child id points into the arena and the root is a unit
    pub fn validate(&self) -> Result<(), String> {
        let len = self.nodes.len();
        if self.root.index() >= len {
            return Err(format!("root {} out of range ({} nodes)", self.root, len));
        }
        if !matches!(self.node(self.root).kind, NodeKind::Unit { .. }) {
            return Err(format!(
                "root node is a {}, expected a unit",
                self.node(self.root).kind.name()
            ));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            let mut bad = None;
            node.kind.for_each_child(&mut |child| {
                if child.index() >= len {
                    bad = Some(child);
                }
            });
            if let Some(child) = bad {
                return Err(format!(
                    "node {} ({}) refers to missing child {}",
                    index,
                    node.kind.name(),
                    child
                ));
            }
        }
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn push(&mut self, kind: NodeKind, span: SourceSpan) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::new(kind, span));
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.node(id).kind.for_each_child(&mut |child| out.push(child));
        out
    }

    /// Pre-order traversal of the subtree rooted at `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children = self.children(next);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Deep-copy a subtree. Copies get fresh ids and empty attribute slots.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let mut kind = self.node(id).kind.clone();
        let span = self.node(id).span;
        kind.for_each_child_mut(&mut |child| *child = self.clone_subtree(*child));
        self.push(kind, span)
    }

    /// Attribute every span in the tree to `file`
    pub fn set_file(&mut self, file: FileId) {
        for node in &mut self.nodes {
            node.span = node.span.with_file(file);
            node.kind
                .for_each_span_mut(&mut |span| *span = span.with_file(file));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_subtree_gets_fresh_ids() {
        let mut b = AstBuilder::new("main.phs");
        let lhs = b.name("a");
        let rhs = b.int(2);
        let sum = b.binary("+", lhs, rhs);
        let stmt = b.expr_stmt(sum);
        let mut ast = b.finish(vec![stmt]);
        ast.node_mut(lhs).symbol = Some(SymbolId::from_raw(9));

        let before = ast.len();
        let copy = ast.clone_subtree(stmt);
        assert_eq!(ast.len(), before + 4);
        assert_ne!(copy, stmt);

        let copied = ast.descendants(copy);
        assert_eq!(copied.len(), 4);
        for id in copied {
            assert!(id.index() >= before);
            assert!(ast.node(id).symbol.is_none());
        }
    }

    #[test]
    fn test_descendants_pre_order() {
        let mut b = AstBuilder::new("main.phs");
        let x = b.name("x");
        let y = b.name("y");
        let call = b.call(x, vec![y]);
        let ast = b.finish(vec![call]);

        assert_eq!(ast.descendants(call), vec![call, x, y]);
    }

    #[test]
    fn test_json_round_trip_skips_attributes() {
        let mut b = AstBuilder::new("main.phs");
        let value = b.int(1);
        let decl = b.var("x", Some(value));
        let mut ast = b.finish(vec![decl]);
        ast.node_mut(decl).scope = Some(ScopeId::from_raw(1));

        let json = serde_json::to_string(&ast).unwrap();
        assert!(json.contains("\"kind\":\"var_decl\""));
        let back = Ast::from_json(&json).unwrap();
        assert_eq!(back.len(), ast.len());
        assert!(back.node(decl).scope.is_none());
        assert_eq!(back.node(decl).kind, ast.node(decl).kind);
    }

    #[test]
    fn test_validate_rejects_dangling_child() {
        let json = r#"{
            "file": "bad.phs",
            "nodes": [
                {"kind": "expr_stmt", "expr": 5},
                {"kind": "unit", "body": [0]}
            ],
            "root": 1
        }"#;
        let err = Ast::from_json(json).unwrap_err();
        assert!(err.contains("missing child"));
    }

    #[test]
    fn test_validate_requires_unit_root() {
        let json = r#"{"file": "x.phs", "nodes": [{"kind": "this"}], "root": 0}"#;
        assert!(Ast::from_json(json).is_err());
    }

    #[test]
    fn test_set_file_reaches_nested_spans() {
        let mut b = AstBuilder::new("main.phs");
        let decl = b.func(FnDecl::named("f").with_params(vec![Param::new("a")]));
        let mut ast = b.finish(vec![decl]);
        ast.set_file(FileId::new(3));

        assert_eq!(ast.node(decl).span.file_id, FileId::new(3));
        match &ast.node(decl).kind {
            NodeKind::FnDecl(f) => assert_eq!(f.params[0].span.file_id, FileId::new(3)),
            other => panic!("unexpected {:?}", other),
        }
    }
}
