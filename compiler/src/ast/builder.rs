//! Programmatic tree construction
//!
//! Used by tests, benches and embedders that synthesize units without going
//! through the parser. Every node gets its own line so diagnostics can be
//! told apart.

use super::nodes::*;
use super::{Ast, Node};
use crate::sema::NodeId;
use source_map::{FileId, SourcePosition, SourceSpan};

pub struct AstBuilder {
    file: String,
    nodes: Vec<Node>,
}

impl AstBuilder {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        let line = self.nodes.len() + 1;
        let span = SourceSpan::single_position(SourcePosition::new(line, 1, 0), FileId::default());
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::new(kind, span));
        id
    }

    /// Span the next pushed node will get
    pub fn next_span(&self) -> SourceSpan {
        let line = self.nodes.len() + 1;
        SourceSpan::single_position(SourcePosition::new(line, 1, 0), FileId::default())
    }

    /// Wrap `body` in the unit root and return the tree
    pub fn finish(mut self, body: Vec<NodeId>) -> Ast {
        let root = self.push(NodeKind::Unit { body });
        Ast {
            file: self.file,
            source: None,
            nodes: self.nodes,
            root,
        }
    }

    // Expressions

    pub fn name(&mut self, path: &str) -> NodeId {
        self.push(NodeKind::Name {
            path: Path::from(path),
        })
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.push(NodeKind::Literal {
            value: Literal::Int(value),
        })
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.push(NodeKind::Literal {
            value: Literal::Str(value.to_string()),
        })
    }

    pub fn null(&mut self) -> NodeId {
        self.push(NodeKind::Literal {
            value: Literal::Null,
        })
    }

    pub fn unary(&mut self, op: &str, operand: NodeId) -> NodeId {
        self.push(NodeKind::Unary {
            op: op.to_string(),
            operand,
        })
    }

    pub fn binary(&mut self, op: &str, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(NodeKind::Binary {
            op: op.to_string(),
            lhs,
            rhs,
        })
    }

    pub fn assign(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.push(NodeKind::Assign {
            op: "=".to_string(),
            target,
            value,
        })
    }

    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Call { callee, args })
    }

    pub fn new_object(&mut self, class: &str, args: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::New {
            class: Path::from(class),
            args,
        })
    }

    pub fn member(&mut self, object: NodeId, name: &str) -> NodeId {
        self.push(NodeKind::Member {
            object,
            name: name.to_string(),
        })
    }

    pub fn index(&mut self, object: NodeId, index: NodeId) -> NodeId {
        self.push(NodeKind::Index { object, index })
    }

    pub fn this(&mut self) -> NodeId {
        self.push(NodeKind::This)
    }

    pub fn self_ref(&mut self) -> NodeId {
        self.push(NodeKind::SelfRef)
    }

    pub fn super_ref(&mut self) -> NodeId {
        self.push(NodeKind::Super)
    }

    pub fn engine_const(&mut self, which: EngineConst) -> NodeId {
        self.push(NodeKind::EngineConst { which })
    }

    /// `this.name`
    pub fn this_member(&mut self, name: &str) -> NodeId {
        let this = self.this();
        self.member(this, name)
    }

    pub fn closure(&mut self, decl: FnDecl) -> NodeId {
        self.push(NodeKind::FnExpr(decl))
    }

    // Statements

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::ExprStmt { expr })
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.push(NodeKind::Return { value })
    }

    pub fn block(&mut self, body: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Block { body })
    }

    pub fn if_stmt(&mut self, cond: NodeId, then: NodeId, otherwise: Option<NodeId>) -> NodeId {
        self.push(NodeKind::If {
            cond,
            then,
            otherwise,
        })
    }

    pub fn while_loop(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.push(NodeKind::While { cond, body })
    }

    pub fn for_in(&mut self, key: Option<&str>, value: &str, iter: NodeId, body: NodeId) -> NodeId {
        let ident = |name: &str| Ident {
            name: name.to_string(),
            span: SourceSpan::default(),
        };
        self.push(NodeKind::ForIn {
            key: key.map(ident),
            value: ident(value),
            iter,
            body,
        })
    }

    // Declarations

    /// `let name = init;`
    pub fn var(&mut self, name: &str, init: Option<NodeId>) -> NodeId {
        self.var_decl(&[], vec![VarItem::new(name, init)])
    }

    /// `const name = init;`
    pub fn constant(&mut self, name: &str, init: NodeId) -> NodeId {
        self.var_decl(&[Modifier::Const], vec![VarItem::new(name, Some(init))])
    }

    pub fn var_decl(&mut self, mods: &[Modifier], items: Vec<VarItem>) -> NodeId {
        self.push(NodeKind::VarDecl {
            mods: mods.to_vec(),
            items,
        })
    }

    pub fn enum_decl(&mut self, mods: &[Modifier], items: Vec<VarItem>) -> NodeId {
        self.push(NodeKind::EnumDecl {
            mods: mods.to_vec(),
            items,
        })
    }

    pub fn func(&mut self, decl: FnDecl) -> NodeId {
        self.push(NodeKind::FnDecl(decl))
    }

    pub fn class(&mut self, decl: ClassDecl) -> NodeId {
        self.push(NodeKind::ClassDecl(decl))
    }

    pub fn trait_decl(&mut self, decl: TraitDecl) -> NodeId {
        self.push(NodeKind::TraitDecl(decl))
    }

    pub fn interface(&mut self, decl: InterfaceDecl) -> NodeId {
        self.push(NodeKind::InterfaceDecl(decl))
    }

    pub fn module(&mut self, name: Option<&str>, body: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Module {
            name: name.map(Path::from),
            body,
        })
    }

    pub fn use_decl(&mut self, path: &str, alias: Option<&str>) -> NodeId {
        self.push(NodeKind::Use {
            path: Path::from(path),
            alias: alias.map(str::to_string),
            public: false,
        })
    }

    pub fn require(&mut self, path: NodeId, foreign: bool) -> NodeId {
        self.push(NodeKind::Require { path, foreign })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_spans_and_root() {
        let mut b = AstBuilder::new("demo.phs");
        let x = b.name("x");
        let stmt = b.expr_stmt(x);
        let ast = b.finish(vec![stmt]);

        assert_eq!(ast.file, "demo.phs");
        assert_eq!(ast.root.index(), 2);
        assert_ne!(ast.node(x).span, ast.node(stmt).span);
        assert!(ast.validate().is_ok());
    }
}
