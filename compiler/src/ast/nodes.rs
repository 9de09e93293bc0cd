//! Node payloads of the phs syntax tree
//!
//! The shape mirrors what the upstream parser produces. Every payload is
//! plain data with `NodeId` children so trees can be cloned, serialized and
//! annotated in place.

use crate::sema::NodeId;
use serde::{Deserialize, Serialize};
use source_map::SourceSpan;
use std::fmt;

/// Declaration modifier keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Static,
    Const,
    Final,
    Abstract,
    Extern,
    Sealed,
    Inline,
    Unsafe,
    Global,
}

/// A possibly qualified name: `a::b::C` or `::a::C` (rooted)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Path {
    pub segments: Vec<String>,
    #[serde(default)]
    pub rooted: bool,
}

impl Path {
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
            rooted: false,
        }
    }

    pub fn is_single(&self) -> bool {
        !self.rooted && self.segments.len() == 1
    }

    /// Last segment, the item the path names
    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }
}

impl From<&str> for Path {
    fn from(text: &str) -> Self {
        let rooted = text.starts_with("::");
        let segments = text
            .trim_start_matches("::")
            .split("::")
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments, rooted }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rooted {
            write!(f, "::")?;
        }
        write!(f, "{}", self.segments.join("::"))
    }
}

/// Role of a function declaration inside a class or trait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FnRole {
    #[default]
    Plain,
    Constructor,
    Destructor,
    Getter,
    Setter,
}

/// Type hint as written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintSyntax {
    Builtin(String),
    Named(Path),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Param {
    pub name: String,
    pub span: SourceSpan,
    pub mods: Vec<Modifier>,
    pub hint: Option<HintSyntax>,
    pub by_ref: bool,
    pub rest: bool,
    pub default: Option<NodeId>,
    /// `this.name` parameter of a constructor
    pub this_bound: bool,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn builtin_hint(mut self, name: &str) -> Self {
        self.hint = Some(HintSyntax::Builtin(name.to_string()));
        self
    }

    pub fn named_hint(mut self, path: &str) -> Self {
        self.hint = Some(HintSyntax::Named(Path::from(path)));
        self
    }

    pub fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    pub fn rest(mut self) -> Self {
        self.rest = true;
        self
    }

    pub fn default_value(mut self, node: NodeId) -> Self {
        self.default = Some(node);
        self
    }

    pub fn this_bound(mut self) -> Self {
        self.this_bound = true;
        self
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// Function declaration or function expression
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FnDecl {
    pub role: FnRole,
    pub mods: Vec<Modifier>,
    /// Absent for constructors, destructors and anonymous closures
    pub name: Option<String>,
    pub params: Vec<Param>,
    /// A block, or an expression for arrow bodies
    pub body: Option<NodeId>,
}

impl FnDecl {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn constructor() -> Self {
        Self {
            role: FnRole::Constructor,
            name: Some("new".to_string()),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: FnRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_mods(mut self, mods: &[Modifier]) -> Self {
        self.mods = mods.to_vec();
        self
    }

    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: NodeId) -> Self {
        self.body = Some(body);
        self
    }
}

/// One `use Trait { item as alias }` entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitUseItem {
    pub name: String,
    pub alias: Option<String>,
    pub mods: Vec<Modifier>,
    pub span: SourceSpan,
}

/// `use Trait;` inside a class or trait body
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitUse {
    pub path: Path,
    pub span: SourceSpan,
    /// `None` mixes in every member
    pub items: Option<Vec<TraitUseItem>>,
}

impl TraitUse {
    pub fn all(path: &str) -> Self {
        Self {
            path: Path::from(path),
            ..Self::default()
        }
    }

    pub fn item(path: &str, name: &str, alias: Option<&str>, mods: &[Modifier]) -> Self {
        Self {
            path: Path::from(path),
            span: SourceSpan::default(),
            items: Some(vec![TraitUseItem {
                name: name.to_string(),
                alias: alias.map(str::to_string),
                mods: mods.to_vec(),
                span: SourceSpan::default(),
            }]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDecl {
    pub mods: Vec<Modifier>,
    pub name: String,
    /// Forward declaration `class Foo;`
    pub incomplete: bool,
    pub extends: Option<Path>,
    pub implements: Vec<Path>,
    pub uses: Vec<TraitUse>,
    pub members: Vec<NodeId>,
}

impl ClassDecl {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_mods(mut self, mods: &[Modifier]) -> Self {
        self.mods = mods.to_vec();
        self
    }

    pub fn extends(mut self, path: &str) -> Self {
        self.extends = Some(Path::from(path));
        self
    }

    pub fn implements(mut self, path: &str) -> Self {
        self.implements.push(Path::from(path));
        self
    }

    pub fn uses(mut self, usage: TraitUse) -> Self {
        self.uses.push(usage);
        self
    }

    pub fn with_members(mut self, members: Vec<NodeId>) -> Self {
        self.members = members;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitDecl {
    pub mods: Vec<Modifier>,
    pub name: String,
    pub incomplete: bool,
    pub uses: Vec<TraitUse>,
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceDecl {
    pub mods: Vec<Modifier>,
    pub name: String,
    pub incomplete: bool,
    pub extends: Vec<Path>,
    pub members: Vec<NodeId>,
}

/// One declarator of a variable or enum declaration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VarItem {
    pub name: String,
    pub span: SourceSpan,
    pub init: Option<NodeId>,
}

impl VarItem {
    pub fn new(name: impl Into<String>, init: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            span: SourceSpan::default(),
            init,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ident {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Reflective constants bound from the lexical context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineConst {
    /// `__class__`
    Class,
    /// `__method__`
    Method,
    /// `__fn__`
    Function,
    /// `__module__`
    Module,
}

impl fmt::Display for EngineConst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineConst::Class => "__class__",
            EngineConst::Method => "__method__",
            EngineConst::Function => "__fn__",
            EngineConst::Module => "__module__",
        };
        write!(f, "{}", name)
    }
}

/// Node payloads; serialized as `{"kind": "<snake_case>", ...fields}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Unit {
        body: Vec<NodeId>,
    },
    Module {
        #[serde(default)]
        name: Option<Path>,
        #[serde(default)]
        body: Vec<NodeId>,
    },
    Use {
        path: Path,
        #[serde(default)]
        alias: Option<String>,
        #[serde(default)]
        public: bool,
    },
    Require {
        path: NodeId,
        #[serde(default)]
        foreign: bool,
    },
    ClassDecl(ClassDecl),
    TraitDecl(TraitDecl),
    InterfaceDecl(InterfaceDecl),
    FnDecl(FnDecl),
    FnExpr(FnDecl),
    VarDecl {
        #[serde(default)]
        mods: Vec<Modifier>,
        items: Vec<VarItem>,
    },
    EnumDecl {
        #[serde(default)]
        mods: Vec<Modifier>,
        items: Vec<VarItem>,
    },
    Block {
        #[serde(default)]
        body: Vec<NodeId>,
    },
    If {
        cond: NodeId,
        then: NodeId,
        #[serde(default)]
        otherwise: Option<NodeId>,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    For {
        #[serde(default)]
        init: Option<NodeId>,
        #[serde(default)]
        test: Option<NodeId>,
        #[serde(default)]
        step: Option<NodeId>,
        body: NodeId,
    },
    ForIn {
        #[serde(default)]
        key: Option<Ident>,
        value: Ident,
        iter: NodeId,
        body: NodeId,
    },
    Return {
        #[serde(default)]
        value: Option<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
    Name {
        path: Path,
    },
    Literal {
        value: Literal,
    },
    Unary {
        op: String,
        operand: NodeId,
    },
    Binary {
        op: String,
        lhs: NodeId,
        rhs: NodeId,
    },
    Assign {
        #[serde(default = "default_assign_op")]
        op: String,
        target: NodeId,
        value: NodeId,
    },
    Call {
        callee: NodeId,
        #[serde(default)]
        args: Vec<NodeId>,
    },
    New {
        class: Path,
        #[serde(default)]
        args: Vec<NodeId>,
    },
    Member {
        object: NodeId,
        name: String,
    },
    Index {
        object: NodeId,
        index: NodeId,
    },
    This,
    #[serde(rename = "self")]
    SelfRef,
    Super,
    EngineConst {
        which: EngineConst,
    },
}

fn default_assign_op() -> String {
    "=".to_string()
}

impl NodeKind {
    /// Calls `f` on every direct child, in source order
    pub fn for_each_child(&self, f: &mut dyn FnMut(NodeId)) {
        let fn_children = |decl: &FnDecl, f: &mut dyn FnMut(NodeId)| {
            decl.params.iter().filter_map(|p| p.default).for_each(&mut *f);
            decl.body.into_iter().for_each(&mut *f);
        };

        match self {
            NodeKind::Unit { body } | NodeKind::Module { body, .. } | NodeKind::Block { body } => {
                body.iter().copied().for_each(f)
            }
            NodeKind::Use { .. }
            | NodeKind::Name { .. }
            | NodeKind::Literal { .. }
            | NodeKind::This
            | NodeKind::SelfRef
            | NodeKind::Super
            | NodeKind::EngineConst { .. } => {}
            NodeKind::Require { path, .. } => f(*path),
            NodeKind::ClassDecl(decl) => decl.members.iter().copied().for_each(f),
            NodeKind::TraitDecl(decl) => decl.members.iter().copied().for_each(f),
            NodeKind::InterfaceDecl(decl) => decl.members.iter().copied().for_each(f),
            NodeKind::FnDecl(decl) | NodeKind::FnExpr(decl) => fn_children(decl, f),
            NodeKind::VarDecl { items, .. } | NodeKind::EnumDecl { items, .. } => {
                items.iter().filter_map(|item| item.init).for_each(f)
            }
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                f(*cond);
                f(*then);
                otherwise.iter().copied().for_each(f);
            }
            NodeKind::While { cond, body } => {
                f(*cond);
                f(*body);
            }
            NodeKind::For {
                init,
                test,
                step,
                body,
            } => {
                init.iter().chain(test).chain(step).copied().for_each(&mut *f);
                f(*body);
            }
            NodeKind::ForIn { iter, body, .. } => {
                f(*iter);
                f(*body);
            }
            NodeKind::Return { value } => value.iter().copied().for_each(f),
            NodeKind::ExprStmt { expr } => f(*expr),
            NodeKind::Unary { operand, .. } => f(*operand),
            NodeKind::Binary { lhs, rhs, .. } => {
                f(*lhs);
                f(*rhs);
            }
            NodeKind::Assign { target, value, .. } => {
                f(*target);
                f(*value);
            }
            NodeKind::Call { callee, args } => {
                f(*callee);
                args.iter().copied().for_each(f);
            }
            NodeKind::New { args, .. } => args.iter().copied().for_each(f),
            NodeKind::Member { object, .. } => f(*object),
            NodeKind::Index { object, index } => {
                f(*object);
                f(*index);
            }
        }
    }

    /// Calls `f` on every child slot so ids can be rewritten
    pub fn for_each_child_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        let fn_children = |decl: &mut FnDecl, f: &mut dyn FnMut(&mut NodeId)| {
            decl.params
                .iter_mut()
                .filter_map(|p| p.default.as_mut())
                .for_each(&mut *f);
            decl.body.iter_mut().for_each(&mut *f);
        };

        match self {
            NodeKind::Unit { body } | NodeKind::Module { body, .. } | NodeKind::Block { body } => {
                body.iter_mut().for_each(f)
            }
            NodeKind::Use { .. }
            | NodeKind::Name { .. }
            | NodeKind::Literal { .. }
            | NodeKind::This
            | NodeKind::SelfRef
            | NodeKind::Super
            | NodeKind::EngineConst { .. } => {}
            NodeKind::Require { path, .. } => f(path),
            NodeKind::ClassDecl(decl) => decl.members.iter_mut().for_each(f),
            NodeKind::TraitDecl(decl) => decl.members.iter_mut().for_each(f),
            NodeKind::InterfaceDecl(decl) => decl.members.iter_mut().for_each(f),
            NodeKind::FnDecl(decl) | NodeKind::FnExpr(decl) => fn_children(decl, f),
            NodeKind::VarDecl { items, .. } | NodeKind::EnumDecl { items, .. } => items
                .iter_mut()
                .filter_map(|item| item.init.as_mut())
                .for_each(f),
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                f(cond);
                f(then);
                otherwise.iter_mut().for_each(f);
            }
            NodeKind::While { cond, body } => {
                f(cond);
                f(body);
            }
            NodeKind::For {
                init,
                test,
                step,
                body,
            } => {
                init.iter_mut()
                    .chain(test.iter_mut())
                    .chain(step.iter_mut())
                    .for_each(&mut *f);
                f(body);
            }
            NodeKind::ForIn { iter, body, .. } => {
                f(iter);
                f(body);
            }
            NodeKind::Return { value } => value.iter_mut().for_each(f),
            NodeKind::ExprStmt { expr } => f(expr),
            NodeKind::Unary { operand, .. } => f(operand),
            NodeKind::Binary { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            NodeKind::Assign { target, value, .. } => {
                f(target);
                f(value);
            }
            NodeKind::Call { callee, args } => {
                f(callee);
                args.iter_mut().for_each(f);
            }
            NodeKind::New { args, .. } => args.iter_mut().for_each(f),
            NodeKind::Member { object, .. } => f(object),
            NodeKind::Index { object, index } => {
                f(object);
                f(index);
            }
        }
    }

    /// Nested spans owned by the payload (params, declarators, trait items)
    pub(crate) fn for_each_span_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        let uses_spans = |uses: &mut Vec<TraitUse>, f: &mut dyn FnMut(&mut SourceSpan)| {
            for usage in uses {
                f(&mut usage.span);
                for item in usage.items.iter_mut().flatten() {
                    f(&mut item.span);
                }
            }
        };

        match self {
            NodeKind::FnDecl(decl) | NodeKind::FnExpr(decl) => {
                decl.params.iter_mut().for_each(|p| f(&mut p.span))
            }
            NodeKind::VarDecl { items, .. } | NodeKind::EnumDecl { items, .. } => {
                items.iter_mut().for_each(|item| f(&mut item.span))
            }
            NodeKind::ForIn { key, value, .. } => {
                if let Some(key) = key {
                    f(&mut key.span);
                }
                f(&mut value.span);
            }
            NodeKind::ClassDecl(decl) => uses_spans(&mut decl.uses, f),
            NodeKind::TraitDecl(decl) => uses_spans(&mut decl.uses, f),
            _ => {}
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Unit { .. } => "unit",
            NodeKind::Module { .. } => "module",
            NodeKind::Use { .. } => "use",
            NodeKind::Require { .. } => "require",
            NodeKind::ClassDecl(_) => "class",
            NodeKind::TraitDecl(_) => "trait",
            NodeKind::InterfaceDecl(_) => "interface",
            NodeKind::FnDecl(_) => "fn",
            NodeKind::FnExpr(_) => "fn-expr",
            NodeKind::VarDecl { .. } => "let",
            NodeKind::EnumDecl { .. } => "enum",
            NodeKind::Block { .. } => "block",
            NodeKind::If { .. } => "if",
            NodeKind::While { .. } => "while",
            NodeKind::For { .. } => "for",
            NodeKind::ForIn { .. } => "for-in",
            NodeKind::Return { .. } => "return",
            NodeKind::ExprStmt { .. } => "expr-stmt",
            NodeKind::Name { .. } => "name",
            NodeKind::Literal { .. } => "literal",
            NodeKind::Unary { .. } => "unary",
            NodeKind::Binary { .. } => "binary",
            NodeKind::Assign { .. } => "assign",
            NodeKind::Call { .. } => "call",
            NodeKind::New { .. } => "new",
            NodeKind::Member { .. } => "member",
            NodeKind::Index { .. } => "index",
            NodeKind::This => "this",
            NodeKind::SelfRef => "self",
            NodeKind::Super => "super",
            NodeKind::EngineConst { .. } => "engine-const",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parsing_and_display() {
        let path = Path::from("a::b::C");
        assert_eq!(path.segments, vec!["a", "b", "C"]);
        assert!(!path.rooted);
        assert_eq!(path.last(), "C");
        assert_eq!(path.to_string(), "a::b::C");

        let rooted = Path::from("::util::Helper");
        assert!(rooted.rooted);
        assert!(!rooted.is_single());
        assert_eq!(rooted.to_string(), "::util::Helper");
        assert!(Path::single("x").is_single());
    }

    #[test]
    fn test_children_in_source_order() {
        let kind = NodeKind::If {
            cond: NodeId::from_raw(1),
            then: NodeId::from_raw(2),
            otherwise: Some(NodeId::from_raw(3)),
        };
        let mut seen = Vec::new();
        kind.for_each_child(&mut |id| seen.push(id.as_raw()));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_fn_children_include_defaults() {
        let decl = FnDecl::named("f")
            .with_params(vec![Param::new("a").default_value(NodeId::from_raw(4))])
            .with_body(NodeId::from_raw(5));
        let mut kind = NodeKind::FnDecl(decl);

        let mut seen = Vec::new();
        kind.for_each_child(&mut |id| seen.push(id.as_raw()));
        assert_eq!(seen, vec![4, 5]);

        kind.for_each_child_mut(&mut |id| *id = NodeId::from_raw(id.as_raw() + 10));
        let mut rewritten = Vec::new();
        kind.for_each_child(&mut |id| rewritten.push(id.as_raw()));
        assert_eq!(rewritten, vec![14, 15]);
    }

    #[test]
    fn test_kind_json_shape() {
        let kind: NodeKind = serde_json::from_str(
            r#"{"kind":"class_decl","name":"Dog","extends":{"segments":["Animal"]}}"#,
        )
        .unwrap();
        match kind {
            NodeKind::ClassDecl(decl) => {
                assert_eq!(decl.name, "Dog");
                assert_eq!(decl.extends, Some(Path::single("Animal")));
                assert!(decl.members.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }

        let this: NodeKind = serde_json::from_str(r#"{"kind":"self"}"#).unwrap();
        assert_eq!(this, NodeKind::SelfRef);
    }
}
