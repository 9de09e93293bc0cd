//! Symbol Model
//!
//! Every declaration the collector sees becomes one `Symbol` in the scope
//! graph's arena:
//! - a namespace tag (value, type, alias, internal) keeping same-named
//!   entities of different kinds apart
//! - a flag bitset for visibility and modifiers
//! - an owning-scope back reference, `None` while the symbol is detached
//! - a closed `SymbolData` payload per kind, matched exhaustively by passes

use super::{NodeId, ScopeId, SymbolId};
use crate::ast::{FnRole, Path};
use crate::sema::values::Value;
use smallvec::SmallVec;
use source_map::SourceSpan;
use std::fmt;
use std::ops::BitOr;

/// Symbol namespaces; one symbol per (namespace, name) in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Bootstrap and intrinsic entries
    Internal,
    /// Functions and variables
    Value,
    /// Classes, traits and interfaces
    Type,
    /// `use` imports and re-exports
    Alias,
}

impl Namespace {
    /// All namespaces, in lookup order for "any namespace" queries
    pub const ALL: [Namespace; 4] = [
        Namespace::Internal,
        Namespace::Value,
        Namespace::Type,
        Namespace::Alias,
    ];

    pub const fn index(self) -> usize {
        match self {
            Namespace::Internal => 0,
            Namespace::Value => 1,
            Namespace::Type => 2,
            Namespace::Alias => 3,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Namespace::Internal => "internal",
            Namespace::Value => "value",
            Namespace::Type => "type",
            Namespace::Alias => "alias",
        };
        write!(f, "{}", name)
    }
}

/// Visibility and modifier bits of a symbol
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolFlags(u32);

impl SymbolFlags {
    pub const NONE: Self = Self(0);
    pub const CONST: Self = Self(1 << 0);
    pub const FINAL: Self = Self(1 << 1);
    pub const GLOBAL: Self = Self(1 << 2);
    pub const STATIC: Self = Self(1 << 3);
    pub const PUBLIC: Self = Self(1 << 4);
    pub const PRIVATE: Self = Self(1 << 5);
    pub const PROTECTED: Self = Self(1 << 6);
    pub const SEALED: Self = Self(1 << 7);
    pub const INLINE: Self = Self(1 << 8);
    pub const EXTERN: Self = Self(1 << 9);
    pub const ABSTRACT: Self = Self(1 << 10);
    pub const INCOMPLETE: Self = Self(1 << 11);
    pub const PARAM: Self = Self(1 << 12);
    pub const UNSAFE: Self = Self(1 << 13);

    pub const VISIBILITY: Self = Self(Self::PUBLIC.0 | Self::PRIVATE.0 | Self::PROTECTED.0);

    const NAMES: [(SymbolFlags, &'static str); 14] = [
        (Self::PUBLIC, "public"),
        (Self::PRIVATE, "private"),
        (Self::PROTECTED, "protected"),
        (Self::STATIC, "static"),
        (Self::CONST, "const"),
        (Self::FINAL, "final"),
        (Self::ABSTRACT, "abstract"),
        (Self::EXTERN, "extern"),
        (Self::SEALED, "sealed"),
        (Self::INLINE, "inline"),
        (Self::UNSAFE, "unsafe"),
        (Self::GLOBAL, "global"),
        (Self::INCOMPLETE, "incomplete"),
        (Self::PARAM, "param"),
    ];

    pub const fn empty() -> Self {
        Self::NONE
    }

    /// True if every bit of `flag` is set
    pub const fn contains(self, flag: Self) -> bool {
        flag.0 != 0 && (self.0 & flag.0) == flag.0
    }

    /// True if any bit of `flag` is set
    pub const fn intersects(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    pub fn insert(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: Self) {
        self.0 &= !flag.0;
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl Default for SymbolFlags {
    fn default() -> Self {
        Self::NONE
    }
}

impl BitOr for SymbolFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for SymbolFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        if first {
            write!(f, "none")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SymbolFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolFlags({})", self)
    }
}

/// The kind of symbol, derived from its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Variable,
    Class,
    Trait,
    Interface,
    Alias,
}

impl SymbolKind {
    /// Namespace a symbol of this kind lives in unless bootstrapped
    pub fn namespace(self) -> Namespace {
        match self {
            SymbolKind::Function | SymbolKind::Variable => Namespace::Value,
            SymbolKind::Class | SymbolKind::Trait | SymbolKind::Interface => Namespace::Type,
            SymbolKind::Alias => Namespace::Alias,
        }
    }

    pub fn is_type(self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Trait | SymbolKind::Interface
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Function => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Class => "class",
            SymbolKind::Trait => "trait",
            SymbolKind::Interface => "interface",
            SymbolKind::Alias => "import",
        };
        write!(f, "{}", name)
    }
}

/// A parameter type hint
#[derive(Debug, Clone, PartialEq)]
pub enum TypeHint {
    /// A builtin type name (`int`, `string`, ...)
    Builtin(String),
    /// A user type; `target` is filled in by the resolver
    Named { path: String, target: Option<SymbolId> },
}

impl TypeHint {
    /// Hint equality used by contract verification
    pub fn same_as(&self, other: &TypeHint) -> bool {
        match (self, other) {
            (TypeHint::Builtin(a), TypeHint::Builtin(b)) => a == b,
            (
                TypeHint::Named {
                    target: Some(a), ..
                },
                TypeHint::Named {
                    target: Some(b), ..
                },
            ) => a == b,
            (TypeHint::Named { path: a, .. }, TypeHint::Named { path: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHint::Builtin(name) => write!(f, "{}", name),
            TypeHint::Named { path, .. } => write!(f, "{}", path),
        }
    }
}

/// Function, method, closure, constructor, destructor, getter or setter
#[derive(Debug, Clone, Default)]
pub struct FunctionSymbol {
    pub params: SmallVec<[SymbolId; 4]>,
    pub role: FnRole,
    /// Declared inside another function
    pub nested: bool,
    /// Function expression (closure)
    pub is_expr: bool,
    pub has_body: bool,
    /// Scope holding the parameters and body declarations
    pub body_scope: Option<ScopeId>,
}

/// Variable, field, enum member or parameter (`PARAM` flag)
#[derive(Debug, Clone, Default)]
pub struct VariableSymbol {
    /// Compile-time value computed by the constant reducer
    pub value: Option<Value>,
    pub hint: Option<TypeHint>,
    pub by_ref: bool,
    pub rest: bool,
    pub optional: bool,
    /// Parameter that also assigns the same-named field
    pub this_bound: bool,
    /// Initializer or default-value expression
    pub init: Option<NodeId>,
}

/// A reference to a type by name, resolved lazily
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub path: Path,
    pub span: SourceSpan,
    pub target: Option<SymbolId>,
}

impl TypeRef {
    pub fn new(path: Path, span: SourceSpan) -> Self {
        Self {
            path,
            span,
            target: None,
        }
    }
}

/// One trait usage clause; `item == None` mixes in every member
#[derive(Debug, Clone)]
pub struct TraitUsage {
    pub trait_ref: TypeRef,
    pub item: Option<String>,
    pub alias: Option<String>,
    /// Visibility/modifier override for the copied member
    pub flags: SymbolFlags,
    pub span: SourceSpan,
}

impl TraitUsage {
    /// Name the copied member gets in the host
    pub fn destination(&self) -> Option<&str> {
        self.alias.as_deref().or(self.item.as_deref())
    }
}

/// Progress of the inheritance and mixin resolver on one type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Unresolved,
    Resolving,
    Resolved,
}

#[derive(Debug, Clone)]
pub struct ClassSymbol {
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub traits: Vec<TraitUsage>,
    pub members: ScopeId,
    pub resolution: Resolution,
}

#[derive(Debug, Clone)]
pub struct TraitSymbol {
    pub traits: Vec<TraitUsage>,
    pub members: ScopeId,
    pub resolution: Resolution,
}

#[derive(Debug, Clone)]
pub struct InterfaceSymbol {
    pub interfaces: Vec<TypeRef>,
    pub members: ScopeId,
    pub resolution: Resolution,
}

/// A `use` import; the name is the alias (or last path segment)
#[derive(Debug, Clone)]
pub struct AliasSymbol {
    pub path: Path,
    pub target: Option<SymbolId>,
}

/// Kind-specific payload
#[derive(Debug, Clone)]
pub enum SymbolData {
    Function(FunctionSymbol),
    Variable(VariableSymbol),
    Class(ClassSymbol),
    Trait(TraitSymbol),
    Interface(InterfaceSymbol),
    Alias(AliasSymbol),
}

/// A named, kinded, flagged semantic entity
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub ns: Namespace,
    pub span: SourceSpan,
    pub flags: SymbolFlags,
    /// Owning scope; `None` while detached
    pub scope: Option<ScopeId>,
    /// False until the declaration point has been passed
    pub reachable: bool,
    pub captured: bool,
    /// Intrinsic entry that can never be redeclared
    pub managed: bool,
    /// Trait symbol this member was copied from
    pub origin: Option<SymbolId>,
    /// Declaration node
    pub node: Option<NodeId>,
    pub data: SymbolData,
}

impl Symbol {
    /// A detached symbol; the arena stamps the id on allocation
    pub fn new(name: impl Into<String>, span: SourceSpan, flags: SymbolFlags, data: SymbolData) -> Self {
        let ns = data.kind().namespace();
        Self {
            id: SymbolId::from_raw(u32::MAX),
            name: name.into(),
            ns,
            span,
            flags,
            scope: None,
            reachable: true,
            captured: false,
            managed: false,
            origin: None,
            node: None,
            data,
        }
    }

    pub fn function(name: impl Into<String>, span: SourceSpan, flags: SymbolFlags, data: FunctionSymbol) -> Self {
        Self::new(name, span, flags, SymbolData::Function(data))
    }

    pub fn variable(name: impl Into<String>, span: SourceSpan, flags: SymbolFlags, data: VariableSymbol) -> Self {
        Self::new(name, span, flags, SymbolData::Variable(data))
    }

    pub fn kind(&self) -> SymbolKind {
        self.data.kind()
    }

    pub fn is_incomplete(&self) -> bool {
        self.flags.contains(SymbolFlags::INCOMPLETE)
    }

    pub fn is_final(&self) -> bool {
        self.flags.contains(SymbolFlags::FINAL)
    }

    pub fn is_const(&self) -> bool {
        self.flags.contains(SymbolFlags::CONST)
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(SymbolFlags::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(SymbolFlags::ABSTRACT)
    }

    pub fn is_private(&self) -> bool {
        self.flags.contains(SymbolFlags::PRIVATE)
    }

    pub fn is_param(&self) -> bool {
        self.flags.contains(SymbolFlags::PARAM)
    }

    pub fn as_function(&self) -> Option<&FunctionSymbol> {
        match &self.data {
            SymbolData::Function(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FunctionSymbol> {
        match &mut self.data {
            SymbolData::Function(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableSymbol> {
        match &self.data {
            SymbolData::Variable(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut VariableSymbol> {
        match &mut self.data {
            SymbolData::Variable(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassSymbol> {
        match &self.data {
            SymbolData::Class(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassSymbol> {
        match &mut self.data {
            SymbolData::Class(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&AliasSymbol> {
        match &self.data {
            SymbolData::Alias(data) => Some(data),
            _ => None,
        }
    }

    /// Member scope of a class, trait or interface
    pub fn members(&self) -> Option<ScopeId> {
        match &self.data {
            SymbolData::Class(data) => Some(data.members),
            SymbolData::Trait(data) => Some(data.members),
            SymbolData::Interface(data) => Some(data.members),
            _ => None,
        }
    }

    /// Resolver progress of a class, trait or interface
    pub fn resolution(&self) -> Option<Resolution> {
        match &self.data {
            SymbolData::Class(data) => Some(data.resolution),
            SymbolData::Trait(data) => Some(data.resolution),
            SymbolData::Interface(data) => Some(data.resolution),
            _ => None,
        }
    }

    pub fn set_resolution(&mut self, state: Resolution) {
        match &mut self.data {
            SymbolData::Class(data) => data.resolution = state,
            SymbolData::Trait(data) => data.resolution = state,
            SymbolData::Interface(data) => data.resolution = state,
            _ => {}
        }
    }

    /// Copy with fresh identity: detached, not captured, not yet allocated
    pub fn clone_detached(&self) -> Symbol {
        Symbol {
            id: SymbolId::from_raw(u32::MAX),
            scope: None,
            captured: false,
            managed: false,
            ..self.clone()
        }
    }
}

impl SymbolData {
    pub fn kind(&self) -> SymbolKind {
        match self {
            SymbolData::Function(_) => SymbolKind::Function,
            SymbolData::Variable(_) => SymbolKind::Variable,
            SymbolData::Class(_) => SymbolKind::Class,
            SymbolData::Trait(_) => SymbolKind::Trait,
            SymbolData::Interface(_) => SymbolKind::Interface,
            SymbolData::Alias(_) => SymbolKind::Alias,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_contains_vs_intersects() {
        let flags = SymbolFlags::PUBLIC | SymbolFlags::STATIC;
        assert!(flags.contains(SymbolFlags::STATIC));
        assert!(!flags.contains(SymbolFlags::VISIBILITY));
        assert!(flags.intersects(SymbolFlags::VISIBILITY));
        assert!(!SymbolFlags::NONE.contains(SymbolFlags::NONE));
    }

    #[test]
    fn test_flags_mutation_and_display() {
        let mut flags = SymbolFlags::EXTERN | SymbolFlags::INCOMPLETE;
        flags.insert(SymbolFlags::PRIVATE);
        flags.remove(SymbolFlags::INCOMPLETE);
        assert_eq!(flags.to_string(), "private extern");
        assert_eq!(SymbolFlags::NONE.to_string(), "none");
        assert_eq!(
            (SymbolFlags::FINAL | SymbolFlags::CONST).without(SymbolFlags::FINAL),
            SymbolFlags::CONST
        );
    }

    #[test]
    fn test_kind_namespace() {
        let func = Symbol::function("f", SourceSpan::default(), SymbolFlags::NONE, FunctionSymbol::default());
        assert_eq!(func.kind(), SymbolKind::Function);
        assert_eq!(func.ns, Namespace::Value);
        assert!(SymbolKind::Interface.is_type());
        assert_eq!(SymbolKind::Alias.namespace(), Namespace::Alias);
    }

    #[test]
    fn test_hint_equality() {
        let int = TypeHint::Builtin("int".into());
        let named = |target| TypeHint::Named {
            path: "Foo".into(),
            target,
        };

        assert!(int.same_as(&TypeHint::Builtin("int".into())));
        assert!(!int.same_as(&named(None)));
        assert!(named(Some(SymbolId::from_raw(1))).same_as(&named(Some(SymbolId::from_raw(1)))));
        assert!(!named(Some(SymbolId::from_raw(1))).same_as(&named(Some(SymbolId::from_raw(2)))));
    }

    #[test]
    fn test_clone_detached_clears_identity() {
        let mut sym = Symbol::variable("x", SourceSpan::default(), SymbolFlags::PRIVATE, VariableSymbol::default());
        sym.id = SymbolId::from_raw(3);
        sym.scope = Some(ScopeId::from_raw(1));
        sym.captured = true;

        let copy = sym.clone_detached();
        assert!(copy.scope.is_none());
        assert!(!copy.captured);
        assert_eq!(copy.name, "x");
        assert_eq!(copy.flags, SymbolFlags::PRIVATE);
    }
}
