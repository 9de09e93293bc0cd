//! Scope Graph
//!
//! Scopes and symbols live in two flat arenas owned by [`ScopeGraph`].
//! Parent, delegate, superclass and owning-scope links are plain ids, so
//! the graph can hold the back references the resolver needs without any
//! shared ownership.
//!
//! Unit, module and member scopes are *partitioned*: private declarations go
//! into a sealed [`ScopeKind::Inner`] scope owned by them, which lookup only
//! opens while the owner is active.

use super::symbol_table::SymbolTable;
use super::symbols::{Symbol, SymbolData};
use super::{ScopeId, SymbolId};
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

/// Role of a scope in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Session-wide root holding bootstrap and intrinsic symbols
    Global,
    /// One compilation unit (file)
    Unit,
    Module,
    /// Members of a class, trait or interface
    Member,
    Function,
    Block,
    /// Private partition of a unit, module or member scope
    Inner,
}

impl ScopeKind {
    pub fn is_partitioned(self) -> bool {
        matches!(self, ScopeKind::Unit | ScopeKind::Module | ScopeKind::Member)
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::Global => "global",
            ScopeKind::Unit => "unit",
            ScopeKind::Module => "module",
            ScopeKind::Member => "member",
            ScopeKind::Function => "function",
            ScopeKind::Block => "block",
            ScopeKind::Inner => "private",
        };
        write!(f, "{}", name)
    }
}

/// Member-scope extras
#[derive(Debug, Clone)]
pub struct MemberInfo {
    /// Class, trait or interface owning the members
    pub host: SymbolId,
    /// Member scope of the superclass, linked by the inheritance resolver
    pub super_scope: Option<ScopeId>,
    pub ctor: Option<SymbolId>,
    pub dtor: Option<SymbolId>,
    pub getters: IndexMap<String, SymbolId>,
    pub setters: IndexMap<String, SymbolId>,
    /// Members of this scope answer `Restricted` while set
    pub restricted: bool,
}

impl MemberInfo {
    fn new(host: SymbolId) -> Self {
        Self {
            host,
            super_scope: None,
            ctor: None,
            dtor: None,
            getters: IndexMap::new(),
            setters: IndexMap::new(),
            restricted: false,
        }
    }

    /// Symbols held in the role slots rather than the table
    pub fn slot_symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.ctor
            .iter()
            .chain(self.dtor.iter())
            .copied()
            .chain(self.getters.values().copied())
            .chain(self.setters.values().copied())
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// Module segment name, or a label for dumps
    pub name: Option<String>,
    pub parent: Option<ScopeId>,
    pub table: SymbolTable,
    /// Symbols owned by an ancestor and referenced from here
    pub captured: IndexSet<SymbolId>,
    /// Consulted by lookup after the parent chain, never for ownership
    pub delegate: Option<ScopeId>,
    /// Lookup never walks past a sealed scope
    pub sealed: bool,
    /// Nesting count of walks currently inside this scope
    pub active: u32,
    /// Symbols replaced in place by a later declaration
    pub dropped: Vec<SymbolId>,
    /// Ancestor symbols hidden by declarations of this scope
    pub shadowed: Vec<SymbolId>,
    /// Private partition
    pub inner: Option<ScopeId>,
    /// Owner of an inner partition
    pub outer: Option<ScopeId>,
    pub member: Option<MemberInfo>,
    /// Sub-modules by segment name (root scopes only)
    pub modules: IndexMap<String, ScopeId>,
}

impl Scope {
    fn new(id: ScopeId, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            id,
            kind,
            name: None,
            parent,
            table: SymbolTable::new(),
            captured: IndexSet::new(),
            delegate: None,
            sealed: false,
            active: 0,
            dropped: Vec::new(),
            shadowed: Vec::new(),
            inner: None,
            outer: None,
            member: None,
            modules: IndexMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active > 0
    }

    pub fn is_restricted(&self) -> bool {
        self.member.as_ref().is_some_and(|m| m.restricted)
    }
}

/// Engine invariant failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// `leave` on a scope that was never entered
    NotActive(ScopeId),
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::NotActive(id) => write!(f, "scope stack underflow leaving {}", id),
        }
    }
}

impl std::error::Error for ScopeError {}

/// Arena of scopes and symbols for one session
#[derive(Debug, Clone)]
pub struct ScopeGraph {
    pub(crate) scopes: Vec<Scope>,
    pub(crate) symbols: Vec<Symbol>,
}

impl Default for ScopeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeGraph {
    /// A graph holding only the active global scope
    pub fn new() -> Self {
        let mut global = Scope::new(ScopeId::from_raw(0), ScopeKind::Global, None);
        global.active = 1;
        Self {
            scopes: vec![global],
            symbols: Vec::new(),
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId::from_raw(0)
    }

    /// Create a scope; partitioned kinds get their inner scope too
    pub fn new_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = self.push_scope(Scope::new(ScopeId::from_index(self.scopes.len()), kind, parent));
        if kind.is_partitioned() {
            let mut inner = Scope::new(ScopeId::from_index(self.scopes.len()), ScopeKind::Inner, Some(id));
            inner.sealed = true;
            inner.outer = Some(id);
            let inner = self.push_scope(inner);
            self.scopes[id.index()].inner = Some(inner);
        }
        id
    }

    pub fn new_member_scope(&mut self, host: SymbolId, parent: ScopeId) -> ScopeId {
        let id = self.new_scope(ScopeKind::Member, Some(parent));
        self.scopes[id.index()].member = Some(MemberInfo::new(host));
        id
    }

    fn push_scope(&mut self, scope: Scope) -> ScopeId {
        let id = scope.id;
        self.scopes.push(scope);
        id
    }

    /// Move a detached symbol into the arena
    pub fn alloc(&mut self, mut symbol: Symbol) -> SymbolId {
        let id = SymbolId::from_index(self.symbols.len());
        symbol.id = id;
        self.symbols.push(symbol);
        id
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// The partition owner of an inner scope, the scope itself otherwise
    pub fn owner(&self, id: ScopeId) -> ScopeId {
        self.scope(id).outer.unwrap_or(id)
    }

    /// True for global, unit and module scopes and their partitions
    pub fn is_global(&self, id: ScopeId) -> bool {
        matches!(
            self.scope(self.owner(id)).kind,
            ScopeKind::Global | ScopeKind::Unit | ScopeKind::Module
        )
    }

    pub fn member_info(&self, id: ScopeId) -> Option<&MemberInfo> {
        self.scope(id).member.as_ref()
    }

    pub fn member_info_mut(&mut self, id: ScopeId) -> Option<&mut MemberInfo> {
        self.scope_mut(id).member.as_mut()
    }

    /// Member scope of a class, trait or interface symbol
    pub fn members_of(&self, host: SymbolId) -> Option<ScopeId> {
        self.symbol(host).members()
    }

    /// Mark the scope as lexically entered
    pub fn enter(&mut self, id: ScopeId) {
        self.scope_mut(id).active += 1;
    }

    pub fn leave(&mut self, id: ScopeId) -> Result<(), ScopeError> {
        let scope = self.scope_mut(id);
        if scope.active == 0 {
            return Err(ScopeError::NotActive(id));
        }
        scope.active -= 1;
        Ok(())
    }

    pub fn is_active(&self, id: ScopeId) -> bool {
        self.scope(id).is_active()
    }

    /// Nearest enclosing global/unit/module scope (partition owners only)
    pub fn root_of(&self, id: ScopeId) -> ScopeId {
        let mut current = self.owner(id);
        loop {
            if self.is_global(current) {
                return current;
            }
            match self.scope(current).parent {
                Some(parent) => current = self.owner(parent),
                None => return current,
            }
        }
    }

    /// Nearest enclosing unit scope
    pub fn unit_of(&self, id: ScopeId) -> Option<ScopeId> {
        let mut current = Some(self.owner(id));
        while let Some(scope) = current {
            if self.scope(scope).kind == ScopeKind::Unit {
                return Some(scope);
            }
            current = self.scope(scope).parent.map(|p| self.owner(p));
        }
        None
    }

    /// `a::b` for a module scope, empty for unit and global scopes
    pub fn module_path(&self, id: ScopeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(self.owner(id));
        while let Some(scope) = current {
            let data = self.scope(scope);
            if data.kind == ScopeKind::Module {
                if let Some(name) = &data.name {
                    segments.push(name.as_str());
                }
            }
            current = data.parent.map(|p| self.owner(p));
        }
        segments.reverse();
        segments.join("::")
    }

    /// Qualified path: modules joined by `::`, members by `.`
    pub fn symbol_path(&self, id: SymbolId) -> String {
        let symbol = self.symbol(id);
        let Some(scope) = symbol.scope else {
            return symbol.name.clone();
        };
        let scope = self.owner(scope);
        if let Some(member) = self.member_info(scope) {
            return format!("{}.{}", self.symbol_path(member.host), symbol.name);
        }
        let module = self.module_path(scope);
        if module.is_empty() {
            symbol.name.clone()
        } else {
            format!("{}::{}", module, symbol.name)
        }
    }

    /// Indented text rendering of the graph, for `--dump-scopes`
    pub fn dump(&self) -> String {
        let mut children: BTreeMap<ScopeId, Vec<ScopeId>> = BTreeMap::new();
        for scope in &self.scopes {
            if let Some(parent) = scope.parent {
                children.entry(parent).or_default().push(scope.id);
            }
        }

        let mut out = String::new();
        self.dump_scope(self.global(), 0, &children, &mut out);
        out
    }

    fn dump_scope(
        &self,
        id: ScopeId,
        depth: usize,
        children: &BTreeMap<ScopeId, Vec<ScopeId>>,
        out: &mut String,
    ) {
        let scope = self.scope(id);
        let indent = "  ".repeat(depth);
        let label = match (&scope.name, &scope.member) {
            (Some(name), _) => format!(" {}", name),
            (None, Some(member)) => format!(" {}", self.symbol_path(member.host)),
            (None, None) => String::new(),
        };
        let _ = writeln!(out, "{}{} #{}{}", indent, scope.kind, id.as_raw(), label);

        let slots: Vec<SymbolId> = scope
            .member
            .as_ref()
            .map(|m| m.slot_symbols().collect())
            .unwrap_or_default();
        for sym in scope.table.ids().chain(slots) {
            let symbol = self.symbol(sym);
            let mut notes = String::new();
            if symbol.captured {
                notes.push_str(" captured");
            }
            if !symbol.reachable {
                notes.push_str(" unreachable");
            }
            if let Some(origin) = symbol.origin {
                let _ = write!(notes, " from {}", self.symbol_path(origin));
            }
            let _ = writeln!(
                out,
                "{}  - {} {} [{}]{}",
                indent,
                symbol.kind(),
                symbol.name,
                symbol.flags,
                notes
            );
        }
        if !scope.captured.is_empty() {
            let names: Vec<&str> = scope
                .captured
                .iter()
                .map(|s| self.symbol(*s).name.as_str())
                .collect();
            let _ = writeln!(out, "{}  captures: {}", indent, names.join(", "));
        }

        for child in children.get(&id).into_iter().flatten() {
            self.dump_scope(*child, depth + 1, children, out);
        }
    }

    /// Members of a type symbol's scope including its private partition
    pub fn member_ids(&self, host: SymbolId) -> Vec<SymbolId> {
        let Some(scope) = self.members_of(host) else {
            return Vec::new();
        };
        let mut ids: Vec<SymbolId> = self.scope(scope).table.ids().collect();
        if let Some(inner) = self.scope(scope).inner {
            ids.extend(self.scope(inner).table.ids());
        }
        ids
    }

    /// True if `id` is a class symbol
    pub fn is_class(&self, id: SymbolId) -> bool {
        matches!(self.symbol(id).data, SymbolData::Class(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::symbols::{SymbolFlags, VariableSymbol};
    use source_map::SourceSpan;

    #[test]
    fn test_partitioned_scopes_get_sealed_inner() {
        let mut graph = ScopeGraph::new();
        let unit = graph.new_scope(ScopeKind::Unit, Some(graph.global()));
        let inner = graph.scope(unit).inner.unwrap();

        assert!(graph.scope(inner).sealed);
        assert_eq!(graph.owner(inner), unit);
        assert!(graph.is_global(inner));

        let block = graph.new_scope(ScopeKind::Block, Some(unit));
        assert!(graph.scope(block).inner.is_none());
        assert!(!graph.is_global(block));
    }

    #[test]
    fn test_enter_leave_underflow() {
        let mut graph = ScopeGraph::new();
        let unit = graph.new_scope(ScopeKind::Unit, Some(graph.global()));

        graph.enter(unit);
        assert!(graph.is_active(unit));
        assert!(graph.leave(unit).is_ok());
        assert!(!graph.is_active(unit));
        assert_eq!(graph.leave(unit), Err(ScopeError::NotActive(unit)));
    }

    #[test]
    fn test_alloc_stamps_id() {
        let mut graph = ScopeGraph::new();
        let sym = Symbol::variable("x", SourceSpan::default(), SymbolFlags::NONE, VariableSymbol::default());
        let id = graph.alloc(sym);
        assert_eq!(graph.symbol(id).id, id);
        assert_eq!(graph.symbol_count(), 1);
    }

    #[test]
    fn test_module_path() {
        let mut graph = ScopeGraph::new();
        let unit = graph.new_scope(ScopeKind::Unit, Some(graph.global()));
        let a = graph.new_scope(ScopeKind::Module, Some(unit));
        graph.scope_mut(a).name = Some("a".into());
        let b = graph.new_scope(ScopeKind::Module, Some(a));
        graph.scope_mut(b).name = Some("b".into());
        let block = graph.new_scope(ScopeKind::Block, Some(b));

        assert_eq!(graph.module_path(b), "a::b");
        assert_eq!(graph.module_path(unit), "");
        assert_eq!(graph.root_of(block), b);
        assert_eq!(graph.unit_of(block), Some(unit));
    }
}
