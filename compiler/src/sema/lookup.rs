//! Name lookup over the scope graph
//!
//! The walk for a plain name, starting at the use-site scope:
//! 1. the scope's own table
//! 2. its private partition (`Private` unless the owner is active)
//! 3. for member scopes, getter/setter slots then the superclass chain
//! 4. the parent, unless the scope is sealed
//! 5. the delegate
//!
//! A `Found` that crosses function or block scopes records the capture on
//! every scope between the use-site and the owner.

use super::scopes::{ScopeGraph, ScopeKind};
use super::symbols::Namespace;
use super::{ScopeId, SymbolId};
use crate::ast::Path;
use log::trace;

/// Longest chain of `use` aliases followed before giving up
pub const MAX_ALIAS_HOPS: usize = 16;

/// Recursion guard for parent/delegate/super walks
const MAX_WALK_DEPTH: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    Found(SymbolId),
    NotFound,
    /// Exists in a private partition the use-site cannot see
    Private(SymbolId),
    /// Exists in a member scope that is temporarily restricted
    Restricted(SymbolId),
    /// The walk could not complete (alias loop, runaway graph)
    Error,
}

impl LookupResult {
    pub fn found(self) -> Option<SymbolId> {
        match self {
            LookupResult::Found(id) => Some(id),
            _ => None,
        }
    }

    /// The symbol the lookup reached, visible or not
    pub fn symbol(self) -> Option<SymbolId> {
        match self {
            LookupResult::Found(id) | LookupResult::Private(id) | LookupResult::Restricted(id) => {
                Some(id)
            }
            LookupResult::NotFound | LookupResult::Error => None,
        }
    }

    pub fn is_not_found(self) -> bool {
        self == LookupResult::NotFound
    }
}

impl ScopeGraph {
    /// Full lookup with capture bookkeeping
    pub fn lookup(&mut self, from: ScopeId, name: &str, ns: Option<Namespace>) -> LookupResult {
        let result = self.search(from, name, ns, 0);
        if let LookupResult::Found(id) = result {
            self.capture(from, id);
        }
        trace!("lookup `{}` from {} -> {:?}", name, from, result);
        result
    }

    /// Lookup without side effects
    pub fn peek(&self, from: ScopeId, name: &str, ns: Option<Namespace>) -> LookupResult {
        self.search(from, name, ns, 0)
    }

    /// Local table and private partition only; never captures
    pub fn lookup_here(&self, scope: ScopeId, name: &str, ns: Option<Namespace>) -> Option<SymbolId> {
        let data = self.scope(scope);
        data.table.find(name, ns).or_else(|| {
            data.inner
                .and_then(|inner| self.scope(inner).table.find(name, ns))
        })
    }

    /// Member access through `this`, `self`, `super` or a class name.
    ///
    /// With `via_super` the private partition is never opened, since the
    /// use-site is not lexically inside the ancestor.
    pub fn lookup_member(
        &self,
        member_scope: ScopeId,
        name: &str,
        ns: Option<Namespace>,
        via_super: bool,
    ) -> LookupResult {
        self.search_member(member_scope, name, ns, via_super, 0)
    }

    fn search(&self, id: ScopeId, name: &str, ns: Option<Namespace>, depth: usize) -> LookupResult {
        if depth > MAX_WALK_DEPTH {
            return LookupResult::Error;
        }

        let local = self.search_member(id, name, ns, false, depth);
        if !local.is_not_found() {
            return local;
        }

        let scope = self.scope(id);
        if !scope.sealed {
            if let Some(parent) = scope.parent {
                let result = self.search(parent, name, ns, depth + 1);
                if !result.is_not_found() {
                    return result;
                }
            }
        }

        match scope.delegate {
            Some(delegate) => self.search(delegate, name, ns, depth + 1),
            None => LookupResult::NotFound,
        }
    }

    /// Local table, private partition, member slots and superclass chain
    fn search_member(
        &self,
        id: ScopeId,
        name: &str,
        ns: Option<Namespace>,
        via_super: bool,
        depth: usize,
    ) -> LookupResult {
        if depth > MAX_WALK_DEPTH {
            return LookupResult::Error;
        }

        let scope = self.scope(id);
        let restrict = |sym| {
            if scope.is_restricted() {
                LookupResult::Restricted(sym)
            } else {
                LookupResult::Found(sym)
            }
        };

        if let Some(sym) = scope.table.find(name, ns) {
            return restrict(sym);
        }

        if let Some(inner) = scope.inner {
            if let Some(sym) = self.scope(inner).table.find(name, ns) {
                if via_super || !scope.is_active() {
                    return LookupResult::Private(sym);
                }
                return restrict(sym);
            }
        }

        let Some(member) = &scope.member else {
            return LookupResult::NotFound;
        };

        if matches!(ns, None | Some(Namespace::Value)) {
            if let Some(sym) = member.getters.get(name).or_else(|| member.setters.get(name)) {
                let sym = *sym;
                if self.symbol(sym).is_private() && (via_super || !scope.is_active()) {
                    return LookupResult::Private(sym);
                }
                return restrict(sym);
            }
        }

        match member.super_scope {
            Some(parent) => self.search_member(parent, name, ns, true, depth + 1),
            None => LookupResult::NotFound,
        }
    }

    /// Record `symbol` as captured on the scopes between `from` and its owner
    fn capture(&mut self, from: ScopeId, symbol: SymbolId) {
        let Some(owner) = self.symbol(symbol).scope else {
            return;
        };
        if !matches!(self.scope(owner).kind, ScopeKind::Function | ScopeKind::Block) {
            return;
        }
        if from == owner || !self.is_ancestor(owner, from) {
            return;
        }

        let mut current = from;
        let mut marked = false;
        while current != owner && !self.is_global(current) {
            self.scope_mut(current).captured.insert(symbol);
            marked = true;
            match self.scope(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }

        if marked {
            trace!("captured `{}` below {}", self.symbol(symbol).name, owner);
            self.symbol_mut(symbol).captured = true;
        }
    }

    /// True if `ancestor` is on the parent chain of `scope`
    pub fn is_ancestor(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        let mut current = self.scope(scope).parent;
        let mut depth = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            depth += 1;
            if depth > MAX_WALK_DEPTH {
                return false;
            }
            current = self.scope(id).parent;
        }
        false
    }

    /// Resolve a possibly qualified name.
    ///
    /// Single names go through [`lookup`](Self::lookup), then intrinsics
    /// for values, then a same-named alias. Qualified names walk the root
    /// scopes outward (rooted paths start at the unit).
    pub fn lookup_path(&mut self, from: ScopeId, path: &Path, ns: Namespace) -> LookupResult {
        if path.segments.is_empty() {
            return LookupResult::NotFound;
        }

        if path.is_single() {
            let name = path.last();
            let result = self.lookup(from, name, Some(ns));
            if !result.is_not_found() {
                return result;
            }
            if ns == Namespace::Value {
                let result = self.lookup(from, name, Some(Namespace::Internal));
                if !result.is_not_found() {
                    return result;
                }
            }
            return match self.lookup(from, name, Some(Namespace::Alias)) {
                LookupResult::Found(alias) => self.follow_alias(alias, ns, 1),
                other => other,
            };
        }

        for root in self.path_roots(from, path.rooted) {
            let result = self.resolve_from_root(root, &path.segments, ns, 0, None);
            if !result.is_not_found() {
                return result;
            }
        }
        LookupResult::NotFound
    }

    /// Root scopes a qualified path may start from, innermost first
    fn path_roots(&self, from: ScopeId, rooted: bool) -> Vec<ScopeId> {
        let global = self.global();
        let mut roots = Vec::new();
        if rooted {
            if let Some(unit) = self.unit_of(from) {
                roots.push(unit);
            }
        } else {
            let mut current = Some(self.root_of(from));
            while let Some(root) = current {
                roots.push(root);
                current = self.scope(root).parent.map(|p| self.root_of(p));
            }
        }
        if !roots.contains(&global) {
            roots.push(global);
        }
        roots
    }

    /// Target of a `use` alias. Alias paths are absolute: they resolve
    /// against the alias's unit first, then the global scope. The alias
    /// never stands for its own target, so `use lib;` cannot find itself.
    pub fn follow_alias(&self, alias: SymbolId, ns: Namespace, hops: usize) -> LookupResult {
        if hops > MAX_ALIAS_HOPS {
            return LookupResult::Error;
        }
        let symbol = self.symbol(alias);
        let Some(data) = symbol.as_alias() else {
            return LookupResult::NotFound;
        };

        let global = self.global();
        let home = symbol
            .scope
            .and_then(|scope| self.unit_of(scope))
            .unwrap_or(global);

        let skip = Some(alias);
        let mut result = self.resolve_from_root(home, &data.path.segments, ns, hops, skip);
        if result.is_not_found() && home != global {
            result = self.resolve_from_root(global, &data.path.segments, ns, hops, skip);
        }
        result
    }

    fn resolve_from_root(
        &self,
        root: ScopeId,
        segments: &[String],
        ns: Namespace,
        hops: usize,
        skip: Option<SymbolId>,
    ) -> LookupResult {
        if hops > MAX_ALIAS_HOPS {
            return LookupResult::Error;
        }
        let Some((last, modules)) = segments.split_last() else {
            return LookupResult::NotFound;
        };

        let mut scope = root;
        for (i, segment) in modules.iter().enumerate() {
            if let Some(next) = self.scope(scope).modules.get(segment) {
                scope = *next;
                continue;
            }
            let Some(alias) = self.visible_alias(scope, segment, skip) else {
                return LookupResult::NotFound;
            };
            let Some(data) = self.symbol(alias).as_alias() else {
                return LookupResult::NotFound;
            };
            let mut expanded = data.path.segments.clone();
            expanded.extend(segments[i + 1..].iter().cloned());
            return self.resolve_from_root(root, &expanded, ns, hops + 1, Some(alias));
        }

        self.resolve_item(scope, last, ns, hops, skip)
    }

    /// Final segment of a qualified path, looked up in one root scope
    fn resolve_item(
        &self,
        scope: ScopeId,
        name: &str,
        ns: Namespace,
        hops: usize,
        skip: Option<SymbolId>,
    ) -> LookupResult {
        let data = self.scope(scope);
        if let Some(id) = data.table.get(ns, name) {
            return LookupResult::Found(id);
        }
        if let Some(inner) = data.inner {
            if let Some(id) = self.scope(inner).table.get(ns, name) {
                return if data.is_active() {
                    LookupResult::Found(id)
                } else {
                    LookupResult::Private(id)
                };
            }
        }
        if ns == Namespace::Value {
            if let Some(id) = data.table.get(Namespace::Internal, name) {
                return LookupResult::Found(id);
            }
        }
        match self.visible_alias(scope, name, skip) {
            Some(alias) => self.follow_alias(alias, ns, hops + 1),
            None => LookupResult::NotFound,
        }
    }

    /// Public alias of a root scope, or a private one while it is active
    fn visible_alias(&self, scope: ScopeId, name: &str, skip: Option<SymbolId>) -> Option<SymbolId> {
        let data = self.scope(scope);
        data.table
            .get(Namespace::Alias, name)
            .or_else(|| {
                data.inner
                    .filter(|_| data.is_active())
                    .and_then(|inner| self.scope(inner).table.get(Namespace::Alias, name))
            })
            .filter(|id| Some(*id) != skip)
    }
}
