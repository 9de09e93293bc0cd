//! Declaration insertion rules
//!
//! `try_add` decides what inserting a symbol into a scope would do, looking
//! at the first same-named occupant along the scope's own tables, its
//! superclass member chain and its parents. `add` applies the decision and
//! keeps every symbol's owning-scope id in step with the table holding it.

use super::scopes::{ScopeGraph, ScopeKind};
use super::symbols::{Namespace, SymbolFlags};
use super::{ScopeId, SymbolId};
use log::debug;

/// Why an insertion was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Collides with a bootstrap or intrinsic symbol
    Managed,
    /// Refines a forward declaration with another kind
    KindMismatch,
    /// Refines a forward declaration with different modifiers
    FlagMismatch,
    Final,
    Const,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddDecision {
    Reject {
        reason: RejectReason,
        existing: SymbolId,
    },
    /// Forward declaration repeated; the existing one stays
    NoOp(SymbolId),
    /// Fresh insert, possibly shadowing an ancestor's symbol
    Add { shadows: Option<SymbolId> },
    /// Completes the given forward declaration in place
    Replace(SymbolId),
}

impl AddDecision {
    /// True if the new symbol ended up in a table
    pub fn is_live(&self) -> bool {
        matches!(self, AddDecision::Add { .. } | AddDecision::Replace(_))
    }
}

impl ScopeGraph {
    /// Visibility after the default rule: private unless stated.
    /// Protected only counts inside member scopes.
    pub fn effective_flags(&self, scope: ScopeId, flags: SymbolFlags) -> SymbolFlags {
        let in_member = self.scope(self.owner(scope)).kind == ScopeKind::Member;
        let mut flags = flags;
        if !in_member && flags.contains(SymbolFlags::PROTECTED) {
            flags.remove(SymbolFlags::PROTECTED);
        }
        if !flags.intersects(SymbolFlags::VISIBILITY) {
            flags.insert(SymbolFlags::PRIVATE);
        }
        flags
    }

    /// Scopes searched for an existing occupant, nearest first
    fn add_chain(&self, target: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = Some(self.owner(target));
        while let Some(scope) = current {
            if chain.contains(&scope) {
                break;
            }
            self.push_with_inner(scope, &mut chain);

            let mut super_scope = self.member_info(scope).and_then(|m| m.super_scope);
            while let Some(parent) = super_scope {
                if chain.contains(&parent) {
                    break;
                }
                self.push_with_inner(parent, &mut chain);
                super_scope = self.member_info(parent).and_then(|m| m.super_scope);
            }

            current = self.scope(scope).parent.map(|p| self.owner(p));
        }
        chain
    }

    fn push_with_inner(&self, scope: ScopeId, chain: &mut Vec<ScopeId>) {
        chain.push(scope);
        if let Some(inner) = self.scope(scope).inner {
            chain.push(inner);
        }
    }

    /// Decide how `symbol` would enter `target`, without mutating anything
    pub fn try_add(&self, target: ScopeId, symbol: SymbolId) -> AddDecision {
        let target = self.owner(target);
        let new = self.symbol(symbol);
        let new_flags = self.effective_flags(target, new.flags);
        let chain = self.add_chain(target);

        for scope in &chain {
            let table = &self.scope(*scope).table;
            let managed = Namespace::ALL
                .iter()
                .filter_map(|ns| table.get(*ns, &new.name))
                .find(|id| *id != symbol && self.symbol(*id).managed);
            if let Some(existing) = managed {
                return AddDecision::Reject {
                    reason: RejectReason::Managed,
                    existing,
                };
            }
        }

        let existing = chain
            .iter()
            .find_map(|scope| self.scope(*scope).table.get(new.ns, &new.name))
            .filter(|id| *id != symbol);
        let Some(existing) = existing else {
            return AddDecision::Add { shadows: None };
        };

        let old = self.symbol(existing);
        let reject = |reason| AddDecision::Reject { reason, existing };

        if old.is_incomplete() {
            if old.kind() != new.kind() {
                return reject(RejectReason::KindMismatch);
            }
            if new_flags.contains(SymbolFlags::INCOMPLETE) {
                return AddDecision::NoOp(existing);
            }
            if old.flags.without(SymbolFlags::INCOMPLETE) == new_flags {
                return AddDecision::Replace(existing);
            }
            return reject(RejectReason::FlagMismatch);
        }

        if old.is_final() {
            return reject(RejectReason::Final);
        }

        let same_scope = old.scope.map(|s| self.owner(s)) == Some(target);
        if same_scope {
            if old.is_const() {
                return reject(RejectReason::Const);
            }
            return reject(RejectReason::Duplicate);
        }

        AddDecision::Add {
            shadows: Some(existing),
        }
    }

    /// Apply [`try_add`](Self::try_add). Private symbols of partitioned
    /// scopes land in the inner partition.
    pub fn add(&mut self, target: ScopeId, symbol: SymbolId) -> AddDecision {
        let target = self.owner(target);
        let flags = self.effective_flags(target, self.symbol(symbol).flags);
        self.symbol_mut(symbol).flags = flags;

        let decision = self.try_add(target, symbol);
        match decision {
            AddDecision::Add { shadows } => {
                let place = match self.scope(target).inner {
                    Some(inner) if flags.contains(SymbolFlags::PRIVATE) => inner,
                    _ => target,
                };
                let (ns, name) = {
                    let sym = self.symbol(symbol);
                    (sym.ns, sym.name.clone())
                };
                self.scope_mut(place).table.insert(ns, &name, symbol);
                self.symbol_mut(symbol).scope = Some(place);
                if let Some(old) = shadows {
                    self.scope_mut(target).shadowed.push(old);
                }
                debug!("added `{}` to {}", name, place);
            }
            AddDecision::Replace(old) => {
                let (ns, name) = {
                    let sym = self.symbol(symbol);
                    (sym.ns, sym.name.clone())
                };
                if let Some(place) = self.symbol(old).scope {
                    self.scope_mut(place).table.replace(ns, &name, symbol);
                    self.symbol_mut(symbol).scope = Some(place);
                    let owner = self.owner(place);
                    self.scope_mut(owner).dropped.push(old);
                }
                let dropped = self.symbol_mut(old);
                dropped.scope = None;
                dropped.reachable = false;
                debug!("`{}` completes its forward declaration", name);
            }
            AddDecision::NoOp(_) | AddDecision::Reject { .. } => {}
        }
        decision
    }

    /// Insert a bootstrap symbol that can never be redeclared
    pub fn add_managed(&mut self, target: ScopeId, symbol: SymbolId, ns: Namespace) -> AddDecision {
        let sym = self.symbol_mut(symbol);
        sym.managed = true;
        sym.ns = ns;
        if !sym.flags.intersects(SymbolFlags::VISIBILITY) {
            sym.flags.insert(SymbolFlags::PUBLIC);
        }
        self.add(target, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::symbols::{
        ClassSymbol, FunctionSymbol, Resolution, Symbol, SymbolData, SymbolKind, VariableSymbol,
    };
    use crate::sema::LookupResult;
    use source_map::SourceSpan;

    fn func(graph: &mut ScopeGraph, name: &str, flags: SymbolFlags) -> SymbolId {
        graph.alloc(Symbol::function(name, SourceSpan::default(), flags, FunctionSymbol::default()))
    }

    fn var(graph: &mut ScopeGraph, name: &str, flags: SymbolFlags) -> SymbolId {
        graph.alloc(Symbol::variable(name, SourceSpan::default(), flags, VariableSymbol::default()))
    }

    fn class(graph: &mut ScopeGraph, scope: ScopeId, name: &str) -> SymbolId {
        let placeholder = graph.global();
        let data = SymbolData::Class(ClassSymbol {
            superclass: None,
            interfaces: Vec::new(),
            traits: Vec::new(),
            members: placeholder,
            resolution: Resolution::Unresolved,
        });
        let id = graph.alloc(Symbol::new(name, SourceSpan::default(), SymbolFlags::NONE, data));
        let members = graph.new_member_scope(id, scope);
        if let Some(class) = graph.symbol_mut(id).as_class_mut() {
            class.members = members;
        }
        id
    }

    fn setup() -> (ScopeGraph, ScopeId) {
        let mut graph = ScopeGraph::new();
        let unit = graph.new_scope(ScopeKind::Unit, Some(graph.global()));
        graph.enter(unit);
        (graph, unit)
    }

    #[test]
    fn test_namespace_isolation() {
        let (mut graph, unit) = setup();
        let f = func(&mut graph, "x", SymbolFlags::NONE);
        let c = class(&mut graph, unit, "x");
        assert!(graph.add(unit, f).is_live());
        assert!(graph.add(unit, c).is_live());
        assert_eq!(graph.symbol(c).kind(), SymbolKind::Class);

        let again = func(&mut graph, "x", SymbolFlags::NONE);
        assert_eq!(
            graph.add(unit, again),
            AddDecision::Reject {
                reason: RejectReason::Duplicate,
                existing: f
            }
        );
        assert!(graph.symbol(again).scope.is_none());
    }

    #[test]
    fn test_default_visibility_is_private() {
        let (mut graph, unit) = setup();
        let f = func(&mut graph, "f", SymbolFlags::NONE);
        graph.add(unit, f);
        assert!(graph.symbol(f).is_private());
        assert_eq!(graph.symbol(f).scope, graph.scope(unit).inner);

        let block = graph.new_scope(ScopeKind::Block, Some(unit));
        let p = var(&mut graph, "p", SymbolFlags::PROTECTED);
        graph.add(block, p);
        assert!(graph.symbol(p).is_private());
        assert!(!graph.symbol(p).flags.contains(SymbolFlags::PROTECTED));
    }

    #[test]
    fn test_incomplete_refinement() {
        let (mut graph, unit) = setup();
        let forward = func(&mut graph, "f", SymbolFlags::EXTERN | SymbolFlags::INCOMPLETE);
        assert!(graph.add(unit, forward).is_live());

        let repeat = func(&mut graph, "f", SymbolFlags::EXTERN | SymbolFlags::INCOMPLETE);
        assert_eq!(graph.add(unit, repeat), AddDecision::NoOp(forward));

        let concrete = func(&mut graph, "f", SymbolFlags::EXTERN);
        assert_eq!(graph.add(unit, concrete), AddDecision::Replace(forward));
        assert_eq!(graph.peek(unit, "f", None), LookupResult::Found(concrete));
        assert!(!graph.symbol(forward).reachable);
        assert!(graph.symbol(forward).scope.is_none());
        assert_eq!(graph.scope(unit).dropped, vec![forward]);
    }

    #[test]
    fn test_incomplete_refinement_rejections() {
        let (mut graph, unit) = setup();
        let forward = func(&mut graph, "f", SymbolFlags::INCOMPLETE);
        graph.add(unit, forward);

        let mismatched = func(&mut graph, "f", SymbolFlags::STATIC);
        assert_eq!(
            graph.add(unit, mismatched),
            AddDecision::Reject {
                reason: RejectReason::FlagMismatch,
                existing: forward
            }
        );
    }

    #[test]
    fn test_kind_mismatch_in_same_namespace() {
        let (mut graph, unit) = setup();
        let forward = func(&mut graph, "f", SymbolFlags::INCOMPLETE);
        graph.add(unit, forward);

        // variables and functions share the value namespace
        let wrong = var(&mut graph, "f", SymbolFlags::NONE);
        assert_eq!(
            graph.add(unit, wrong),
            AddDecision::Reject {
                reason: RejectReason::KindMismatch,
                existing: forward
            }
        );
    }

    #[test]
    fn test_shadowing_vs_duplication() {
        let (mut graph, unit) = setup();
        let outer = var(&mut graph, "x", SymbolFlags::NONE);
        graph.add(unit, outer);

        let block = graph.new_scope(ScopeKind::Block, Some(unit));
        let inner = var(&mut graph, "x", SymbolFlags::NONE);
        assert_eq!(graph.add(block, inner), AddDecision::Add { shadows: Some(outer) });
        assert_eq!(graph.peek(block, "x", None), LookupResult::Found(inner));
        assert_eq!(graph.scope(block).shadowed, vec![outer]);

        let twin = var(&mut graph, "x", SymbolFlags::NONE);
        assert!(matches!(
            graph.add(block, twin),
            AddDecision::Reject {
                reason: RejectReason::Duplicate,
                ..
            }
        ));
    }

    #[test]
    fn test_final_protects_whole_chain() {
        let (mut graph, unit) = setup();
        let locked = func(&mut graph, "locked", SymbolFlags::FINAL | SymbolFlags::PUBLIC);
        graph.add(unit, locked);

        let func_scope = graph.new_scope(ScopeKind::Function, Some(unit));
        let deep = graph.new_scope(ScopeKind::Block, Some(func_scope));
        let attempt = func(&mut graph, "locked", SymbolFlags::NONE);
        assert_eq!(
            graph.add(deep, attempt),
            AddDecision::Reject {
                reason: RejectReason::Final,
                existing: locked
            }
        );
    }

    #[test]
    fn test_const_protects_only_own_scope() {
        let (mut graph, unit) = setup();
        let limit = var(&mut graph, "LIMIT", SymbolFlags::CONST);
        graph.add(unit, limit);

        let same = var(&mut graph, "LIMIT", SymbolFlags::NONE);
        assert_eq!(
            graph.add(unit, same),
            AddDecision::Reject {
                reason: RejectReason::Const,
                existing: limit
            }
        );

        let block = graph.new_scope(ScopeKind::Block, Some(unit));
        let nested = var(&mut graph, "LIMIT", SymbolFlags::NONE);
        assert!(graph.add(block, nested).is_live());
    }

    #[test]
    fn test_managed_symbols_cannot_be_redeclared() {
        let (mut graph, unit) = setup();
        let global = graph.global();
        let print = func(&mut graph, "print", SymbolFlags::NONE);
        assert!(graph.add_managed(global, print, Namespace::Internal).is_live());

        let user = func(&mut graph, "print", SymbolFlags::NONE);
        assert_eq!(
            graph.add(unit, user),
            AddDecision::Reject {
                reason: RejectReason::Managed,
                existing: print
            }
        );
    }

    #[test]
    fn test_member_override_sees_superclass_final() {
        let (mut graph, unit) = setup();
        let base = class(&mut graph, unit, "Base");
        let derived = class(&mut graph, unit, "Derived");
        let base_members = graph.members_of(base).unwrap();
        let derived_members = graph.members_of(derived).unwrap();
        graph.member_info_mut(derived_members).unwrap().super_scope = Some(base_members);

        let sealed = func(&mut graph, "run", SymbolFlags::FINAL | SymbolFlags::PUBLIC);
        graph.add(base_members, sealed);
        let open = func(&mut graph, "walk", SymbolFlags::PUBLIC);
        graph.add(base_members, open);

        let override_run = func(&mut graph, "run", SymbolFlags::PUBLIC);
        assert!(matches!(
            graph.add(derived_members, override_run),
            AddDecision::Reject {
                reason: RejectReason::Final,
                ..
            }
        ));
        let override_walk = func(&mut graph, "walk", SymbolFlags::PUBLIC);
        assert_eq!(
            graph.add(derived_members, override_walk),
            AddDecision::Add { shadows: Some(open) }
        );
    }
}
