//! Publishing a unit's declarations to the session
//!
//! After a unit resolves, its non-private unit-level symbols (including
//! public `use` aliases) become visible from the global scope, and its
//! modules are merged into the global module tree. Exported symbols keep
//! their owning scope; only the global tables gain an entry, so later
//! units find them through the ordinary parent walk and qualified paths.

use super::add::RejectReason;
use super::scopes::{ScopeGraph, ScopeKind};
use super::symbols::Namespace;
use super::{ScopeId, SymbolId};
use log::{debug, trace};

/// An exported symbol whose name was already taken in the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportConflict {
    pub symbol: SymbolId,
    pub existing: SymbolId,
    pub reason: RejectReason,
}

impl ScopeGraph {
    /// Export `unit` into the global scope. Returns the symbols that
    /// collided with an earlier unit's exports; they stay private to
    /// their own unit.
    pub fn export_unit(&mut self, unit: ScopeId) -> Vec<ExportConflict> {
        let global = self.global();
        let mut conflicts = Vec::new();
        self.export_table(unit, global, &mut conflicts);

        let mut stack = vec![(unit, global)];
        while let Some((src, dst)) = stack.pop() {
            let modules: Vec<(String, ScopeId)> = self
                .scope(src)
                .modules
                .iter()
                .map(|(name, id)| (name.clone(), *id))
                .collect();
            for (name, module) in modules {
                let target = self.global_module(dst, &name);
                trace!("exporting module {} into {}", self.module_path(module), target);
                self.export_table(module, target, &mut conflicts);
                stack.push((module, target));
            }
        }

        debug!(
            "unit {} exported, {} conflict(s)",
            unit,
            conflicts.len()
        );
        conflicts
    }

    /// Copy the public entries of `src`'s own table (never its private
    /// partition) into `dst`
    fn export_table(&mut self, src: ScopeId, dst: ScopeId, conflicts: &mut Vec<ExportConflict>) {
        let entries: Vec<(Namespace, String, SymbolId)> = Namespace::ALL
            .iter()
            .filter(|ns| **ns != Namespace::Internal)
            .flat_map(|ns| {
                self.scope(src)
                    .table
                    .entries(*ns)
                    .map(move |(name, id)| (*ns, name.to_string(), id))
            })
            .collect();

        for (ns, name, symbol) in entries {
            match self.scope(dst).table.get(ns, &name) {
                None => {
                    self.scope_mut(dst).table.insert(ns, &name, symbol);
                    trace!("exported `{}` into {}", name, dst);
                }
                Some(existing) if existing == symbol => {}
                Some(existing) => {
                    let old = self.symbol(existing);
                    let reason = if old.managed {
                        RejectReason::Managed
                    } else if old.is_final() {
                        RejectReason::Final
                    } else if old.is_const() {
                        RejectReason::Const
                    } else {
                        RejectReason::Duplicate
                    };
                    conflicts.push(ExportConflict {
                        symbol,
                        existing,
                        reason,
                    });
                }
            }
        }
    }

    /// Module `name` under a global-tree scope, created on first export
    fn global_module(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        if let Some(existing) = self.scope(parent).modules.get(name) {
            return *existing;
        }
        let module = self.new_scope(ScopeKind::Module, Some(parent));
        self.scope_mut(module).name = Some(name.to_string());
        self.scope_mut(parent).modules.insert(name.to_string(), module);
        module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Path;
    use crate::sema::symbols::{Symbol, SymbolFlags, VariableSymbol};
    use crate::sema::LookupResult;
    use source_map::SourceSpan;

    fn declare(graph: &mut ScopeGraph, scope: ScopeId, name: &str, flags: SymbolFlags) -> SymbolId {
        let id = graph.alloc(Symbol::variable(name, SourceSpan::default(), flags, VariableSymbol::default()));
        assert!(graph.add(scope, id).is_live());
        id
    }

    fn unit(graph: &mut ScopeGraph) -> ScopeId {
        let unit = graph.new_scope(ScopeKind::Unit, Some(graph.global()));
        graph.enter(unit);
        unit
    }

    #[test]
    fn test_public_symbols_reach_later_units() {
        let mut graph = ScopeGraph::new();
        let first = unit(&mut graph);
        let shared = declare(&mut graph, first, "shared", SymbolFlags::PUBLIC);
        declare(&mut graph, first, "hidden", SymbolFlags::NONE);
        assert!(graph.export_unit(first).is_empty());
        graph.leave(first).unwrap();

        let second = unit(&mut graph);
        assert_eq!(graph.peek(second, "shared", None), LookupResult::Found(shared));
        assert!(graph.peek(second, "hidden", None).is_not_found());
        assert_eq!(graph.symbol(shared).scope, Some(first));
    }

    #[test]
    fn test_modules_merge_into_the_global_tree() {
        let mut graph = ScopeGraph::new();
        let first = unit(&mut graph);
        let util = graph.new_scope(ScopeKind::Module, Some(first));
        graph.scope_mut(util).name = Some("util".into());
        graph.scope_mut(first).modules.insert("util".into(), util);
        let helper = declare(&mut graph, util, "helper", SymbolFlags::PUBLIC);
        declare(&mut graph, util, "secret", SymbolFlags::PRIVATE);
        graph.export_unit(first);

        let second = unit(&mut graph);
        let other = graph.new_scope(ScopeKind::Module, Some(second));
        graph.scope_mut(second).modules.insert("util".into(), other);
        let tool = declare(&mut graph, other, "tool", SymbolFlags::PUBLIC);
        graph.export_unit(second);

        let third = unit(&mut graph);
        assert_eq!(
            graph.lookup_path(third, &Path::from("util::helper"), Namespace::Value),
            LookupResult::Found(helper)
        );
        assert_eq!(
            graph.lookup_path(third, &Path::from("util::tool"), Namespace::Value),
            LookupResult::Found(tool)
        );
        assert!(graph
            .lookup_path(third, &Path::from("util::secret"), Namespace::Value)
            .is_not_found());
    }

    #[test]
    fn test_second_export_of_a_name_conflicts() {
        let mut graph = ScopeGraph::new();
        let first = unit(&mut graph);
        let original = declare(&mut graph, first, "config", SymbolFlags::PUBLIC);
        graph.export_unit(first);

        let second = unit(&mut graph);
        let again = declare(&mut graph, second, "config", SymbolFlags::PUBLIC);
        let conflicts = graph.export_unit(second);

        assert_eq!(
            conflicts,
            vec![ExportConflict {
                symbol: again,
                existing: original,
                reason: RejectReason::Duplicate,
            }]
        );
        assert_eq!(graph.scope(graph.global()).table.get(Namespace::Value, "config"), Some(original));
    }
}
