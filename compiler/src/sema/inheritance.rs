//! Inheritance and mixin resolution
//!
//! Resolves a type's superclass, interfaces and used traits into concrete
//! links, copies trait members into their hosts and checks the abstract
//! obligations a class inherits. Every type is resolved at most once; the
//! `Resolving` state doubles as the cycle guard.

use super::add::AddDecision;
use super::collector::{report_rejection, Collector};
use super::lookup::LookupResult;
use super::scopes::ScopeGraph;
use super::sink::{DiagnosticSink, ResolveErrorKind};
use super::symbols::{Namespace, Resolution, SymbolData, SymbolFlags, SymbolKind, TraitUsage, TypeHint, TypeRef};
use super::{NodeId, ScopeId, SymbolId};
use crate::ast::{Ast, ConstBinding, FnRole, NodeKind, Path};
use fxhash::FxHashSet;
use log::{debug, trace};

/// An engine constant inside a trait member copied into a class, bound
/// once the whole unit is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LateBinding {
    pub node: NodeId,
    pub host: SymbolId,
    pub function: SymbolId,
}

pub struct Inheritance<'a> {
    graph: &'a mut ScopeGraph,
    ast: &'a mut Ast,
    sink: &'a mut DiagnosticSink,
    root_object: Option<SymbolId>,
    late: &'a mut Vec<LateBinding>,
}

impl<'a> Inheritance<'a> {
    pub fn new(
        graph: &'a mut ScopeGraph,
        ast: &'a mut Ast,
        sink: &'a mut DiagnosticSink,
        root_object: Option<SymbolId>,
        late: &'a mut Vec<LateBinding>,
    ) -> Self {
        Self {
            graph,
            ast,
            sink,
            root_object,
            late,
        }
    }

    /// Resolve a class, trait or interface; no-op for anything else or
    /// for types already resolved
    pub fn resolve_type(&mut self, symbol: SymbolId) {
        if self.graph.symbol(symbol).resolution() != Some(Resolution::Unresolved) {
            return;
        }
        self.graph
            .symbol_mut(symbol)
            .set_resolution(Resolution::Resolving);
        trace!("resolving {}", self.graph.symbol_path(symbol));

        match self.graph.symbol(symbol).kind() {
            SymbolKind::Class => self.resolve_class(symbol),
            SymbolKind::Trait => self.resolve_trait(symbol),
            SymbolKind::Interface => self.resolve_interface(symbol),
            _ => {}
        }

        self.graph
            .symbol_mut(symbol)
            .set_resolution(Resolution::Resolved);
    }

    /// Scope type references of `symbol` are looked up from
    fn declaring_scope(&self, symbol: SymbolId) -> ScopeId {
        let sym = self.graph.symbol(symbol);
        match sym.scope {
            Some(scope) => self.graph.owner(scope),
            None => sym
                .members()
                .and_then(|members| self.graph.scope(members).parent)
                .unwrap_or_else(|| self.graph.global()),
        }
    }

    /// Look up a referenced type, check its kind and resolve it first
    fn require_type(&mut self, from: ScopeId, tref: &TypeRef, expected: SymbolKind) -> Option<SymbolId> {
        let missing_kind = if expected == SymbolKind::Class {
            ResolveErrorKind::CyclicOrMissingSuperclass
        } else {
            ResolveErrorKind::UndefinedSymbol
        };

        let target = match self.graph.lookup_path(from, &tref.path, Namespace::Type) {
            LookupResult::Found(id) => id,
            LookupResult::Private(_) => {
                self.sink.error(
                    ResolveErrorKind::PrivateAccess,
                    tref.span,
                    format!("{} `{}` is private", expected, tref.path),
                );
                return None;
            }
            LookupResult::Restricted(_) => {
                self.sink.error(
                    ResolveErrorKind::RestrictedAccess,
                    tref.span,
                    format!("{} `{}` is not accessible here", expected, tref.path),
                );
                return None;
            }
            LookupResult::NotFound => {
                self.sink.error(
                    missing_kind,
                    tref.span,
                    format!("unknown {} `{}`", expected, tref.path),
                );
                return None;
            }
            LookupResult::Error => {
                self.sink.error(
                    ResolveErrorKind::LookupFailed,
                    tref.span,
                    format!("{} `{}` could not be resolved", expected, tref.path),
                );
                return None;
            }
        };

        let found = self.graph.symbol(target).kind();
        if found != expected {
            let kind = if expected == SymbolKind::Class {
                ResolveErrorKind::CyclicOrMissingSuperclass
            } else {
                ResolveErrorKind::InterfaceContractViolation
            };
            self.sink.error(
                kind,
                tref.span,
                format!("`{}` is a {}, expected a {}", tref.path, found, expected),
            );
            return None;
        }

        if self.graph.symbol(target).resolution() == Some(Resolution::Resolving) {
            self.sink.error(
                ResolveErrorKind::CyclicOrMissingSuperclass,
                tref.span,
                format!("cyclic {} hierarchy through `{}`", expected, tref.path),
            );
            return None;
        }

        self.resolve_type(target);
        Some(target)
    }

    fn resolve_class(&mut self, symbol: SymbolId) {
        let Some(class) = self.graph.symbol(symbol).as_class().cloned() else {
            return;
        };
        let from = self.declaring_scope(symbol);
        let members = class.members;

        let superclass = match &class.superclass {
            Some(tref) => {
                let target = self.require_type(from, tref, SymbolKind::Class);
                if let Some(target) = target {
                    let base = self.graph.symbol(target);
                    if base.is_final() {
                        let declared = base.span;
                        self.sink.error_with_previous(
                            ResolveErrorKind::FinalOverride,
                            tref.span,
                            format!("cannot extend final class `{}`", tref.path),
                            declared,
                            "declared final here",
                        );
                    }
                }
                target
            }
            None => self.root_object.filter(|root| *root != symbol),
        };
        if let Some(target) = superclass {
            let super_scope = self.graph.members_of(target);
            if let Some(info) = self.graph.member_info_mut(members) {
                info.super_scope = super_scope;
            }
            if let Some(data) = self.graph.symbol_mut(symbol).as_class_mut() {
                if let Some(tref) = data.superclass.as_mut() {
                    tref.target = Some(target);
                }
            }
        }

        for (index, tref) in class.interfaces.iter().enumerate() {
            if let Some(target) = self.require_type(from, tref, SymbolKind::Interface) {
                if let Some(data) = self.graph.symbol_mut(symbol).as_class_mut() {
                    data.interfaces[index].target = Some(target);
                }
            }
        }

        self.apply_traits(symbol, from, &class.traits);
        self.resolve_member_hints(symbol);
        self.mark_abstract(symbol);
        self.verify_contracts(symbol);
    }

    fn resolve_trait(&mut self, symbol: SymbolId) {
        let traits = match &self.graph.symbol(symbol).data {
            SymbolData::Trait(data) => data.traits.clone(),
            _ => return,
        };
        let from = self.declaring_scope(symbol);
        self.apply_traits(symbol, from, &traits);
        self.resolve_member_hints(symbol);
    }

    fn resolve_interface(&mut self, symbol: SymbolId) {
        let parents = match &self.graph.symbol(symbol).data {
            SymbolData::Interface(data) => data.interfaces.clone(),
            _ => return,
        };
        let from = self.declaring_scope(symbol);
        for (index, tref) in parents.iter().enumerate() {
            if let Some(target) = self.require_type(from, tref, SymbolKind::Interface) {
                if let SymbolData::Interface(data) = &mut self.graph.symbol_mut(symbol).data {
                    data.interfaces[index].target = Some(target);
                }
            }
        }
        self.resolve_member_hints(symbol);
    }

    fn apply_traits(&mut self, host: SymbolId, from: ScopeId, usages: &[TraitUsage]) {
        for usage in usages {
            if let Some(target) = self.require_type(from, &usage.trait_ref, SymbolKind::Trait) {
                self.flatten(host, target, usage);
            }
        }
    }

    /// Copy the members a usage clause selects from `source` into `host`.
    /// Members the host already has are left alone.
    pub fn flatten(&mut self, host: SymbolId, source: SymbolId, usage: &TraitUsage) {
        let (Some(host_scope), Some(trait_scope)) =
            (self.graph.members_of(host), self.graph.members_of(source))
        else {
            return;
        };

        let candidates = match &usage.item {
            None => self.graph.member_ids(source),
            Some(name) => match self.graph.lookup_here(trait_scope, name, Some(Namespace::Value)) {
                Some(member) => vec![member],
                None => {
                    self.sink.error(
                        ResolveErrorKind::UndefinedSymbol,
                        usage.span,
                        format!("trait `{}` has no member `{}`", usage.trait_ref.path, name),
                    );
                    return;
                }
            },
        };

        for member in candidates {
            let dest = match (&usage.item, &usage.alias) {
                (Some(_), Some(alias)) => alias.clone(),
                _ => self.graph.symbol(member).name.clone(),
            };
            let ns = self.graph.symbol(member).ns;
            if self.graph.lookup_here(host_scope, &dest, Some(ns)).is_some() {
                continue;
            }

            let copy = self.clone_member(member, source, &dest, usage.flags);
            match self.graph.add(host_scope, copy) {
                AddDecision::Reject { reason, existing } => {
                    report_rejection(self.graph, self.sink, copy, reason, existing);
                }
                decision if decision.is_live() => self.collect_copy(host, copy, host_scope, trait_scope),
                _ => {}
            }
        }

        if usage.item.is_none() {
            self.flatten_slots(host, host_scope, source, trait_scope);
        }
    }

    /// Constructor, destructor and accessor slots the host leaves empty
    fn flatten_slots(&mut self, host: SymbolId, host_scope: ScopeId, source: SymbolId, trait_scope: ScopeId) {
        let Some(trait_info) = self.graph.member_info(trait_scope).cloned() else {
            return;
        };

        let mut copies = Vec::new();
        for (role, slot) in [(FnRole::Constructor, trait_info.ctor), (FnRole::Destructor, trait_info.dtor)] {
            let Some(member) = slot else { continue };
            let taken = self.graph.member_info(host_scope).and_then(|info| match role {
                FnRole::Constructor => info.ctor,
                _ => info.dtor,
            });
            if taken.is_none() {
                copies.push((role, member));
            }
        }
        for (role, slots) in [(FnRole::Getter, &trait_info.getters), (FnRole::Setter, &trait_info.setters)] {
            for (name, member) in slots {
                let taken = self.graph.member_info(host_scope).is_some_and(|info| match role {
                    FnRole::Getter => info.getters.contains_key(name),
                    _ => info.setters.contains_key(name),
                });
                if !taken {
                    copies.push((role, *member));
                }
            }
        }

        for (role, member) in copies {
            let name = self.graph.symbol(member).name.clone();
            let copy = self.clone_member(member, source, &name, SymbolFlags::NONE);
            self.graph.symbol_mut(copy).scope = Some(host_scope);
            if let Some(info) = self.graph.member_info_mut(host_scope) {
                match role {
                    FnRole::Constructor => info.ctor = Some(copy),
                    FnRole::Destructor => info.dtor = Some(copy),
                    FnRole::Getter => {
                        info.getters.insert(name, copy);
                    }
                    _ => {
                        info.setters.insert(name, copy);
                    }
                }
            }
            self.collect_copy(host, copy, host_scope, trait_scope);
        }
    }

    /// Detached copy of a trait member with its own parameters and subtree
    fn clone_member(&mut self, member: SymbolId, source: SymbolId, name: &str, flags: SymbolFlags) -> SymbolId {
        let mut copy = self.graph.symbol(member).clone_detached();
        copy.name = name.to_string();
        copy.origin = Some(copy.origin.unwrap_or(source));
        if flags.intersects(SymbolFlags::VISIBILITY) {
            copy.flags.remove(SymbolFlags::VISIBILITY);
        }
        copy.flags.insert(flags);

        match &mut copy.data {
            SymbolData::Function(func) => {
                func.params = func
                    .params
                    .iter()
                    .map(|param| {
                        let detached = self.graph.symbol(*param).clone_detached();
                        self.graph.alloc(detached)
                    })
                    .collect();
                func.body_scope = None;
                copy.node = copy.node.map(|node| self.ast.clone_subtree(node));
            }
            SymbolData::Variable(var) => {
                var.init = var.init.map(|node| self.ast.clone_subtree(node));
            }
            _ => {}
        }

        let id = self.graph.alloc(copy);
        debug!("copied {} into {}", self.graph.symbol_path(member), name);
        id
    }

    /// Collect the body of a function copied into a class and defer the
    /// engine constants it contains
    fn collect_copy(&mut self, host: SymbolId, copy: SymbolId, host_scope: ScopeId, trait_scope: ScopeId) {
        if !self.graph.is_class(host) {
            return;
        }
        let Some(func) = self.graph.symbol(copy).as_function() else {
            return;
        };
        if !func.has_body {
            return;
        }
        let Some(node) = self.graph.symbol(copy).node else {
            return;
        };

        Collector::new(self.graph, self.ast, self.sink, host_scope).collect_cloned_function(
            copy,
            node,
            host_scope,
            Some(trait_scope),
        );

        for descendant in self.ast.descendants(node) {
            if matches!(self.ast.node(descendant).kind, NodeKind::EngineConst { .. }) {
                self.ast.node_mut(descendant).binding = Some(ConstBinding::PendingClassContext);
                self.late.push(LateBinding {
                    node: descendant,
                    host,
                    function: copy,
                });
            }
        }
    }

    /// Functions of a type: table members and role slots
    fn member_functions(&self, host: SymbolId) -> Vec<SymbolId> {
        let mut ids = self.graph.member_ids(host);
        if let Some(info) = self.graph.members_of(host).and_then(|s| self.graph.member_info(s)) {
            ids.extend(info.slot_symbols());
        }
        ids.retain(|id| self.graph.symbol(*id).kind() == SymbolKind::Function);
        ids
    }

    fn resolve_member_hints(&mut self, host: SymbolId) {
        let Some(scope) = self.graph.members_of(host) else {
            return;
        };
        for function in self.member_functions(host) {
            resolve_param_hints(self.graph, self.sink, function, scope);
        }
    }

    /// A class with a bodiless member is abstract unless it is extern
    fn mark_abstract(&mut self, class: SymbolId) {
        let sym = self.graph.symbol(class);
        if sym.flags.contains(SymbolFlags::EXTERN) {
            return;
        }
        let has_abstract = self
            .member_functions(class)
            .iter()
            .any(|id| self.graph.symbol(*id).is_abstract());
        if has_abstract {
            self.graph
                .symbol_mut(class)
                .flags
                .insert(SymbolFlags::ABSTRACT);
        }

        let sym = self.graph.symbol(class);
        if sym.is_abstract() && sym.is_final() {
            let message = format!("class `{}` cannot be both abstract and final", sym.name);
            let span = sym.span;
            self.sink
                .error(ResolveErrorKind::InterfaceContractViolation, span, message);
        }
    }

    /// Abstract functions a class must implement: those of its interfaces
    /// (transitively) and of its abstract ancestors and their interfaces
    fn obligations(&self, class: SymbolId) -> Vec<SymbolId> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = Some(class);
        let mut first = true;

        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            let Some(data) = self.graph.symbol(id).as_class() else {
                break;
            };
            if !first {
                if !self.graph.symbol(id).is_abstract() {
                    break;
                }
                out.extend(
                    self.member_functions(id)
                        .into_iter()
                        .filter(|m| self.graph.symbol(*m).is_abstract()),
                );
            }
            for iface in data.interfaces.iter().filter_map(|r| r.target) {
                self.interface_obligations(iface, &mut out, &mut seen);
            }
            first = false;
            current = data.superclass.as_ref().and_then(|r| r.target).or_else(|| {
                self.root_object.filter(|root| *root != id && data.superclass.is_none())
            });
        }
        out
    }

    fn interface_obligations(&self, iface: SymbolId, out: &mut Vec<SymbolId>, seen: &mut FxHashSet<SymbolId>) {
        if !seen.insert(iface) {
            return;
        }
        out.extend(self.member_functions(iface));
        if let SymbolData::Interface(data) = &self.graph.symbol(iface).data {
            for parent in data.interfaces.iter().filter_map(|r| r.target) {
                self.interface_obligations(parent, out, seen);
            }
        }
    }

    /// First same-named value member along the class's member chain
    fn find_implementation(&self, class: SymbolId, name: &str) -> Option<SymbolId> {
        let mut scope = self.graph.members_of(class);
        let mut depth = 0;
        while let Some(id) = scope {
            if let Some(found) = self.graph.lookup_here(id, name, Some(Namespace::Value)) {
                return Some(found);
            }
            depth += 1;
            if depth > self.graph.scope_count() {
                return None;
            }
            scope = self.graph.member_info(id).and_then(|info| info.super_scope);
        }
        None
    }

    fn verify_contracts(&mut self, class: SymbolId) {
        if self.graph.symbol(class).flags.contains(SymbolFlags::EXTERN) {
            return;
        }

        let mut unresolved = false;
        for obligation in self.obligations(class) {
            let name = self.graph.symbol(obligation).name.clone();
            let implementation = match self.find_implementation(class, &name) {
                Some(found) if found != obligation && !self.graph.symbol(found).is_abstract() => found,
                _ => {
                    trace!("{} leaves `{}` unimplemented", self.graph.symbol_path(class), name);
                    unresolved = true;
                    continue;
                }
            };
            if let Err(reason) = self.compatible(obligation, implementation) {
                let message = format!(
                    "{} does not satisfy {}: {}",
                    self.graph.symbol_path(implementation),
                    self.graph.symbol_path(obligation),
                    reason
                );
                let span = self.graph.symbol(implementation).span;
                let required = self.graph.symbol(obligation).span;
                self.sink.error_with_previous(
                    ResolveErrorKind::InterfaceContractViolation,
                    span,
                    message,
                    required,
                    "required by this declaration",
                );
                unresolved = true;
            }
        }

        if unresolved {
            self.graph
                .symbol_mut(class)
                .flags
                .insert(SymbolFlags::ABSTRACT);
        }
    }

    /// Shape check between an abstract declaration and its implementation
    fn compatible(&self, obligation: SymbolId, implementation: SymbolId) -> Result<(), String> {
        let wanted = self.graph.symbol(obligation);
        let found = self.graph.symbol(implementation);

        let (Some(wanted_fn), Some(found_fn)) = (wanted.as_function(), found.as_function()) else {
            return Err(format!("`{}` is a {}, not a function", found.name, found.kind()));
        };
        if wanted.is_static() != found.is_static() {
            return Err("static modifier differs".to_string());
        }
        if visibility_rank(found.flags) < visibility_rank(wanted.flags) {
            return Err(format!(
                "visibility narrowed from {} to {}",
                wanted.flags.intersection(SymbolFlags::VISIBILITY),
                found.flags.intersection(SymbolFlags::VISIBILITY)
            ));
        }
        if wanted_fn.params.len() != found_fn.params.len() {
            return Err(format!(
                "expected {} parameters, found {}",
                wanted_fn.params.len(),
                found_fn.params.len()
            ));
        }

        for (a, b) in wanted_fn.params.iter().zip(&found_fn.params) {
            let (pa, pb) = (self.graph.symbol(*a), self.graph.symbol(*b));
            let (Some(va), Some(vb)) = (pa.as_variable(), pb.as_variable()) else {
                continue;
            };
            if va.by_ref != vb.by_ref || va.rest != vb.rest || va.optional != vb.optional {
                return Err(format!(
                    "parameter `{}` differs in by-reference, rest or optional form",
                    pb.name
                ));
            }
            let hints_match = match (&va.hint, &vb.hint) {
                (None, None) => true,
                (Some(x), Some(y)) => x.same_as(y),
                _ => false,
            };
            if !hints_match {
                let show = |hint: &Option<TypeHint>| {
                    hint.as_ref()
                        .map(|h| h.to_string())
                        .unwrap_or_else(|| "no hint".to_string())
                };
                return Err(format!(
                    "parameter `{}` is `{}`, expected `{}`",
                    pb.name,
                    show(&vb.hint),
                    show(&va.hint)
                ));
            }
        }
        Ok(())
    }
}

fn visibility_rank(flags: SymbolFlags) -> u8 {
    if flags.contains(SymbolFlags::PUBLIC) {
        2
    } else if flags.contains(SymbolFlags::PROTECTED) {
        1
    } else {
        0
    }
}

/// Bind named parameter hints of `function`, looked up from `scope`
pub fn resolve_param_hints(graph: &mut ScopeGraph, sink: &mut DiagnosticSink, function: SymbolId, scope: ScopeId) {
    let params = match graph.symbol(function).as_function() {
        Some(func) => func.params.clone(),
        None => return,
    };
    for param in params {
        let Some(TypeHint::Named { path, target: None }) =
            graph.symbol(param).as_variable().and_then(|v| v.hint.clone())
        else {
            continue;
        };
        let span = graph.symbol(param).span;
        match graph.lookup_path(scope, &Path::from(path.as_str()), Namespace::Type) {
            LookupResult::Found(target) => {
                if let Some(var) = graph.symbol_mut(param).as_variable_mut() {
                    var.hint = Some(TypeHint::Named {
                        path,
                        target: Some(target),
                    });
                }
            }
            LookupResult::Private(_) => {
                sink.error(
                    ResolveErrorKind::PrivateAccess,
                    span,
                    format!("type `{}` is private", path),
                );
            }
            _ => {
                sink.error(
                    ResolveErrorKind::UndefinedSymbol,
                    span,
                    format!("unknown type `{}` in parameter hint", path),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstBuilder, ClassDecl, EngineConst, FnDecl, InterfaceDecl, Modifier, Param, TraitDecl, TraitUse};
    use crate::sema::collector::Collector;

    struct Resolved {
        graph: ScopeGraph,
        sink: DiagnosticSink,
        late: Vec<LateBinding>,
        ast: Ast,
    }

    fn resolve(mut ast: Ast) -> Resolved {
        let mut graph = ScopeGraph::new();
        let mut sink = DiagnosticSink::new();
        let unit = Collector::collect_unit(&mut graph, &mut ast, &mut sink);
        graph.enter(unit);

        let types: Vec<SymbolId> = graph
            .symbols()
            .filter(|s| s.resolution().is_some())
            .map(|s| s.id)
            .collect();
        let mut late = Vec::new();
        let mut inheritance = Inheritance::new(&mut graph, &mut ast, &mut sink, None, &mut late);
        for ty in types {
            inheritance.resolve_type(ty);
        }
        Resolved {
            graph,
            sink,
            late,
            ast,
        }
    }

    fn type_symbol(r: &Resolved, node: NodeId) -> SymbolId {
        r.ast.node(node).symbol.unwrap()
    }

    fn member(r: &Resolved, host: SymbolId, name: &str) -> Option<SymbolId> {
        let scope = r.graph.members_of(host).unwrap();
        r.graph.lookup_here(scope, name, Some(Namespace::Value))
    }

    #[test]
    fn test_superclass_cycle_is_reported_once() {
        let mut b = AstBuilder::new("main.phs");
        let a = b.class(ClassDecl::named("A").extends("B"));
        let c = b.class(ClassDecl::named("B").extends("A"));
        let r = resolve(b.finish(vec![a, c]));

        assert_eq!(r.sink.count(ResolveErrorKind::CyclicOrMissingSuperclass), 1);
        let mut scope = r.graph.members_of(type_symbol(&r, a));
        let mut steps = 0;
        while let Some(id) = scope {
            steps += 1;
            assert!(steps <= 2, "superclass chain loops");
            scope = r.graph.member_info(id).and_then(|info| info.super_scope);
        }
    }

    #[test]
    fn test_unknown_and_final_superclass() {
        let mut b = AstBuilder::new("main.phs");
        let base = b.class(ClassDecl::named("Base").with_mods(&[Modifier::Final]));
        let derived = b.class(ClassDecl::named("Derived").extends("Base"));
        let orphan = b.class(ClassDecl::named("Orphan").extends("Missing"));
        let r = resolve(b.finish(vec![base, derived, orphan]));

        assert_eq!(r.sink.count(ResolveErrorKind::FinalOverride), 1);
        let final_error = r.sink.diagnostics().with_code("E2201").next().unwrap();
        assert_eq!(final_error.labels[0].span, r.ast.node(base).span);
        assert_eq!(r.sink.count(ResolveErrorKind::CyclicOrMissingSuperclass), 1);
        let derived_sym = type_symbol(&r, derived);
        let link = r.graph.symbol(derived_sym).as_class().unwrap().superclass.as_ref().unwrap().target;
        assert_eq!(link, Some(type_symbol(&r, base)));
    }

    #[test]
    fn test_trait_members_are_copied_with_pending_constants() {
        let mut b = AstBuilder::new("main.phs");
        let constant = b.engine_const(EngineConst::Class);
        let stmt = b.ret(Some(constant));
        let body = b.block(vec![stmt]);
        let hello = b.func(FnDecl::named("hello").with_mods(&[Modifier::Public]).with_body(body));
        let greet = b.trait_decl(TraitDecl {
            name: "Greet".into(),
            members: vec![hello],
            ..TraitDecl::default()
        });
        let dog = b.class(ClassDecl::named("Dog").uses(TraitUse::all("Greet")));
        let mut r = resolve(b.finish(vec![greet, dog]));
        assert!(!r.sink.has_errors());

        let dog_sym = type_symbol(&r, dog);
        let greet_sym = type_symbol(&r, greet);
        let copy = member(&r, dog_sym, "hello").expect("copied member");
        let copied = r.graph.symbol(copy);
        assert_eq!(copied.origin, Some(greet_sym));
        assert_ne!(copied.node, Some(hello));

        let body_scope = copied.as_function().unwrap().body_scope.unwrap();
        assert_eq!(r.graph.scope(body_scope).delegate, r.graph.members_of(greet_sym));

        assert_eq!(r.late.len(), 1);
        let pending = r.late[0].node;
        assert_ne!(pending, constant);
        assert_eq!(r.ast.node(pending).binding, Some(ConstBinding::PendingClassContext));
        assert!(r.ast.node(constant).binding.is_none());

        let before = r.graph.member_ids(dog_sym).len();
        let usage = r.graph.symbol(dog_sym).as_class().unwrap().traits[0].clone();
        Inheritance::new(&mut r.graph, &mut r.ast, &mut r.sink, None, &mut r.late).flatten(dog_sym, greet_sym, &usage);
        assert_eq!(r.graph.member_ids(dog_sym).len(), before);
        assert_eq!(r.late.len(), 1);
    }

    #[test]
    fn test_host_member_wins_over_trait() {
        let mut b = AstBuilder::new("main.phs");
        let trait_body = b.block(vec![]);
        let from_trait = b.func(FnDecl::named("hello").with_body(trait_body));
        let greet = b.trait_decl(TraitDecl {
            name: "Greet".into(),
            members: vec![from_trait],
            ..TraitDecl::default()
        });
        let own_body = b.block(vec![]);
        let own = b.func(FnDecl::named("hello").with_mods(&[Modifier::Public]).with_body(own_body));
        let dog = b.class(ClassDecl::named("Dog").uses(TraitUse::all("Greet")).with_members(vec![own]));
        let r = resolve(b.finish(vec![greet, dog]));

        let found = member(&r, type_symbol(&r, dog), "hello").unwrap();
        assert_eq!(Some(found), r.ast.node(own).symbol);
        assert!(r.graph.symbol(found).origin.is_none());
    }

    #[test]
    fn test_aliased_item_takes_new_name_and_visibility() {
        let mut b = AstBuilder::new("main.phs");
        let body = b.block(vec![]);
        let hello = b.func(FnDecl::named("hello").with_body(body));
        let greet = b.trait_decl(TraitDecl {
            name: "Greet".into(),
            members: vec![hello],
            ..TraitDecl::default()
        });
        let usage = TraitUse::item("Greet", "hello", Some("greet"), &[Modifier::Public]);
        let dog = b.class(ClassDecl::named("Dog").uses(usage));
        let r = resolve(b.finish(vec![greet, dog]));

        let dog_sym = type_symbol(&r, dog);
        let greet_member = member(&r, dog_sym, "greet").expect("aliased copy");
        assert!(r.graph.symbol(greet_member).flags.contains(SymbolFlags::PUBLIC));
        assert!(member(&r, dog_sym, "hello").is_none());
    }

    #[test]
    fn test_abstract_marking_and_implementation() {
        let mut b = AstBuilder::new("main.phs");
        let speak = b.func(FnDecl::named("speak").with_mods(&[Modifier::Public]));
        let animal = b.class(ClassDecl::named("Animal").with_members(vec![speak]));
        let body = b.block(vec![]);
        let bark = b.func(FnDecl::named("speak").with_mods(&[Modifier::Public]).with_body(body));
        let dog = b.class(ClassDecl::named("Dog").extends("Animal").with_members(vec![bark]));
        let cat = b.class(ClassDecl::named("Cat").extends("Animal"));
        let r = resolve(b.finish(vec![animal, dog, cat]));

        assert!(!r.sink.has_errors());
        assert!(r.graph.symbol(type_symbol(&r, animal)).is_abstract());
        assert!(!r.graph.symbol(type_symbol(&r, dog)).is_abstract());
        assert!(r.graph.symbol(type_symbol(&r, cat)).is_abstract());
    }

    #[test]
    fn test_abstract_final_class_is_rejected() {
        let mut b = AstBuilder::new("main.phs");
        let run = b.func(FnDecl::named("run").with_mods(&[Modifier::Public]));
        let class = b.class(ClassDecl::named("Job").with_mods(&[Modifier::Final]).with_members(vec![run]));
        let r = resolve(b.finish(vec![class]));
        assert_eq!(r.sink.count(ResolveErrorKind::InterfaceContractViolation), 1);
    }

    #[test]
    fn test_interface_contract_mismatch() {
        let mut b = AstBuilder::new("main.phs");
        let area = b.func(FnDecl::named("area").with_params(vec![Param::new("scale").builtin_hint("int")]));
        let shape = b.interface(InterfaceDecl {
            name: "Shape".into(),
            members: vec![area],
            ..InterfaceDecl::default()
        });

        let good_body = b.block(vec![]);
        let good = b.func(
            FnDecl::named("area")
                .with_mods(&[Modifier::Public])
                .with_params(vec![Param::new("s").builtin_hint("int")])
                .with_body(good_body),
        );
        let square = b.class(ClassDecl::named("Square").implements("Shape").with_members(vec![good]));

        let bad_body = b.block(vec![]);
        let bad = b.func(
            FnDecl::named("area")
                .with_mods(&[Modifier::Public])
                .with_params(vec![Param::new("s").builtin_hint("string")])
                .with_body(bad_body),
        );
        let circle = b.class(ClassDecl::named("Circle").implements("Shape").with_members(vec![bad]));

        let hidden_body = b.block(vec![]);
        let hidden = b.func(
            FnDecl::named("area")
                .with_params(vec![Param::new("s").builtin_hint("int")])
                .with_body(hidden_body),
        );
        let blob = b.class(ClassDecl::named("Blob").implements("Shape").with_members(vec![hidden]));

        let empty = b.class(ClassDecl::named("Empty").implements("Shape"));
        let r = resolve(b.finish(vec![shape, square, circle, blob, empty]));

        assert_eq!(r.sink.count(ResolveErrorKind::InterfaceContractViolation), 2);
        for diagnostic in r.sink.diagnostics().with_code("E2302") {
            assert_eq!(diagnostic.labels.len(), 1);
            assert_eq!(diagnostic.labels[0].span, r.ast.node(area).span);
        }
        assert!(!r.graph.symbol(type_symbol(&r, square)).is_abstract());
        assert!(r.graph.symbol(type_symbol(&r, circle)).is_abstract());
        assert!(r.graph.symbol(type_symbol(&r, blob)).is_abstract());
        assert!(r.graph.symbol(type_symbol(&r, empty)).is_abstract());
    }

    #[test]
    fn test_named_hints_bind_to_types() {
        let mut b = AstBuilder::new("main.phs");
        let point = b.class(ClassDecl::named("Point"));
        let body = b.block(vec![]);
        let shift = b.func(
            FnDecl::named("shift")
                .with_params(vec![Param::new("by").named_hint("Point")])
                .with_body(body),
        );
        let mover = b.class(ClassDecl::named("Mover").with_members(vec![shift]));
        let r = resolve(b.finish(vec![point, mover]));

        assert!(!r.sink.has_errors());
        let func = r.graph.symbol(r.ast.node(shift).symbol.unwrap()).as_function().unwrap();
        let hint = r.graph.symbol(func.params[0]).as_variable().unwrap().hint.clone();
        assert_eq!(
            hint,
            Some(TypeHint::Named {
                path: "Point".into(),
                target: Some(type_symbol(&r, point)),
            })
        );
    }
}
