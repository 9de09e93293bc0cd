//! Name and context resolution
//!
//! Second pass over a collected unit. Binds every name, `this`, `self`,
//! `super` and member-access node to a symbol, checks the context rules
//! around them, reduces compile-time constants and decides when engine
//! constants are bound. Types of a scope are resolved before its body is
//! walked, so sibling classes may refer to each other in any order.

use super::collector::item_symbols;
use super::imports::{resolve_require_path, ImportRequest, SourceLoader};
use super::inheritance::{resolve_param_hints, Inheritance, LateBinding};
use super::lookup::LookupResult;
use super::scopes::{ScopeGraph, ScopeKind};
use super::sink::{DiagnosticSink, ResolveErrorKind};
use super::symbols::{Namespace, SymbolData, SymbolKind};
use super::values::{ConstantReducer, Value};
use super::{NodeId, ScopeId, SymbolId};
use crate::ast::{Ast, ConstBinding, EngineConst, FnDecl, FnRole, NodeKind, Path};
use crate::config::SessionConfig;
use log::{debug, trace};
use source_map::SourceSpan;

/// Lexical context threaded through the walk
#[derive(Debug, Clone, Default)]
struct Context {
    class: Option<SymbolId>,
    /// Trait a copied member came from
    trait_origin: Option<SymbolId>,
    /// Enclosing functions, innermost last
    functions: Vec<SymbolId>,
    module: Option<ScopeId>,
    /// Inside the argument list of `super(...)`
    forwarding: bool,
}

/// Collaborators the resolver calls out to
pub struct Services<'a> {
    pub reducer: &'a mut dyn ConstantReducer,
    pub loader: &'a mut dyn SourceLoader,
    pub config: &'a SessionConfig,
    pub root_object: Option<SymbolId>,
}

pub struct Resolver<'a> {
    graph: &'a mut ScopeGraph,
    ast: &'a mut Ast,
    sink: &'a mut DiagnosticSink,
    services: Services<'a>,
    scope: ScopeId,
    ctx: Context,
    late: Vec<LateBinding>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        graph: &'a mut ScopeGraph,
        ast: &'a mut Ast,
        sink: &'a mut DiagnosticSink,
        services: Services<'a>,
    ) -> Self {
        let scope = graph.global();
        Self {
            graph,
            ast,
            sink,
            services,
            scope,
            ctx: Context::default(),
            late: Vec::new(),
        }
    }

    /// Resolve a collected unit. Engine constants in members copied from
    /// traits are left pending for [`bind_late`](Self::bind_late).
    pub fn resolve_unit(&mut self) {
        let root = self.ast.root;
        let Some(unit) = self.ast.node(root).scope else {
            let span = self.ast.node(root).span;
            self.sink.abort(span, "unit was not collected");
            return;
        };

        self.scope = unit;
        self.graph.enter(unit);
        self.resolve_types_in(unit);
        self.visit(root);
        let span = self.ast.node(root).span;
        self.leave(unit, span);
    }

    /// True once an engine invariant failed in this unit
    pub fn aborted(&self) -> bool {
        self.sink.aborted()
    }

    fn inheritance(&mut self) -> Inheritance<'_> {
        Inheritance::new(
            &mut *self.graph,
            &mut *self.ast,
            &mut *self.sink,
            self.services.root_object,
            &mut self.late,
        )
    }

    /// Resolve every class, trait and interface declared in `scope`
    fn resolve_types_in(&mut self, scope: ScopeId) {
        let data = self.graph.scope(scope);
        let mut ids: Vec<SymbolId> = data.table.entries(Namespace::Type).map(|(_, id)| id).collect();
        if let Some(inner) = data.inner {
            ids.extend(self.graph.scope(inner).table.entries(Namespace::Type).map(|(_, id)| id));
        }
        for id in ids {
            self.inheritance().resolve_type(id);
        }
    }

    fn leave(&mut self, scope: ScopeId, span: SourceSpan) {
        if let Err(err) = self.graph.leave(scope) {
            self.sink.abort(span, err.to_string());
        }
    }

    fn span(&self, node: NodeId) -> SourceSpan {
        self.ast.node(node).span
    }

    fn bind(&mut self, node: NodeId, symbol: SymbolId) {
        self.ast.node_mut(node).symbol = Some(symbol);
    }

    fn reduce(&mut self, node: NodeId) -> Value {
        self.services
            .reducer
            .reduce(self.ast, node, self.graph, self.scope, self.ctx.module)
    }

    fn within_scope(&mut self, scope: Option<ScopeId>, f: impl FnOnce(&mut Self)) {
        match scope {
            Some(scope) if scope != self.scope => {
                let saved = std::mem::replace(&mut self.scope, scope);
                self.resolve_types_in(scope);
                f(self);
                self.scope = saved;
            }
            _ => f(self),
        }
    }

    fn visit_all(&mut self, nodes: &[NodeId]) {
        for node in nodes {
            self.visit(*node);
        }
    }

    fn visit_children(&mut self, node: NodeId) {
        for child in self.ast.children(node) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: NodeId) {
        let kind = self.ast.node(node).kind.clone();
        match kind {
            NodeKind::Unit { body } => self.visit_all(&body),
            NodeKind::Module { body, .. } => self.visit_module(node, &body),
            NodeKind::Use { path, .. } => self.visit_use(node, &path),
            NodeKind::Require { path, foreign } => self.visit_require(node, path, foreign),
            NodeKind::ClassDecl(decl) => self.visit_class(node, &decl.members),
            // trait and interface members only run once copied into a class
            NodeKind::TraitDecl(_) | NodeKind::InterfaceDecl(_) => {}
            NodeKind::FnDecl(decl) | NodeKind::FnExpr(decl) => self.visit_function(node, &decl),
            NodeKind::VarDecl { .. } => self.visit_variables(node),
            NodeKind::EnumDecl { .. } => self.visit_enum(node),
            NodeKind::Block { body } => {
                let scope = self.ast.node(node).scope;
                self.within_scope(scope, |r| r.visit_all(&body));
            }
            NodeKind::For { .. } => {
                let scope = self.ast.node(node).scope;
                self.within_scope(scope, |r| r.visit_children(node));
            }
            NodeKind::ForIn { iter, body, .. } => {
                self.visit(iter);
                let scope = self.ast.node(node).scope;
                self.within_scope(scope, |r| r.visit(body));
            }
            NodeKind::Name { path } => {
                self.resolve_name(node, &path);
            }
            NodeKind::Assign { target, value, .. } => self.visit_assign(target, value),
            NodeKind::Call { callee, args } => {
                if matches!(self.ast.node(callee).kind, NodeKind::Super) {
                    self.visit_super_call(node, callee, &args);
                } else {
                    self.visit(callee);
                    self.visit_all(&args);
                }
            }
            NodeKind::New { class, args } => {
                self.visit_new(node, &class);
                self.visit_all(&args);
            }
            NodeKind::Member { object, name } => self.visit_member(node, object, &name),
            NodeKind::This => {
                self.visit_this(node);
            }
            NodeKind::SelfRef => {
                if let Some(class) = self.require_class(node, "self") {
                    self.bind(node, class);
                }
            }
            NodeKind::Super => {
                if let Some(parent) = self.require_superclass(node) {
                    self.bind(node, parent);
                }
            }
            NodeKind::EngineConst { which } => self.visit_engine_const(node, which),
            _ => self.visit_children(node),
        }
    }

    fn visit_module(&mut self, node: NodeId, body: &[NodeId]) {
        let Some(scope) = self.ast.node(node).scope else {
            return;
        };
        let is_module = self.graph.scope(scope).kind == ScopeKind::Module;

        self.graph.enter(scope);
        let saved_module = std::mem::replace(&mut self.ctx.module, is_module.then_some(scope));
        self.within_scope(Some(scope), |r| r.visit_all(body));
        self.ctx.module = saved_module;
        let span = self.span(node);
        self.leave(scope, span);
    }

    fn visit_use(&mut self, node: NodeId, path: &Path) {
        let Some(alias) = self.ast.node(node).symbol else {
            return;
        };
        // a shadowed duplicate was reported by the collector
        if self.graph.symbol(alias).scope.is_none() {
            return;
        }

        let mut target = LookupResult::NotFound;
        for ns in [Namespace::Type, Namespace::Value] {
            target = self.graph.follow_alias(alias, ns, 1);
            if !target.is_not_found() {
                break;
            }
        }

        match target {
            LookupResult::Found(id) | LookupResult::Private(id) | LookupResult::Restricted(id) => {
                if let SymbolData::Alias(data) = &mut self.graph.symbol_mut(alias).data {
                    data.target = Some(id);
                }
            }
            LookupResult::Error => {
                let span = self.span(node);
                self.sink.error(
                    ResolveErrorKind::LookupFailed,
                    span,
                    format!("import `{}` does not resolve: alias chain too long", path),
                );
            }
            LookupResult::NotFound if self.names_module(alias, path) => {}
            LookupResult::NotFound => {
                let span = self.span(node);
                self.sink.error(
                    ResolveErrorKind::UndefinedSymbol,
                    span,
                    format!("unresolved import `{}`", path),
                );
            }
        }
    }

    /// True if `path` names a module reachable from the alias's unit
    fn names_module(&self, alias: SymbolId, path: &Path) -> bool {
        let global = self.graph.global();
        let unit = self
            .graph
            .symbol(alias)
            .scope
            .and_then(|scope| self.graph.unit_of(scope));
        unit.into_iter().chain(Some(global)).any(|root| {
            let mut scope = root;
            path.segments.iter().all(|segment| {
                match self.graph.scope(scope).modules.get(segment) {
                    Some(next) => {
                        scope = *next;
                        true
                    }
                    None => false,
                }
            })
        })
    }

    fn visit_require(&mut self, node: NodeId, path: NodeId, foreign: bool) {
        self.visit(path);
        let value = self.reduce(path);
        let span = self.span(node);

        let Some(raw) = value.as_str() else {
            self.sink.error(
                ResolveErrorKind::NonConstantRequirePath,
                span,
                format!("require path must reduce to a string, found {}", value),
            );
            return;
        };

        let unit_dir = std::path::Path::new(&self.ast.file)
            .parent()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_default();
        let resolved = resolve_require_path(raw, &unit_dir, foreign, self.services.config);
        debug!("require {} -> {}", raw, resolved.display());

        let handle = self.services.loader.register(ImportRequest {
            path: resolved,
            foreign,
            span,
        });
        let slot = self.ast.node_mut(node);
        slot.import = Some(handle);
        slot.value = Some(value);
    }

    fn visit_class(&mut self, node: NodeId, members: &[NodeId]) {
        let (Some(class), Some(scope)) = (self.ast.node(node).symbol, self.ast.node(node).scope) else {
            return;
        };
        self.inheritance().resolve_type(class);

        let context = Context {
            class: Some(class),
            module: self.ctx.module,
            ..Context::default()
        };
        let saved = std::mem::replace(&mut self.ctx, context);
        self.graph.enter(scope);
        self.within_scope(Some(scope), |r| {
            r.visit_all(members);
            r.visit_copied_members(class, scope);
        });
        let span = self.span(node);
        self.leave(scope, span);
        self.ctx = saved;
    }

    /// Bodies and initializers of members flattened in from traits
    fn visit_copied_members(&mut self, class: SymbolId, scope: ScopeId) {
        let mut copies = self.graph.member_ids(class);
        if let Some(info) = self.graph.member_info(scope) {
            copies.extend(info.slot_symbols());
        }
        copies.retain(|id| self.graph.symbol(*id).origin.is_some());

        for copy in copies {
            let symbol = self.graph.symbol(copy);
            let origin = symbol.origin;
            let (node, init) = match &symbol.data {
                SymbolData::Function(_) => (symbol.node, None),
                SymbolData::Variable(var) => (None, var.init),
                _ => continue,
            };

            let saved_origin = std::mem::replace(&mut self.ctx.trait_origin, origin);
            if let Some(node) = node {
                self.visit(node);
            }
            if let Some(init) = init {
                self.visit(init);
                self.store_constant(copy, init);
            }
            self.ctx.trait_origin = saved_origin;
        }
    }

    fn visit_function(&mut self, node: NodeId, decl: &FnDecl) {
        let Some(function) = self.ast.node(node).symbol else {
            return;
        };
        if self.graph.scope(self.scope).kind != ScopeKind::Member {
            resolve_param_hints(self.graph, self.sink, function, self.scope);
        }
        let Some(fscope) = self.ast.node(node).scope else {
            return;
        };

        let params = self
            .graph
            .symbol(function)
            .as_function()
            .map(|f| f.params.clone())
            .unwrap_or_default();

        self.ctx.functions.push(function);
        self.within_scope(Some(fscope), |r| {
            for (param, syntax) in params.iter().zip(&decl.params) {
                if let Some(default) = syntax.default {
                    r.visit(default);
                    r.store_constant(*param, default);
                }
            }
            if decl.role == FnRole::Constructor {
                r.check_this_bound(&params);
            }
            if let Some(body) = decl.body {
                match r.ast.node(body).kind.clone() {
                    NodeKind::Block { body: statements } => r.visit_all(&statements),
                    _ => r.visit(body),
                }
            }
        });
        self.ctx.functions.pop();
    }

    /// A constructor's this-bound parameters must name instance fields
    fn check_this_bound(&mut self, params: &[SymbolId]) {
        let Some(members) = self.ctx.class.and_then(|class| self.graph.members_of(class)) else {
            return;
        };
        for param in params {
            let symbol = self.graph.symbol(*param);
            if !symbol.as_variable().is_some_and(|v| v.this_bound) {
                continue;
            }
            let field = self
                .graph
                .lookup_here(members, &symbol.name, Some(Namespace::Value))
                .map(|id| self.graph.symbol(id));
            let valid = field.is_some_and(|f| f.kind() == SymbolKind::Variable && !f.is_static());
            if !valid {
                let message = format!("constructor parameter `{}` does not name an instance field", symbol.name);
                let span = symbol.span;
                self.sink
                    .error(ResolveErrorKind::UndefinedSymbol, span, message);
            }
        }
    }

    /// Reduce a constant's initializer and record the value
    fn store_constant(&mut self, symbol: SymbolId, init: NodeId) {
        let sym = self.graph.symbol(symbol);
        if !sym.is_const() && !sym.is_param() {
            return;
        }
        let value = self.reduce(init);
        trace!("{} = {}", self.graph.symbol(symbol).name, value);
        if let Some(var) = self.graph.symbol_mut(symbol).as_variable_mut() {
            var.value = Some(value);
        }
    }

    fn visit_variables(&mut self, node: NodeId) {
        let NodeKind::VarDecl { items, .. } = self.ast.node(node).kind.clone() else {
            return;
        };
        for (symbol, item) in item_symbols(self.ast, node).into_iter().zip(&items) {
            if let Some(init) = item.init {
                self.visit(init);
                self.store_constant(symbol, init);
            }
            self.graph.symbol_mut(symbol).reachable = true;
        }
    }

    /// Enum members count up from the previous integer value
    fn visit_enum(&mut self, node: NodeId) {
        let NodeKind::EnumDecl { items, .. } = self.ast.node(node).kind.clone() else {
            return;
        };
        let mut next = 0i64;
        for (symbol, item) in item_symbols(self.ast, node).into_iter().zip(&items) {
            let value = match item.init {
                Some(init) => {
                    self.visit(init);
                    self.reduce(init)
                }
                None => Value::Int(next),
            };
            if let Value::Int(current) = value {
                next = current.saturating_add(1);
            }
            let sym = self.graph.symbol_mut(symbol);
            sym.reachable = true;
            if let Some(var) = sym.as_variable_mut() {
                var.value = Some(value);
            }
        }
    }

    /// Resolve a name in the value namespace, falling back to types
    fn resolve_name(&mut self, node: NodeId, path: &Path) -> Option<SymbolId> {
        let span = self.span(node);
        let mut result = self.graph.lookup_path(self.scope, path, Namespace::Value);
        if result.is_not_found() {
            result = self.graph.lookup_path(self.scope, path, Namespace::Type);
        }

        let symbol = self.accept(result, span, || format!("`{}`", path))?;
        if self.graph.symbol(symbol).resolution().is_some() {
            self.inheritance().resolve_type(symbol);
        }
        self.check_reachable(symbol, span);
        self.bind(node, symbol);
        Some(symbol)
    }

    /// Report a non-`Found` lookup result
    fn accept(&mut self, result: LookupResult, span: SourceSpan, what: impl FnOnce() -> String) -> Option<SymbolId> {
        match result {
            LookupResult::Found(id) => Some(id),
            LookupResult::Private(id) => {
                let message = format!("{} is private", self.graph.symbol_path(id));
                self.sink
                    .error(ResolveErrorKind::PrivateAccess, span, message);
                None
            }
            LookupResult::Restricted(id) => {
                let message = format!(
                    "{} cannot be used while the parent constructor is being called",
                    self.graph.symbol_path(id)
                );
                self.sink
                    .error(ResolveErrorKind::RestrictedAccess, span, message);
                None
            }
            LookupResult::NotFound => {
                self.sink.error(
                    ResolveErrorKind::UndefinedSymbol,
                    span,
                    format!("undefined symbol {}", what()),
                );
                None
            }
            LookupResult::Error => {
                self.sink.error(
                    ResolveErrorKind::LookupFailed,
                    span,
                    format!("could not resolve {}: alias chain or scope walk too long", what()),
                );
                None
            }
        }
    }

    /// A variable is unusable before its declaration unless the use sits in
    /// a function that may run later
    fn check_reachable(&mut self, symbol: SymbolId, span: SourceSpan) {
        let sym = self.graph.symbol(symbol);
        if sym.reachable {
            return;
        }
        let Some(owner) = sym.scope.map(|scope| self.graph.owner(scope)) else {
            return;
        };

        let mut current = Some(self.scope);
        while let Some(scope) = current {
            if scope == owner {
                break;
            }
            if self.graph.scope(scope).kind == ScopeKind::Function {
                return;
            }
            current = self.graph.scope(scope).parent;
        }

        let message = format!("`{}` is used before its declaration", sym.name);
        self.sink
            .error(ResolveErrorKind::UnreachableSymbol, span, message);
    }

    fn visit_assign(&mut self, target: NodeId, value: NodeId) {
        self.visit(value);
        self.visit(target);

        let Some(symbol) = self.ast.node(target).symbol else {
            return;
        };
        let sym = self.graph.symbol(symbol);
        let what = match sym.kind() {
            SymbolKind::Variable if sym.is_const() => "constant",
            SymbolKind::Variable | SymbolKind::Alias => return,
            SymbolKind::Function => "function",
            SymbolKind::Class | SymbolKind::Trait | SymbolKind::Interface => "type",
        };
        let message = format!("cannot assign to {} {}", what, self.graph.symbol_path(symbol));
        let span = self.span(target);
        self.sink
            .error(ResolveErrorKind::ConstOverride, span, message);
    }

    /// Nearest enclosing named function (closures see through to it)
    fn current_method(&self) -> Option<SymbolId> {
        self.ctx
            .functions
            .iter()
            .rev()
            .copied()
            .find(|f| self.graph.symbol(*f).as_function().is_some_and(|data| !data.is_expr))
    }

    fn require_class(&mut self, node: NodeId, keyword: &str) -> Option<SymbolId> {
        match self.ctx.class {
            Some(class) => Some(class),
            None => {
                let span = self.span(node);
                self.sink.error(
                    ResolveErrorKind::InvalidContext,
                    span,
                    format!("`{}` used outside of a class", keyword),
                );
                None
            }
        }
    }

    fn require_superclass(&mut self, node: NodeId) -> Option<SymbolId> {
        let class = self.require_class(node, "super")?;
        let parent = self
            .graph
            .symbol(class)
            .as_class()
            .and_then(|data| data.superclass.as_ref())
            .and_then(|tref| tref.target)
            .or_else(|| self.services.root_object.filter(|root| *root != class));
        if parent.is_none() {
            let message = format!("class `{}` has no superclass", self.graph.symbol(class).name);
            let span = self.span(node);
            self.sink
                .error(ResolveErrorKind::InvalidContext, span, message);
        }
        parent
    }

    fn visit_this(&mut self, node: NodeId) -> Option<SymbolId> {
        let class = self.require_class(node, "this")?;
        let span = self.span(node);
        if self.ctx.forwarding {
            self.sink.error(
                ResolveErrorKind::InvalidContext,
                span,
                "`this` cannot be used in the arguments of `super(...)`",
            );
            return None;
        }
        if let Some(method) = self.current_method() {
            if self.graph.symbol(method).is_static() {
                let message = format!("`this` used in static method {}", self.graph.symbol_path(method));
                self.sink
                    .error(ResolveErrorKind::InvalidContext, span, message);
                return None;
            }
        }
        self.bind(node, class);
        Some(class)
    }

    fn visit_super_call(&mut self, node: NodeId, callee: NodeId, args: &[NodeId]) {
        let span = self.span(node);
        let in_constructor = self.ctx.functions.last().is_some_and(|f| {
            self.graph
                .symbol(*f)
                .as_function()
                .is_some_and(|data| data.role == FnRole::Constructor && !data.is_expr)
        });
        if !in_constructor {
            self.sink.error(
                ResolveErrorKind::InvalidContext,
                span,
                "`super(...)` is only allowed directly inside a constructor",
            );
            self.visit_all(args);
            return;
        }

        if let Some(parent) = self.require_superclass(callee) {
            match self.parent_constructor(parent) {
                Some(ctor) if self.graph.symbol(ctor).is_private() => {
                    let message = format!("{} is private", self.graph.symbol_path(ctor));
                    self.sink
                        .error(ResolveErrorKind::PrivateAccess, span, message);
                }
                Some(ctor) => self.bind(callee, ctor),
                None => self.bind(callee, parent),
            }
        }

        let members = self.ctx.class.and_then(|class| self.graph.members_of(class));
        self.set_restricted(members, true);
        let forwarding = std::mem::replace(&mut self.ctx.forwarding, true);
        self.visit_all(args);
        self.ctx.forwarding = forwarding;
        self.set_restricted(members, false);
    }

    fn set_restricted(&mut self, members: Option<ScopeId>, restricted: bool) {
        if let Some(info) = members.and_then(|scope| self.graph.member_info_mut(scope)) {
            info.restricted = restricted;
        }
    }

    /// First constructor along the superclass chain starting at `parent`
    fn parent_constructor(&self, parent: SymbolId) -> Option<SymbolId> {
        let mut scope = self.graph.members_of(parent);
        let mut steps = 0;
        while let Some(id) = scope {
            let info = self.graph.member_info(id)?;
            if info.ctor.is_some() {
                return info.ctor;
            }
            steps += 1;
            if steps > self.graph.scope_count() {
                return None;
            }
            scope = info.super_scope;
        }
        None
    }

    fn visit_new(&mut self, node: NodeId, class: &Path) {
        let span = self.span(node);
        let result = self.graph.lookup_path(self.scope, class, Namespace::Type);
        let Some(target) = self.accept(result, span, || format!("type `{}`", class)) else {
            return;
        };
        self.inheritance().resolve_type(target);
        self.bind(node, target);

        let symbol = self.graph.symbol(target);
        let problem = match symbol.kind() {
            SymbolKind::Class if symbol.is_abstract() => Some("abstract class"),
            SymbolKind::Class => None,
            SymbolKind::Trait => Some("trait"),
            SymbolKind::Interface => Some("interface"),
            _ => Some("non-class symbol"),
        };
        if let Some(what) = problem {
            let message = format!("cannot instantiate {} {}", what, self.graph.symbol_path(target));
            self.sink
                .error(ResolveErrorKind::InvalidInstantiation, span, message);
        }
    }

    fn visit_member(&mut self, node: NodeId, object: NodeId, name: &str) {
        let span = self.span(node);
        match self.ast.node(object).kind.clone() {
            NodeKind::This => {
                let Some(class) = self.visit_this(object) else {
                    return;
                };
                if let Some(member) = self.member_of(class, name, false, span) {
                    if self.graph.symbol(member).is_static() {
                        let message = format!(
                            "{} is static; use `self.{}`",
                            self.graph.symbol_path(member),
                            name
                        );
                        self.sink
                            .error(ResolveErrorKind::InvalidContext, span, message);
                    }
                    self.bind(node, member);
                }
            }
            NodeKind::SelfRef => {
                let Some(class) = self.require_class(object, "self") else {
                    return;
                };
                self.bind(object, class);
                self.static_member(node, class, name);
            }
            NodeKind::Super => {
                let Some(parent) = self.require_superclass(object) else {
                    return;
                };
                self.bind(object, parent);
                if let Some(member) = self.member_of(parent, name, true, span) {
                    let sym = self.graph.symbol(member);
                    if sym.kind() == SymbolKind::Variable && !sym.is_static() {
                        let message = format!(
                            "instance field {} cannot be reached through `super`",
                            self.graph.symbol_path(member)
                        );
                        self.sink
                            .error(ResolveErrorKind::InvalidContext, span, message);
                    }
                    self.bind(node, member);
                }
            }
            NodeKind::Name { path } => {
                let Some(target) = self.resolve_name(object, &path) else {
                    return;
                };
                match self.graph.symbol(target).kind() {
                    SymbolKind::Class => self.static_member(node, target, name),
                    SymbolKind::Trait | SymbolKind::Interface => {
                        let message = format!(
                            "members of {} cannot be accessed through its name",
                            self.graph.symbol(target)
                        );
                        self.sink
                            .error(ResolveErrorKind::InvalidContext, span, message);
                    }
                    _ => {}
                }
            }
            _ => self.visit(object),
        }
    }

    /// Member of a class's member scope, reporting failed lookups
    fn member_of(&mut self, class: SymbolId, name: &str, via_super: bool, span: SourceSpan) -> Option<SymbolId> {
        let members = self.graph.members_of(class)?;
        let result = self
            .graph
            .lookup_member(members, name, Some(Namespace::Value), via_super);
        let class_name = self.graph.symbol_path(class);
        self.accept(result, span, || format!("`{}` in class `{}`", name, class_name))
    }

    /// `self.x` and `Class.x` reach static members only
    fn static_member(&mut self, node: NodeId, class: SymbolId, name: &str) {
        let span = self.span(node);
        let Some(member) = self.member_of(class, name, false, span) else {
            return;
        };
        if !self.graph.symbol(member).is_static() {
            let message = format!(
                "{} is not static; use `this.{}`",
                self.graph.symbol_path(member),
                name
            );
            self.sink
                .error(ResolveErrorKind::InvalidContext, span, message);
        }
        self.bind(node, member);
    }

    fn visit_engine_const(&mut self, node: NodeId, which: EngineConst) {
        if matches!(self.ast.node(node).binding, Some(ConstBinding::PendingClassContext)) {
            return;
        }
        if self.ctx.class.is_none() && self.ctx.trait_origin.is_some() {
            self.ast.node_mut(node).binding = Some(ConstBinding::PendingClassContext);
            return;
        }

        let module = self.ctx.module.unwrap_or(self.scope);
        let text = self.engine_value(which, self.ctx.class, self.current_method(), module);
        let value = match text {
            Ok(text) => text,
            Err(reason) => {
                let span = self.span(node);
                self.sink
                    .warn(span, format!("{} {}; using an empty string", which, reason));
                String::new()
            }
        };
        self.ast.node_mut(node).binding = Some(ConstBinding::Bound(Value::Str(value)));
    }

    fn engine_value(
        &self,
        which: EngineConst,
        class: Option<SymbolId>,
        function: Option<SymbolId>,
        module: ScopeId,
    ) -> Result<String, &'static str> {
        match which {
            EngineConst::Class => class
                .map(|c| self.graph.symbol_path(c))
                .ok_or("used outside of a class"),
            EngineConst::Method => {
                let class = class.ok_or("used outside of a class")?;
                let function = function.ok_or("used outside of a method")?;
                Ok(format!(
                    "{}.{}",
                    self.graph.symbol_path(class),
                    self.graph.symbol(function).name
                ))
            }
            EngineConst::Function => function
                .map(|f| self.graph.symbol(f).name.clone())
                .ok_or("used outside of a function"),
            EngineConst::Module => Ok(self.graph.module_path(module)),
        }
    }

    /// Bind engine constants of trait members copied into classes
    pub fn bind_late(&mut self) {
        let pending = std::mem::take(&mut self.late);
        for binding in pending {
            let NodeKind::EngineConst { which } = self.ast.node(binding.node).kind else {
                continue;
            };
            let module = self
                .graph
                .symbol(binding.host)
                .scope
                .unwrap_or_else(|| self.graph.global());
            let value = self
                .engine_value(which, Some(binding.host), Some(binding.function), module)
                .unwrap_or_default();
            trace!("late-bound {} to {:?}", which, value);
            self.ast.node_mut(binding.node).binding = Some(ConstBinding::Bound(Value::Str(value)));
        }
    }
}
