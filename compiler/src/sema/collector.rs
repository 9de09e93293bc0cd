//! Declaration collector
//!
//! First pass over a unit. Creates every scope the unit needs, allocates a
//! symbol per declaration and inserts it through the add engine, reporting
//! rejected insertions. Names are not resolved here.
//!
//! Trait and interface member bodies are not entered: they only run once
//! copied into a class, where the inheritance resolver collects the copy.

use super::add::{AddDecision, RejectReason};
use super::scopes::{ScopeGraph, ScopeKind};
use super::sink::{DiagnosticSink, ResolveErrorKind};
use super::symbols::{
    AliasSymbol, ClassSymbol, FunctionSymbol, InterfaceSymbol, Resolution, Symbol, SymbolData,
    SymbolFlags, SymbolKind, TraitSymbol, TraitUsage, TypeHint, TypeRef, VariableSymbol,
};
use super::{NodeId, ScopeId, SymbolId};
use crate::ast::{
    Ast, ClassDecl, FnDecl, FnRole, HintSyntax, InterfaceDecl, Modifier, NodeKind, Param, Path,
    TraitDecl, TraitUse, VarItem,
};
use log::debug;
use smallvec::SmallVec;
use source_map::SourceSpan;

/// Flags named by a modifier list
pub fn modifier_flags(mods: &[Modifier]) -> SymbolFlags {
    mods.iter().fold(SymbolFlags::NONE, |flags, modifier| {
        flags
            | match modifier {
                Modifier::Public => SymbolFlags::PUBLIC,
                Modifier::Private => SymbolFlags::PRIVATE,
                Modifier::Protected => SymbolFlags::PROTECTED,
                Modifier::Static => SymbolFlags::STATIC,
                Modifier::Const => SymbolFlags::CONST,
                Modifier::Final => SymbolFlags::FINAL,
                Modifier::Abstract => SymbolFlags::ABSTRACT,
                Modifier::Extern => SymbolFlags::EXTERN,
                Modifier::Sealed => SymbolFlags::SEALED,
                Modifier::Inline => SymbolFlags::INLINE,
                Modifier::Unsafe => SymbolFlags::UNSAFE,
                Modifier::Global => SymbolFlags::GLOBAL,
            }
    })
}

pub fn hint_from_syntax(hint: &HintSyntax) -> TypeHint {
    match hint {
        HintSyntax::Builtin(name) => TypeHint::Builtin(name.clone()),
        HintSyntax::Named(path) => TypeHint::Named {
            path: path.to_string(),
            target: None,
        },
    }
}

/// Symbols of a variable or enum declaration, one per declarator.
///
/// The collector allocates them contiguously from `Node::symbol`.
pub fn item_symbols(ast: &Ast, node: NodeId) -> Vec<SymbolId> {
    let count = match &ast.node(node).kind {
        NodeKind::VarDecl { items, .. } | NodeKind::EnumDecl { items, .. } => items.len(),
        _ => 0,
    };
    match ast.node(node).symbol {
        Some(first) => (0..count as u32)
            .map(|offset| SymbolId::from_raw(first.as_raw() + offset))
            .collect(),
        None => Vec::new(),
    }
}

/// Turn an add-engine rejection into a diagnostic
pub fn report_rejection(
    graph: &ScopeGraph,
    sink: &mut DiagnosticSink,
    symbol: SymbolId,
    reason: RejectReason,
    existing: SymbolId,
) {
    let sym = graph.symbol(symbol);
    let old = graph.symbol(existing);
    let (kind, message) = match reason {
        RejectReason::Managed => (
            ResolveErrorKind::FinalOverride,
            format!("cannot redeclare intrinsic `{}`", sym.name),
        ),
        RejectReason::KindMismatch => (
            ResolveErrorKind::IncompleteMismatch,
            format!(
                "`{}` was forward-declared as a {}, not a {}",
                sym.name,
                old.kind(),
                sym.kind()
            ),
        ),
        RejectReason::FlagMismatch => (
            ResolveErrorKind::IncompleteMismatch,
            format!(
                "modifiers of `{}` ({}) differ from its forward declaration ({})",
                sym.name,
                sym.flags,
                old.flags.without(SymbolFlags::INCOMPLETE)
            ),
        ),
        RejectReason::Final => (
            ResolveErrorKind::FinalOverride,
            format!("cannot redeclare final {}", graph.symbol_path(existing)),
        ),
        RejectReason::Const => (
            ResolveErrorKind::ConstOverride,
            format!("cannot redeclare constant `{}`", sym.name),
        ),
        RejectReason::Duplicate => (
            ResolveErrorKind::DuplicateDeclaration,
            format!("duplicate declaration of {}", sym),
        ),
    };
    sink.error_with_previous(kind, sym.span, message, old.span, "previous declaration was here");
}

pub struct Collector<'a> {
    graph: &'a mut ScopeGraph,
    ast: &'a mut Ast,
    sink: &'a mut DiagnosticSink,
    scope: ScopeId,
    /// Type whose member list is being collected
    host: Option<SymbolId>,
    fn_depth: usize,
}

impl<'a> Collector<'a> {
    pub fn new(
        graph: &'a mut ScopeGraph,
        ast: &'a mut Ast,
        sink: &'a mut DiagnosticSink,
        scope: ScopeId,
    ) -> Self {
        Self {
            graph,
            ast,
            sink,
            scope,
            host: None,
            fn_depth: 0,
        }
    }

    /// Create the unit scope under the global scope and collect the tree
    pub fn collect_unit(graph: &'a mut ScopeGraph, ast: &'a mut Ast, sink: &'a mut DiagnosticSink) -> ScopeId {
        let unit = graph.new_scope(ScopeKind::Unit, Some(graph.global()));
        graph.scope_mut(unit).name = Some(ast.file.clone());
        let root = ast.root;
        let mut collector = Collector::new(graph, ast, sink, unit);
        collector.visit(root);
        unit
    }

    /// Collect the body of a function copied from a trait into a class.
    ///
    /// The copy's scope hangs off the host's member scope and delegates to
    /// the trait's member scope, so names the trait body used still resolve.
    pub fn collect_cloned_function(
        &mut self,
        symbol: SymbolId,
        node: NodeId,
        parent: ScopeId,
        delegate: Option<ScopeId>,
    ) {
        let NodeKind::FnDecl(decl) = self.ast.node(node).kind.clone() else {
            return;
        };
        self.ast.node_mut(node).symbol = Some(symbol);
        if decl.body.is_none() {
            return;
        }

        let fscope = self.graph.new_scope(ScopeKind::Function, Some(parent));
        self.graph.scope_mut(fscope).delegate = delegate;
        self.ast.node_mut(node).scope = Some(fscope);

        let params = self
            .graph
            .symbol(symbol)
            .as_function()
            .map(|f| f.params.clone())
            .unwrap_or_default();
        for (param, syntax) in params.iter().zip(&decl.params) {
            if let Some(var) = self.graph.symbol_mut(*param).as_variable_mut() {
                var.init = syntax.default;
            }
        }
        if let Some(func) = self.graph.symbol_mut(symbol).as_function_mut() {
            func.body_scope = Some(fscope);
        }

        let saved = self.scope;
        self.scope = parent;
        self.collect_body(symbol, &decl, fscope);
        self.scope = saved;
    }

    fn within(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self)) {
        let saved = std::mem::replace(&mut self.scope, scope);
        f(self);
        self.scope = saved;
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

    fn span_of(&self, node: NodeId) -> SourceSpan {
        self.ast.node(node).span
    }

    fn visit(&mut self, node: NodeId) {
        let kind = self.ast.node(node).kind.clone();
        match kind {
            NodeKind::Unit { body } => {
                self.ast.node_mut(node).scope = Some(self.scope);
                self.visit_all(&body);
            }
            NodeKind::Module { name, body } => self.visit_module(node, name.as_ref(), &body),
            NodeKind::Use {
                path,
                alias,
                public,
            } => self.visit_use(node, path, alias, public),
            NodeKind::ClassDecl(decl) => self.visit_class(node, decl),
            NodeKind::TraitDecl(decl) => self.visit_trait(node, decl),
            NodeKind::InterfaceDecl(decl) => self.visit_interface(node, decl),
            NodeKind::FnDecl(decl) => self.visit_function(node, &decl, false),
            NodeKind::FnExpr(decl) => self.visit_function(node, &decl, true),
            NodeKind::VarDecl { mods, items } => self.visit_variables(node, &mods, &items, false),
            NodeKind::EnumDecl { mods, items } => self.visit_variables(node, &mods, &items, true),
            NodeKind::Block { body } => {
                let scope = self.open_block(node);
                self.within(scope, |c| c.visit_all(&body));
            }
            NodeKind::For { .. } => {
                let scope = self.open_block(node);
                self.within(scope, |c| c.visit_children(node));
            }
            NodeKind::ForIn {
                key,
                value,
                iter,
                body,
            } => {
                self.visit(iter);
                let scope = self.open_block(node);
                let span = self.span_of(node);
                self.within(scope, |c| {
                    for ident in key.iter().chain(Some(&value)) {
                        let span = if ident.span.is_synthetic() { span } else { ident.span };
                        let symbol = Symbol::variable(&ident.name, span, SymbolFlags::NONE, VariableSymbol::default());
                        let id = c.graph.alloc(symbol);
                        c.insert(id);
                    }
                    c.visit(body);
                });
            }
            _ => self.visit_children(node),
        }
    }

    fn open_block(&mut self, node: NodeId) -> ScopeId {
        let scope = self.graph.new_scope(ScopeKind::Block, Some(self.scope));
        self.ast.node_mut(node).scope = Some(scope);
        scope
    }

    /// Insert through the add engine, reporting rejections
    fn insert(&mut self, symbol: SymbolId) -> AddDecision {
        let decision = self.graph.add(self.scope, symbol);
        if let AddDecision::Reject { reason, existing } = decision {
            report_rejection(self.graph, self.sink, symbol, reason, existing);
        }
        decision
    }

    fn visit_module(&mut self, node: NodeId, name: Option<&Path>, body: &[NodeId]) {
        let unit = self.graph.unit_of(self.scope).unwrap_or(self.scope);
        let target = match name {
            None => unit,
            Some(path) => {
                let mut current = if path.rooted {
                    unit
                } else {
                    self.graph.root_of(self.scope)
                };
                for segment in &path.segments {
                    current = self.module_scope(current, segment);
                }
                current
            }
        };
        self.ast.node_mut(node).scope = Some(target);
        self.within(target, |c| c.visit_all(body));
    }

    /// Existing sub-module of `parent`, or a new one
    fn module_scope(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        if let Some(existing) = self.graph.scope(parent).modules.get(name) {
            return *existing;
        }
        let module = self.graph.new_scope(ScopeKind::Module, Some(parent));
        self.graph.scope_mut(module).name = Some(name.to_string());
        self.graph
            .scope_mut(parent)
            .modules
            .insert(name.to_string(), module);
        debug!("module {} opened", self.graph.module_path(module));
        module
    }

    fn visit_use(&mut self, node: NodeId, path: Path, alias: Option<String>, public: bool) {
        let name = alias.unwrap_or_else(|| path.last().to_string());
        let flags = if public {
            SymbolFlags::PUBLIC
        } else {
            SymbolFlags::NONE
        };
        let data = SymbolData::Alias(AliasSymbol { path, target: None });
        let mut symbol = Symbol::new(name, self.span_of(node), flags, data);
        symbol.node = Some(node);
        let id = self.graph.alloc(symbol);
        self.ast.node_mut(node).symbol = Some(id);
        self.insert(id);
    }

    fn trait_usages(uses: &[TraitUse], fallback: SourceSpan) -> Vec<TraitUsage> {
        let pick = |span: SourceSpan| if span.is_synthetic() { fallback } else { span };
        let mut usages = Vec::new();
        for usage in uses {
            let trait_ref = TypeRef::new(usage.path.clone(), pick(usage.span));
            match &usage.items {
                None => usages.push(TraitUsage {
                    trait_ref,
                    item: None,
                    alias: None,
                    flags: SymbolFlags::NONE,
                    span: pick(usage.span),
                }),
                Some(items) => usages.extend(items.iter().map(|item| TraitUsage {
                    trait_ref: trait_ref.clone(),
                    item: Some(item.name.clone()),
                    alias: item.alias.clone(),
                    flags: modifier_flags(&item.mods),
                    span: pick(item.span),
                })),
            }
        }
        usages
    }

    fn visit_class(&mut self, node: NodeId, decl: ClassDecl) {
        let span = self.span_of(node);
        let mut flags = modifier_flags(&decl.mods);
        if decl.incomplete {
            flags.insert(SymbolFlags::INCOMPLETE);
        }
        let data = SymbolData::Class(ClassSymbol {
            superclass: decl.extends.map(|path| TypeRef::new(path, span)),
            interfaces: decl
                .implements
                .into_iter()
                .map(|path| TypeRef::new(path, span))
                .collect(),
            traits: Self::trait_usages(&decl.uses, span),
            members: self.scope,
            resolution: Resolution::Unresolved,
        });
        let symbol = self.declare_type(node, &decl.name, flags, data);
        self.visit_members(symbol, &decl.members);
    }

    fn visit_trait(&mut self, node: NodeId, decl: TraitDecl) {
        let span = self.span_of(node);
        let mut flags = modifier_flags(&decl.mods);
        if decl.incomplete {
            flags.insert(SymbolFlags::INCOMPLETE);
        }
        let data = SymbolData::Trait(TraitSymbol {
            traits: Self::trait_usages(&decl.uses, span),
            members: self.scope,
            resolution: Resolution::Unresolved,
        });
        let symbol = self.declare_type(node, &decl.name, flags, data);
        self.visit_members(symbol, &decl.members);
    }

    fn visit_interface(&mut self, node: NodeId, decl: InterfaceDecl) {
        let span = self.span_of(node);
        let mut flags = modifier_flags(&decl.mods);
        if decl.incomplete {
            flags.insert(SymbolFlags::INCOMPLETE);
        }
        let data = SymbolData::Interface(InterfaceSymbol {
            interfaces: decl
                .extends
                .into_iter()
                .map(|path| TypeRef::new(path, span))
                .collect(),
            members: self.scope,
            resolution: Resolution::Unresolved,
        });
        let symbol = self.declare_type(node, &decl.name, flags, data);
        self.visit_members(symbol, &decl.members);
    }

    /// Allocate a type symbol with its member scope and insert it
    fn declare_type(&mut self, node: NodeId, name: &str, flags: SymbolFlags, data: SymbolData) -> SymbolId {
        let mut symbol = Symbol::new(name, self.span_of(node), flags, data);
        symbol.node = Some(node);
        let id = self.graph.alloc(symbol);
        let members = self.graph.new_member_scope(id, self.scope);
        match &mut self.graph.symbol_mut(id).data {
            SymbolData::Class(class) => class.members = members,
            SymbolData::Trait(data) => data.members = members,
            SymbolData::Interface(data) => data.members = members,
            _ => {}
        }

        let slot = self.ast.node_mut(node);
        slot.symbol = Some(id);
        slot.scope = Some(members);
        self.insert(id);
        id
    }

    fn visit_members(&mut self, host: SymbolId, members: &[NodeId]) {
        let Some(scope) = self.graph.members_of(host) else {
            return;
        };
        let saved_host = self.host.replace(host);
        let saved_depth = std::mem::replace(&mut self.fn_depth, 0);
        self.within(scope, |c| c.visit_all(members));
        self.host = saved_host;
        self.fn_depth = saved_depth;
    }

    fn host_kind(&self) -> Option<SymbolKind> {
        self.host.map(|host| self.graph.symbol(host).kind())
    }

    fn in_member_scope(&self) -> bool {
        self.graph.scope(self.scope).kind == ScopeKind::Member
    }

    fn visit_function(&mut self, node: NodeId, decl: &FnDecl, is_expr: bool) {
        let span = self.span_of(node);
        let in_members = self.in_member_scope() && !is_expr;
        let host_kind = if in_members { self.host_kind() } else { None };

        let mut flags = modifier_flags(&decl.mods);
        if in_members {
            if host_kind == Some(SymbolKind::Interface) && !flags.intersects(SymbolFlags::VISIBILITY) {
                flags.insert(SymbolFlags::PUBLIC);
            }
            if decl.body.is_none() && !flags.contains(SymbolFlags::EXTERN) {
                flags.insert(SymbolFlags::ABSTRACT);
            }
        } else if decl.body.is_none() && !is_expr {
            flags.insert(SymbolFlags::INCOMPLETE);
        }

        let name = decl.name.clone().unwrap_or_else(|| {
            match decl.role {
                FnRole::Constructor => "new",
                FnRole::Destructor => "drop",
                _ => "{closure}",
            }
            .to_string()
        });
        let data = FunctionSymbol {
            role: decl.role,
            nested: self.fn_depth > 0,
            is_expr,
            has_body: decl.body.is_some(),
            ..FunctionSymbol::default()
        };
        let mut symbol = Symbol::function(name, span, flags, data);
        symbol.node = Some(node);
        let id = self.graph.alloc(symbol);
        self.ast.node_mut(node).symbol = Some(id);

        if !is_expr {
            match decl.role {
                FnRole::Plain => {
                    self.insert(id);
                }
                role if in_members => self.fill_slot(id, role),
                _ => {
                    self.sink.error(
                        ResolveErrorKind::InvalidContext,
                        span,
                        "constructors, destructors and accessors must be declared inside a class",
                    );
                    self.insert(id);
                }
            }
        }

        let params = self.make_params(&decl.params, span);
        if let Some(func) = self.graph.symbol_mut(id).as_function_mut() {
            func.params = params;
        }

        // bodiless declarations and trait/interface bodies get no scope
        if decl.body.is_none() || matches!(host_kind, Some(SymbolKind::Trait | SymbolKind::Interface)) {
            return;
        }

        let fscope = self.graph.new_scope(ScopeKind::Function, Some(self.scope));
        self.ast.node_mut(node).scope = Some(fscope);
        if let Some(func) = self.graph.symbol_mut(id).as_function_mut() {
            func.body_scope = Some(fscope);
        }
        self.collect_body(id, decl, fscope);
    }

    /// Parameters as detached symbols
    fn make_params(&mut self, params: &[Param], fallback: SourceSpan) -> SmallVec<[SymbolId; 4]> {
        params
            .iter()
            .map(|param| {
                let span = if param.span.is_synthetic() {
                    fallback
                } else {
                    param.span
                };
                let data = VariableSymbol {
                    value: None,
                    hint: param.hint.as_ref().map(hint_from_syntax),
                    by_ref: param.by_ref,
                    rest: param.rest,
                    optional: param.is_optional(),
                    this_bound: param.this_bound,
                    init: param.default,
                };
                let flags = modifier_flags(&param.mods) | SymbolFlags::PARAM;
                self.graph
                    .alloc(Symbol::variable(&param.name, span, flags, data))
            })
            .collect()
    }

    /// Add parameters to the function scope and collect defaults and body.
    /// A block body shares the function scope.
    fn collect_body(&mut self, function: SymbolId, decl: &FnDecl, fscope: ScopeId) {
        let params = self
            .graph
            .symbol(function)
            .as_function()
            .map(|f| f.params.clone())
            .unwrap_or_default();

        let saved_host = self.host.take();
        self.fn_depth += 1;
        self.within(fscope, |c| {
            for param in params {
                c.insert(param);
            }
            for default in decl.params.iter().filter_map(|p| p.default) {
                c.visit(default);
            }
            if let Some(body) = decl.body {
                match c.ast.node(body).kind.clone() {
                    NodeKind::Block { body: statements } => {
                        c.ast.node_mut(body).scope = Some(fscope);
                        c.visit_all(&statements);
                    }
                    _ => c.visit(body),
                }
            }
        });
        self.fn_depth -= 1;
        self.host = saved_host;
    }

    /// Constructor, destructor, getter and setter slots of a member scope
    fn fill_slot(&mut self, symbol: SymbolId, role: FnRole) {
        let scope = self.scope;
        let flags = self.graph.effective_flags(scope, self.graph.symbol(symbol).flags);
        self.graph.symbol_mut(symbol).flags = flags;
        let name = self.graph.symbol(symbol).name.clone();
        let span = self.graph.symbol(symbol).span;

        let Some(member) = self.graph.member_info_mut(scope) else {
            return;
        };
        let replaced = match role {
            FnRole::Constructor => member.ctor.replace(symbol),
            FnRole::Destructor => member.dtor.replace(symbol),
            FnRole::Getter | FnRole::Setter => {
                let slots = if role == FnRole::Getter {
                    &mut member.getters
                } else {
                    &mut member.setters
                };
                if let Some(existing) = slots.get(&name).copied() {
                    let what = if role == FnRole::Getter { "getter" } else { "setter" };
                    let first = self.graph.symbol(existing).span;
                    self.sink.error(
                        ResolveErrorKind::DuplicateDeclaration,
                        span,
                        format!("duplicate {} `{}` (first declared at {})", what, name, first),
                    );
                    return;
                }
                slots.insert(name, symbol);
                None
            }
            FnRole::Plain => None,
        };

        self.graph.symbol_mut(symbol).scope = Some(scope);
        if let Some(old) = replaced {
            let what = if role == FnRole::Constructor {
                "constructor"
            } else {
                "destructor"
            };
            self.sink
                .warn(span, format!("duplicate {}; this one replaces the first", what));
            let dropped = self.graph.symbol_mut(old);
            dropped.scope = None;
            dropped.reachable = false;
            self.graph.scope_mut(scope).dropped.push(old);
        }
    }

    fn visit_variables(&mut self, node: NodeId, mods: &[Modifier], items: &[VarItem], is_enum: bool) {
        let fallback = self.span_of(node);
        let in_members = self.in_member_scope();
        let mut flags = modifier_flags(mods);
        if is_enum {
            flags.insert(SymbolFlags::CONST);
        }
        if in_members
            && self.host_kind() == Some(SymbolKind::Interface)
            && !flags.intersects(SymbolFlags::VISIBILITY)
        {
            flags.insert(SymbolFlags::PUBLIC);
        }

        let mut first = None;
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let span = if item.span.is_synthetic() {
                fallback
            } else {
                item.span
            };
            let data = VariableSymbol {
                init: item.init,
                ..VariableSymbol::default()
            };
            let mut symbol = Symbol::variable(&item.name, span, flags, data);
            symbol.node = Some(node);
            // members are hoisted; everything else becomes visible in order
            symbol.reachable = in_members;
            let id = self.graph.alloc(symbol);
            first.get_or_insert(id);
            ids.push(id);
        }
        self.ast.node_mut(node).symbol = first;

        for id in ids {
            self.insert(id);
        }
        for init in items.iter().filter_map(|item| item.init) {
            self.visit(init);
        }
    }
}
