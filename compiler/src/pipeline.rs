//! Analysis pipeline
//!
//! A [`Session`] owns the scope graph shared by every unit it analyzes. Each
//! call to [`Session::analyze`] runs the passes over one unit:
//!
//! 1. **Collect**: create the unit's scopes and declaration symbols
//! 2. **Resolve**: bind names, link inheritance, flatten traits
//! 3. **Late bind**: fill engine constants of members copied from traits
//! 4. **Export**: publish the unit's public declarations and modules in the
//!    global scope for the units analyzed after it
//!
//! The abort latch is checked between passes. A unit that recorded an
//! `error` or `abort` must not reach code generation.

use crate::config::SessionConfig;
use crate::sema::collector::report_rejection;
use crate::sema::{
    ClassSymbol, Collector, ConstantReducer, DiagnosticSink, FunctionSymbol, ImportCollector,
    ImportRequest, LiteralReducer, Namespace, Resolution, Resolver, ScopeGraph, ScopeId, Services,
    SourceHandle, SourceLoader, Symbol, SymbolData, SymbolFlags, SymbolId,
};
use diagnostics::Diagnostics;
use log::{debug, info, warn};
use source_map::{FileId, SourceSpan};
use std::time::Instant;

/// Timing and counters accumulated over a session
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Number of units analyzed
    pub units_analyzed: usize,

    /// Time spent in the collect pass (microseconds)
    pub collect_time_us: u64,

    /// Time spent in the resolve pass (microseconds)
    pub resolve_time_us: u64,

    /// Time spent binding trait-copied engine constants (microseconds)
    pub late_bind_time_us: u64,

    /// Time spent exporting units to the global scope (microseconds)
    pub export_time_us: u64,

    /// Total analysis time (microseconds)
    pub total_time_us: u64,

    /// Warnings reported across all units
    pub warning_count: usize,

    /// Errors and aborts reported across all units
    pub error_count: usize,
}

/// Result of analyzing one unit
#[derive(Debug)]
pub struct UnitAnalysis {
    /// Scope created for the unit; `None` if collection never ran
    pub unit_scope: Option<ScopeId>,
    pub diagnostics: Diagnostics,
    /// Sources the unit asked for through `require`, in request order
    pub imports: Vec<ImportRequest>,
    /// An engine invariant failed and later passes were skipped
    pub aborted: bool,
}

impl UnitAnalysis {
    /// True if no error or abort was recorded
    pub fn can_generate(&self) -> bool {
        !self.aborted && !self.diagnostics.has_errors()
    }
}

/// Loader adapter that records the requests of the unit being analyzed
struct RecordingLoader<'a> {
    inner: &'a mut dyn SourceLoader,
    requests: Vec<ImportRequest>,
}

impl SourceLoader for RecordingLoader<'_> {
    fn register(&mut self, request: ImportRequest) -> SourceHandle {
        if !self.requests.iter().any(|r| r.path == request.path) {
            self.requests.push(request.clone());
        }
        self.inner.register(request)
    }
}

/// One analysis session: the global scope, its bootstrap entries and the
/// collaborators every unit shares
pub struct Session {
    config: SessionConfig,
    graph: ScopeGraph,
    loader: Box<dyn SourceLoader>,
    reducer: Box<dyn ConstantReducer>,
    root_object: Option<SymbolId>,
    stats: PipelineStats,
}

impl Session {
    /// A session with the literal-only reducer and a recording loader
    pub fn new(config: SessionConfig) -> Self {
        let mut session = Self {
            config,
            graph: ScopeGraph::new(),
            loader: Box::new(ImportCollector::new()),
            reducer: Box::new(LiteralReducer),
            root_object: None,
            stats: PipelineStats::default(),
        };
        session.bootstrap();
        session
    }

    pub fn with_loader(mut self, loader: Box<dyn SourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_reducer(mut self, reducer: Box<dyn ConstantReducer>) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn graph(&self) -> &ScopeGraph {
        &self.graph
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// The implicit root class, if one is configured
    pub fn root_object(&self) -> Option<SymbolId> {
        self.root_object
    }

    /// Register the root object and the intrinsic functions in the
    /// global scope as managed entries
    fn bootstrap(&mut self) {
        let global = self.graph.global();
        let span = SourceSpan::synthetic(FileId::default());

        if let Some(name) = self.config.root_object.clone() {
            let data = SymbolData::Class(ClassSymbol {
                superclass: None,
                interfaces: Vec::new(),
                traits: Vec::new(),
                members: global,
                resolution: Resolution::Resolved,
            });
            let id = self
                .graph
                .alloc(Symbol::new(name.as_str(), span, SymbolFlags::PUBLIC, data));
            let members = self.graph.new_member_scope(id, global);
            self.graph.scope_mut(members).name = Some(name.clone());
            if let Some(class) = self.graph.symbol_mut(id).as_class_mut() {
                class.members = members;
            }
            if self.graph.add_managed(global, id, Namespace::Type).is_live() {
                debug!("root object `{}` registered", name);
                self.root_object = Some(id);
            } else {
                warn!("root object `{}` could not be registered", name);
            }
        }

        for name in self.config.intrinsics.clone() {
            let function = FunctionSymbol {
                has_body: true,
                ..FunctionSymbol::default()
            };
            let id = self
                .graph
                .alloc(Symbol::function(name.as_str(), span, SymbolFlags::PUBLIC, function));
            if !self.graph.add_managed(global, id, Namespace::Internal).is_live() {
                warn!("intrinsic `{}` registered twice", name);
            }
        }
    }

    /// Run every pass over one unit
    pub fn analyze(&mut self, ast: &mut crate::ast::Ast) -> UnitAnalysis {
        let start = Instant::now();
        let mut sink = DiagnosticSink::new();
        info!("Analyzing {}", ast.file);

        if let Err(message) = ast.validate() {
            sink.abort(SourceSpan::synthetic(FileId::default()), message);
            return self.finish(sink, None, Vec::new(), start);
        }

        let collect_start = Instant::now();
        let unit = {
            let _span = tracing::info_span!("collect", file = %ast.file).entered();
            Collector::collect_unit(&mut self.graph, ast, &mut sink)
        };
        self.stats.collect_time_us += collect_start.elapsed().as_micros() as u64;
        debug!("collect pass created unit scope {}", unit);
        if sink.aborted() {
            return self.finish(sink, Some(unit), Vec::new(), start);
        }

        let mut loader = RecordingLoader {
            inner: &mut *self.loader,
            requests: Vec::new(),
        };
        let services = Services {
            reducer: &mut *self.reducer,
            loader: &mut loader,
            config: &self.config,
            root_object: self.root_object,
        };
        let mut resolver = Resolver::new(&mut self.graph, ast, &mut sink, services);

        let resolve_start = Instant::now();
        {
            let _span = tracing::info_span!("resolve").entered();
            resolver.resolve_unit();
        }
        self.stats.resolve_time_us += resolve_start.elapsed().as_micros() as u64;

        let late_start = Instant::now();
        if !resolver.aborted() {
            let _span = tracing::info_span!("late_bind").entered();
            resolver.bind_late();
        }
        drop(resolver);
        self.stats.late_bind_time_us += late_start.elapsed().as_micros() as u64;

        if !sink.aborted() {
            let export_start = Instant::now();
            let _span = tracing::info_span!("export").entered();
            for conflict in self.graph.export_unit(unit) {
                report_rejection(&self.graph, &mut sink, conflict.symbol, conflict.reason, conflict.existing);
            }
            self.stats.export_time_us += export_start.elapsed().as_micros() as u64;
        }

        let imports = loader.requests;
        self.finish(sink, Some(unit), imports, start)
    }

    fn finish(
        &mut self,
        sink: DiagnosticSink,
        unit_scope: Option<ScopeId>,
        imports: Vec<ImportRequest>,
        start: Instant,
    ) -> UnitAnalysis {
        let aborted = sink.aborted();
        let diagnostics = sink.into_diagnostics();

        self.stats.units_analyzed += 1;
        self.stats.warning_count += diagnostics.warnings().count();
        self.stats.error_count += diagnostics.errors().count();
        self.stats.total_time_us += start.elapsed().as_micros() as u64;

        info!(
            "Analysis finished: {} error(s), {} warning(s){}",
            diagnostics.errors().count(),
            diagnostics.warnings().count(),
            if aborted { ", aborted" } else { "" }
        );

        UnitAnalysis {
            unit_scope,
            diagnostics,
            imports,
            aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, AstBuilder, ClassDecl, FnDecl};
    use crate::sema::NodeId;

    fn session_with(root_object: Option<&str>, intrinsics: &[&str]) -> Session {
        crate::logging::init_test();
        Session::new(SessionConfig {
            root_object: root_object.map(str::to_string),
            intrinsics: intrinsics.iter().map(|s| s.to_string()).collect(),
            ..SessionConfig::default()
        })
    }

    #[test]
    fn test_intrinsics_resolve_and_cannot_be_redeclared() {
        let mut session = session_with(None, &["print"]);

        let mut b = AstBuilder::new("main.phs");
        let callee = b.name("print");
        let arg = b.string("hi");
        let call = b.call(callee, vec![arg]);
        let stmt = b.expr_stmt(call);
        let mut ast = b.finish(vec![stmt]);
        let analysis = session.analyze(&mut ast);
        assert!(analysis.can_generate(), "{}", analysis.diagnostics.summary());
        assert!(ast.node(callee).symbol.is_some());

        let mut b = AstBuilder::new("other.phs");
        let body = b.block(vec![]);
        let redeclared = b.func(FnDecl::named("print").with_body(body));
        let mut ast = b.finish(vec![redeclared]);
        let analysis = session.analyze(&mut ast);
        assert!(!analysis.can_generate());
        assert_eq!(analysis.diagnostics.with_code("E2201").count(), 1);
    }

    #[test]
    fn test_root_object_is_default_superclass() {
        let mut session = session_with(Some("Obj"), &[]);
        let root = session.root_object().expect("root object registered");

        let mut b = AstBuilder::new("main.phs");
        let dog = b.class(ClassDecl::named("Dog"));
        let mut ast = b.finish(vec![dog]);
        let analysis = session.analyze(&mut ast);
        assert!(analysis.can_generate());

        let graph = session.graph();
        let dog = ast.node(dog).symbol.expect("Dog collected");
        let dog_members = graph.members_of(dog).expect("Dog has members");
        let super_scope = graph.member_info(dog_members).and_then(|m| m.super_scope);
        assert_eq!(super_scope, graph.members_of(root));
    }

    #[test]
    fn test_imports_are_reported_per_unit() {
        let mut session = session_with(None, &[]);

        for (file, target) in [("a.phs", "lib/a"), ("b.phs", "lib/b")] {
            let mut b = AstBuilder::new(file);
            let path = b.string(target);
            let require = b.require(path, false);
            let stmt = b.expr_stmt(require);
            let mut ast = b.finish(vec![stmt]);
            let analysis = session.analyze(&mut ast);
            assert_eq!(analysis.imports.len(), 1);
            assert_eq!(
                analysis.imports[0].path,
                std::path::PathBuf::from(format!("{}.phs", target))
            );
        }

        let stats = session.stats();
        assert_eq!(stats.units_analyzed, 2);
        assert_eq!(stats.error_count, 0);
    }

    #[test]
    fn test_malformed_tree_aborts() {
        let mut session = session_with(None, &[]);
        let mut ast = Ast {
            file: "broken.phs".to_string(),
            source: None,
            nodes: Vec::new(),
            root: NodeId::from_raw(0),
        };
        let analysis = session.analyze(&mut ast);
        assert!(analysis.aborted);
        assert!(analysis.unit_scope.is_none());
        assert!(!analysis.can_generate());
    }

    #[test]
    fn test_errors_block_generation_but_not_analysis() {
        let mut session = session_with(None, &[]);
        let mut b = AstBuilder::new("main.phs");
        let missing = b.name("missing");
        let first = b.expr_stmt(missing);
        let also_missing = b.name("also_missing");
        let second = b.expr_stmt(also_missing);
        let mut ast = b.finish(vec![first, second]);

        let analysis = session.analyze(&mut ast);
        assert!(!analysis.aborted);
        assert!(!analysis.can_generate());
        assert_eq!(analysis.diagnostics.with_code("E2001").count(), 2);
    }
}
