//! Scope and symbol resolution engine
//!
//! The engine runs two passes per unit:
//! 1. [`collector`] creates scopes and declaration symbols
//! 2. [`resolver`] binds names and checks context rules, calling
//!    [`inheritance`] to link and flatten types on the way
//!
//! A unit that resolved cleanly is then [exported](export) to the global
//! scope so later units of the session can use its public declarations.
//!
//! Both passes report through a [`DiagnosticSink`]; only engine invariant
//! failures latch the unit as aborted.

pub mod add;
pub mod collector;
pub mod export;
pub mod id_types;
pub mod imports;
pub mod inheritance;
pub mod lookup;
pub mod resolver;
pub mod scopes;
pub mod sink;
pub mod symbol_table;
pub mod symbols;
pub mod values;

pub use add::{AddDecision, RejectReason};
pub use collector::Collector;
pub use export::ExportConflict;
pub use id_types::{NodeId, ScopeId, SymbolId};
pub use imports::{ImportCollector, ImportRequest, SourceHandle, SourceLoader};
pub use inheritance::{Inheritance, LateBinding};
pub use lookup::{LookupResult, MAX_ALIAS_HOPS};
pub use resolver::{Resolver, Services};
pub use scopes::{MemberInfo, Scope, ScopeError, ScopeGraph, ScopeKind};
pub use sink::{DiagnosticSink, ResolveErrorKind};
pub use symbol_table::SymbolTable;
pub use symbols::{
    AliasSymbol, ClassSymbol, FunctionSymbol, InterfaceSymbol, Namespace, Resolution, Symbol,
    SymbolData, SymbolFlags, SymbolKind, TraitSymbol, TraitUsage, TypeHint, TypeRef,
    VariableSymbol,
};
pub use values::{ConstantReducer, LiteralReducer, Value};
