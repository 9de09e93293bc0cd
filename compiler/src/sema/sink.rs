//! Diagnostic sink shared by the semantic passes
//!
//! Ordinary semantic errors never unwind: passes record them here and carry
//! on with a sentinel outcome. `abort` additionally latches the unit so the
//! driver stops between passes.

use crate::error_codes::{format_error_code, get_error_code};
use diagnostics::{DiagnosticBuilder, Diagnostics};
use log::{debug, error, warn};
use source_map::SourceSpan;
use std::fmt;

/// Closed taxonomy of resolution errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveErrorKind {
    UndefinedSymbol,
    DuplicateDeclaration,
    UnreachableSymbol,
    LookupFailed,
    PrivateAccess,
    RestrictedAccess,
    FinalOverride,
    ConstOverride,
    IncompleteMismatch,
    CyclicOrMissingSuperclass,
    InterfaceContractViolation,
    InvalidInstantiation,
    InvalidContext,
    NonConstantRequirePath,
    EngineAbort,
}

impl ResolveErrorKind {
    /// Registry code of this kind
    pub fn code(self) -> u16 {
        match self {
            ResolveErrorKind::UndefinedSymbol => 2001,
            ResolveErrorKind::DuplicateDeclaration => 2002,
            ResolveErrorKind::UnreachableSymbol => 2003,
            ResolveErrorKind::LookupFailed => 2004,
            ResolveErrorKind::PrivateAccess => 2101,
            ResolveErrorKind::RestrictedAccess => 2102,
            ResolveErrorKind::FinalOverride => 2201,
            ResolveErrorKind::ConstOverride => 2202,
            ResolveErrorKind::IncompleteMismatch => 2203,
            ResolveErrorKind::CyclicOrMissingSuperclass => 2301,
            ResolveErrorKind::InterfaceContractViolation => 2302,
            ResolveErrorKind::InvalidInstantiation => 2303,
            ResolveErrorKind::InvalidContext => 2401,
            ResolveErrorKind::NonConstantRequirePath => 2501,
            ResolveErrorKind::EngineAbort => 2901,
        }
    }
}

impl fmt::Display for ResolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ResolveErrorKind::UndefinedSymbol => "undefined symbol",
            ResolveErrorKind::DuplicateDeclaration => "duplicate declaration",
            ResolveErrorKind::UnreachableSymbol => "unreachable symbol",
            ResolveErrorKind::LookupFailed => "lookup failed",
            ResolveErrorKind::PrivateAccess => "private access",
            ResolveErrorKind::RestrictedAccess => "restricted access",
            ResolveErrorKind::FinalOverride => "final override",
            ResolveErrorKind::ConstOverride => "constant override",
            ResolveErrorKind::IncompleteMismatch => "incompatible forward declaration",
            ResolveErrorKind::CyclicOrMissingSuperclass => "invalid superclass",
            ResolveErrorKind::InterfaceContractViolation => "contract violation",
            ResolveErrorKind::InvalidInstantiation => "invalid instantiation",
            ResolveErrorKind::InvalidContext => "invalid context",
            ResolveErrorKind::NonConstantRequirePath => "non-constant require path",
            ResolveErrorKind::EngineAbort => "engine abort",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Diagnostics,
    aborted: bool,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, kind: ResolveErrorKind, span: SourceSpan, message: impl Into<String>) {
        let builder = self.error_builder(kind, span, message.into());
        self.diagnostics.push(builder.build());
    }

    /// Error that also points at the declaration it conflicts with
    pub fn error_with_previous(
        &mut self,
        kind: ResolveErrorKind,
        span: SourceSpan,
        message: impl Into<String>,
        previous: SourceSpan,
        note: &str,
    ) {
        let builder = self
            .error_builder(kind, span, message.into())
            .label(previous, note);
        self.diagnostics.push(builder.build());
    }

    fn error_builder(&self, kind: ResolveErrorKind, span: SourceSpan, message: String) -> DiagnosticBuilder {
        debug!("{} at {}: {}", kind, span, message);
        let builder = DiagnosticBuilder::error(message, span).code(format_error_code(kind.code()));
        match get_error_code(kind.code()).and_then(|code| code.help) {
            Some(help) => builder.help(help),
            None => builder,
        }
    }

    pub fn warn(&mut self, span: SourceSpan, message: impl Into<String>) {
        let message = message.into();
        warn!("{}: {}", span, message);
        self.diagnostics
            .push(DiagnosticBuilder::warning(message, span).build());
    }

    pub fn info(&mut self, span: SourceSpan, message: impl Into<String>) {
        self.diagnostics
            .push(DiagnosticBuilder::info(message, span).build());
    }

    /// Record an engine invariant failure and latch the unit
    pub fn abort(&mut self, span: SourceSpan, message: impl Into<String>) {
        let message = message.into();
        error!("abort at {}: {}", span, message);
        let code = format_error_code(ResolveErrorKind::EngineAbort.code());
        self.diagnostics
            .push(DiagnosticBuilder::abort(message, span).code(code).build());
        self.aborted = true;
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Number of diagnostics carrying `kind`'s code
    pub fn count(&self, kind: ResolveErrorKind) -> usize {
        let code = format_error_code(kind.code());
        self.diagnostics.with_code(&code).count()
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}
