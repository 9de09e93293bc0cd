//! Diagnostics for the phs front end
//!
//! A [`Diagnostic`] has a severity, an optional registry code, a primary
//! span and any number of related locations ("previous declaration was
//! here"). [`ErrorFormatter`] renders them rustc-style with source
//! snippets.
//!
//! `Abort` is reserved for engine invariant failures; a unit that records one
//! stops between passes.

use std::fmt::{self, Write};

pub use source_map::{FileId, SourceFile, SourceMap, SourcePosition, SourceSpan};

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Abort,
    Error,
    Warning,
    Info,
}

impl DiagnosticSeverity {
    /// Errors and aborts block code generation
    pub fn is_fatal(self) -> bool {
        matches!(self, DiagnosticSeverity::Abort | DiagnosticSeverity::Error)
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Abort => write!(f, "abort"),
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Info => write!(f, "info"),
        }
    }
}

/// A related location, e.g. the declaration a redeclaration clashes with
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub span: SourceSpan,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
    pub span: SourceSpan,
    pub labels: Vec<Label>,
    pub help: Option<String>,
}

/// Diagnostics of one unit, in report order
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// True if an error or an abort was recorded
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_fatal())
    }

    pub fn has_aborted(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Abort)
    }

    /// Errors and aborts
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity.is_fatal())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }

    /// Diagnostics carrying the given code, e.g. `"E2001"`
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |d| d.code.as_deref() == Some(code))
    }

    /// One-line tally, e.g. `2 errors, 1 warning`
    pub fn summary(&self) -> String {
        fn plural(n: usize, word: &str) -> String {
            if n == 1 {
                format!("{} {}", n, word)
            } else {
                format!("{} {}s", n, word)
            }
        }
        format!(
            "{}, {}",
            plural(self.errors().count(), "error"),
            plural(self.warnings().count(), "warning")
        )
    }
}

pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(severity: DiagnosticSeverity, message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            diagnostic: Diagnostic {
                severity,
                code: None,
                message: message.into(),
                span,
                labels: Vec::new(),
                help: None,
            },
        }
    }

    pub fn abort(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticSeverity::Abort, message, span)
    }

    pub fn error(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticSeverity::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticSeverity::Warning, message, span)
    }

    pub fn info(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticSeverity::Info, message, span)
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.diagnostic.code = Some(code.into());
        self
    }

    /// Attach a related location. Synthetic spans (bootstrap entries) have
    /// no source to point at and are skipped.
    pub fn label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        if !span.is_synthetic() {
            self.diagnostic.labels.push(Label {
                span,
                message: message.into(),
            });
        }
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic.help = Some(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }
}

/// ANSI sequences used by the formatter; all empty when colors are off
struct Palette {
    severity: &'static str,
    gutter: &'static str,
    message: &'static str,
    related: &'static str,
    help: &'static str,
    reset: &'static str,
}

impl Palette {
    fn new(colors: bool, severity: DiagnosticSeverity) -> Self {
        if !colors {
            return Self {
                severity: "",
                gutter: "",
                message: "",
                related: "",
                help: "",
                reset: "",
            };
        }
        Self {
            severity: match severity {
                DiagnosticSeverity::Abort => "\x1b[1;31m",
                DiagnosticSeverity::Error => "\x1b[31m",
                DiagnosticSeverity::Warning => "\x1b[33m",
                DiagnosticSeverity::Info => "\x1b[36m",
            },
            gutter: "\x1b[96m",
            message: "\x1b[1;97m",
            related: "\x1b[34m",
            help: "\x1b[32m",
            reset: "\x1b[0m",
        }
    }
}

/// Renders diagnostics with source snippets
#[derive(Default)]
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    pub fn format_diagnostics(&self, diagnostics: &Diagnostics, source_map: &SourceMap) -> String {
        diagnostics
            .diagnostics
            .iter()
            .map(|d| self.format_diagnostic(d, source_map))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic, source_map: &SourceMap) -> String {
        let p = Palette::new(self.use_colors, diagnostic.severity);
        let mut out = String::new();

        let code = diagnostic
            .code
            .as_ref()
            .map(|c| format!("[{}]", c))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{}{}{}{}: {}{}{}",
            p.severity, diagnostic.severity, code, p.reset, p.message, diagnostic.message, p.reset
        );

        self.snippet(&mut out, &p, source_map, diagnostic.span, '^', None);
        for label in &diagnostic.labels {
            self.snippet(&mut out, &p, source_map, label.span, '-', Some(&label.message));
        }

        if let Some(help) = &diagnostic.help {
            let _ = writeln!(out, "   {}help{}: {}", p.help, p.reset, help);
        }
        out
    }

    /// Location arrow, the source line and a marker under the span
    fn snippet(
        &self,
        out: &mut String,
        p: &Palette,
        source_map: &SourceMap,
        span: SourceSpan,
        marker: char,
        message: Option<&str>,
    ) {
        if span.is_synthetic() {
            return;
        }
        let Some(file) = source_map.get_file(span.file_id) else {
            return;
        };
        let _ = writeln!(
            out,
            "  {}-->{} {}:{}:{}",
            p.gutter, p.reset, file.name, span.start.line, span.start.column
        );

        let Some(line) = file.get_line(span.start.line) else {
            return;
        };
        let number = span.start.line.to_string();
        let blank = " ".repeat(number.len());
        let _ = writeln!(out, "{} {}|{}", blank, p.gutter, p.reset);
        let _ = writeln!(out, "{}{}{} {}|{} {}", p.gutter, number, p.reset, p.gutter, p.reset, line);

        let start = span.start.column.saturating_sub(1);
        let width = if span.start.line == span.end.line {
            span.end.column.saturating_sub(span.start.column)
        } else {
            line.len().saturating_sub(start)
        };
        let color = if marker == '^' { p.severity } else { p.related };
        let _ = write!(
            out,
            "{} {}|{} {}{}{}{}",
            blank,
            p.gutter,
            p.reset,
            " ".repeat(start),
            color,
            marker.to_string().repeat(width.max(1)),
            p.reset
        );
        if let Some(message) = message {
            let _ = write!(out, " {}{}{}", color, message, p.reset);
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_at(line: usize, column: usize) -> SourceSpan {
        SourceSpan::new(
            SourcePosition::new(line, column, 0),
            SourcePosition::new(line, column + 3, 3),
            FileId::new(0),
        )
    }

    #[test]
    fn test_diagnostic_builder() {
        let span = span_at(2, 5);
        let previous = span_at(1, 5);

        let diagnostic = DiagnosticBuilder::error("duplicate declaration of variable `foo`", span)
            .code("E2002")
            .label(previous, "previous declaration was here")
            .help("choose a different name")
            .build();

        assert_eq!(diagnostic.severity, DiagnosticSeverity::Error);
        assert_eq!(diagnostic.code.as_deref(), Some("E2002"));
        assert_eq!(diagnostic.labels.len(), 1);
        assert_eq!(diagnostic.labels[0].span, previous);
        assert_eq!(diagnostic.help.as_deref(), Some("choose a different name"));
    }

    #[test]
    fn test_synthetic_labels_are_dropped() {
        let diagnostic = DiagnosticBuilder::error("cannot redeclare intrinsic `print`", span_at(1, 1))
            .label(SourceSpan::synthetic(FileId::new(0)), "intrinsic")
            .build();
        assert!(diagnostic.labels.is_empty());
    }

    #[test]
    fn test_abort_counts_as_error() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(DiagnosticBuilder::warning("unused", span_at(1, 1)).build());
        assert!(!diagnostics.has_errors());

        diagnostics.push(DiagnosticBuilder::abort("scope stack underflow", span_at(2, 1)).build());
        assert!(diagnostics.has_errors());
        assert!(diagnostics.has_aborted());
        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(diagnostics.summary(), "1 error, 1 warning");
    }

    #[test]
    fn test_with_code_filters() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(DiagnosticBuilder::error("a", span_at(1, 1)).code("E2001").build());
        diagnostics.push(DiagnosticBuilder::error("b", span_at(2, 1)).code("E2101").build());
        diagnostics.push(DiagnosticBuilder::error("c", span_at(3, 1)).code("E2001").build());

        assert_eq!(diagnostics.with_code("E2001").count(), 2);
        assert_eq!(diagnostics.with_code("E2999").count(), 0);
    }

    #[test]
    fn test_format_snippet_with_previous_declaration() {
        let mut source_map = SourceMap::new();
        let file_id = source_map.add_file(
            "main.phs".to_string(),
            "let foo = 1;\nlet foo = 2;\n".to_string(),
        );
        let at = |line| {
            SourceSpan::new(
                SourcePosition::new(line, 5, 0),
                SourcePosition::new(line, 8, 0),
                file_id,
            )
        };

        let diagnostic = DiagnosticBuilder::error("duplicate declaration of variable `foo`", at(2))
            .code("E2002")
            .label(at(1), "previous declaration was here")
            .build();
        let text = ErrorFormatter::new().format_diagnostic(&diagnostic, &source_map);

        assert!(text.starts_with("error[E2002]: duplicate declaration of variable `foo`"));
        assert!(text.contains("--> main.phs:2:5"));
        assert!(text.contains("2 | let foo = 2;"));
        assert!(text.contains("    ^^^"));
        assert!(text.contains("--> main.phs:1:5"));
        assert!(text.contains("--- previous declaration was here"));
    }
}
