//! phsc - scope and name resolution checker for phs syntax trees
//!
//! # Usage
//!
//! ```bash
//! # Check one or more serialized syntax trees
//! phsc check main.ast.json lib.ast.json
//!
//! # Use a session configuration and machine-readable output
//! phsc check --config phsc.toml --format json main.ast.json
//!
//! # Print the scope graph after analysis
//! phsc check --dump-scopes -vv main.ast.json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use compiler::ast::Ast;
use compiler::config::{load_config, SessionConfig};
use compiler::logging;
use compiler::{Session, UnitAnalysis};
use diagnostics::{Diagnostic, ErrorFormatter};
use log::{info, LevelFilter};
use serde_json::json;
use source_map::SourceMap;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "phsc")]
#[command(version = "0.1.0")]
#[command(about = "Scope and name resolution checker for phs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze serialized syntax trees and report diagnostics
    Check {
        /// JSON-encoded syntax trees, analyzed in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Session configuration (defaults to ./phsc.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Print the scope graph after analysis
        #[arg(long)]
        dump_scopes: bool,

        /// Increase log verbosity (-v info, -vv debug, -vvv trace)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            files,
            config,
            format,
            dump_scopes,
            verbose,
        } => check(&files, config.as_deref(), format, dump_scopes, verbose),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when some unit may not proceed to code generation
fn check(
    files: &[PathBuf],
    config_path: Option<&Path>,
    format: OutputFormat,
    dump_scopes: bool,
    verbose: u8,
) -> Result<bool, String> {
    let config = read_config(config_path)?;
    logging::init_with_level(log_level(&config, verbose));

    let mut session = Session::new(config);
    let mut source_map = SourceMap::new();
    let mut reports = Vec::new();

    for path in files {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let mut ast = Ast::from_json(&text).map_err(|e| format!("{}: {}", path.display(), e))?;

        let content = ast.source.clone().unwrap_or_default();
        let file_id = source_map.add_file(ast.file.clone(), content);
        ast.set_file(file_id);

        let analysis = session.analyze(&mut ast);
        reports.push((ast.file.clone(), analysis));
    }

    let ok = reports.iter().all(|(_, analysis)| analysis.can_generate());
    match format {
        OutputFormat::Text => print_text(&reports, &source_map),
        OutputFormat::Json => print_json(&reports, &source_map)?,
    }

    if dump_scopes {
        println!("{}", session.graph().dump());
    }

    let stats = session.stats();
    info!(
        "{} unit(s) in {}us ({} error(s), {} warning(s))",
        stats.units_analyzed, stats.total_time_us, stats.error_count, stats.warning_count
    );
    Ok(ok)
}

fn read_config(path: Option<&Path>) -> Result<SessionConfig, String> {
    match path {
        Some(path) => load_config(path),
        None => {
            let default = Path::new("phsc.toml");
            if default.exists() {
                load_config(default)
            } else {
                Ok(SessionConfig::default())
            }
        }
    }
}

fn log_level(config: &SessionConfig, verbose: u8) -> LevelFilter {
    match verbose {
        0 => logging::parse_level(&config.log_level).unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn print_text(reports: &[(String, UnitAnalysis)], source_map: &SourceMap) {
    let formatter = ErrorFormatter::with_colors();
    for (file, analysis) in reports {
        if analysis.diagnostics.is_empty() {
            println!("✓ {}", file);
            continue;
        }
        print!("{}", formatter.format_diagnostics(&analysis.diagnostics, source_map));
        println!("{}: {}", file, analysis.diagnostics.summary());
    }
}

fn print_json(reports: &[(String, UnitAnalysis)], source_map: &SourceMap) -> Result<(), String> {
    let units: Vec<_> = reports
        .iter()
        .map(|(file, analysis)| {
            json!({
                "file": file,
                "can_generate": analysis.can_generate(),
                "aborted": analysis.aborted,
                "imports": analysis.imports,
                "diagnostics": analysis
                    .diagnostics
                    .diagnostics
                    .iter()
                    .map(|d| diagnostic_json(d, source_map))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    let out = serde_json::to_string_pretty(&json!({ "units": units }))
        .map_err(|e| format!("Failed to encode report: {}", e))?;
    println!("{}", out);
    Ok(())
}

fn diagnostic_json(diagnostic: &Diagnostic, source_map: &SourceMap) -> serde_json::Value {
    json!({
        "severity": diagnostic.severity.to_string(),
        "code": diagnostic.code,
        "message": diagnostic.message,
        "location": source_map.describe(diagnostic.span),
        "line": diagnostic.span.start.line,
        "column": diagnostic.span.start.column,
        "help": diagnostic.help,
        "related": diagnostic
            .labels
            .iter()
            .map(|label| json!({
                "location": source_map.describe(label.span),
                "message": label.message,
            }))
            .collect::<Vec<_>>(),
    })
}
