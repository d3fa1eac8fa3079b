//! Command-line interface for gnarl.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::analysis::LanguageId;
use crate::config::{Config, CONFIG_FILE_NAMES, DEFAULT_TEMPLATE};
use crate::detect::Runner;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

const FORMATS: &[&str] = &["pretty", "json", "sarif"];

/// Source complexity analyzer.
///
/// Gnarl parses Python, TypeScript and JavaScript with tree-sitter and
/// reports cyclomatic complexity, cognitive complexity and nesting depth
/// per function, along with structural code patterns and likely dead code.
#[derive(Parser)]
#[command(name = "gnarl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a file or directory
    #[command(visible_alias = "check")]
    Analyze(AnalyzeArgs),
    /// List the built-in pattern library
    Patterns(PatternsArgs),
    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Path to analyze (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Treat every file as this language instead of using extensions
    #[arg(short, long)]
    pub language: Option<String>,

    /// Skip the structural pattern pass
    #[arg(long)]
    pub no_patterns: bool,

    /// Skip the dead-code pass
    #[arg(long)]
    pub no_dead_code: bool,

    /// Show suppressed findings in output
    #[arg(long)]
    pub show_suppressed: bool,
}

/// Arguments for the patterns command.
#[derive(Parser)]
pub struct PatternsArgs {
    /// Only list patterns for this language
    #[arg(short, long)]
    pub language: Option<String>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "gnarl.yaml")]
    pub output: PathBuf,
}

/// Install the `tracing` subscriber. `RUST_LOG` directives are honoured on
/// top of the level picked by `-v`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_language(name: Option<&str>) -> Result<Option<LanguageId>, i32> {
    match name.map(str::parse::<LanguageId>).transpose() {
        Ok(id) => Ok(id),
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(EXIT_ERROR)
        }
    }
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    if !FORMATS.contains(&args.format.as_str()) {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let language = match parse_language(args.language.as_deref()) {
        Ok(id) => id,
        Err(code) => return Ok(code),
    };

    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let cwd = std::env::current_dir()?;
    let config_path = args.config.clone().or_else(|| Config::discover(&cwd));
    let mut config = match Config::load(config_path.as_deref(), &cwd) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if args.no_patterns {
        config.passes.patterns = false;
    }
    if args.no_dead_code {
        config.passes.dead_code = false;
    }

    let runner = Runner::new(&abs_path, config).with_language(language);
    let files = runner.collect_files()?;
    if files.is_empty() {
        eprintln!("Warning: no files to analyze");
        return Ok(EXIT_SUCCESS);
    }
    tracing::info!(files = files.len(), path = %abs_path.display(), "analyzing");

    let result = runner.run(&files)?;

    let config_str = config_path.as_ref().map(|p| p.to_string_lossy().to_string());
    let path_str = args.path.to_string_lossy().to_string();

    match args.format.as_str() {
        "json" => report::write_json(&path_str, config_str.as_deref(), &result)?,
        "sarif" => report::write_sarif(&result)?,
        _ => report::write_pretty(
            &path_str,
            config_str.as_deref(),
            &result,
            args.show_suppressed,
        ),
    }

    if result.has_errors() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the patterns command.
pub fn run_patterns(args: &PatternsArgs) -> anyhow::Result<i32> {
    let filter = match parse_language(args.language.as_deref()) {
        Ok(id) => id,
        Err(code) => return Ok(code),
    };

    let registry = crate::registry();
    for id in registry.languages() {
        if filter.is_some_and(|f| f != id) {
            continue;
        }
        let analyzer = registry.analyzer(id)?;
        let patterns = analyzer.builtin_patterns();

        println!("{} ({} patterns):", id, patterns.len());
        for p in patterns {
            println!(
                "  {:<28} {:<8} {:<14} {}",
                p.id,
                p.severity.as_str(),
                p.category.as_str(),
                p.description
            );
        }
        println!();
    }

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, DEFAULT_TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to tune thresholds and patterns", args.output.display());
    if !CONFIG_FILE_NAMES
        .iter()
        .any(|name| args.output.file_name().is_some_and(|f| f == *name))
    {
        println!("  2. Run: gnarl analyze . --config {}", args.output.display());
    } else {
        println!("  2. Run: gnarl analyze .");
    }

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_analyze_flags() {
        let cli = Cli::try_parse_from([
            "gnarl",
            "-vv",
            "check",
            "src",
            "--format",
            "json",
            "--language",
            "ts",
            "--no-dead-code",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.path, PathBuf::from("src"));
                assert_eq!(args.format, "json");
                assert_eq!(args.language.as_deref(), Some("ts"));
                assert!(args.no_dead_code);
                assert!(!args.no_patterns);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_invalid_format_is_usage_error() {
        let args = AnalyzeArgs {
            path: PathBuf::from("."),
            config: None,
            format: "xml".to_string(),
            language: None,
            no_patterns: false,
            no_dead_code: false,
            show_suppressed: false,
        };
        assert_eq!(run_analyze(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_unknown_language_is_usage_error() {
        let args = PatternsArgs {
            language: Some("cobol".to_string()),
        };
        assert_eq!(run_patterns(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_init_writes_template_once() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("conf/gnarl.yaml");
        let args = InitArgs {
            output: output.clone(),
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert!(Config::parse_file(&output).is_ok());
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }
}
