#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use safecheck_core::{Checker, Rule};
use tracing_subscriber::EnvFilter;

mod load;
mod render;

use load::LoadError;

#[derive(Parser, Debug)]
#[command(name = "safecheck", version, about = "Memory-safety checker for C++ translation units")]
struct Cli {
    /// More logging on stderr (repeatable). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check a translation unit serialized by the frontend
    Check {
        /// Input unit (JSON)
        unit: PathBuf,

        /// Checker options (`safecheck.toml`)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Safe library database; defaults to the nearest `safe_library.json`
        #[arg(long = "library-db")]
        library_db: Option<PathBuf>,

        /// Run only the given rule (repeatable)
        #[arg(long = "rule")]
        rules: Vec<Rule>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// List the rules and whether they run by default
    Rules,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Cmd::Check {
            unit: unit_path,
            config,
            library_db,
            rules,
            format,
        } => {
            let config = load::load_config(&unit_path, config.as_deref(), library_db.as_deref())?;
            let unit = load::load_unit(&unit_path)?;

            let mut checker = Checker::new(&config);
            if !rules.is_empty() {
                checker = checker.with_rules(rules);
            }
            let diags = checker.check_unit(&unit);
            let errors = diags.error_count();
            let findings = render::findings(&unit, diags.items());

            match format {
                Format::Text => print!("{}", render::text(&findings)),
                Format::Json => {
                    let report = render::Report {
                        input: unit_path.display().to_string(),
                        errors,
                        findings,
                    };
                    println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
                }
            }

            if errors > 0 {
                return Err(LoadError::Violations { errors }.into());
            }
            Ok(())
        }
        Cmd::Rules => {
            for rule in Rule::ALL {
                let default = if rule == Rule::Determinism { "opt-in" } else { "default" };
                println!("{:<24}{default}", rule.name());
            }
            Ok(())
        }
    }
}
