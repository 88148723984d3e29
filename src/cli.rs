//! CLI argument parsing and command dispatch

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use strata::defaults::ENV_PREFIX;
use strata::output::OutputConfig;

use crate::commands;

/// Strata - Render YAML templates from layered data values
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process YAML templates with layered data values
    #[command(visible_aliases = ["t", "tpl"])]
    Template(commands::template::TemplateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> ExitCode {
        let level = match &self.command {
            Commands::Template(args) if args.debug => "debug",
            _ => self.log_level.as_str(),
        };
        init_logging(level);
        let out = OutputConfig::from_env_and_flag(&self.color);

        let result = match self.command {
            Commands::Template(args) => commands::template::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        };

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", out.error_message(&format!("{:#}", e)));
                ExitCode::FAILURE
            }
        }
    }
}

/// Log to stderr at `level`; `STRATA_LOG` overrides it.
fn init_logging(level: &str) {
    let env_var = format!("{}_LOG", ENV_PREFIX);
    let mut builder = env_logger::Builder::new();
    builder
        .parse_filters(level)
        .parse_env(env_logger::Env::new().filter(env_var))
        .format_timestamp(None)
        .format_target(false);
    // A logger may already be installed when running under a test harness.
    let _ = builder.try_init();
}
