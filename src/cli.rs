//! Command-line interface for pdf-toolbox, built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (run, tools, pages,
//! presets) and the global flags (--config, --workers, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// pdf-toolbox: queue and run cancellable PDF jobs.
#[derive(Debug, Parser)]
#[command(name = "pdf-toolbox", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: ./pdf-toolbox.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum number of jobs running at once.
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Enable verbose (debug) logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one tool over the given input files.
    Run {
        /// Tool id, e.g. merge or rotate_pages (see `tools`).
        tool: String,

        /// Input files, in order.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (default: from config, else next to the first input).
        #[arg(long, short)]
        out: Option<PathBuf>,

        /// Base name used instead of the input file name.
        #[arg(long)]
        name: Option<String>,

        /// Tool parameter as KEY=VALUE; may be repeated.
        #[arg(long = "param", short = 'p', value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Preset id from the configured preset file.
        #[arg(long)]
        preset: Option<String>,

        /// Replace existing output files instead of picking a free name.
        #[arg(long, default_value_t = false)]
        overwrite: bool,

        /// Print every job event as a JSON line instead of a progress bar.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the available tools.
    Tools,

    /// Show which pages a range expression selects.
    Pages {
        /// Range expression, e.g. "1-3,8".
        expr: String,

        /// Page count of the document the range applies to. Without it the
        /// expression is only checked and its spans are listed.
        #[arg(long)]
        max: Option<usize>,
    },

    /// List presets from the configured preset file.
    Presets,
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_run_subcommand() {
        let cli = Cli::parse_from([
            "pdf-toolbox",
            "run",
            "rotate_pages",
            "a.pdf",
            "b.pdf",
            "--param",
            "angle=180",
            "-p",
            "ranges=1-3",
            "--out",
            "done",
        ]);
        match cli.command {
            Command::Run {
                tool,
                inputs,
                out,
                params,
                overwrite,
                json,
                ..
            } => {
                assert_eq!(tool, "rotate_pages");
                assert_eq!(inputs, vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]);
                assert_eq!(out, Some(PathBuf::from("done")));
                assert_eq!(
                    params,
                    vec![
                        ("angle".to_string(), "180".to_string()),
                        ("ranges".to_string(), "1-3".to_string())
                    ]
                );
                assert!(!overwrite);
                assert!(!json);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn run_requires_inputs() {
        assert!(Cli::try_parse_from(["pdf-toolbox", "run", "merge"]).is_err());
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "pdf-toolbox",
            "--workers",
            "2",
            "--config",
            "custom.toml",
            "--verbose",
            "tools",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.workers, Some(2));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Command::Tools));
    }

    #[test]
    fn cli_parses_pages_subcommand() {
        let cli = Cli::parse_from(["pdf-toolbox", "pages", "1-3,8", "--max", "10"]);
        match cli.command {
            Command::Pages { expr, max } => {
                assert_eq!(expr, "1-3,8");
                assert_eq!(max, Some(10));
            }
            _ => panic!("expected Pages command"),
        }
    }

    #[test]
    fn key_value_parsing() {
        assert_eq!(
            parse_key_value("lang=chi_sim+eng"),
            Ok(("lang".into(), "chi_sim+eng".into()))
        );
        assert_eq!(parse_key_value("note=a=b"), Ok(("note".into(), "a=b".into())));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=3").is_err());
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
