mod cli;
mod ui;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};
use pdf_toolbox::backend::CommandBackend;
use pdf_toolbox::config::ToolboxConfig;
use pdf_toolbox::engine::JobQueue;
use pdf_toolbox::job::{JobEvent, JobSpec};
use pdf_toolbox::ops::Registry;
use pdf_toolbox::presets::PresetStore;
use pdf_toolbox::range::{page_spans, parse_page_range};
use ui::JobDisplay;

const EXIT_FAILED: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run {
            tool,
            inputs,
            out,
            name,
            params,
            preset,
            overwrite,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let workers = cli.workers.unwrap_or(config.max_workers);
            let output_dir = out
                .or_else(|| config.output_dir.clone())
                .unwrap_or_else(|| beside(&inputs[0]));

            let mut spec = JobSpec::new(tool, inputs, output_dir).with_overwrite(overwrite);
            if let Some(name) = name {
                spec = spec.with_output_name(name);
            }
            for (key, value) in &params {
                spec.params.insert_raw(key, value);
            }
            if let Some(id) = preset {
                load_presets(&config)?.find(&id)?.apply(&mut spec);
            }

            let registry = Registry::with_defaults(Arc::new(CommandBackend::new(config.tools)));
            run(registry, workers, spec, json).await
        }
        Command::Tools => {
            let config = load_config(cli.config.as_deref())?;
            ui::print_tools(&Registry::with_defaults(Arc::new(CommandBackend::new(
                config.tools,
            ))));
            Ok(ExitCode::SUCCESS)
        }
        Command::Pages { expr, max: Some(max) } => {
            let pages = parse_page_range(&expr, Some(max))?;
            ui::print_pages(&pages);
            Ok(ExitCode::SUCCESS)
        }
        Command::Pages { expr, max: None } => {
            // Without a document size the selection is unbounded, so show spans.
            ui::print_spans(&page_spans(&expr, None)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Presets => {
            let config = load_config(cli.config.as_deref())?;
            ui::print_presets(load_presets(&config)?.presets());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "pdf_toolbox=debug"
    } else {
        "pdf_toolbox=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ToolboxConfig> {
    ToolboxConfig::load(path).context("failed to load configuration")
}

fn load_presets(config: &ToolboxConfig) -> Result<PresetStore> {
    let Some(path) = &config.presets else {
        bail!("no preset file configured (set `presets` in pdf-toolbox.toml)");
    };
    PresetStore::load(path)
        .with_context(|| format!("failed to read presets from {}", path.display()))
}

// Directory of `input`, or the working directory for bare file names.
fn beside(input: &Path) -> PathBuf {
    match input.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Submit `spec`, follow its events until it finishes, and map the outcome to an exit code.
/// Ctrl-C requests cooperative cancellation; the job still reports its own end.
async fn run(registry: Registry, workers: usize, spec: JobSpec, json: bool) -> Result<ExitCode> {
    let (queue, mut events) = JobQueue::new(registry, workers)?;
    let title = format!("{} ({} file(s))", spec.tool_id, spec.inputs.len());
    let job_id = queue.submit(spec)?;

    let mut display = (!json).then(|| JobDisplay::start(&title));
    let mut cancel_sent = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    bail!("job engine stopped before job {job_id} finished");
                };
                if json {
                    println!("{}", serde_json::to_string(&event)?);
                }
                match event {
                    JobEvent::Progress(progress) => {
                        if let Some(display) = display.as_mut() {
                            display.update(&progress);
                        }
                    }
                    JobEvent::Finished { result, .. } => {
                        if let Some(display) = &display {
                            display.finish(&result);
                        }
                        let code = if result.success {
                            ExitCode::SUCCESS
                        } else if result.cancelled {
                            ExitCode::from(EXIT_CANCELLED)
                        } else {
                            ExitCode::from(EXIT_FAILED)
                        };
                        return Ok(code);
                    }
                }
            }
            signal = &mut ctrl_c, if !cancel_sent => {
                signal.context("failed to listen for Ctrl-C")?;
                cancel_sent = true;
                queue.cancel(job_id);
                if let Some(display) = &display {
                    display.note("cancelling, waiting for the current step to finish");
                }
            }
        }
    }
}
