use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use fs_inspect::Inspector;
use fs_inspect::config::{DirectorySizePolicy, InspectConfig, MenuMode, ValidationPolicy};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fs-inspect",
    about = "Inspect files, directories and symlinks interactively, one worker tree per path"
)]
struct Cli {
    /// Paths to inspect, processed in order.
    paths: Vec<PathBuf>,

    /// JSON config file; flags below override its fields.
    #[arg(long, env = "FS_INSPECT_CONFIG")]
    config: Option<PathBuf>,

    /// Filename fragment marking source files.
    #[arg(long)]
    source_marker: Option<String>,

    /// Diagnostics script run against source files.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Interpreter for the diagnostics script.
    #[arg(long)]
    script_runner: Option<String>,

    /// Line counter run against other regular files.
    #[arg(long)]
    line_count_tool: Option<String>,

    /// What the directory size option reports.
    #[arg(long, value_enum)]
    dir_size: Option<DirSize>,

    /// How option tokens with unknown characters are handled.
    #[arg(long, value_enum)]
    validation: Option<Validation>,

    /// Re-prompt until an option token is acted on.
    #[arg(long)]
    retry: bool,

    /// Mode to apply through each symlink with chmod (changes the target).
    #[arg(long, value_name = "MODE")]
    symlink_mode: Option<String>,

    /// Log more (repeat for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DirSize {
    Children,
    Inode,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Validation {
    WholeToken,
    PerCharacter,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.paths.is_empty() {
        eprintln!("usage: fs-inspect <path> [<path> ...]");
        process::exit(1);
    }

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            1
        }
    };

    if exit_code != 0 {
        process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = build_config(&cli)?;
    debug!(?config, "configuration resolved");

    let inspector = Inspector::new(config).context("invalid configuration")?;
    let summary = inspector.run(&cli.paths).await;
    for (path, err) in &summary.failures {
        debug!(path = %path.display(), error = %err, "path failed");
    }
    Ok(summary.exit_code)
}

fn build_config(cli: &Cli) -> anyhow::Result<InspectConfig> {
    let mut config = match &cli.config {
        Some(path) => InspectConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => InspectConfig::default(),
    };

    if let Some(marker) = &cli.source_marker {
        config.source_marker = marker.clone();
    }
    if let Some(script) = &cli.script {
        config.diagnostics_script = script.clone();
    }
    if let Some(runner) = &cli.script_runner {
        config.script_runner = runner.clone();
    }
    if let Some(tool) = &cli.line_count_tool {
        config.line_count_tool = tool.clone();
    }
    if let Some(dir_size) = cli.dir_size {
        config.directory_size = match dir_size {
            DirSize::Children => DirectorySizePolicy::ChildrenTotal,
            DirSize::Inode => DirectorySizePolicy::InodeSize,
        };
    }
    if let Some(validation) = cli.validation {
        config.validation = match validation {
            Validation::WholeToken => ValidationPolicy::WholeToken,
            Validation::PerCharacter => ValidationPolicy::PerCharacter,
        };
    }
    if cli.retry {
        config.menu_mode = MenuMode::Retry;
    }
    if let Some(mode) = &cli.symlink_mode {
        config.symlink_mode = Some(mode.clone());
    }
    Ok(config)
}

/// Logs go to stderr so stdout carries only the interactive protocol.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "fs_inspect=info",
        2 => "fs_inspect=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
