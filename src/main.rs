use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mp3_tools_helper::app::BatchCoordinator;
use mp3_tools_helper::config::{self, DEFAULT_CONFIG_FILE, YamlConfig};
use mp3_tools_helper::fs_scan;
use mp3_tools_helper::report::ConsoleReport;
use mp3_tools_helper::tag_store::LoftyTagStore;
use mp3_tools_helper::types::{CommandMode, DEFAULT_THREADS, NormalizationOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "MP3 Tools Helper: repair encodings and fill missing audio tags")]
struct Cli {
    /// YAML config file (default: ./mp3tools.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the final statistics as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args, Debug, Default)]
struct PipelineArgs {
    /// Derive tags from the filename and directory name
    #[arg(short, long)]
    force: bool,

    /// With --force: overwrite tags even when they look fine
    #[arg(short = 'a', long = "all")]
    force_all: bool,

    /// Worker threads
    #[arg(short = 'n', long = "threads")]
    threads: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct OutputArgs {
    /// Output directory for tagged copies
    #[arg(short = 'o', long = "outdir")]
    outdir: Option<PathBuf>,

    /// Write the original files in place
    #[arg(short = 'u', long = "update", conflicts_with = "outdir")]
    update: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the tags of every audio file
    Scan { path: PathBuf },
    /// Show current tags with progress lines
    Check { path: PathBuf },
    /// Preview the changes without writing
    Test {
        path: PathBuf,
        #[command(flatten)]
        pipeline: PipelineArgs,
        /// Only repair encodings
        #[arg(short = 'e', long = "encoding-only")]
        encoding_only: bool,
    },
    /// Repair, clean and fill tags, then write them
    Fix {
        path: PathBuf,
        #[command(flatten)]
        pipeline: PipelineArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Fill missing tags (optionally encoding repair only), then write them
    Tag {
        path: PathBuf,
        #[command(flatten)]
        pipeline: PipelineArgs,
        /// Only repair encodings
        #[arg(short = 'e', long = "encoding-only")]
        encoding_only: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
}

/// One resolved invocation: what to run, where, and with which options.
struct Invocation {
    mode: CommandMode,
    path: PathBuf,
    options: NormalizationOptions,
    extensions: Vec<String>,
}

fn build_invocation(cmd: Commands, cfg: &YamlConfig) -> Invocation {
    let (mode, path, pipeline, encoding_only, output) = match cmd {
        Commands::Scan { path } => (CommandMode::Scan, path, PipelineArgs::default(), false, None),
        Commands::Check { path } => {
            // check always runs on the default pool size
            let pipeline = PipelineArgs {
                threads: Some(DEFAULT_THREADS),
                ..Default::default()
            };
            (CommandMode::Check, path, pipeline, false, None)
        }
        Commands::Test {
            path,
            pipeline,
            encoding_only,
        } => (CommandMode::Test, path, pipeline, encoding_only, None),
        Commands::Fix {
            path,
            pipeline,
            output,
        } => (CommandMode::Fix, path, pipeline, false, Some(output)),
        Commands::Tag {
            path,
            pipeline,
            encoding_only,
            output,
        } => (CommandMode::Tag, path, pipeline, encoding_only, Some(output)),
    };

    let cli_outdir = output.as_ref().and_then(|o| o.outdir.clone());
    let settings = cfg.resolve(pipeline.threads, cli_outdir);

    let output_root = match output {
        Some(o) if !o.update => Some(settings.outdir),
        _ => None,
    };

    Invocation {
        mode,
        path,
        options: NormalizationOptions {
            force: pipeline.force,
            force_all: pipeline.force_all,
            update_encoding_only: encoding_only,
            output_root,
            threads: settings.threads,
        },
        extensions: settings.extensions,
    }
}

fn init_tracing(verbose: bool, config_level: Option<&str>) {
    let level = if verbose {
        "debug"
    } else {
        config_level.unwrap_or("info")
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let loaded = config::load_yaml(&config_path);
    init_tracing(cli.verbose, loaded.log_level());
    let cfg = loaded.finish(&config_path);

    let inv = build_invocation(cli.cmd, &cfg);
    info!(mode = %inv.mode, path = %inv.path.display(), "starting");

    let files = fs_scan::scan_directory(&inv.path, &inv.extensions)
        .with_context(|| format!("scan {}", inv.path.display()))?;
    if files.is_empty() {
        println!("No audio files found");
        return Ok(());
    }

    if let Some(root) = &inv.options.output_root {
        std::fs::create_dir_all(root)
            .with_context(|| format!("create output directory {}", root.display()))?;
    }

    let mut report = ConsoleReport::stdout(cli.json);
    let mut coordinator = BatchCoordinator::new(Arc::new(LoftyTagStore), inv.mode, inv.options);
    coordinator.run(files, &mut report)?;

    Ok(())
}
