//! flowsnap: batch-render workflow-definition JSON documents to PNG.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use flowsnap_core::backend::{ChromeBackendFactory, ChromeConfig, PageServer};
use flowsnap_core::domain::{ProgressEvent, RenderSettings, RenderTask, RunMode, StatusBoard};
use flowsnap_core::ports::{
    BackendFactory, Clock, ProgressSink, RenderBackend as _, RunIdGenerator, SystemClock,
};
use flowsnap_core::reconcile::{RunInfo, RunStats};
use flowsnap_core::retry::RetryPolicy;
use flowsnap_core::scanner::{self, DocumentFile};
use flowsnap_core::scheduler::{shutdown_channel, Dispatcher};
use flowsnap_core::state::JobStateStore;

#[derive(Parser)]
#[command(name = "flowsnap")]
#[command(about = "Render workflow-definition JSON documents to PNG snapshots", version)]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every workflow document under a folder, resumably
    Generate(GenerateArgs),

    /// Discover and validate documents without rendering anything
    Scan(ScanArgs),

    /// Repair near-valid documents by adding a missing name field
    Fix(FixArgs),

    /// Render a single document (no job state involved)
    Preview(PreviewArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Folder containing workflow JSON documents
    input: PathBuf,

    /// Collect PNGs into this folder (mutually exclusive with --in-place)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write each PNG next to its source document
    #[arg(long)]
    in_place: bool,

    /// Also scan subdirectories
    #[arg(long)]
    recursive: bool,

    #[command(flatten)]
    viewport: ViewportArgs,

    /// Parallel browser sessions (clamped to the CPU count)
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Re-render documents that already succeeded in a previous run
    #[arg(long)]
    force: bool,

    /// Port for the local render-page server
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Per-operation browser timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Seconds to let the viewer draw before capturing
    #[arg(long, default_value_t = 60)]
    wait_time: u64,
}

#[derive(Args)]
struct ScanArgs {
    /// Folder containing workflow JSON documents
    input: PathBuf,

    /// Also scan subdirectories
    #[arg(long)]
    recursive: bool,
}

#[derive(Args)]
struct FixArgs {
    /// Folder containing workflow JSON documents
    input: PathBuf,

    /// Also scan subdirectories
    #[arg(long)]
    recursive: bool,
}

#[derive(Args)]
struct PreviewArgs {
    /// The workflow JSON document to render
    file: PathBuf,

    /// Where to write the PNG (defaults to the source path with .png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    viewport: ViewportArgs,

    /// Port for the local render-page server
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Seconds to let the viewer draw before capturing
    #[arg(long, default_value_t = 25)]
    wait_time: u64,
}

#[derive(Args)]
struct ViewportArgs {
    /// Viewport width in pixels
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Square 2560x2560 viewport (overrides --width/--height)
    #[arg(long)]
    square: bool,

    /// Dark theme
    #[arg(long)]
    dark_mode: bool,
}

impl ViewportArgs {
    fn settings(&self) -> RenderSettings {
        let mut settings = if self.square {
            RenderSettings::square()
        } else {
            RenderSettings {
                width: self.width,
                height: self.height,
                ..RenderSettings::default()
            }
        };
        settings.dark_mode = self.dark_mode;
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate(args) => generate(args).await,
        Commands::Scan(args) => scan(args),
        Commands::Fix(args) => fix(args),
        Commands::Preview(args) => preview(args).await,
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let mode = match (&args.output, args.in_place) {
        (Some(_), true) => bail!("--output and --in-place are mutually exclusive"),
        (None, false) => bail!("pass --output <dir> or --in-place"),
        (Some(_), false) => RunMode::OutputFolder,
        (None, true) => RunMode::InPlace,
    };

    let workers = clamp_workers(args.workers);
    let settings = args.viewport.settings();

    let documents = scanner::scan_documents(&args.input, args.recursive)?;
    for doc in documents.iter().filter(|d| !d.valid) {
        tracing::warn!(
            file = %doc.path.display(),
            error = doc.error.as_deref().unwrap_or("unknown"),
            "skipping invalid document"
        );
    }

    if let Some(output) = &args.output {
        std::fs::create_dir_all(output)
            .with_context(|| format!("cannot create output folder {}", output.display()))?;
    }
    let tasks: Vec<RenderTask> = documents
        .iter()
        .filter(|d| d.valid)
        .map(|d| to_task(d, &args.input, args.output.as_deref()))
        .collect();

    let store = JobStateStore::new(&args.input);
    let prior = store.load();
    let successes = JobStateStore::index_successes(prior.as_ref());
    let (tasks, pruned) = JobStateStore::prune(tasks, &successes, args.force);
    if pruned.skipped > 0 {
        tracing::info!(skipped = pruned.skipped, "already rendered in a previous run");
    }
    if tasks.is_empty() {
        tracing::info!("nothing to render");
        return Ok(());
    }

    let server = PageServer::start(args.port)?;
    let factory: Arc<dyn BackendFactory> = Arc::new(ChromeBackendFactory::new(ChromeConfig {
        server_url: server.url(),
        width: settings.width,
        height: settings.height,
        dark_mode: settings.dark_mode,
        timeout: Duration::from_secs(args.timeout),
        wait_time: Duration::from_secs(args.wait_time),
    }));

    let (stop, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after in-flight renders");
            let _ = stop.send(true);
        }
    });

    let clock = SystemClock;
    let run_id = RunIdGenerator::new(SystemClock).generate();
    let started_at = clock.now();
    let wall_clock = Instant::now();

    let dispatcher = Dispatcher::new(workers, RetryPolicy::default())
        .with_sink(Arc::new(CliProgressSink::default()));
    let results = match dispatcher.run(tasks, factory, shutdown).await {
        Ok(results) => results,
        Err(flowsnap_core::Error::Interrupted) => {
            tracing::warn!("run interrupted, job state left untouched");
            std::process::exit(130);
        }
        Err(e) => return Err(e).context("render batch failed"),
    };

    let info = RunInfo {
        run_id,
        input_folder: args.input.display().to_string(),
        mode,
        settings,
        started_at,
        finished_at: clock.now(),
    };
    let report = store
        .merge_and_persist(prior.as_ref(), &results, &info)
        .context("cannot persist job report")?;

    let stats = RunStats::compute(&results, wall_clock.elapsed());
    tracing::info!(
        run_id = %run_id,
        rendered = stats.successful,
        failed = stats.failed,
        replaced = stats.replaced_existing,
        elapsed_secs = stats.elapsed.as_secs(),
        throughput_per_min = stats.throughput_per_min(),
        report = %store.path().display(),
        "run complete"
    );
    for result in results.iter().filter(|r| !r.is_success()) {
        tracing::error!(
            document = %result.source_identity,
            reason = result.outcome.reason().unwrap_or("unknown"),
            "render failed"
        );
    }
    tracing::info!(
        total = report.summary.total_workflows,
        successful = report.summary.successful,
        failed = report.summary.failed,
        "job state"
    );

    if stats.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn scan(args: ScanArgs) -> Result<()> {
    let documents = scanner::scan_documents(&args.input, args.recursive)?;

    for doc in &documents {
        match &doc.error {
            None => println!("ok      {}  ({})", doc.path.display(), doc.name),
            Some(error) => println!("INVALID {}  {error}", doc.path.display()),
        }
    }

    let summary = scanner::summarize(&documents);
    println!(
        "{} file(s): {} valid, {} invalid",
        summary.total_files, summary.valid, summary.invalid
    );

    if summary.invalid > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn fix(args: FixArgs) -> Result<()> {
    let repaired = scanner::repair_missing_names(&args.input, args.recursive)?;

    for path in &repaired {
        println!("fixed   {}", path.display());
    }
    println!("{} document(s) repaired", repaired.len());
    Ok(())
}

async fn preview(args: PreviewArgs) -> Result<()> {
    let doc = scanner::load_document(&args.file);
    let Some(payload) = doc.payload.clone() else {
        bail!(
            "{}: {}",
            args.file.display(),
            doc.error.as_deref().unwrap_or("invalid document")
        );
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.file.with_extension("png"));
    let settings = args.viewport.settings();

    let server = PageServer::start(args.port)?;
    let factory = ChromeBackendFactory::new(ChromeConfig {
        server_url: server.url(),
        width: settings.width,
        height: settings.height,
        dark_mode: settings.dark_mode,
        timeout: Duration::from_secs(120),
        wait_time: Duration::from_secs(args.wait_time),
    });

    let backend = factory.create(0).await.context("cannot start browser")?;
    let task = RenderTask::new(
        payload,
        doc.name.clone(),
        args.file.display().to_string(),
        &output,
    );

    tracing::info!(document = doc.name, "rendering preview");
    backend
        .render(&task)
        .await
        .with_context(|| format!("cannot render {}", args.file.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn clamp_workers(requested: usize) -> usize {
    let cpus = num_cpus::get().max(1);
    let workers = requested.clamp(1, cpus);
    if workers != requested {
        tracing::warn!(requested, using = workers, "adjusted worker count");
    }
    workers
}

fn to_task(doc: &DocumentFile, input: &Path, output: Option<&Path>) -> RenderTask {
    let identity = doc
        .path
        .strip_prefix(input)
        .unwrap_or(&doc.path)
        .to_string_lossy()
        .into_owned();
    let output_path = match output {
        Some(dir) => dir.join(format!("{}.png", doc.safe_filename())),
        None => doc.path.with_extension("png"),
    };
    // Scanner guarantees a payload on valid documents; fall back to an empty
    // object rather than panicking on a caller mistake.
    let payload = doc.payload.clone().unwrap_or_else(|| serde_json::json!({}));
    RenderTask::new(payload, doc.name.clone(), identity, output_path)
}

/// Progress listener that narrates the batch through the log output.
#[derive(Default)]
struct CliProgressSink {
    board: Mutex<StatusBoard>,
}

impl ProgressSink for CliProgressSink {
    fn emit(&self, event: &ProgressEvent) {
        let Ok(mut board) = self.board.lock() else {
            return;
        };
        board.apply(event, SystemClock.now());

        match event {
            ProgressEvent::BatchStarted { total, workers } => {
                tracing::info!(total = *total, workers = *workers, "rendering");
            }
            ProgressEvent::TaskStarted {
                worker_id,
                display_name,
            } => {
                tracing::info!(worker = *worker_id, task = display_name.as_str(), "started");
            }
            ProgressEvent::TaskCompleted { worker_id, result } => {
                if result.is_success() {
                    tracing::info!(
                        worker = *worker_id,
                        document = %result.source_identity,
                        done = board.completed(),
                        total = board.total(),
                        "rendered"
                    );
                } else {
                    tracing::warn!(
                        worker = *worker_id,
                        document = %result.source_identity,
                        reason = result.outcome.reason().unwrap_or("unknown"),
                        done = board.completed(),
                        total = board.total(),
                        "failed"
                    );
                }
            }
            ProgressEvent::BatchFinished { .. } => {}
        }
    }
}
