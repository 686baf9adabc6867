//! Administrative CLI for the media-search pipeline (spec §6.1).
//!
//! Each worker subcommand (`proxy`, `video-proxy`, `ai start`, `ai video`)
//! launches exactly one worker process hosting exactly one role, per the
//! scheduling model in spec §5 — this binary is never itself the
//! dispatcher, just the thing an operator or process supervisor invokes
//! once per fleet member.

mod asset;
mod library;
mod maintenance;
mod runloop;
mod scan;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use mediasearch_cache::CacheConfig;
use mediasearch_db::{check_schema_version, connect, DbConfig};
use mediasearch_models::{AnalysisMode, MediaKind, WorkerRole};
use mediasearch_queue::{ClaimEngine, LeaseConfig};
use mediasearch_vision::{HttpVisionAnalyzer, MockVisionAnalyzer, VisionAnalyzer};
use mediasearch_worker::{ai_image, ai_video, logging, maintenance as maintenance_stage, proxy_image, proxy_video, FlightLog, Lifecycle};

#[derive(Parser)]
#[command(name = "mediasearch", author, version, about = "Media library indexing pipeline admin CLI")]
#[command(arg_required_else_help(true))]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Library registration and lifecycle.
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },
    /// Chunked hard-delete of soft-deleted libraries.
    Trash {
        #[command(subcommand)]
        command: TrashCommand,
    },
    /// One-shot filesystem-to-database reconciliation for one library.
    Scan {
        slug: String,
        #[arg(long)]
        verbose: bool,
    },
    /// Image proxy/thumbnail worker.
    Proxy(WorkerArgs),
    /// Video proxy/thumbnail/scene-segmentation worker.
    VideoProxy(WorkerArgs),
    /// Vision analysis workers.
    Ai {
        #[command(subcommand)]
        command: AiCommand,
    },
    /// Asset inspection.
    Asset {
        #[command(subcommand)]
        command: AssetCommand,
    },
    /// Fleet housekeeping: lease reclaim, stale-worker pruning, temp GC.
    Maintenance {
        #[command(subcommand)]
        command: MaintenanceCommand,
    },
}

#[derive(Subcommand)]
enum LibraryCommand {
    Add { name: String, path: String },
    Remove { slug: String },
    Restore { slug: String },
    List {
        #[arg(long)]
        include_deleted: bool,
    },
}

#[derive(Subcommand)]
enum TrashCommand {
    Empty {
        slug: String,
        #[arg(long)]
        force: bool,
    },
    EmptyAll {
        #[arg(long)]
        force: bool,
        #[arg(long)]
        verbose: bool,
    },
}

#[derive(Subcommand)]
enum AssetCommand {
    List {
        slug: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum MaintenanceCommand {
    Run {
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        library: Option<String>,
    },
    /// The only path that returns a `poisoned` asset to the queue (spec §7).
    RetryPoisoned {
        #[arg(long)]
        library: Option<String>,
    },
}

/// Flags shared by every long-running worker subcommand (spec §6.1 table).
#[derive(Args)]
struct WorkerArgs {
    #[arg(long, conflicts_with = "all")]
    library: Option<String>,
    #[arg(long)]
    all: bool,
    #[arg(long)]
    once: bool,
    #[arg(long)]
    repair: bool,
    #[arg(long)]
    verbose: bool,
    #[arg(long)]
    heartbeat: Option<u64>,
    #[arg(long)]
    worker_name: Option<String>,
}

impl WorkerArgs {
    fn library_slug(&self) -> Result<Option<mediasearch_models::LibrarySlug>> {
        if self.library.is_none() == !self.all {
            bail!("specify exactly one of --library <slug> or --all");
        }
        self.library
            .as_deref()
            .map(|s| mediasearch_models::LibrarySlug::parse(s).map_err(|e| anyhow::anyhow!("{e}")))
            .transpose()
    }
}

#[derive(Subcommand)]
enum AiCommand {
    /// Image vision worker.
    Start(AiWorkerArgs),
    /// Video vision worker (per-scene strict merge).
    Video(AiWorkerArgs),
}

#[derive(Args)]
struct AiWorkerArgs {
    #[command(flatten)]
    worker: WorkerArgs,
    /// "http" (default, talks to VISION_SERVICE_URL) or "mock" (tests only,
    /// gated by MEDIASEARCH_ALLOW_MOCK_DEFAULT=1).
    #[arg(long, default_value = "http")]
    analyzer: String,
    #[arg(long, value_enum, default_value_t = ModeArg::Light)]
    mode: ModeArg,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Light,
    Full,
}

impl From<ModeArg> for AnalysisMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Light => AnalysisMode::Light,
            ModeArg::Full => AnalysisMode::Full,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let flight_log = logging::init_tracing();

    match run(flight_log).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(flight_log: Arc<FlightLog>) -> Result<()> {
    let cli = Cli::parse();

    let db_config = DbConfig::from_env().context("database configuration error")?;
    let pool = connect(&db_config).await.context("failed to connect to database")?;
    check_schema_version(&pool)
        .await
        .context("schema version check failed")?;

    let cache_config = CacheConfig::from_env();
    tokio::fs::create_dir_all(&cache_config.data_dir).await?;
    tokio::fs::create_dir_all(&cache_config.forensics_dir).await?;

    match cli.command {
        Command::Library { command } => run_library(&pool, command).await,
        Command::Trash { command } => run_trash(&pool, command).await,
        Command::Scan { slug, verbose } => {
            let lifecycle =
                start_lifecycle(&pool, &cache_config, flight_log, WorkerRole::Scanner, None).await?;
            let result = scan::run(&lifecycle, &pool, &slug, verbose).await;
            lifecycle.shutdown().await;
            result
        }
        Command::Proxy(args) => run_proxy(&pool, &cache_config, flight_log, args).await,
        Command::VideoProxy(args) => run_video_proxy(&pool, &cache_config, flight_log, args).await,
        Command::Ai { command } => run_ai(&pool, &cache_config, flight_log, command).await,
        Command::Asset { command } => run_asset(&pool, command).await,
        Command::Maintenance { command } => run_maintenance(&pool, &cache_config, command).await,
    }
}

async fn start_lifecycle(
    pool: &sqlx::PgPool,
    cache_config: &CacheConfig,
    flight_log: Arc<FlightLog>,
    role: WorkerRole,
    worker_name: Option<String>,
) -> Result<Arc<Lifecycle>> {
    start_lifecycle_with_heartbeat(pool, cache_config, flight_log, role, worker_name, None).await
}

async fn start_lifecycle_with_heartbeat(
    pool: &sqlx::PgPool,
    cache_config: &CacheConfig,
    flight_log: Arc<FlightLog>,
    role: WorkerRole,
    worker_name: Option<String>,
    heartbeat_secs: Option<u64>,
) -> Result<Arc<Lifecycle>> {
    let config =
        mediasearch_worker::config::WorkerConfig::with_heartbeat_override(role, worker_name, heartbeat_secs);
    Ok(Lifecycle::start(pool.clone(), config, flight_log, cache_config.forensics_dir.clone()).await)
}

async fn run_library(pool: &sqlx::PgPool, command: LibraryCommand) -> Result<()> {
    match command {
        LibraryCommand::Add { name, path } => library::add(pool, &name, &path).await,
        LibraryCommand::Remove { slug } => library::remove(pool, &slug).await,
        LibraryCommand::Restore { slug } => library::restore(pool, &slug).await,
        LibraryCommand::List { include_deleted } => library::list(pool, include_deleted).await,
    }
}

async fn run_trash(pool: &sqlx::PgPool, command: TrashCommand) -> Result<()> {
    match command {
        TrashCommand::Empty { slug, force } => library::trash_empty(pool, &slug, force).await,
        TrashCommand::EmptyAll { force, verbose } => library::trash_empty_all(pool, force, verbose).await,
    }
}

async fn run_asset(pool: &sqlx::PgPool, command: AssetCommand) -> Result<()> {
    match command {
        AssetCommand::List { slug, status, limit } => asset::list(pool, &slug, status, limit).await,
    }
}

async fn run_maintenance(
    pool: &sqlx::PgPool,
    cache_config: &CacheConfig,
    command: MaintenanceCommand,
) -> Result<()> {
    match command {
        MaintenanceCommand::Run { dry_run, library } => {
            maintenance::run(pool, cache_config, library, dry_run).await
        }
        MaintenanceCommand::RetryPoisoned { library } => maintenance::retry_poisoned(pool, library).await,
    }
}

async fn run_proxy(
    pool: &sqlx::PgPool,
    cache_config: &CacheConfig,
    flight_log: Arc<FlightLog>,
    args: WorkerArgs,
) -> Result<()> {
    let library_slug = args.library_slug()?;
    let lifecycle = start_lifecycle_with_heartbeat(
        pool,
        cache_config,
        flight_log,
        WorkerRole::ImageProxy,
        args.worker_name.clone(),
        args.heartbeat,
    )
    .await?;

    if args.repair {
        let repaired = repair_scoped(pool, cache_config, library_slug.as_ref(), MediaKind::Image).await?;
        println!("repair: reset {repaired} image asset(s) to pending");
        lifecycle.shutdown().await;
        return Ok(());
    }

    let claim_engine = ClaimEngine::new(pool, LeaseConfig::from_env());
    let result = runloop::drive(&lifecycle, args.once, || {
        proxy_image::run_once(&lifecycle, &claim_engine, cache_config, library_slug.as_ref())
    })
    .await;
    result.context("image proxy worker exited")
}

async fn run_video_proxy(
    pool: &sqlx::PgPool,
    cache_config: &CacheConfig,
    flight_log: Arc<FlightLog>,
    args: WorkerArgs,
) -> Result<()> {
    let library_slug = args.library_slug()?;
    let lifecycle = start_lifecycle_with_heartbeat(
        pool,
        cache_config,
        flight_log,
        WorkerRole::VideoProxy,
        args.worker_name.clone(),
        args.heartbeat,
    )
    .await?;

    if args.repair {
        let repaired = repair_scoped(pool, cache_config, library_slug.as_ref(), MediaKind::Video).await?;
        println!("repair: reset {repaired} video asset(s) to pending");
        lifecycle.shutdown().await;
        return Ok(());
    }

    // ffmpeg/ffprobe reachability is load-bearing for the entire video
    // pipeline; fail fast and loud rather than poisoning the first claimed
    // asset with a confusing "program not found" error (spec §7,
    // configuration errors are fatal to the worker, never silent).
    which::which("ffmpeg").context("ffmpeg not found on PATH")?;
    which::which("ffprobe").context("ffprobe not found on PATH")?;

    let claim_engine = ClaimEngine::new(pool, LeaseConfig::from_env());
    let result = runloop::drive(&lifecycle, args.once, || {
        proxy_video::run_once(&lifecycle, &claim_engine, cache_config, library_slug.as_ref())
    })
    .await;
    result.context("video proxy worker exited")
}

async fn run_ai(
    pool: &sqlx::PgPool,
    cache_config: &CacheConfig,
    flight_log: Arc<FlightLog>,
    command: AiCommand,
) -> Result<()> {
    match command {
        AiCommand::Start(args) => run_ai_image(pool, cache_config, flight_log, args).await,
        AiCommand::Video(args) => run_ai_video(pool, cache_config, flight_log, args).await,
    }
}

fn build_analyzer(analyzer: &str) -> Result<Box<dyn VisionAnalyzer>> {
    match analyzer {
        "http" => Ok(Box::new(HttpVisionAnalyzer::from_env().context("vision service configuration error")?)),
        "mock" => {
            if !MockVisionAnalyzer::allowed_as_default() {
                bail!(
                    "the mock analyzer requires MEDIASEARCH_ALLOW_MOCK_DEFAULT=1 (tests only, spec §6.3)"
                );
            }
            Ok(Box::new(MockVisionAnalyzer::new()))
        }
        other => bail!("unknown analyzer {other:?}: expected \"http\" or \"mock\""),
    }
}

async fn run_ai_image(
    pool: &sqlx::PgPool,
    cache_config: &CacheConfig,
    flight_log: Arc<FlightLog>,
    args: AiWorkerArgs,
) -> Result<()> {
    let library_slug = args.worker.library_slug()?;
    let lifecycle = start_lifecycle_with_heartbeat(
        pool,
        cache_config,
        flight_log,
        WorkerRole::AiImage,
        args.worker.worker_name.clone(),
        args.worker.heartbeat,
    )
    .await?;
    let mode: AnalysisMode = args.mode.into();

    if args.worker.repair {
        let repaired = repair_scoped(pool, cache_config, library_slug.as_ref(), MediaKind::Image).await?;
        println!("repair: reset {repaired} image asset(s) to pending");
        lifecycle.shutdown().await;
        return Ok(());
    }

    let analyzer = build_analyzer(&args.analyzer)?;
    let claim_engine = ClaimEngine::new(pool, LeaseConfig::from_env());
    let result = runloop::drive(&lifecycle, args.worker.once, || {
        ai_image::run_once(&lifecycle, &claim_engine, cache_config, analyzer.as_ref(), mode, library_slug.as_ref())
    })
    .await;
    result.context("image AI worker exited")
}

async fn run_ai_video(
    pool: &sqlx::PgPool,
    cache_config: &CacheConfig,
    flight_log: Arc<FlightLog>,
    args: AiWorkerArgs,
) -> Result<()> {
    let library_slug = args.worker.library_slug()?;
    let lifecycle = start_lifecycle_with_heartbeat(
        pool,
        cache_config,
        flight_log,
        WorkerRole::AiVideo,
        args.worker.worker_name.clone(),
        args.worker.heartbeat,
    )
    .await?;
    let mode: AnalysisMode = args.mode.into();

    if args.worker.repair {
        // The video proxy contract is the only one with a filesystem
        // derivative to check (spec §4.4); the AI stage's output lives
        // entirely in scene rows, so its `--repair` delegates to the same
        // head-clip presence check scoped to video assets.
        let repaired = repair_scoped(pool, cache_config, library_slug.as_ref(), MediaKind::Video).await?;
        println!("repair: reset {repaired} video asset(s) to pending");
        lifecycle.shutdown().await;
        return Ok(());
    }

    let analyzer = build_analyzer(&args.analyzer)?;
    let claim_engine = ClaimEngine::new(pool, LeaseConfig::from_env());
    let result = runloop::drive(&lifecycle, args.worker.once, || {
        ai_video::run_once(&lifecycle, &claim_engine, cache_config, analyzer.as_ref(), mode, library_slug.as_ref())
    })
    .await;
    result.context("video AI worker exited")
}

async fn repair_scoped(
    pool: &sqlx::PgPool,
    cache_config: &CacheConfig,
    library_slug: Option<&mediasearch_models::LibrarySlug>,
    kind: MediaKind,
) -> Result<u64> {
    let slugs: Vec<mediasearch_models::LibrarySlug> = match library_slug {
        Some(slug) => vec![slug.clone()],
        None => mediasearch_db::LibraryRepo::new(pool)
            .list(mediasearch_db::QueryScope::visible_only())
            .await?
            .into_iter()
            .map(|l| l.slug)
            .collect(),
    };

    let mut total = 0u64;
    for slug in &slugs {
        total += maintenance_stage::repair_library(pool, cache_config, slug, kind).await?;
    }
    Ok(total)
}
