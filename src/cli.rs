use crate::{
    browser::{Browser, bridge::BridgeBrowser},
    clock::SystemClock,
    config::Config,
    observer::{LogStatus, ProgressTally},
    report::{RunReport, RunStatus},
    resume::{FileResumeSource, ResumeSource, extract_profile},
    runner::Automation,
    util::{ensure_dir, run_dir_name, write_file},
};
use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "auto-apply")]
#[command(about = "Job-portal auto-apply runner (manual login, discovery, guided applications)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./auto-apply.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the browser driver answers and the resume is readable.
    Doctor {},
    /// Print the profile extracted from a resume.
    ParseResume {
        /// Defaults to the configured resume path.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    Run {
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Rebuild the CSV log from a saved report.json.
    Export {
        #[arg(long)]
        report: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            doctor(&cfg)
        }
        Command::ParseResume { input } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            parse_resume(&cfg, input.as_deref())
        }
        Command::Run { out_dir } => run(&args, &cfg, out_dir.as_deref()),
        Command::Export { report, out } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            export(report, out)
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> PathBuf {
    if let Some(p) = user {
        return p.to_path_buf();
    }
    let default = PathBuf::from("auto-apply.toml");
    if default.exists() {
        default
    } else {
        PathBuf::from("auto-apply.example.toml")
    }
}

fn init_logging(
    args: &Args,
    cfg: &Config,
    file_path: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = match file_path {
        Some(path) => {
            let parent = path.parent().unwrap_or_else(|| Path::new("."));
            ensure_dir(parent)?;
            let file = std::fs::File::create(path)
                .with_context(|| format!("create log file: {}", path.display()))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let driver = match BridgeBrowser::launch(cfg) {
        Ok(mut browser) => {
            let diag = browser.handshake();
            if let Err(err) = browser.close() {
                warn!("closing driver after handshake failed: {err:#}");
            }
            match diag {
                Ok(diag) => serde_json::to_value(diag)?,
                Err(err) => serde_json::json!({ "ok": false, "error": format!("{err:#}") }),
            }
        }
        Err(err) => serde_json::json!({ "ok": false, "error": format!("{err:#}") }),
    };

    let resume = match cfg.resume_path() {
        None => serde_json::json!({ "configured": false }),
        Some(path) => match FileResumeSource.read_text(&path) {
            Ok(text) => serde_json::json!({
                "configured": true,
                "path": path,
                "readable": true,
                "chars": text.chars().count(),
            }),
            Err(err) => serde_json::json!({
                "configured": true,
                "path": path,
                "readable": false,
                "error": err.to_string(),
            }),
        },
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "driver": driver,
            "resume": resume,
        }))?
    );
    Ok(())
}

fn parse_resume(cfg: &Config, input: Option<&Path>) -> Result<()> {
    let path = match input {
        Some(p) => p.to_path_buf(),
        None => cfg
            .resume_path()
            .ok_or_else(|| anyhow!("no --input given and resume.file_name is empty"))?,
    };
    let text = FileResumeSource
        .read_text(&path)
        .with_context(|| format!("reading resume: {}", path.display()))?;
    let profile = extract_profile(&text);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": path,
            "profile": profile,
        }))?
    );
    Ok(())
}

fn run(args: &Args, cfg: &Config, out_override: Option<&Path>) -> Result<()> {
    let started = OffsetDateTime::now_utc();
    let out_root = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let run_dir = out_root.join(run_dir_name(started));

    ensure_dir(&run_dir)?;
    ensure_dir(&run_dir.join("logs"))?;

    let log_path = resolve_log_path(cfg, Some(&run_dir));
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!(
        "run={} out={} skills={:?}",
        cfg.global.run_name,
        run_dir.display(),
        cfg.search.skills
    );
    if cfg.search.skills.is_empty() {
        warn!("search.skills is empty; discovery will find nothing");
    }

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        write_file(&run_dir.join("effective-config.toml"), raw)?;
    }

    let mut browser = BridgeBrowser::launch(cfg)?;
    match browser.handshake() {
        Ok(diag) => info!("driver {} {} ready", diag.driver, diag.version),
        Err(err) => warn!("driver handshake failed: {err:#}"),
    }

    let mut status = LogStatus;
    let mut tally = ProgressTally::new(LogStatus);
    let report = Automation::new(cfg, SystemClock).run(
        &mut browser,
        &FileResumeSource,
        &mut status,
        &mut tally,
    );

    write_outputs(cfg, &run_dir, &report)?;

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "run_dir": run_dir,
                "status": report.status,
                "jobs_discovered": report.jobs_discovered,
                "counts": report.counts,
                "summary": report.summary(),
            }))?
        );
    }

    if let RunStatus::Errored(msg) = &report.status {
        bail!("run failed: {msg}");
    }
    Ok(())
}

fn write_outputs(cfg: &Config, run_dir: &Path, report: &RunReport) -> Result<()> {
    if cfg.output.write_csv {
        let path = run_dir.join(&cfg.output.csv_filename);
        write_file(&path, report.records.to_csv_string()?)?;
        info!("application log exported to {}", path.display());
    }

    if cfg.output.write_report_json {
        write_file(
            &run_dir.join(&cfg.output.report_filename),
            serde_json::to_string_pretty(report)?,
        )?;
    }
    Ok(())
}

fn export(report_path: &Path, out: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(report_path)
        .with_context(|| format!("reading report: {}", report_path.display()))?;
    let report: RunReport = serde_json::from_str(&raw)
        .with_context(|| format!("parsing report: {}", report_path.display()))?;
    write_file(out, report.records.to_csv_string()?)?;
    info!("{} records exported to {}", report.records.len(), out.display());
    Ok(())
}

fn resolve_log_path(cfg: &Config, run_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    if let Some(run_dir) = run_dir {
        return Some(run_dir.join("logs").join("auto-apply.log"));
    }

    Some(PathBuf::from(&cfg.paths.out_dir).join("auto-apply.log"))
}
