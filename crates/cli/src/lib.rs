use anyhow::{Context as AnyhowContext, Result};
use buildcost_core::{
    frame_file_name, scan_commands, AnalysisError, DependencyIndex, FrameSeries, FsLineCounter,
    LineCountCache, NinjaLog, ReadOptions, ReportBuilder, ReportSummary, DEFAULT_COMPILER,
    DEFAULT_FRAME_COUNT,
};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::{ConfigFile, DEFAULT_LOG_FILE, DEFAULT_TARGET};
use crate::ninja::{find_ninja, NinjaTool};

mod config;
mod ninja;

#[derive(Parser)]
#[command(name = "buildcost")]
#[command(about = "Per-object compile cost reports from ninja build artifacts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for CSV)
    #[arg(long, global = true)]
    quiet: bool,

    /// Settings file (default: ./buildcost.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the compile cost CSV for the last build to stdout
    Analyze(AnalyzeArgs),

    /// Write eased animation frames between two cost CSVs
    #[command(name = "anim-frames")]
    AnimFrames(AnimFramesArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Build directory holding .ninja_log; source paths are relative to it
    #[arg(short = 'C', long, default_value = ".")]
    build_dir: PathBuf,

    /// Build log, relative to the build directory (default: .ninja_log)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Target passed to `ninja -t commands` (default: chrome)
    #[arg(long)]
    target: Option<String>,

    /// Compiler front-end whose command lines are analyzed (default: clang-cl.exe)
    #[arg(long)]
    compiler: Option<String>,

    /// ninja executable (default: first ninja on PATH)
    #[arg(long, env = "BUILDCOST_NINJA")]
    ninja: Option<PathBuf>,

    /// Read captured `ninja -t deps` output instead of running ninja
    #[arg(long)]
    deps_file: Option<PathBuf>,

    /// Read captured `ninja -t commands` output instead of running ninja
    #[arg(long)]
    commands_file: Option<PathBuf>,

    /// Keep every log record instead of only the last build
    #[arg(long)]
    show_all: bool,
}

#[derive(Args)]
struct AnimFramesArgs {
    /// Cost CSV of the first frame
    start_file: PathBuf,

    /// Cost CSV of the last frame
    end_file: PathBuf,

    /// Number of frames to write, including both ends
    #[arg(long, default_value_t = DEFAULT_FRAME_COUNT)]
    num_frames: usize,

    /// Directory receiving anim-frame<N>.csv files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Analyze settings after merging flags, environment and config file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AnalyzeSettings {
    build_dir: PathBuf,
    log: PathBuf,
    target: String,
    compiler: String,
    ninja: Option<PathBuf>,
    deps_file: Option<PathBuf>,
    commands_file: Option<PathBuf>,
    show_all: bool,
}

impl AnalyzeSettings {
    fn resolve(args: AnalyzeArgs, file: ConfigFile) -> Self {
        Self {
            build_dir: args.build_dir,
            log: args
                .log
                .or(file.log)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            target: args
                .target
                .or(file.target)
                .unwrap_or_else(|| DEFAULT_TARGET.to_string()),
            compiler: args
                .compiler
                .or(file.compiler)
                .unwrap_or_else(|| DEFAULT_COMPILER.to_string()),
            ninja: args.ninja.or(file.ninja),
            deps_file: args.deps_file,
            commands_file: args.commands_file,
            show_all: args.show_all || file.show_all.unwrap_or(false),
        }
    }

    fn log_path(&self) -> PathBuf {
        self.build_dir.join(&self.log)
    }

    fn ninja_tool(&self) -> Result<NinjaTool> {
        let exe = find_ninja(self.ninja.as_deref())?;
        Ok(NinjaTool::new(exe, self.build_dir.clone()))
    }
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Analyze(args) => {
            let file = ConfigFile::discover(cli.config.as_deref())?;
            run_analyze(AnalyzeSettings::resolve(args, file))
        }
        Commands::AnimFrames(args) => run_anim_frames(args),
    }
}

fn run_analyze(settings: AnalyzeSettings) -> Result<()> {
    let log_path = settings.log_path();

    log::info!("Reading .ninja_log file.");
    let options = ReadOptions {
        show_all: settings.show_all,
    };
    let ninja_log = match NinjaLog::open(&log_path, options) {
        Ok(ninja_log) => ninja_log,
        Err(AnalysisError::IoError(err)) if err.kind() == io::ErrorKind::NotFound => {
            // Nothing was built here yet; not a failure. Printed regardless of
            // the log filter.
            eprintln!(
                "Log file '{}' not found, no build summary created.",
                log_path.display()
            );
            return Ok(());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Cannot read {}", log_path.display()));
        }
    };
    log::debug!(
        "{} build sessions, {} malformed lines skipped",
        ninja_log.sessions().len(),
        ninja_log.skipped_lines()
    );

    log::info!("Creating durations database.");
    let durations = ninja_log.durations();

    // Resolved lazily so captured listings work without ninja installed.
    let mut tool: Option<NinjaTool> = None;

    log::info!("Reading dependencies list.");
    let deps_text = match &settings.deps_file {
        Some(path) => read_listing(path)?,
        None => ensure_tool(&mut tool, &settings)?.deps()?,
    };
    let deps = DependencyIndex::parse(&deps_text);

    log::info!("Reading build commands.");
    let commands_text = match &settings.commands_file {
        Some(path) => read_listing(path)?,
        None => ensure_tool(&mut tool, &settings)?.commands(&settings.target)?,
    };
    let commands = scan_commands(commands_text.lines(), &settings.compiler);
    log::debug!(
        "{} timed outputs, {} dependency entries, {} compile commands",
        durations.len(),
        deps.len(),
        commands.len()
    );

    log::info!("Generating .csv file.");
    let mut lines = LineCountCache::with_counter(FsLineCounter::with_base(&settings.build_dir));
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    finish_report(ReportBuilder::new(&durations, &deps).write(&mut out, &commands, &mut lines))
}

/// A reader that stops early (`buildcost analyze | head`) is not an error.
fn finish_report(result: buildcost_core::Result<ReportSummary>) -> Result<()> {
    match result {
        Ok(summary) => {
            log::info!(
                "Wrote {} rows ({} compile commands had no timing)",
                summary.rows,
                summary.untimed
            );
            Ok(())
        }
        Err(AnalysisError::IoError(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
            log::debug!("stdout closed early: {err}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn ensure_tool<'a>(
    tool: &'a mut Option<NinjaTool>,
    settings: &AnalyzeSettings,
) -> Result<&'a NinjaTool> {
    if tool.is_none() {
        *tool = Some(settings.ninja_tool()?);
    }
    tool.as_ref().context("ninja tool not initialized")
}

fn read_listing(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}

fn run_anim_frames(args: AnimFramesArgs) -> Result<()> {
    if args.num_frames < 2 {
        return Err(AnalysisError::InvalidFrameCount(args.num_frames).into());
    }
    let start = read_listing(&args.start_file)?;
    let end = read_listing(&args.end_file)?;
    let series = FrameSeries::parse(&start, &end).with_context(|| {
        format!(
            "Cannot interpolate {} and {}",
            args.start_file.display(),
            args.end_file.display()
        )
    })?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Cannot create {}", args.output_dir.display()))?;
    for index in 0..args.num_frames {
        let path = args.output_dir.join(frame_file_name(index));
        let file = fs::File::create(&path)
            .with_context(|| format!("Cannot create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        series.write_frame(&mut out, index, args.num_frames)?;
        out.flush()
            .with_context(|| format!("Cannot write {}", path.display()))?;
    }
    log::info!(
        "Wrote {} frames of {} rows to {}",
        args.num_frames,
        series.len(),
        args.output_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_analyze(argv: &[&str]) -> AnalyzeArgs {
        let cli = Cli::try_parse_from(argv.iter().copied()).unwrap();
        match cli.command {
            Commands::Analyze(args) => args,
            Commands::AnimFrames(_) => panic!("expected analyze"),
        }
    }

    #[test]
    fn defaults_without_config() {
        let args = parse_analyze(&["buildcost", "analyze", "--ninja", "/bin/ninja"]);
        let settings = AnalyzeSettings::resolve(args, ConfigFile::default());

        assert_eq!(settings.log_path(), PathBuf::from("./.ninja_log"));
        assert_eq!(settings.target, "chrome");
        assert_eq!(settings.compiler, "clang-cl.exe");
        assert!(!settings.show_all);
    }

    #[test]
    fn flags_override_config_file() {
        let args = parse_analyze(&[
            "buildcost",
            "analyze",
            "-C",
            "out/Release",
            "--target",
            "base",
            "--ninja",
            "/bin/ninja",
        ]);
        let file = ConfigFile {
            log: Some(PathBuf::from("custom.log")),
            target: Some("chrome_dll".to_string()),
            compiler: Some("cl.exe".to_string()),
            ninja: Some(PathBuf::from("/opt/ninja")),
            show_all: Some(true),
        };
        let settings = AnalyzeSettings::resolve(args, file);

        assert_eq!(settings.log_path(), PathBuf::from("out/Release/custom.log"));
        assert_eq!(settings.target, "base");
        assert_eq!(settings.compiler, "cl.exe");
        assert_eq!(settings.ninja, Some(PathBuf::from("/bin/ninja")));
        assert!(settings.show_all);
    }

    #[test]
    fn anim_frames_defaults() {
        let cli = Cli::try_parse_from(["buildcost", "anim-frames", "a.csv", "b.csv"]).unwrap();
        let Commands::AnimFrames(args) = cli.command else {
            panic!("expected anim-frames");
        };
        assert_eq!(args.num_frames, 45);
        assert_eq!(args.output_dir, PathBuf::from("."));
    }

    #[test]
    fn closed_stdout_is_not_a_failure() {
        let closed = AnalysisError::IoError(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(finish_report(Err(closed)).is_ok());

        let other = AnalysisError::IoError(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(finish_report(Err(other)).is_err());

        assert!(finish_report(Ok(ReportSummary::default())).is_ok());
    }
}
