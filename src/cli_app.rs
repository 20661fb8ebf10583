//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use fpga_osd::browser::filter::{ScanOptions, SelectionFilter};
use fpga_osd::browser::scan::FsDirectoryScanner;
use fpga_osd::browser::session::FileBrowser;
use fpga_osd::core::config::Config;
use fpga_osd::core::errors::FosdError;
use fpga_osd::core::paths::resolve_absolute_path;
use fpga_osd::input::debounce::RawSample;
use fpga_osd::input::keys::code;
use fpga_osd::loader::channel::EndianMode;
use fpga_osd::loader::registry::CoreRegistry;
use fpga_osd::loader::session::{ConfigLoader, Phase};
use fpga_osd::loader::sim::SimulatedChannel;
use fpga_osd::logger::activity::{ActivityEvent, ActivityLog};
use fpga_osd::logger::jsonl::JsonlConfig;
use fpga_osd::menu::MenuMachine;
use fpga_osd::osd::{RowArrow, TextOsd};
use fpga_osd::runtime::{INPUT_FEED_CAPACITY, InputFeed, Orchestrator};

/// FPGA OSD engine: menu, file browser and core loader.
#[derive(Debug, Parser)]
#[command(
    name = "fosd",
    author,
    version,
    about = "FPGA OSD engine - menu, file browser and core loader",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List a directory the way the file browser shows it.
    Scan(ScanArgs),
    /// Rehearse a core load against the simulated configuration channel.
    Load(LoadArgs),
    /// Drive the menu with a scripted key sequence and print the OSD.
    Menu(MenuArgs),
    /// Show the effective configuration.
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args, Serialize)]
struct ScanArgs {
    /// Starting path (file or directory).
    path: PathBuf,
    /// Extension filter, three characters per extension (e.g. "NESFDS").
    #[arg(long, default_value = "*", value_name = "EXTS")]
    ext: String,
    /// Browse core images; the extension filter is forced.
    #[arg(long, conflicts_with_all = ["saves", "text"])]
    cores: bool,
    /// Browse the per-core save directory.
    #[arg(long)]
    saves: bool,
    /// Text-file browsing.
    #[arg(long)]
    text: bool,
    /// Show the selected name unabridged.
    #[arg(long)]
    expand: bool,
    /// Core image treated as already running.
    #[arg(long, value_name = "PATH")]
    core: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Serialize)]
struct LoadArgs {
    /// Core image to stream.
    image: PathBuf,
    /// Wire variant: native8, swapped8, le16 or be16.
    #[arg(long, value_name = "MODE")]
    mode: Option<EndianMode>,
    /// Never report configuration-done.
    #[arg(long)]
    never_ready: bool,
    /// Never acknowledge the reset handshake.
    #[arg(long)]
    reset_stall: bool,
    /// Fail the write of this block index.
    #[arg(long, value_name = "INDEX")]
    fail_block: Option<usize>,
}

#[derive(Debug, Clone, Args, Serialize)]
struct MenuArgs {
    /// Comma-separated keys: up, down, left, right, enter, esc, menu,
    /// backspace, a single letter, or wait:<ms>.
    #[arg(long, value_delimiter = ',', value_name = "KEYS")]
    keys: Vec<String>,
    /// Core image treated as already running.
    #[arg(long, value_name = "PATH")]
    core: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Serialize)]
struct ConfigArgs {
    /// Print the stable config hash only.
    #[arg(long)]
    show_hash: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Engine failure.
    #[error(transparent)]
    Engine(#[from] FosdError),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Engine(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }

    /// Whether re-running the same command might succeed.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Engine(err) => err.is_retryable(),
            Self::Io(_) => true,
            Self::User(_) | Self::Json(_) => false,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color || !io::stdout().is_terminal() {
        control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())?;
    let (activity, logger) = open_activity(&config)?;
    activity.record(ActivityEvent::ConfigLoaded {
        path: config.paths.config_file.clone(),
        config_hash: config.stable_hash()?,
    });

    let result = match &cli.command {
        Command::Scan(args) => run_scan(cli, &config, &activity, args),
        Command::Load(args) => run_load(cli, &config, &activity, args),
        Command::Menu(args) => run_menu(cli, &config, &activity, args),
        Command::Config(args) => run_config(cli, &config, args),
    };

    activity.shutdown();
    if let Some(handle) = logger {
        let _ = handle.join();
    }
    result
}

fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

fn open_activity(config: &Config) -> Result<(ActivityLog, Option<JoinHandle<()>>), CliError> {
    if !config.activity_log_enabled() {
        return Ok((ActivityLog::disabled(), None));
    }
    let (log, handle) = ActivityLog::spawn(JsonlConfig::for_path(&config.paths.activity_log))?;
    Ok((log, Some(handle)))
}

fn write_json(value: &impl Serialize) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

// ──────────────────── scan ────────────────────

fn run_scan(
    cli: &Cli,
    config: &Config,
    activity: &ActivityLog,
    args: &ScanArgs,
) -> Result<(), CliError> {
    let filter = if args.cores {
        SelectionFilter::cores()
    } else {
        SelectionFilter::new(
            &args.ext,
            ScanOptions {
                saves: args.saves,
                text: args.text,
                ..ScanOptions::default()
            },
        )
    };

    let registry = CoreRegistry::new();
    if let Some(core) = &args.core {
        preload_core(config, &registry, activity, core)?;
    }
    let scanner = FsDirectoryScanner::new(config.browser.max_entries)?;
    let mut browser = FileBrowser::new(
        scanner,
        config.browser.clone(),
        config.input.typing_reset_ms,
        registry,
        activity.clone(),
    );
    browser.open(&args.path, filter);
    let rows = browser.render(args.expand);

    match output_mode(cli) {
        OutputMode::Human => {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", browser.current_dir().display().to_string().bold())?;
            for row in &rows {
                let marker = match row.arrow {
                    RowArrow::Up => "^",
                    RowArrow::Down => "v",
                    RowArrow::None => " ",
                };
                let text = row.text.trim_end();
                if row.invert {
                    writeln!(out, "{marker}{}", text.reversed())?;
                } else if row.stipple {
                    writeln!(out, "{marker}{}", text.dimmed())?;
                } else {
                    writeln!(out, "{marker}{text}")?;
                }
            }
        }
        OutputMode::Json => {
            let listing = browser.listing();
            let entries: Vec<_> = listing
                .entries()
                .iter()
                .map(|e| {
                    json!({
                        "name": e.name,
                        "display": e.altname,
                        "dir": e.is_dir(),
                        "datecode": e.datecode,
                        "size": e.size,
                    })
                })
                .collect();
            write_json(&json!({
                "command": "scan",
                "directory": browser.current_dir(),
                "selected": listing.selected_index(),
                "first_visible": listing.first_visible(),
                "entries": entries,
                "rows": rows.iter().map(|r| r.text.trim_end()).collect::<Vec<_>>(),
            }))?;
        }
    }
    Ok(())
}

// ──────────────────── load ────────────────────

#[derive(Debug, Serialize)]
struct PhaseChange {
    phase: Phase,
    bytes_sent: usize,
}

fn run_load(
    cli: &Cli,
    config: &Config,
    activity: &ActivityLog,
    args: &LoadArgs,
) -> Result<(), CliError> {
    let mut channel = SimulatedChannel::new();
    if args.reset_stall {
        channel = channel.never_resets();
    }
    if args.never_ready {
        channel = channel.never_ready();
    }
    if let Some(index) = args.fail_block {
        channel = channel.failing_at_block(index);
    }
    let mode = args.mode.unwrap_or(config.loader.endian);

    let registry = CoreRegistry::new();
    let mut loader = ConfigLoader::new(
        channel,
        config.loader.clone(),
        config.browser.clone(),
        registry.clone(),
        activity.clone(),
    );
    let image = resolve_absolute_path(&args.image);
    let mut session = loader.begin_load(&image, mode)?;

    let mut trace = vec![PhaseChange {
        phase: session.phase(),
        bytes_sent: 0,
    }];
    loop {
        let phase = loader.step(&mut session);
        if trace.last().map(|t| t.phase) != Some(phase) {
            trace.push(PhaseChange {
                phase,
                bytes_sent: session.bytes_sent(),
            });
        }
        if phase.is_terminal() {
            break;
        }
    }

    let words = loader.channel().words().len();
    match output_mode(cli) {
        OutputMode::Human => {
            let mut out = io::stdout().lock();
            writeln!(
                out,
                "{} {} ({mode}, {} bytes)",
                "load".bold(),
                image.display(),
                session.total_bytes()
            )?;
            for change in &trace {
                writeln!(out, "  {:<16} {} bytes", format!("{:?}", change.phase), change.bytes_sent)?;
            }
            writeln!(out, "  {words} words written")?;
        }
        OutputMode::Json => {
            write_json(&json!({
                "command": "load",
                "image": image,
                "mode": mode,
                "bytes": session.total_bytes(),
                "words": words,
                "phases": trace,
                "core": registry.core_name(),
            }))?;
        }
    }

    match session.phase() {
        Phase::Failed(reason) => Err(FosdError::from(reason).into()),
        _ => {
            if output_mode(cli) == OutputMode::Human {
                println!("{} {}", "loaded".green(), registry.core_name());
            }
            Ok(())
        }
    }
}

// ──────────────────── menu ────────────────────

/// Ticks a scripted key stays down; comfortably past the debounce window.
const KEY_HOLD_TICKS: u64 = 40;
/// Ticks between scripted keys.
const KEY_GAP_TICKS: u64 = 40;

enum ScriptStep {
    Key(u32),
    Wait(u64),
}

fn parse_key(raw: &str) -> Result<ScriptStep, CliError> {
    let key = raw.trim().to_ascii_lowercase();
    if let Some(ms) = key.strip_prefix("wait:") {
        return ms
            .parse()
            .map(ScriptStep::Wait)
            .map_err(|_| CliError::User(format!("invalid wait duration {ms:?}")));
    }
    let code = match key.as_str() {
        "up" => code::UP,
        "down" => code::DOWN,
        "left" => code::LEFT,
        "right" => code::RIGHT,
        "enter" | "select" => code::ENTER,
        "esc" | "back" => code::ESC,
        "menu" | "f12" => code::F12,
        "backspace" => code::BACKSPACE,
        "space" => code::SPACE,
        other => match other.chars().collect::<Vec<_>>().as_slice() {
            [c] => letter_code(*c).ok_or_else(|| CliError::User(format!("unknown key {raw:?}")))?,
            _ => return Err(CliError::User(format!("unknown key {raw:?}"))),
        },
    };
    Ok(ScriptStep::Key(code))
}

/// Key code for a letter or digit, inverse of the keyboard row table.
fn letter_code(c: char) -> Option<u32> {
    const ROWS: [(&str, u32); 4] = [
        ("1234567890", 2),
        ("qwertyuiop", 16),
        ("asdfghjkl", 30),
        ("zxcvbnm", 44),
    ];
    ROWS.iter().find_map(|(row, first)| {
        row.chars()
            .position(|r| r == c)
            .and_then(|i| u32::try_from(i).ok())
            .map(|i| first + i)
    })
}

fn run_menu(
    cli: &Cli,
    config: &Config,
    activity: &ActivityLog,
    args: &MenuArgs,
) -> Result<(), CliError> {
    let script = args
        .keys
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|k| parse_key(k))
        .collect::<Result<Vec<_>, _>>()?;

    let registry = CoreRegistry::new();
    let mut menu = MenuMachine::new(
        config,
        FsDirectoryScanner::new(config.browser.max_entries)?,
        SimulatedChannel::new(),
        registry.clone(),
        activity.clone(),
    );
    if let Some(core) = &args.core {
        preload_core(config, &registry, activity, core)?;
        menu.context_mut().content_extensions = "*".to_string();
    }

    let (tx, feed) = InputFeed::new(INPUT_FEED_CAPACITY);
    let osd = TextOsd::new(config.browser.visible_rows);
    let mut orch = Orchestrator::new(config, feed, menu, osd);

    let mut now = 0;
    let mut commands = Vec::new();
    let mut effects = Vec::new();
    let mut run_for = |orch: &mut Orchestrator<_, _, _>, ticks: u64, now: &mut u64| {
        for _ in 0..ticks {
            let report = orch.tick(*now);
            if let Some(cmd) = report.command {
                commands.push(format!("{cmd:?}"));
            }
            effects.extend(report.effects);
            *now += 1;
        }
    };
    for step in script {
        match step {
            ScriptStep::Key(code) => {
                tx.push(RawSample::key(code));
                run_for(&mut orch, KEY_HOLD_TICKS, &mut now);
                tx.push(RawSample::default());
                run_for(&mut orch, KEY_GAP_TICKS, &mut now);
            }
            ScriptStep::Wait(ms) => run_for(&mut orch, ms, &mut now),
        }
    }
    // Let an in-flight transfer settle before reporting.
    while orch.menu().loader().is_busy() {
        run_for(&mut orch, 1, &mut now);
    }

    let osd = orch.osd();
    match output_mode(cli) {
        OutputMode::Human => {
            let mut out = io::stdout().lock();
            writeln!(
                out,
                "{} {:?} (osd {})",
                "state".bold(),
                orch.menu().current().kind(),
                if osd.is_enabled() { "on" } else { "off" }
            )?;
            if osd.is_enabled() {
                writeln!(out, "{}", osd.title().underline())?;
                for row in osd.rows() {
                    let text = row.text.trim_end();
                    if row.invert {
                        writeln!(out, "|{}", text.reversed())?;
                    } else {
                        writeln!(out, "|{text}")?;
                    }
                }
            }
            for effect in &effects {
                writeln!(out, "{} {}", "effect".cyan(), serde_json::to_string(effect)?)?;
            }
        }
        OutputMode::Json => {
            write_json(&json!({
                "command": "menu",
                "ticks": now,
                "state": format!("{:?}", orch.menu().current().kind()),
                "osd_enabled": osd.is_enabled(),
                "title": osd.title(),
                "rows": osd.dump().lines().collect::<Vec<_>>(),
                "commands": commands,
                "effects": effects,
            }))?;
        }
    }
    Ok(())
}

fn preload_core(
    config: &Config,
    registry: &CoreRegistry,
    activity: &ActivityLog,
    core: &Path,
) -> Result<(), CliError> {
    let mut loader = ConfigLoader::new(
        SimulatedChannel::new(),
        config.loader.clone(),
        config.browser.clone(),
        registry.clone(),
        activity.clone(),
    );
    let mut session = loader.begin_load(core, config.loader.endian)?;
    loader.run_to_completion(&mut session)?;
    Ok(())
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, config: &Config, args: &ConfigArgs) -> Result<(), CliError> {
    let hash = config.stable_hash()?;
    match (output_mode(cli), args.show_hash) {
        (OutputMode::Human, true) => println!("{hash}"),
        (OutputMode::Human, false) => {
            let rendered = toml::to_string_pretty(config).map_err(FosdError::from)?;
            println!("# {} {}", "config".bold(), config.paths.config_file.display());
            println!("# hash {hash}");
            print!("{rendered}");
        }
        (OutputMode::Json, true) => write_json(&json!({ "config_hash": hash }))?,
        (OutputMode::Json, false) => write_json(&json!({
            "config_hash": hash,
            "config": config,
        }))?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn keys_parse_to_codes() {
        assert!(matches!(parse_key("down"), Ok(ScriptStep::Key(code::DOWN))));
        assert!(matches!(parse_key("Enter"), Ok(ScriptStep::Key(code::ENTER))));
        assert!(matches!(parse_key("wait:250"), Ok(ScriptStep::Wait(250))));
        assert!(matches!(parse_key("a"), Ok(ScriptStep::Key(30))));
        assert!(matches!(parse_key("m"), Ok(ScriptStep::Key(50))));
        assert!(parse_key("hyper").is_err());
        assert!(parse_key("wait:soon").is_err());
    }

    #[test]
    fn letter_codes_invert_ascii_table() {
        for c in "1234567890qwertyuiopasdfghjklzxcvbnm".chars() {
            let code = letter_code(c).unwrap();
            assert_eq!(fpga_osd::input::keys::ascii_of(code), Some(c));
        }
        assert_eq!(letter_code('!'), None);
    }

    #[test]
    fn load_args_parse_mode() {
        let cli = Cli::parse_from(["fosd", "load", "core.rbf", "--mode", "be16"]);
        match cli.command {
            Command::Load(args) => assert_eq!(args.mode, Some(EndianMode::BigEndian16)),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
