#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use fpga_osd::core::config::Config;

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_fosd") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "fosd.exe" } else { "fosd" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve fosd binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("fosd-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute fosd command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// A throwaway SD-card layout with one console core, one game and one script.
pub struct SdCard {
    pub dir: tempfile::TempDir,
}

impl SdCard {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create sd card root");
        let root = dir.path();
        for sub in ["_Console", "games/NES", "saves/NES", "Scripts", "docs"] {
            fs::create_dir_all(root.join(sub)).expect("create sd card dir");
        }
        fs::write(root.join("_Console/NES_20240131.rbf"), b"nes-core!").expect("write core");
        fs::write(root.join("_Console/SNES_20231201.rbf"), b"snes").expect("write core");
        fs::write(root.join("games/NES/Contra.nes"), b"rom").expect("write rom");
        fs::write(root.join("games/NES/Zelda.nes"), b"rom").expect("write rom");
        fs::write(root.join("Scripts/update.sh"), b"#!/bin/sh\n").expect("write script");
        fs::write(root.join("docs/readme.txt"), b"hello").expect("write doc");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn core_image(&self) -> PathBuf {
        self.root().join("_Console/NES_20240131.rbf")
    }

    /// In-process config pointing every browser root at this card.
    pub fn config(&self) -> Config {
        let mut cfg = Config::default();
        let root = self.root();
        cfg.browser.cores_dir = root.to_path_buf();
        cfg.browser.games_dir = root.join("games");
        cfg.browser.saves_dir = root.join("saves");
        cfg.browser.scripts_dir = root.join("Scripts");
        cfg.browser.docs_dir = root.join("docs");
        cfg.browser.visible_rows = 8;
        cfg.loader.block_bytes = 4;
        cfg.loader.reset_timeout_cycles = 64;
        cfg.loader.reset_polls_per_step = 16;
        cfg.paths.activity_log = root.join("activity.jsonl");
        cfg
    }

    /// Write `config()` as TOML and return its path.
    pub fn write_config(&self) -> PathBuf {
        let path = self.root().join("fosd.toml");
        let raw = toml::to_string_pretty(&self.config()).expect("serialize config");
        fs::write(&path, raw).expect("write config");
        path
    }
}
