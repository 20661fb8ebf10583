#![forbid(unsafe_code)]

//! fpga_osd (fosd) — on-device control layer for an FPGA retro platform.
//!
//! Four cooperating engines, all driven from one control thread:
//! 1. **Input** — debounce, auto-repeat and long-press detection over raw key samples
//! 2. **Menu** — table-driven OSD state machine with a typed effect outbox
//! 3. **File browser** — filtered, sorted directory sessions with prefix search
//! 4. **Core loader** — reset handshake, block streaming and readiness polling
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use fpga_osd::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use fpga_osd::core::config::Config;
//! use fpga_osd::loader::session::{ConfigLoader, Phase};
//! ```

pub mod prelude;

pub mod browser;
pub mod core;
pub mod input;
pub mod loader;
pub mod logger;
pub mod menu;
pub mod osd;
pub mod runtime;
