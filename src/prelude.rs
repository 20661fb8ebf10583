//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use fpga_osd::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{FosdError, Result};

// Input
pub use crate::input::debounce::{DebounceEngine, PollContext, RawSample};
pub use crate::input::keys::Command;

// Browser
pub use crate::browser::filter::{ExtensionFilter, ScanOptions, SelectionFilter};
pub use crate::browser::scan::{DirectoryScan, FsDirectoryScanner};
pub use crate::browser::session::{FileBrowser, Target};

// Loader
pub use crate::loader::channel::{ConfigChannel, EndianMode};
pub use crate::loader::registry::CoreRegistry;
pub use crate::loader::session::{ConfigLoader, LoadFailure, Phase, TransferSession};
pub use crate::loader::sim::SimulatedChannel;

// Menu
pub use crate::menu::{MenuContext, MenuEffect, MenuMachine, MenuState, StateKind};

// OSD
pub use crate::osd::progress::ProgressState;
pub use crate::osd::{OsdRow, OsdSurface, TextOsd};

// Runtime
pub use crate::runtime::{InputFeed, InputSender, Orchestrator, TickReport};

// Logger
pub use crate::logger::activity::{ActivityEvent, ActivityLog};
