//! Menu state machine: screens, static pages, the transition table, and the
//! machine that drives them.

pub mod machine;
pub mod pages;
pub mod render;
pub mod state;
pub mod table;

pub use machine::{MenuContext, MenuEffect, MenuMachine};
pub use state::{AssetKind, BrowserPurpose, MenuState, StateKind};
pub use table::{Action, Guard, Trigger};
