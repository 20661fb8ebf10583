//! Directory scan and file selection: filters, listings, display and sessions.

pub mod display;
pub mod filter;
pub mod listing;
pub mod scan;
pub mod session;

pub use filter::{ExtensionFilter, ScanOptions, SelectionFilter};
pub use listing::{DirEntry, DirectoryListing, EntryKind};
pub use scan::{DirectoryScan, FsDirectoryScanner, ScanMode, ScanOutcome, ScanRequest};
pub use session::{FileBrowser, Target};
