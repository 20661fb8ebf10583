//! Activity logging: JSONL writer plus a non-blocking handle for the control thread.

pub mod activity;
pub mod jsonl;
