//! In-memory `ConfigChannel` for tests and load rehearsal.

#![allow(missing_docs)]

use crate::core::errors::{FosdError, Result};
use crate::loader::channel::{ConfigChannel, ReadyPoll, WordWidth};

/// Scriptable stand-in for the register/SPI interface.
#[derive(Debug, Clone)]
pub struct SimulatedChannel {
    reset_after: Option<u64>,
    ready_after: Option<u32>,
    fail_block: Option<usize>,
    reset_fails: bool,

    reset_asserted: bool,
    reset_polls: u64,
    ready_checks: u32,
    blocks_written: usize,
    words: Vec<u16>,
    widths: Vec<WordWidth>,
    reset_history: Vec<bool>,
}

impl Default for SimulatedChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedChannel {
    /// Acknowledges reset on the first poll and reports ready on the first check.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reset_after: Some(1),
            ready_after: Some(1),
            fail_block: None,
            reset_fails: false,
            reset_asserted: false,
            reset_polls: 0,
            ready_checks: 0,
            blocks_written: 0,
            words: Vec::new(),
            widths: Vec::new(),
            reset_history: Vec::new(),
        }
    }

    /// Acknowledge reset after `polls` polls while asserted.
    #[must_use]
    pub fn with_reset_after(mut self, polls: u64) -> Self {
        self.reset_after = Some(polls);
        self
    }

    #[must_use]
    pub fn never_resets(mut self) -> Self {
        self.reset_after = None;
        self
    }

    /// Report configuration-done on the `checks`-th status check.
    #[must_use]
    pub fn with_ready_after(mut self, checks: u32) -> Self {
        self.ready_after = Some(checks);
        self
    }

    #[must_use]
    pub fn never_ready(mut self) -> Self {
        self.ready_after = None;
        self
    }

    /// Fail the write of block `index` (zero-based).
    #[must_use]
    pub fn failing_at_block(mut self, index: usize) -> Self {
        self.fail_block = Some(index);
        self
    }

    /// Every attempt to drive the reset line fails.
    #[must_use]
    pub fn failing_reset(mut self) -> Self {
        self.reset_fails = true;
        self
    }

    #[must_use]
    pub const fn reset_asserted(&self) -> bool {
        self.reset_asserted
    }

    /// Every level successfully driven onto the reset line, in order.
    #[must_use]
    pub fn reset_history(&self) -> &[bool] {
        &self.reset_history
    }

    #[must_use]
    pub const fn blocks_written(&self) -> usize {
        self.blocks_written
    }

    #[must_use]
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Word width of each block written.
    #[must_use]
    pub fn widths(&self) -> &[WordWidth] {
        &self.widths
    }

    #[must_use]
    pub const fn ready_checks(&self) -> u32 {
        self.ready_checks
    }
}

impl ConfigChannel for SimulatedChannel {
    fn set_reset(&mut self, asserted: bool) -> Result<()> {
        if self.reset_fails {
            return Err(FosdError::Runtime {
                details: "simulated reset line fault".to_string(),
            });
        }
        if asserted {
            self.reset_polls = 0;
        }
        self.reset_asserted = asserted;
        self.reset_history.push(asserted);
        Ok(())
    }

    fn reset_done(&mut self) -> bool {
        if !self.reset_asserted {
            return false;
        }
        self.reset_polls += 1;
        self.reset_after.is_some_and(|n| self.reset_polls >= n)
    }

    fn write_words(&mut self, width: WordWidth, words: &[u16]) -> Result<()> {
        if self.fail_block == Some(self.blocks_written) {
            return Err(FosdError::Runtime {
                details: format!("simulated stream fault at block {}", self.blocks_written),
            });
        }
        self.blocks_written += 1;
        self.words.extend_from_slice(words);
        self.widths.push(width);
        Ok(())
    }

    fn is_ready(&mut self, _poll: ReadyPoll) -> bool {
        self.ready_checks += 1;
        self.ready_after.is_some_and(|n| self.ready_checks >= n)
    }
}
