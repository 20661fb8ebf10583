//! Input engine: raw key/button samples in, discrete menu commands out.

pub mod debounce;
pub mod keys;

pub use debounce::{DebounceEngine, KeyTimingState, LongPressEdge, LongPressState, PollContext, RawSample};
pub use keys::Command;
