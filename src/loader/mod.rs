//! FPGA configuration loading: wire encoding, transfer protocol, and the
//! process-wide current-core registry.

pub mod channel;
pub mod registry;
pub mod session;
pub mod sim;

pub use channel::{ConfigChannel, EndianMode, ReadyPoll, WordWidth, encode_block};
pub use registry::{CoreInfo, CoreRegistry, MENU_CORE_NAME};
pub use session::{ConfigLoader, LoadFailure, Phase, TransferSession};
pub use sim::SimulatedChannel;
