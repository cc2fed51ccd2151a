mod accumulator;
pub mod clipboard;
mod gateway;
mod handoff;
mod history;
mod preview;
mod session;

pub use accumulator::*;
pub use gateway::*;
pub use handoff::*;
pub use history::*;
pub use preview::*;
pub use session::*;
