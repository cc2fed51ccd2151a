mod backend;
mod error;
mod event;
mod fragment;
mod generation;
mod history;
mod language;
mod preview;
mod session;
mod slash_commands;
mod source;
mod storage;

pub use backend::*;
pub use error::*;
pub use event::*;
pub use fragment::*;
pub use generation::*;
pub use history::*;
pub use language::*;
pub use preview::*;
pub use session::*;
pub use slash_commands::*;
pub use source::*;
pub use storage::*;
