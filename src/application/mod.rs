pub mod cli;
pub mod preview;
pub mod server;
pub mod ui;
