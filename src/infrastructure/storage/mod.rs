mod file_store;
#[cfg(test)]
mod memory_store;

pub use file_store::*;
#[cfg(test)]
pub use memory_store::*;
