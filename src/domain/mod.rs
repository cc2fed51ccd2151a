pub mod models;
pub mod services;

#[cfg(test)]
pub mod testing;
