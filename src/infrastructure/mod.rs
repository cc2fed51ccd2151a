pub mod backends;
pub mod gateway_client;
pub mod storage;
