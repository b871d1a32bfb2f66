pub mod client;
#[cfg(test)]
pub mod memory;
pub mod valkey;

pub use client::{CacheClient, CacheError};
pub use valkey::ValkeyClient;
