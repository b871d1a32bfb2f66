pub mod access;
pub mod whitelist;

pub use whitelist::Whitelist;
