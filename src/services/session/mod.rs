pub mod store;
pub mod valkey;

pub use store::{DeptAuthSource, SessionError, SessionOracle};
pub use valkey::ValkeySessionStore;
