pub mod claims;
pub mod factory;
pub mod headers;
pub mod settings;
pub mod strategy;
pub mod token;
pub mod verifier;

pub use claims::Claims;
pub use factory::{build_registry, build_verifier};
pub use settings::AuthSettings;
pub use strategy::{AuthStrategy, RequestSource, StrategyRegistry};
pub use verifier::{JwtVerifier, TokenVerifier};
