pub mod config;
pub mod error;
pub mod fingerprint;
pub mod topics;
pub mod types;

pub use config::Config;
pub use error::MarketPulseError;
pub use fingerprint::*;
pub use topics::*;
pub use types::*;
