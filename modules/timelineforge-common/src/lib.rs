pub mod config;
pub mod error;
pub mod safety;
pub mod scoring;
pub mod types;

pub use config::Config;
pub use error::ForgeError;
pub use safety::is_valid_external_url;
pub use scoring::*;
pub use types::*;
