pub mod error;
mod rows;
mod store;

pub use error::{Result, StoreError};
pub use store::{NewBranch, NewEvidence, NewHypothesis, Store};
