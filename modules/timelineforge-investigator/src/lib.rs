pub mod analysis;
pub mod collector;
#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;
pub mod investigator;
pub mod monitor;
pub mod prompts;
pub mod tester;
pub mod traits;

pub use collector::{CollectedEvidence, CollectionOutcome, EvidenceCollector};
pub use investigator::{InvestigationStats, Investigator};
pub use monitor::{Monitor, MonitorReport};
pub use tester::{HypothesisTester, TestOutcome};
pub use traits::{Analyst, InvestigationStore, SearchHit, WebSearcher};
