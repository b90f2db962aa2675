//! Sweep over active investigations: every event still in collecting or
//! analyzing status gets another orchestrator run. Keep-going semantics
//! without a real scheduler; no backoff, no concurrency limit.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use timelineforge_common::ForgeError;

use crate::investigator::Investigator;
use crate::traits::InvestigationStore;

pub struct Monitor {
    store: Arc<dyn InvestigationStore>,
    investigator: Arc<Investigator>,
}

#[derive(Debug, Serialize)]
pub struct MonitorReport {
    pub processed: usize,
    pub details: Vec<SweepResult>,
}

#[derive(Debug, Serialize)]
pub struct SweepResult {
    pub id: Uuid,
    pub title: String,
    pub success: bool,
}

impl Monitor {
    pub fn new(store: Arc<dyn InvestigationStore>, investigator: Arc<Investigator>) -> Self {
        Self {
            store,
            investigator,
        }
    }

    /// Run the orchestrator once for each active event, sequentially.
    /// Individual failures are recorded and the sweep continues.
    pub async fn sweep(&self) -> Result<MonitorReport, ForgeError> {
        let events = self.store.list_active_events().await?;
        info!(count = events.len(), "Monitor sweep: active events found");

        let mut details = Vec::with_capacity(events.len());

        for event in events {
            info!(event_id = %event.id, title = event.title.as_str(), "Triggering investigator");

            // Runs with the owner's identity; the sweep itself is not a user.
            let success = match self.investigator.run(event.id, event.user_id).await {
                Ok(stats) => {
                    info!(event_id = %event.id, %stats, "Sweep run complete");
                    true
                }
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "Sweep run failed");
                    false
                }
            };

            details.push(SweepResult {
                id: event.id,
                title: event.title,
                success,
            });
        }

        Ok(MonitorReport {
            processed: details.len(),
            details,
        })
    }
}
