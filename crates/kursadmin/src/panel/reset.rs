//! Global candidate counter reset.

use serde_json::Map;
use tracing::{debug, info};

use super::{AdminPanel, Outcome};
use crate::decode::decode_schools;
use crate::error::Result;
use crate::messages::{Message, Task};
use crate::model::CandidateCounterSet;
use crate::store::SCHOOLS_PATH;

/// Asks the administrator to confirm a destructive action.
pub trait Confirm {
    /// Show `prompt` and return whether the administrator agreed.
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

impl AdminPanel {
    /// Zero the candidate counters of every school in one atomic update.
    ///
    /// Nothing is read or written unless `confirm` agrees. Every stored
    /// school must decode with a complete counter set.
    pub async fn reset_candidates(&mut self, confirm: &dyn Confirm) -> Outcome {
        let prompt = self.settings.locale.render(&Message::ResetPrompt);
        if !confirm.confirm(&prompt) {
            debug!("candidate reset declined");
            return Outcome::Declined;
        }

        match self.reset_all_schools().await {
            Ok(count) => {
                info!(schools = count, "candidate counters reset");
                self.succeed(&Message::CandidatesReset)
            }
            Err(err) => self.fail(Task::ResetCandidates, err),
        }
    }

    /// Returns the number of schools reset.
    async fn reset_all_schools(&self) -> Result<usize> {
        let Some(snapshot) = self.store.get(SCHOOLS_PATH).await? else {
            debug!("no schools to reset");
            return Ok(0);
        };
        let schools = decode_schools(&snapshot)?;
        if schools.is_empty() {
            return Ok(0);
        }

        let zeroed = serde_json::to_value(CandidateCounterSet::zeroed())?;
        let updates: Map<_, _> = schools
            .iter()
            .map(|school| (format!("{}/candidates", school.id), zeroed.clone()))
            .collect();
        debug!(schools = updates.len(), "submitting candidate reset");
        self.store.update(SCHOOLS_PATH, updates).await?;
        Ok(schools.len())
    }
}
