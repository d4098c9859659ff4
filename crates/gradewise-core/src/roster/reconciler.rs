//! Drives a [`DeleteTracker`] against the query layer

use std::time::Duration;

use super::tracker::DeleteTracker;
use crate::api::{Enrollments, ResourceApi};
use crate::error::{Error, Result};
use crate::models::{Enrollment, EnrollmentFilters};
use crate::query::Queries;

/// How many roster reads to wait for the removed row to disappear
pub const DEFAULT_SYNC_ATTEMPTS: u32 = 5;

/// Pause between roster reads while waiting
pub const DEFAULT_SYNC_DELAY: Duration = Duration::from_millis(500);

/// Removes enrollments from one class roster and waits for the roster to agree
pub struct RosterReconciler<'q, B: ResourceApi> {
    queries: &'q Queries<B>,
    filters: EnrollmentFilters,
    max_attempts: u32,
    delay: Duration,
}

impl<'q, B: ResourceApi> RosterReconciler<'q, B> {
    pub fn new(queries: &'q Queries<B>, class_id: impl Into<String>) -> Self {
        Self {
            queries,
            filters: EnrollmentFilters::for_class(class_id),
            max_attempts: DEFAULT_SYNC_ATTEMPTS,
            delay: DEFAULT_SYNC_DELAY,
        }
    }

    pub fn with_sync_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_sync_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Current roster, served from the cache when fresh
    pub async fn roster(&self) -> Result<Vec<Enrollment>> {
        let page = self
            .queries
            .resource::<Enrollments>()
            .list(&self.filters)
            .await?;
        Ok(page.content.clone())
    }

    /// Confirm the pending removal, delete it, then wait for the roster to sync
    ///
    /// A failed delete puts the tracker back to idle and returns the error.
    pub async fn remove(&self, tracker: &mut DeleteTracker) -> Result<()> {
        let id = tracker.confirm()?;

        if let Err(e) = self.queries.resource::<Enrollments>().delete(&id).await {
            log::error!("[roster] Failed to remove enrollment {}: {}", id, e);
            tracker.delete_failed();
            return Err(e);
        }
        log::info!("[roster] Removed enrollment {}", id);
        tracker.delete_succeeded();

        self.sync(tracker).await
    }

    /// Read the roster until it no longer lists the removed row
    ///
    /// Gives up after the configured attempts with a timeout error, leaving
    /// the tracker waiting so a later read can still complete it.
    pub async fn sync(&self, tracker: &mut DeleteTracker) -> Result<()> {
        let roster = self.queries.resource::<Enrollments>();

        for attempt in 1..=self.max_attempts {
            let page = roster.list(&self.filters).await?;
            let status = roster.list_status(&self.filters).await?;
            if tracker.observe_list(page.content.iter().map(|e| e.id.as_str()), status.is_fetching) {
                return Ok(());
            }
            if tracker.is_idle() {
                return Ok(());
            }

            log::debug!(
                "[roster] Attempt {}/{}: roster still lists {:?}",
                attempt,
                self.max_attempts,
                tracker.pending_id()
            );
            roster.invalidate_list(&self.filters).await?;
            if attempt < self.max_attempts {
                tokio::time::sleep(self.delay).await;
            }
        }

        Err(Error::timeout(format!(
            "roster still lists {} after {} reads",
            tracker.pending_label().unwrap_or("the removed student"),
            self.max_attempts
        )))
    }
}
