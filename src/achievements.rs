//! Achievement aggregation
//!
//! Issues one lookup per requested app, runs them concurrently and joins on
//! all of them before returning. Each lookup is isolated: a transport error,
//! an undecodable payload or a timeout resolves that one app to
//! [`Completion::NotApplicable`] and the batch carries on.
//!
//! The result always holds exactly one entry per distinct requested app.

use crate::error::LookupError;
use crate::models::{AppId, Completion};
use crate::sources::AchievementSource;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

pub struct AchievementAggregator<S> {
    source: S,
    lookup_timeout: Duration,
    max_in_flight: Option<usize>,
}

impl<S: AchievementSource> AchievementAggregator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            max_in_flight: None,
        }
    }

    pub fn with_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    /// Cap the number of lookups in flight. `None` issues every lookup at once.
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Completion per requested app, with failed lookups as `NotApplicable`
    pub async fn aggregate<I>(&self, apps: I) -> BTreeMap<AppId, Completion>
    where
        I: IntoIterator<Item = AppId>,
    {
        let requested: BTreeSet<AppId> = apps.into_iter().collect();
        if requested.is_empty() {
            return BTreeMap::new();
        }

        let in_flight = self
            .max_in_flight
            .unwrap_or(requested.len())
            .clamp(1, requested.len());
        info!(
            apps = requested.len(),
            in_flight,
            timeout_secs = self.lookup_timeout.as_secs_f64(),
            "Fetching achievements"
        );

        let outcomes: Vec<(AppId, Result<Completion, LookupError>)> =
            stream::iter(requested.iter().copied())
                .map(|app_id| async move { (app_id, self.lookup(app_id).await) })
                .buffer_unordered(in_flight)
                .collect()
                .await;

        let mut completions: BTreeMap<AppId, Completion> = requested
            .iter()
            .map(|app_id| (*app_id, Completion::NotApplicable))
            .collect();
        let mut failures = 0usize;

        for (app_id, outcome) in outcomes {
            match outcome {
                Ok(completion) => {
                    completions.insert(app_id, completion);
                }
                Err(e) => {
                    failures += 1;
                    warn!(app_id, error = %e, "Achievement lookup failed");
                }
            }
        }

        info!(
            apps = completions.len(),
            failures,
            "Achievements aggregated"
        );
        completions
    }

    async fn lookup(&self, app_id: AppId) -> Result<Completion, LookupError> {
        let stats = tokio::time::timeout(
            self.lookup_timeout,
            self.source.player_achievements(app_id),
        )
        .await
        .map_err(|_| LookupError::Timeout(self.lookup_timeout))??;

        let completion = stats.completion();
        debug!(app_id, ?completion, "Achievement lookup resolved");
        Ok(completion)
    }
}
