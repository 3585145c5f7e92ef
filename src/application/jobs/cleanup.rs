//! Cron job that deletes finished jobs once their results expire.

use std::str::FromStr;
use std::sync::Arc;

use apalis::prelude::*;
use apalis_cron::Schedule;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::application::repos::{JobStore, RepoError};

/// Runs every hour at minute 0.
pub const PURGE_SCHEDULE: &str = "0 0 * * * *";

/// Marker struct for the cron-triggered purge.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron compatibility.
#[derive(Default, Debug, Clone)]
pub struct PurgeExpiredJobs;

impl From<chrono::DateTime<chrono::Utc>> for PurgeExpiredJobs {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

#[derive(Clone)]
pub struct PurgeContext {
    pub store: Arc<dyn JobStore>,
    pub result_ttl: Duration,
}

/// Delete terminal jobs whose results are older than the configured TTL.
pub async fn purge_expired_jobs(
    store: &dyn JobStore,
    result_ttl: Duration,
    now: OffsetDateTime,
) -> Result<u64, RepoError> {
    let cutoff = now - result_ttl;
    let purged = store.purge_finished_before(cutoff).await?;
    metrics::counter!("specdoc_jobs_purged_total").increment(purged);
    info!(
        target = "specdoc::application::jobs::cleanup",
        purged,
        cutoff = %cutoff,
        "expired documentation jobs purged"
    );
    Ok(purged)
}

pub async fn process_purge_expired_jobs(
    _job: PurgeExpiredJobs,
    ctx: Data<PurgeContext>,
) -> Result<(), apalis::prelude::Error> {
    if let Err(err) =
        purge_expired_jobs(ctx.store.as_ref(), ctx.result_ttl, OffsetDateTime::now_utc()).await
    {
        warn!(
            target = "specdoc::application::jobs::cleanup",
            error = %err,
            "failed to purge expired documentation jobs"
        );
    }
    Ok(())
}

pub fn purge_schedule() -> Result<Schedule, String> {
    Schedule::from_str(PURGE_SCHEDULE).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_parses_correctly() {
        let schedule = purge_schedule().expect("schedule");
        let upcoming: Vec<_> = schedule.upcoming(chrono::Utc).take(3).collect();
        assert_eq!(upcoming.len(), 3);
    }
}
