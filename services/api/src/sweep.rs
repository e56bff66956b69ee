//! Periodic purge of expired revocations and stale rate-limit entries

use anyhow::Result;
use auth::{rate_limiter::RateLimiter, repositories::RevocationStore};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Outcome of one sweep run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub revocations_purged: u64,
    pub rate_limit_entries_purged: usize,
}

/// Run a single sweep. Failures are logged and do not abort the run.
pub async fn run_sweep(
    revocations: &dyn RevocationStore,
    rate_limiters: &[RateLimiter],
) -> SweepReport {
    let mut report = SweepReport::default();

    match revocations.purge_expired().await {
        Ok(purged) => report.revocations_purged = purged,
        Err(e) => error!("Failed to purge expired revocations: {}", e),
    }

    for limiter in rate_limiters {
        report.rate_limit_entries_purged += limiter.purge_stale().await;
    }

    if report.revocations_purged > 0 || report.rate_limit_entries_purged > 0 {
        info!(
            "Sweep purged {} revocations and {} rate limit entries",
            report.revocations_purged, report.rate_limit_entries_purged
        );
    }

    report
}

/// Start the sweep on a cron schedule (seconds field included)
pub async fn start_sweep(
    schedule: &str,
    revocations: Arc<dyn RevocationStore>,
    rate_limiters: Vec<RateLimiter>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(schedule, move |_, _| {
        let revocations = revocations.clone();
        let rate_limiters = rate_limiters.clone();
        Box::pin(async move {
            run_sweep(revocations.as_ref(), &rate_limiters).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Started revocation sweep with schedule: {}", schedule);
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::{
        rate_limiter::RateLimiterConfig,
        repositories::InMemoryRevocationRepository,
    };
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_sweep_purges_expired_revocations() {
        let store = InMemoryRevocationRepository::default();
        store
            .revoke("old", Utc::now() - Duration::minutes(5))
            .await
            .unwrap();
        store
            .revoke("current", Utc::now() + Duration::minutes(5))
            .await
            .unwrap();

        let limiter = RateLimiter::new(RateLimiterConfig::default());
        let report = run_sweep(&store, &[limiter]).await;

        assert_eq!(report.revocations_purged, 1);
        assert!(store.is_revoked("current").await.unwrap());
        assert!(!store.is_revoked("old").await.unwrap());
    }
}
