//! Sharded job table keyed by job identifier.
//!
//! Each entry is guarded by its [`DashMap`] shard, so concurrent runs only
//! contend when their identifiers hash to the same shard. The TTL is fixed:
//! it counts from creation and is not extended by updates. Only terminal
//! records expire; a job whose run is still in flight keeps its entry however
//! long the run takes.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use faceswap_core::error::CoreError;
use faceswap_core::job::{JobRecord, JobStatus};
use faceswap_core::types::JobId;
use tokio::time::Instant;

/// Default record lifetime: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct StoredJob {
    record: JobRecord,
    created: Instant,
}

impl StoredJob {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        self.record.is_terminal() && now.duration_since(self.created) >= ttl
    }
}

/// Concurrent in-memory job table.
///
/// Designed to be wrapped in `Arc` and shared between the orchestrator,
/// the request handlers, and the expiry sweeper.
pub struct JobStore {
    entries: DashMap<JobId, StoredJob>,
    ttl: Duration,
}

impl JobStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert a new record for `job_id`.
    ///
    /// Fails with [`CoreError::DuplicateJob`] while an unexpired record with
    /// the same identifier exists, terminal or not. An expired record is
    /// replaced. Also sweeps expired entries, so creation traffic keeps the
    /// table bounded even without the scheduled sweeper.
    pub fn create(&self, job_id: &str, status: JobStatus) -> Result<JobRecord, CoreError> {
        self.sweep_expired();

        let now = Instant::now();
        let record = JobRecord::new(job_id, status);
        let stored = StoredJob {
            record: record.clone(),
            created: now,
        };

        match self.entries.entry(job_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired(self.ttl, now) {
                    return Err(CoreError::DuplicateJob(job_id.to_string()));
                }
                occupied.insert(stored);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(stored);
            }
        }

        Ok(record)
    }

    /// Snapshot of `job_id`, or `None` if absent or expired. Expired entries
    /// are evicted on the way out.
    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        let now = Instant::now();
        {
            let stored = self.entries.get(job_id)?;
            if !stored.is_expired(self.ttl, now) {
                return Some(stored.record.clone());
            }
        }
        self.evict_if_expired(job_id, now);
        None
    }

    /// Atomic read-modify-write on one record.
    ///
    /// `mutate` runs while the entry is locked and reports whether it changed
    /// the record. Returns the new snapshot when it did, `None` when the
    /// mutation was a no-op (e.g. a late event on a terminal job). The
    /// identifier and `created_at` are restored if `mutate` touched them.
    pub fn update<F>(&self, job_id: &str, mutate: F) -> Result<Option<JobRecord>, CoreError>
    where
        F: FnOnce(&mut JobRecord) -> bool,
    {
        let now = Instant::now();
        let Some(mut stored) = self.entries.get_mut(job_id) else {
            return Err(CoreError::not_found("Job", job_id));
        };
        if stored.is_expired(self.ttl, now) {
            drop(stored);
            self.evict_if_expired(job_id, now);
            return Err(CoreError::not_found("Job", job_id));
        }

        let created_at = stored.record.created_at;
        let changed = mutate(&mut stored.record);
        stored.record.job_id = job_id.to_string();
        stored.record.created_at = created_at;

        Ok(changed.then(|| stored.record.clone()))
    }

    /// All unexpired records, oldest first.
    pub fn list(&self) -> Vec<JobRecord> {
        let now = Instant::now();
        let mut records: Vec<JobRecord> = self
            .entries
            .iter()
            .filter(|entry| !entry.is_expired(self.ttl, now))
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, stored| {
            let keep = !stored.is_expired(self.ttl, now);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            tracing::debug!(removed, "Swept expired jobs");
        }
        removed
    }

    /// Number of entries currently held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_if_expired(&self, job_id: &str, now: Instant) {
        self.entries
            .remove_if(job_id, |_, stored| stored.is_expired(self.ttl, now));
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
