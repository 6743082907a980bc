use anyhow::Result;
use chrono::Utc;
use tracing::debug;

use tagwatch_common::PostRecord;

use crate::traits::PostStore;

/// Post-write state of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Every input record as it now stands in the store.
    pub records: Vec<PostRecord>,
    pub created: usize,
    pub updated: usize,
}

/// Upsert freshly extracted records by shortcode. First sighting inserts
/// the record with `notified = false`; a re-sighting overwrites every
/// mutable field but leaves `shortcode`, `id`, `created_at`, and `notified`
/// alone, so re-scraping never re-arms notification.
///
/// Idempotent: the same extraction applied twice changes nothing but
/// timestamps. A store write failure propagates; records already written
/// this pass stand.
pub async fn reconcile(
    records: &[PostRecord],
    store: &dyn PostStore,
) -> Result<ReconcileOutcome> {
    let mut outcome = ReconcileOutcome::default();
    let now = Utc::now();

    for record in records {
        match store.find_by_shortcode(&record.shortcode).await? {
            None => {
                let mut fresh = record.clone();
                fresh.notified = false;
                fresh.created_at = now;
                fresh.updated_at = now;
                store.insert(&fresh).await?;
                debug!(shortcode = fresh.shortcode.as_str(), "Created post record");
                outcome.created += 1;
                outcome.records.push(fresh);
            }
            Some(existing) => {
                let mut merged = record.clone();
                merged.id = existing.id;
                merged.created_at = existing.created_at;
                merged.notified = existing.notified;
                merged.updated_at = now;
                store.update(&merged).await?;
                debug!(shortcode = merged.shortcode.as_str(), "Updated post record");
                outcome.updated += 1;
                outcome.records.push(merged);
            }
        }
    }

    Ok(outcome)
}
