use nh_core::{ArticleStorage, FieldUpdate};
use serde::Serialize;
use tracing::{debug, error};

/// Per-stage counters. `failed` counts collaborator and persistence failures,
/// `skipped` counts blank articles the stage never sent to a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Writes one document at a time. A failed write is logged and counted, earlier
/// writes stay in place.
pub async fn write_updates<I>(store: &dyn ArticleStorage, updates: I) -> StageReport
where
    I: IntoIterator<Item = (String, Vec<FieldUpdate>)>,
{
    let mut report = StageReport::default();
    for (id, fields) in updates {
        report.processed += 1;
        match store.update_by_id(&id, &fields).await {
            Ok(()) => {
                debug!("Updated article {}", id);
                report.updated += 1;
            }
            Err(e) => {
                error!("❌ Failed to update article {}: {}", id, e);
                report.failed += 1;
            }
        }
    }
    report
}
