use std::time::Duration;

use tokio::time::sleep;

use quotedeck_core::QuoteDraft;

use crate::error::StoreError;
use crate::store::QuoteStore;
use crate::text::ellipsize;

/// Pacing profile for bulk runs against the service's rate limit: a pause
/// after every item, plus a longer breather after each full batch.
#[derive(Debug, Clone)]
pub struct BatchPacing {
    pub item_delay: Duration,
    /// Items per batch before the extra pause. Zero disables batch pauses.
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for BatchPacing {
    /// Import profile: the service throttles creates hardest.
    fn default() -> Self {
        Self {
            item_delay: Duration::from_millis(1100),
            batch_size: 5,
            batch_delay: Duration::from_secs(2),
        }
    }
}

impl BatchPacing {
    /// Deletions tolerate a much shorter gap and need no batch pause.
    pub fn delete_profile() -> Self {
        Self {
            item_delay: Duration::from_millis(300),
            batch_size: 0,
            batch_delay: Duration::ZERO,
        }
    }

    /// No waiting at all.
    pub fn none() -> Self {
        Self {
            item_delay: Duration::ZERO,
            batch_size: 0,
            batch_delay: Duration::ZERO,
        }
    }

    async fn pause_after(&self, index: usize, total: usize) {
        if index + 1 == total {
            return; // no trailing pause after the last item
        }
        if !self.item_delay.is_zero() {
            sleep(self.item_delay).await;
        }
        if self.batch_size > 0 && (index + 1) % self.batch_size == 0 && !self.batch_delay.is_zero()
        {
            sleep(self.batch_delay).await;
        }
    }
}

/// How one item of a bulk run ended.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Created { id: String },
    Deleted,
    Duplicate { count: usize },
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct BatchItem {
    pub index: usize,
    pub label: String,
    pub outcome: ItemOutcome,
}

/// Per-item outcomes of a bulk run, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    fn record(&mut self, index: usize, label: String, outcome: ItemOutcome) {
        match &outcome {
            ItemOutcome::Created { id } => tracing::info!("[{index}] created {id}: {label}"),
            ItemOutcome::Deleted => tracing::info!("[{index}] deleted {label}"),
            ItemOutcome::Duplicate { count } => {
                tracing::warn!("[{index}] skipped {label}: {count} duplicate(s)")
            }
            ItemOutcome::Failed { message } => {
                tracing::warn!("[{index}] failed {label}: {message}")
            }
        }
        self.items.push(BatchItem {
            index,
            label,
            outcome,
        });
    }

    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Created { .. } | ItemOutcome::Deleted))
            .count()
    }

    pub fn duplicates(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Duplicate { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Failed { .. }))
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} skipped as duplicates, {} failed ({} attempted)",
            self.succeeded(),
            self.duplicates(),
            self.failed(),
            self.items.len()
        )
    }
}

/// Create every draft in order. One failing item never stops the rest; the
/// report says what happened to each.
pub async fn import_quotes(
    store: &QuoteStore,
    drafts: &[QuoteDraft],
    pacing: &BatchPacing,
) -> BatchReport {
    let mut report = BatchReport::default();
    for (i, draft) in drafts.iter().enumerate() {
        let label = ellipsize(&draft.text, 40);
        match store.create_quote(draft).await {
            Ok(quote) => report.record(i, label, ItemOutcome::Created { id: quote.id }),
            Err(StoreError::DuplicateDetected(dup)) => report.record(
                i,
                label,
                ItemOutcome::Duplicate {
                    count: dup.duplicate_count,
                },
            ),
            Err(e) => report.record(
                i,
                label,
                ItemOutcome::Failed {
                    message: e.to_string(),
                },
            ),
        }
        pacing.pause_after(i, drafts.len()).await;
    }
    tracing::info!("import finished: {}", report.summary());
    report
}

/// Delete every id in order, with the same per-item isolation as imports.
pub async fn delete_quotes(
    store: &QuoteStore,
    ids: &[String],
    pacing: &BatchPacing,
) -> BatchReport {
    let mut report = BatchReport::default();
    for (i, id) in ids.iter().enumerate() {
        match store.delete_quote(id).await {
            Ok(_) => report.record(i, id.clone(), ItemOutcome::Deleted),
            Err(e) => report.record(
                i,
                id.clone(),
                ItemOutcome::Failed {
                    message: e.to_string(),
                },
            ),
        }
        pacing.pause_after(i, ids.len()).await;
    }
    tracing::info!("bulk delete finished: {}", report.summary());
    report
}
