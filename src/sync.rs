//! Stock Sync
//!
//! Posts one stock-balance adjustment per expanded delta to the store's
//! deposit.

use std::sync::Arc;

use crate::bom::{expand, CatalogSource, Expansion, ExpansionStatus, StockDelta};
use crate::client::ApiClient;
use crate::core::HttpTransport;
use crate::error::SyncResult;
use crate::report::RawReport;
use crate::token::TokenManager;
use crate::types::StoreKey;

/// Stock adjustment operation: balance (sets the deposit quantity).
pub const BALANCE_OPERATION: &str = "B";

/// A delta that could not be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaFailure {
    pub sku: Option<String>,
    pub id: String,
    pub message: String,
}

/// Outcome of posting a delta list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Adjustments accepted by the API.
    pub posted: usize,
    /// Deltas without a SKU, not posted.
    pub skipped: usize,
    /// Deltas that failed.
    pub failures: Vec<DeltaFailure>,
}

impl SyncSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub expansion: Expansion,
    pub summary: SyncSummary,
}

impl SyncReport {
    pub fn status(&self) -> ExpansionStatus {
        self.expansion.status()
    }
}

/// Drives report expansion and stock adjustment for a store.
pub struct StockSynchronizer<T: HttpTransport, M: TokenManager, S: CatalogSource> {
    client: ApiClient<T, M>,
    catalog: Arc<S>,
}

impl<T, M, S> StockSynchronizer<T, M, S>
where
    T: HttpTransport,
    M: TokenManager,
    S: CatalogSource,
{
    pub fn new(client: ApiClient<T, M>, catalog: Arc<S>) -> Self {
        Self { client, catalog }
    }

    pub fn client(&self) -> &ApiClient<T, M> {
        &self.client
    }

    /// Load the catalog and expand a report without posting anything.
    pub async fn plan(&self, report: &RawReport) -> SyncResult<Expansion> {
        let catalog = self.catalog.load().await?;
        Ok(expand(report, &catalog))
    }

    /// Expand a report and post the resulting deltas for `store`.
    ///
    /// Nothing is posted when no report SKU matched the catalog or every
    /// matched product failed to parse.
    pub async fn run(&self, store: &StoreKey, report: &RawReport) -> SyncResult<SyncReport> {
        let expansion = self.plan(report).await?;

        let summary = match expansion.status() {
            ExpansionStatus::Ready => self.sync_deltas(store, &expansion.deltas).await?,
            ExpansionStatus::NoMatches => {
                tracing::warn!(store = %store, skus = report.len(), "No report SKU matched the catalog");
                SyncSummary::default()
            }
            ExpansionStatus::AllFailed => {
                tracing::warn!(
                    store = %store,
                    failed = expansion.failures.len(),
                    "Every matched product had a malformed structure"
                );
                SyncSummary::default()
            }
        };

        Ok(SyncReport { expansion, summary })
    }

    /// Post one adjustment per delta, in order.
    ///
    /// Deltas without a SKU are skipped. A failing delta is recorded and the
    /// run continues.
    pub async fn sync_deltas(
        &self,
        store: &StoreKey,
        deltas: &[StockDelta],
    ) -> SyncResult<SyncSummary> {
        let config = self.client.config();
        let deposit_id = config.store(store)?.deposit_id;
        let url = config.stock_endpoint();
        let mut summary = SyncSummary::default();

        for delta in deltas {
            if delta.sku.is_none() {
                tracing::debug!(store = %store, id = %delta.id, "Skipping delta without SKU");
                summary.skipped += 1;
                continue;
            }

            let product_id = match delta.id.trim().parse::<u64>() {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!(store = %store, id = %delta.id, "Skipping delta with non-numeric product id");
                    summary.failures.push(failure(delta, "non-numeric product id".to_string()));
                    continue;
                }
            };

            let body = stock_adjustment_body(deposit_id, product_id, delta.qtd, &config.adjustment_note);

            match self.client.post(&url, &body, store).await {
                Ok(_) => {
                    tracing::debug!(
                        store = %store,
                        sku = delta.sku.as_deref().unwrap_or_default(),
                        quantity = delta.qtd,
                        "Posted stock adjustment"
                    );
                    summary.posted += 1;
                }
                Err(e) => summary.failures.push(failure(delta, e.to_string())),
            }
        }

        tracing::info!(
            store = %store,
            posted = summary.posted,
            skipped = summary.skipped,
            failed = summary.failed(),
            "Stock sync finished"
        );
        Ok(summary)
    }
}

fn failure(delta: &StockDelta, message: String) -> DeltaFailure {
    DeltaFailure {
        sku: delta.sku.clone(),
        id: delta.id.clone(),
        message,
    }
}

/// Request body of a stock balance adjustment.
pub fn stock_adjustment_body(
    deposit_id: u64,
    product_id: u64,
    quantity: u64,
    note: &str,
) -> serde_json::Value {
    serde_json::json!({
        "deposito": { "id": deposit_id },
        "operacao": BALANCE_OPERATION,
        "produto": { "id": product_id },
        "quantidade": quantity as f64,
        "preco": 0.0,
        "custo": 0.0,
        "observacoes": note,
    })
}
