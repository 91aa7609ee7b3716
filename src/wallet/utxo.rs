//! UTXO Analysis
//!
//! Summarizes an address's unspent outputs and splits them into
//! consolidation batches. Listings are cached per address for a short TTL.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::address_validation::require_valid_address;
use crate::chain::{MAX_BATCH_SIZE, TOP_UTXO_COUNT};
use crate::error::{LanaError, LanaResult};
use crate::node::NodeClient;
use crate::types::{checked_total, Utxo};
use crate::utils::{Cache, Clock, SystemClock};
use crate::{log_debug, log_info};

// =============================================================================
// Types
// =============================================================================

/// Totals and the largest outputs for one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoAnalysis {
    pub total_count: usize,
    pub total_value: u64,
    pub top_utxos: Vec<Utxo>,
    pub dust_count: usize,
    pub dust_value: u64,
    pub non_dust_count: usize,
    pub non_dust_value: u64,
}

/// Lifecycle of a consolidation batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Completed { txid: String },
    Failed { reason: String },
}

/// Up to `MAX_BATCH_SIZE` outputs spent together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub index: usize,
    pub utxos: Vec<Utxo>,
    pub total_value: u64,
    pub dust_count: usize,
    pub status: BatchStatus,
}

impl Batch {
    fn new(index: usize, utxos: Vec<Utxo>) -> LanaResult<Self> {
        let total_value = values_total(&utxos)?;
        let dust_count = utxos.iter().filter(|u| u.is_dust()).count();
        Ok(Self {
            index,
            utxos,
            total_value,
            dust_count,
            status: BatchStatus::Pending,
        })
    }

    /// Pending and failed batches may be (re)submitted
    pub fn is_retryable(&self) -> bool {
        !self.is_completed()
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, BatchStatus::Completed { .. })
    }

    pub fn mark_completed(&mut self, txid: impl Into<String>) -> LanaResult<()> {
        if self.is_completed() {
            return Err(LanaError::invalid_input(format!(
                "Batch {} is already completed",
                self.index
            )));
        }
        self.status = BatchStatus::Completed { txid: txid.into() };
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> LanaResult<()> {
        if self.is_completed() {
            return Err(LanaError::invalid_input(format!(
                "Batch {} is already completed",
                self.index
            )));
        }
        self.status = BatchStatus::Failed {
            reason: reason.into(),
        };
        Ok(())
    }
}

/// Result of analyzing an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// The address has no unspent outputs
    Empty { address: String },
    Analyzed {
        analysis: UtxoAnalysis,
        batches: Vec<Batch>,
    },
}

// =============================================================================
// Pure functions
// =============================================================================

/// Largest value first; ties broken by higher block, then outpoint
fn by_value_desc(a: &Utxo, b: &Utxo) -> Ordering {
    b.value_lanoshi
        .cmp(&a.value_lanoshi)
        .then_with(|| b.block_height.cmp(&a.block_height))
        .then_with(|| a.tx_hash.cmp(&b.tx_hash))
        .then_with(|| a.output_index.cmp(&b.output_index))
}

/// Values as listed by a node; a listing whose total overflows is malformed
fn values_total<'a, I>(utxos: I) -> LanaResult<u64>
where
    I: IntoIterator<Item = &'a Utxo>,
{
    checked_total(utxos.into_iter().map(|u| u.value_lanoshi))
        .ok_or_else(|| LanaError::protocol_error("Output values overflow a 64-bit total"))
}

pub fn summarize(utxos: &[Utxo]) -> LanaResult<UtxoAnalysis> {
    let total_value = values_total(utxos)?;
    let (dust, non_dust): (Vec<&Utxo>, Vec<&Utxo>) = utxos.iter().partition(|u| u.is_dust());

    let mut sorted: Vec<Utxo> = utxos.to_vec();
    sorted.sort_by(by_value_desc);
    sorted.truncate(TOP_UTXO_COUNT);

    Ok(UtxoAnalysis {
        total_count: utxos.len(),
        total_value,
        top_utxos: sorted,
        dust_count: dust.len(),
        dust_value: values_total(dust)?,
        non_dust_count: non_dust.len(),
        non_dust_value: values_total(non_dust)?,
    })
}

/// Shuffle, then cut into batches of at most `MAX_BATCH_SIZE`.
///
/// Every output lands in exactly one batch.
pub fn partition_into_batches<R: Rng + ?Sized>(
    utxos: &[Utxo],
    rng: &mut R,
) -> LanaResult<Vec<Batch>> {
    let mut shuffled = utxos.to_vec();
    shuffled.shuffle(rng);
    shuffled
        .chunks(MAX_BATCH_SIZE)
        .enumerate()
        .map(|(index, chunk)| Batch::new(index, chunk.to_vec()))
        .collect()
}

/// Largest outputs first until `target` is covered, at most `MAX_BATCH_SIZE`.
///
/// `fee_for` receives the input count under consideration. Returns `None`
/// when the cap is reached or the outputs run out first.
pub fn select_largest_first<F>(utxos: &[Utxo], target: u64, fee_for: F) -> Option<(Vec<Utxo>, u64)>
where
    F: Fn(usize) -> u64,
{
    let mut sorted = utxos.to_vec();
    sorted.sort_by(by_value_desc);

    let mut selected = Vec::new();
    let mut total: u64 = 0;
    for utxo in sorted.into_iter().take(MAX_BATCH_SIZE) {
        total = total.saturating_add(utxo.value_lanoshi);
        selected.push(utxo);
        let fee = fee_for(selected.len());
        if total >= target.saturating_add(fee) {
            return Some((selected, fee));
        }
    }
    None
}

// =============================================================================
// Analyzer
// =============================================================================

/// Lists and analyzes unspent outputs through a node client
pub struct UtxoAnalyzer {
    client: Arc<NodeClient>,
    cache: Mutex<Cache<Vec<Utxo>>>,
}

impl UtxoAnalyzer {
    pub fn new(client: Arc<NodeClient>) -> Self {
        Self::with_clock(client, Arc::new(SystemClock))
    }

    pub fn with_clock(client: Arc<NodeClient>, clock: Arc<dyn Clock>) -> Self {
        let config = client.config();
        let cache = Cache::with_clock(
            Duration::from_secs(config.utxo_cache_ttl_secs),
            config.utxo_cache_capacity,
            clock,
        );
        Self {
            client,
            cache: Mutex::new(cache),
        }
    }

    pub fn client(&self) -> &NodeClient {
        &self.client
    }

    /// Unspent outputs for `address`, served from cache when fresh
    pub async fn list_unspent(&self, address: &str) -> LanaResult<Vec<Utxo>> {
        if let Some(cached) = self.cached(address)? {
            log_debug!(
                "utxo",
                "Listing served from cache",
                address = address,
                count = cached.len(),
            );
            return Ok(cached);
        }

        let utxos = self.client.list_unspent(address).await?;
        self.cache
            .lock()
            .map_err(|_| LanaError::internal("UTXO cache lock poisoned"))?
            .set(address.to_string(), utxos.clone());
        Ok(utxos)
    }

    pub async fn analyze(&self, address: &str) -> LanaResult<AnalysisOutcome> {
        let address = require_valid_address(address)?;
        let utxos = self.list_unspent(&address).await?;

        if utxos.is_empty() {
            log_info!("utxo", "No unspent outputs", address = address);
            return Ok(AnalysisOutcome::Empty { address });
        }

        let analysis = summarize(&utxos)?;
        let batches = partition_into_batches(&utxos, &mut rand::thread_rng())?;
        log_info!(
            "utxo",
            "Address analyzed",
            address = address,
            outputs = analysis.total_count,
            dust = analysis.dust_count,
            batches = batches.len(),
        );
        Ok(AnalysisOutcome::Analyzed { analysis, batches })
    }

    fn cached(&self, address: &str) -> LanaResult<Option<Vec<Utxo>>> {
        let cache = self
            .cache
            .lock()
            .map_err(|_| LanaError::internal("UTXO cache lock poisoned"))?;
        Ok(cache.get(address))
    }
}
