use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use blocktree::{BlockHash, BlockHeader, ChainError, CompactTarget, Hash256, InsertionOutcome};

use crate::state::SharedState;

/// Request body for `POST /headers`.
///
/// Carries an already-parsed block header. Hashes are passed in display
/// order (byte-reversed hex, the form explorers and RPC interfaces use);
/// `bits` is the raw 32-bit compact target.
#[derive(Debug, Deserialize)]
pub struct SubmitHeaderRequest {
    /// Block version signalled by the miner.
    pub version: i32,
    /// Display-order hex hash of the parent block.
    pub previous_block_hash: String,
    /// Display-order hex merkle root.
    pub merkle_root: String,
    /// Block timestamp, seconds since Unix epoch.
    pub timestamp: u32,
    /// Raw compact difficulty target.
    pub bits: u32,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

/// Response body for `POST /headers`.
#[derive(Debug, Serialize)]
pub struct SubmitHeaderResponse {
    /// `"chained"`, `"orphaned"`, or `"duplicate"`.
    pub outcome: &'static str,
    /// Display-order hex hash of the submitted header.
    pub hash: String,
    /// Height of the new chain row, when the header chained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    /// Accumulator of the new chain row, when the header chained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative_log_difficulty: Option<f64>,
}

impl SubmitHeaderRequest {
    fn into_header(self) -> Result<BlockHeader, (StatusCode, String)> {
        let previous_block_hash =
            BlockHash::from_display_hex(&self.previous_block_hash).map_err(as_bad_request)?;
        let merkle_root = Hash256::from_display_hex(&self.merkle_root).map_err(as_bad_request)?;

        Ok(BlockHeader {
            version: self.version,
            previous_block_hash,
            merkle_root,
            timestamp: self.timestamp,
            bits: CompactTarget(self.bits),
            nonce: self.nonce,
        })
    }
}

/// `POST /headers`
///
/// Feeds one header through the acceptance pipeline and reports the
/// terminal classification. A malformed difficulty target is a 400; a
/// storage fault is a 500, and callers should not treat the header as
/// acknowledged in that case.
pub async fn submit_header(
    State(state): State<SharedState>,
    Json(body): Json<SubmitHeaderRequest>,
) -> Result<(StatusCode, Json<SubmitHeaderResponse>), (StatusCode, String)> {
    let header = body.into_header()?;
    let hash = header.compute_hash();

    let start = std::time::Instant::now();
    let outcome = {
        let mut tree = state.tree.lock().await;

        let outcome = tree.accept(&header).map_err(|e| match e {
            ChainError::InvalidTarget(_) => (StatusCode::BAD_REQUEST, e.to_string()),
            ChainError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

        // Refresh the gauges while we still hold the lock.
        if let Ok(Some(tip)) = tree.best_tip() {
            state.metrics.accept.best_tip_height.set(tip.height as i64);
        }
        if let Ok(pooled) = tree.orphan_count() {
            state.metrics.accept.orphan_pool_size.set(pooled as i64);
        }
        outcome
    };

    state.metrics.accept.accept_seconds.observe(start.elapsed().as_secs_f64());
    state.metrics.accept.record_outcome(&outcome);

    let response = match &outcome {
        InsertionOutcome::Chained { block, promoted_orphans } => {
            tracing::info!(
                height = block.height,
                hash = %hash.to_display_hex(),
                promoted_orphans,
                "chained header"
            );
            SubmitHeaderResponse {
                outcome: "chained",
                hash: hash.to_display_hex(),
                height: Some(block.height),
                cumulative_log_difficulty: Some(block.cumulative_log_difficulty),
            }
        }
        InsertionOutcome::Orphaned(orphan) => {
            tracing::info!(
                parent = %orphan.previous_block_hash.to_display_hex(),
                hash = %hash.to_display_hex(),
                "buffered orphan header"
            );
            SubmitHeaderResponse {
                outcome: "orphaned",
                hash: hash.to_display_hex(),
                height: None,
                cumulative_log_difficulty: None,
            }
        }
        InsertionOutcome::Duplicate => SubmitHeaderResponse {
            outcome: "duplicate",
            hash: hash.to_display_hex(),
            height: None,
            cumulative_log_difficulty: None,
        },
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

fn as_bad_request(msg: &'static str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.to_string())
}
