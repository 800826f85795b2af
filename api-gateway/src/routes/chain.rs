use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use blocktree::{BlockHash, ChainBlock};

use crate::state::SharedState;

/// JSON projection of a stored chain block.
#[derive(Debug, Serialize)]
pub struct ChainBlockDto {
    /// Display-order hex hash.
    pub hash: String,
    pub height: u64,
    pub cumulative_log_difficulty: f64,
}

impl From<ChainBlock> for ChainBlockDto {
    fn from(block: ChainBlock) -> Self {
        ChainBlockDto {
            hash: block.hash.to_display_hex(),
            height: block.height,
            cumulative_log_difficulty: block.cumulative_log_difficulty,
        }
    }
}

/// `GET /chain/tip`
///
/// Returns the current best tip: greatest height, tie-broken by
/// greatest cumulative log-difficulty. Recomputed per request.
pub async fn best_tip(
    State(state): State<SharedState>,
) -> Result<Json<ChainBlockDto>, (StatusCode, String)> {
    let tree = state.tree.lock().await;
    match tree.best_tip() {
        Ok(Some(tip)) => Ok(Json(tip.into())),
        // Cannot happen once genesis is seeded, but surface it honestly.
        Ok(None) => Err((StatusCode::NOT_FOUND, "chain store is empty".to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// `GET /chain/blocks/{hash}`
///
/// Point lookup by display-order hex hash; 404 when the hash is not a
/// stored chain block.
pub async fn block_by_hash(
    State(state): State<SharedState>,
    Path(hash_hex): Path<String>,
) -> Result<Json<ChainBlockDto>, (StatusCode, String)> {
    let hash = BlockHash::from_display_hex(&hash_hex)
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg.to_string()))?;

    let tree = state.tree.lock().await;
    match tree.block(&hash) {
        Ok(Some(block)) => Ok(Json(block.into())),
        Ok(None) => Err((StatusCode::NOT_FOUND, "unknown block hash".to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
