use std::collections::HashMap;
use serde_json::{Map, Value};
use shared::models::*;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::processor::{VoteDecision, VoteProcessor};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Transaction conflict persisted after {0} attempts")]
    Conflict(u32),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Unexpected store response: {0}")]
    Protocol(String),
}

/// Transactional home of tallies and receipts.
///
/// `record_vote` must run the receipt check, the tally read and both writes
/// as one serializable unit: two calls for the same pair never both record,
/// and calls from different voters never lose an increment.
#[rocket::async_trait]
pub trait VoteStore: Send + Sync {
    async fn record_vote(&self, key: &VoteKey) -> Result<VoteOutcome, StoreError>;

    async fn tally(&self, destination_id: &str) -> Result<Option<VoteTally>, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    tallies: HashMap<String, Map<String, Value>>,
    receipts: HashMap<String, VoteReceipt>,
}

/// Process-local store. The whole transaction runs under one lock.
#[derive(Debug, Default)]
pub struct MemoryVoteStore {
    state: Mutex<MemoryState>,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the raw tally document for a destination.
    pub async fn seed_tally_document(&self, destination_id: &str, document: Map<String, Value>) {
        let mut state = self.state.lock().await;
        state.tallies.insert(destination_id.to_string(), document);
    }

    pub async fn tally_document(&self, destination_id: &str) -> Option<Map<String, Value>> {
        self.state.lock().await.tallies.get(destination_id).cloned()
    }

    pub async fn receipt(&self, voter_id: &str, destination_id: &str) -> Option<VoteReceipt> {
        self.state.lock().await.receipts.get(&receipt_id(voter_id, destination_id)).cloned()
    }

    pub async fn receipt_count(&self) -> usize {
        self.state.lock().await.receipts.len()
    }
}

/// Missing or null counts read as zero. Anything but an integer is corrupt.
fn tally_from_document(document: &Map<String, Value>) -> Result<VoteTally, StoreError> {
    let vote_count = match document.get(VOTE_COUNT_FIELD) {
        None | Some(Value::Null) => 0,
        Some(value) => value
            .as_i64()
            .ok_or_else(|| StoreError::Protocol(format!("{VOTE_COUNT_FIELD} is not an integer: {value}")))?,
    };
    Ok(VoteTally { vote_count })
}

#[rocket::async_trait]
impl VoteStore for MemoryVoteStore {
    async fn record_vote(&self, key: &VoteKey) -> Result<VoteOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let receipt_key = key.receipt_id();

        let receipt = state.receipts.get(&receipt_key);
        let tally = state.tallies.get(&key.destination_id).map(tally_from_document).transpose()?;

        match VoteProcessor::decide(receipt, tally)? {
            VoteDecision::AlreadyVoted { current_count } => {
                Ok(VoteOutcome::AlreadyVoted { current_count })
            }
            VoteDecision::Record { new_count } => {
                state
                    .tallies
                    .entry(key.destination_id.clone())
                    .or_default()
                    .insert(VOTE_COUNT_FIELD.into(), Value::from(new_count));
                state.receipts.insert(receipt_key, VoteReceipt {
                    voted_at: Some(OffsetDateTime::now_utc()),
                });
                Ok(VoteOutcome::Recorded { new_count })
            }
        }
    }

    async fn tally(&self, destination_id: &str) -> Result<Option<VoteTally>, StoreError> {
        let state = self.state.lock().await;
        state.tallies.get(destination_id).map(tally_from_document).transpose()
    }
}
