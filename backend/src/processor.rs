use shared::models::{VoteKey, VoteOutcome, VoteReceipt, VoteTally};
use tracing::{debug, error, info};

use crate::error::ApiError;
use crate::store::{StoreError, VoteStore};

/// What a transaction should do once both documents have been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDecision {
    AlreadyVoted { current_count: i64 },
    Record { new_count: i64 },
}

pub struct VoteProcessor;

impl VoteProcessor {
    /// A receipt means the vote was already counted: nothing is written.
    /// Otherwise the tally (absent counts as zero) goes up by one.
    ///
    /// A negative stored count, or one that cannot be incremented, is corrupt
    /// data and fails the transaction.
    pub fn decide(
        receipt: Option<&VoteReceipt>,
        tally: Option<VoteTally>,
    ) -> Result<VoteDecision, StoreError> {
        let count = tally.map(|t| t.vote_count).unwrap_or(0);
        if count < 0 {
            return Err(StoreError::Protocol(format!("negative vote count {count}")));
        }
        match receipt {
            Some(_) => Ok(VoteDecision::AlreadyVoted { current_count: count }),
            None => count
                .checked_add(1)
                .map(|new_count| VoteDecision::Record { new_count })
                .ok_or_else(|| StoreError::Protocol(format!("vote count {count} cannot be incremented"))),
        }
    }

    pub async fn record(store: &dyn VoteStore, key: &VoteKey) -> Result<VoteOutcome, ApiError> {
        let outcome = store.record_vote(key).await.map_err(|e| {
            error!(error = %e, "Vote transaction failed");
            ApiError::from(e)
        })?;

        match outcome {
            VoteOutcome::Recorded { new_count } => info!(new_count, "🗳️ Vote recorded"),
            VoteOutcome::AlreadyVoted { current_count } => debug!(current_count, "Already voted"),
        }

        Ok(outcome)
    }
}
