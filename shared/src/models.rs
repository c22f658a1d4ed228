use serde::{Serialize, Deserialize};
use time::OffsetDateTime;

pub const TALLY_COLLECTION: &str = "destinationVotes";
pub const RECEIPT_COLLECTION: &str = "userVotes";
pub const VOTE_COUNT_FIELD: &str = "voteCount";
pub const VOTED_AT_FIELD: &str = "votedAt";
pub const ALREADY_VOTED_MESSAGE: &str = "Already voted";

/// Raw request body. Both fields are optional here so that a missing field
/// surfaces as a validation error instead of a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordVoteRequest {
    #[serde(default)]
    pub destination_id: Option<String>,
    #[serde(default)]
    pub voter_id: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteKey {
    pub destination_id: String,
    pub voter_id: String,
}

impl VoteKey {
    pub fn receipt_id(&self) -> String {
        receipt_id(&self.voter_id, &self.destination_id)
    }
}

/// Document id of the receipt for a voter/destination pair.
///
/// `%` and `_` in the voter id are percent-escaped, so the first `_` in the
/// id is always the separator and distinct pairs never share a receipt.
pub fn receipt_id(voter_id: &str, destination_id: &str) -> String {
    let mut id = String::with_capacity(voter_id.len() + destination_id.len() + 1);
    for c in voter_id.chars() {
        match c {
            '%' => id.push_str("%25"),
            '_' => id.push_str("%5F"),
            _ => id.push(c),
        }
    }
    id.push('_');
    id.push_str(destination_id);
    id
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub vote_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub voted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded { new_count: i64 },
    AlreadyVoted { current_count: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RecordVoteResponse {
    #[serde(rename_all = "camelCase")]
    Recorded {
        success: bool,
        message: String,
        new_count: i64,
    },
    #[serde(rename_all = "camelCase")]
    AlreadyVoted {
        success: bool,
        message: String,
        current_count: i64,
    },
}

impl RecordVoteResponse {
    pub fn from_outcome(destination_id: &str, outcome: VoteOutcome) -> Self {
        match outcome {
            VoteOutcome::Recorded { new_count } => RecordVoteResponse::Recorded {
                success: true,
                message: format!("Vote recorded for {}", destination_id),
                new_count,
            },
            VoteOutcome::AlreadyVoted { current_count } => RecordVoteResponse::AlreadyVoted {
                success: false,
                message: ALREADY_VOTED_MESSAGE.into(),
                current_count,
            },
        }
    }
}
