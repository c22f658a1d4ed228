use crate::models::{RecordVoteRequest, VoteKey};

/// A fully escaped voter id (3 bytes per character) plus `_` plus the
/// destination id stays under the store's 1500 byte document id limit.
pub const MAX_ID_LENGTH: usize = 374;

pub const MISSING_FIELDS_MESSAGE: &str = "Missing destinationId or voterId";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{}", MISSING_FIELDS_MESSAGE)]
    MissingField,
    #[error("{0} exceeds maximum length of {MAX_ID_LENGTH} bytes")]
    IdTooLong(&'static str),
    #[error("{0} must not contain '/'")]
    ContainsSlash(&'static str),
    #[error("{0} is a reserved identifier")]
    ReservedId(&'static str),
}

pub fn validate_vote_request(request: &RecordVoteRequest) -> Result<VoteKey, ValidationError> {
    let (Some(destination_id), Some(voter_id)) = (
        request.destination_id.as_deref().filter(|id| !id.is_empty()),
        request.voter_id.as_deref().filter(|id| !id.is_empty()),
    ) else {
        return Err(ValidationError::MissingField);
    };

    validate_id("destinationId", destination_id)?;
    validate_id("voterId", voter_id)?;

    Ok(VoteKey {
        destination_id: destination_id.to_string(),
        voter_id: voter_id.to_string(),
    })
}

fn validate_id(field: &'static str, id: &str) -> Result<(), ValidationError> {
    if id.len() > MAX_ID_LENGTH { return Err(ValidationError::IdTooLong(field)); }
    if id.contains('/') { return Err(ValidationError::ContainsSlash(field)); }
    if id == "." || id == ".." || (id.len() >= 4 && id.starts_with("__") && id.ends_with("__")) {
        return Err(ValidationError::ReservedId(field));
    }
    Ok(())
}
