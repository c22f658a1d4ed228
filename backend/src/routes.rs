use std::sync::Arc;
use rocket::{State, delete, get, options, patch, post, put};
use rocket::serde::json::{self, Json};
use tracing::{debug, instrument, Span};
use shared::models::{RecordVoteRequest, RecordVoteResponse};
use shared::validation::validate_vote_request;
use crate::{
    error::ApiError,
    processor::VoteProcessor,
    store::VoteStore,
};

pub struct AppState {
    pub store: Arc<dyn VoteStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self { store }
    }
}

#[instrument(skip(state, request), fields(destination_id, voter_id))]
#[post("/record-vote", data = "<request>")]
pub async fn record_vote(
    state: &State<AppState>,
    request: Result<Json<RecordVoteRequest>, json::Error<'_>>,
) -> Result<Json<RecordVoteResponse>, ApiError> {
    let request = request.map_err(|e| {
        debug!("Rejected malformed vote body: {}", e);
        ApiError::InvalidRequest("Request body must be a JSON object with destinationId and voterId".into())
    })?;

    let key = validate_vote_request(&request)?;
    let span = Span::current();
    span.record("destination_id", key.destination_id.as_str());
    span.record("voter_id", key.voter_id.as_str());

    let outcome = VoteProcessor::record(state.store.as_ref(), &key).await?;
    Ok(Json(RecordVoteResponse::from_outcome(&key.destination_id, outcome)))
}

#[get("/record-vote")]
pub async fn record_vote_get() -> ApiError {
    ApiError::MethodNotAllowed
}

#[put("/record-vote")]
pub async fn record_vote_put() -> ApiError {
    ApiError::MethodNotAllowed
}

#[patch("/record-vote")]
pub async fn record_vote_patch() -> ApiError {
    ApiError::MethodNotAllowed
}

#[delete("/record-vote")]
pub async fn record_vote_delete() -> ApiError {
    ApiError::MethodNotAllowed
}

#[options("/record-vote")]
pub async fn record_vote_options() -> ApiError {
    ApiError::MethodNotAllowed
}
