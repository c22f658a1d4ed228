pub mod auth;
pub mod wire;


use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use serde_json::Map;
use shared::models::*;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::config::{ConfigError, Credentials};
use crate::processor::{VoteDecision, VoteProcessor};
use crate::store::{StoreError, VoteStore};
use auth::{AccessTokens, ServiceAccountSigner, DEFAULT_TOKEN_URI};
use wire::*;

pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";
pub const MAX_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of a single REST call inside a transaction attempt.
#[derive(Debug)]
enum CallError {
    /// The server aborted the transaction because of contention.
    Aborted(String),
    Store(StoreError),
}

impl From<StoreError> for CallError {
    fn from(e: StoreError) -> Self {
        CallError::Store(e)
    }
}

pub struct FirestoreStore {
    http: reqwest::Client,
    tokens: AccessTokens,
    documents_url: String,
    documents_path: String,
}

impl FirestoreStore {
    pub fn new(credentials: &Credentials) -> Result<Self, ConfigError> {
        Self::with_endpoints(credentials, DEFAULT_FIRESTORE_URL, DEFAULT_TOKEN_URI)
    }

    pub fn with_endpoints(
        credentials: &Credentials,
        firestore_url: &str,
        token_uri: &str,
    ) -> Result<Self, ConfigError> {
        let signer = ServiceAccountSigner::new(credentials)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let documents_path = format!(
            "projects/{}/databases/(default)/documents",
            credentials.project_id
        );

        Ok(Self {
            http,
            tokens: AccessTokens::new(signer, token_uri),
            documents_url: format!("{}/v1/{}", firestore_url.trim_end_matches('/'), documents_path),
            documents_path,
        })
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_path, collection, id)
    }

    async fn call<B, R>(&self, token: &str, method: &str, body: &B) -> Result<R, CallError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}:{}", self.documents_url, method);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("{method}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<R>()
                .await
                .map_err(|e| StoreError::Protocol(format!("{method}: {e}")).into());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(method, status, &body))
    }

    async fn begin_transaction(&self, token: &str, retry_from: Option<String>) -> Result<String, CallError> {
        let request = BeginTransactionRequest {
            options: TransactionOptions {
                read_write: ReadWrite { retry_transaction: retry_from },
            },
        };
        let response: BeginTransactionResponse = self.call(token, "beginTransaction", &request).await?;
        Ok(response.transaction)
    }

    async fn batch_get(
        &self,
        token: &str,
        names: &[&str],
        transaction: Option<&str>,
    ) -> Result<HashMap<String, Document>, CallError> {
        let request = BatchGetRequest {
            documents: names.to_vec(),
            transaction,
        };
        let items: Vec<BatchGetItem> = self.call(token, "batchGet", &request).await?;

        Ok(items
            .into_iter()
            .filter_map(|item| item.found)
            .map(|doc| (doc.name.clone(), doc))
            .collect())
    }

    async fn commit(&self, token: &str, transaction: &str, writes: Vec<Write>) -> Result<(), CallError> {
        let request = CommitRequest { writes, transaction };
        let _: IgnoredAny = self.call(token, "commit", &request).await?;
        Ok(())
    }

    async fn rollback(&self, token: &str, transaction: &str) {
        let request = RollbackRequest { transaction };
        if let Err(e) = self.call::<_, IgnoredAny>(token, "rollback", &request).await {
            warn!("Failed to roll back transaction: {:?}", e);
        }
    }

    fn tally_write(&self, key: &VoteKey, new_count: i64) -> Write {
        let mut fields = Map::new();
        fields.insert(VOTE_COUNT_FIELD.into(), integer_value(new_count));

        Write {
            update: WriteDocument {
                name: self.document_name(TALLY_COLLECTION, &key.destination_id),
                fields,
            },
            update_mask: Some(DocumentMask {
                field_paths: vec![VOTE_COUNT_FIELD.into()],
            }),
            update_transforms: Vec::new(),
            current_document: None,
        }
    }

    fn receipt_write(&self, key: &VoteKey) -> Write {
        let mut fields = Map::new();
        fields.insert("voterId".into(), string_value(&key.voter_id));
        fields.insert("destinationId".into(), string_value(&key.destination_id));

        Write {
            update: WriteDocument {
                name: self.document_name(RECEIPT_COLLECTION, &key.receipt_id()),
                fields,
            },
            update_mask: None,
            update_transforms: vec![FieldTransform {
                field_path: VOTED_AT_FIELD.into(),
                set_to_server_value: "REQUEST_TIME",
            }],
            current_document: Some(Precondition { exists: false }),
        }
    }

    /// Reads both documents, decides, and commits inside `transaction`.
    async fn read_decide_commit(
        &self,
        token: &str,
        transaction: &str,
        key: &VoteKey,
    ) -> Result<VoteOutcome, CallError> {
        let receipt_name = self.document_name(RECEIPT_COLLECTION, &key.receipt_id());
        let tally_name = self.document_name(TALLY_COLLECTION, &key.destination_id);

        let documents = self
            .batch_get(token, &[receipt_name.as_str(), tally_name.as_str()], Some(transaction))
            .await?;

        let receipt = documents.get(&receipt_name).map(|doc| VoteReceipt {
            voted_at: doc.timestamp(VOTED_AT_FIELD),
        });
        let tally = match documents.get(&tally_name) {
            Some(doc) => Some(VoteTally {
                vote_count: doc
                    .integer(VOTE_COUNT_FIELD)
                    .map_err(StoreError::Protocol)?
                    .unwrap_or(0),
            }),
            None => None,
        };

        match VoteProcessor::decide(receipt.as_ref(), tally)? {
            VoteDecision::AlreadyVoted { current_count } => {
                self.commit(token, transaction, Vec::new()).await?;
                Ok(VoteOutcome::AlreadyVoted { current_count })
            }
            VoteDecision::Record { new_count } => {
                let writes = vec![self.tally_write(key, new_count), self.receipt_write(key)];
                self.commit(token, transaction, writes).await?;
                Ok(VoteOutcome::Recorded { new_count })
            }
        }
    }
}

fn classify_failure(method: &str, status: StatusCode, body: &str) -> CallError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error)
        .unwrap_or_default();
    let message = if detail.message.is_empty() { body.to_string() } else { detail.message };

    if detail.status == "ABORTED" || (status == StatusCode::CONFLICT && detail.status.is_empty()) {
        return CallError::Aborted(message);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CallError::Store(StoreError::Unavailable(format!("{method} rejected credentials: {message}")))
        }
        _ => CallError::Store(StoreError::Transport(format!("{method} returned {status}: {message}"))),
    }
}

#[rocket::async_trait]
impl VoteStore for FirestoreStore {
    #[instrument(skip(self, key), fields(destination_id = %key.destination_id))]
    async fn record_vote(&self, key: &VoteKey) -> Result<VoteOutcome, StoreError> {
        let mut retry_from = None;
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 1..=MAX_ATTEMPTS {
            let token = self.tokens.access_token(&self.http).await?;
            debug!(attempt, "Beginning vote transaction");

            let transaction = match self.begin_transaction(&token, retry_from.take()).await {
                Ok(transaction) => transaction,
                Err(CallError::Aborted(message)) => {
                    return Err(StoreError::Transport(format!("beginTransaction aborted: {message}")));
                }
                Err(CallError::Store(e)) => return Err(e),
            };

            match self.read_decide_commit(&token, &transaction, key).await {
                Ok(outcome) => return Ok(outcome),
                Err(CallError::Aborted(message)) => {
                    warn!(attempt, "Vote transaction aborted: {}", message);
                    retry_from = Some(transaction);
                    if attempt < MAX_ATTEMPTS {
                        sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
                Err(CallError::Store(e)) => {
                    self.rollback(&token, &transaction).await;
                    return Err(e);
                }
            }
        }

        Err(StoreError::Conflict(MAX_ATTEMPTS))
    }

    async fn tally(&self, destination_id: &str) -> Result<Option<VoteTally>, StoreError> {
        let token = self.tokens.access_token(&self.http).await?;
        let name = self.document_name(TALLY_COLLECTION, destination_id);

        let documents = self.batch_get(&token, &[name.as_str()], None).await.map_err(|e| match e {
            CallError::Aborted(message) => StoreError::Transport(message),
            CallError::Store(e) => e,
        })?;

        documents
            .get(&name)
            .map(|doc| {
                doc.integer(VOTE_COUNT_FIELD)
                    .map(|count| VoteTally { vote_count: count.unwrap_or(0) })
                    .map_err(StoreError::Protocol)
            })
            .transpose()
    }
}
