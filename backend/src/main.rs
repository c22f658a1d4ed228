use std::sync::Arc;
use shuttle_runtime::CustomError;
use tracing::info;
use vote_recorder::{build_rocket, config::Credentials, firestore::FirestoreStore};

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting vote recorder");

    let credentials = Credentials::from_lookup(|key| {
        secret_store.get(key).or_else(|| std::env::var(key).ok())
    })
    .map_err(CustomError::new)?;

    let store = FirestoreStore::new(&credentials).map_err(CustomError::new)?;
    info!("📋 Vote store ready for project {}", credentials.project_id);

    Ok(build_rocket(Arc::new(store)).into())
}
