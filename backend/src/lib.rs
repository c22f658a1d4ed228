pub mod catchers;
pub mod config;
pub mod cors;
pub mod error;
pub mod firestore;
pub mod processor;
pub mod routes;
pub mod store;

use std::sync::Arc;
use rocket::{Build, Rocket, catchers, routes};

use crate::catchers::{bad_request, internal_error, not_found};
use crate::cors::CORS;
use crate::routes::{
    record_vote, record_vote_delete, record_vote_get, record_vote_options, record_vote_patch,
    record_vote_put, AppState,
};
use crate::store::VoteStore;

pub use shared::{models::*, error::*, validation::*};

/// Assembles the service around an already constructed store.
pub fn build_rocket(store: Arc<dyn VoteStore>) -> Rocket<Build> {
    rocket::build()
        .attach(CORS)
        .manage(AppState::new(store))
        .mount(
            "/api",
            routes![
                record_vote,
                record_vote_get,
                record_vote_put,
                record_vote_patch,
                record_vote_delete,
                record_vote_options
            ],
        )
        .register("/", catchers![bad_request, not_found, internal_error])
}
