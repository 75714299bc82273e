//! JSON HTTP boundary over the repository.
//!
//! One resource path per entity. Creates answer 201 with the record, deletes
//! answer `{"success": true}`, failures answer the serialized [`RepoError`]
//! with the status of its category.
//!
//! [`RepoError`]: crate::error::RepoError

mod handlers;
mod server;

pub use server::{AppState, build_router, start_server};
