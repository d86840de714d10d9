use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
mod memory;
pub mod repo;
mod repo_types;
pub mod services;

pub use memory::MemorySnippetStore;
pub use repo::{PgSnippetStore, SnippetStore};

pub fn router() -> Router<AppState> {
    handlers::snippet_routes()
}
