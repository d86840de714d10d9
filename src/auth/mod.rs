use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
mod memory;
mod password;
pub mod repo;
pub(crate) mod repo_types;
pub mod services;
pub(crate) mod extractors;

pub use memory::MemoryUserStore;
pub use repo::{PgUserStore, UserStore};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::user_routes())
        .merge(handlers::account_routes())
}
