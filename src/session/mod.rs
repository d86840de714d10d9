//! Session authority, CSRF guard and the access policy composed from them.

mod authority;
mod context;
mod csrf;
mod memory;
mod middleware;
mod policy;
mod store;
mod token;

pub use authority::SessionAuthority;
pub use context::PageContext;
pub use csrf::CsrfGuard;
pub use memory::MemorySessionStore;
pub use middleware::{session_layer, Session, SESSION_COOKIE_NAME};
pub use policy::{AccessError, AccessPolicy, RouteClass};
pub use store::{PgSessionStore, SessionStore};
