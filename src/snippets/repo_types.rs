use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Snippet record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires: OffsetDateTime,
}

impl Snippet {
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires > now
    }
}
