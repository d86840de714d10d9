use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Serialized into the `sessions.data` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub csrf_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_after_login: Option<String>,
}

impl SessionData {
    pub fn new(user_id: Option<i64>, csrf_token: String) -> Self {
        Self {
            user_id,
            csrf_token,
            flash: None,
            redirect_after_login: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub data: SessionData,
    pub expires_at: OffsetDateTime,
}

/// How the current request came by its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// The presented token matched a live session.
    Resumed,
    /// No token was presented.
    Started,
    /// A token was presented but is unknown or expired.
    Expired,
}

/// What a UI layer needs to render any page.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub is_authenticated: bool,
    pub csrf_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<String>,
}

/// The session as seen by one request.
#[derive(Debug)]
pub struct SessionContext {
    token: String,
    record: SessionRecord,
    origin: SessionOrigin,
    persisted: bool,
    dirty: bool,
}

impl SessionContext {
    pub(super) fn new(token: String, record: SessionRecord, origin: SessionOrigin, persisted: bool) -> Self {
        Self {
            token,
            record,
            origin,
            persisted,
            dirty: false,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn expires_at(&self) -> OffsetDateTime {
        self.record.expires_at
    }

    pub fn current_user_id(&self) -> Option<i64> {
        self.record.data.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.record.data.user_id.is_some()
    }

    pub fn csrf_token(&self) -> &str {
        &self.record.data.csrf_token
    }

    pub fn set_flash(&mut self, message: impl Into<String>) {
        self.record.data.flash = Some(message.into());
        self.dirty = true;
    }

    /// Remembers where to send the client after it logs in.
    pub fn remember_path(&mut self, path: &str) {
        if path.starts_with('/') && !path.starts_with("//") {
            self.record.data.redirect_after_login = Some(path.to_string());
            self.dirty = true;
        }
    }

    pub fn take_redirect(&mut self) -> Option<String> {
        let path = self.record.data.redirect_after_login.take();
        if path.is_some() {
            self.dirty = true;
        }
        path
    }

    /// Pops the flash message. A page hands out the CSRF token, so an
    /// unsaved session is marked for saving.
    pub fn page(&mut self) -> PageContext {
        let flash = self.record.data.flash.take();
        if flash.is_some() || !self.persisted {
            self.dirty = true;
        }
        PageContext {
            is_authenticated: self.is_authenticated(),
            csrf_token: self.record.data.csrf_token.clone(),
            flash,
        }
    }

    /// Drops the user for this request only; see the session layer.
    pub(crate) fn forget_user(&mut self) {
        self.record.data.user_id = None;
    }

    pub(super) fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub(super) fn mark_persisted(&mut self) {
        self.persisted = true;
        self.dirty = false;
    }

    /// Swaps in a renewed session.
    pub(super) fn replace(&mut self, token: String, record: SessionRecord) {
        self.token = token;
        self.record = record;
        self.origin = SessionOrigin::Resumed;
        self.persisted = true;
        self.dirty = false;
    }
}
