use serde::{Deserialize, Serialize};

use crate::session::PageContext;
use crate::snippets::repo_types::Snippet;

/// Form body for a new snippet. `expires` is a day count kept as text so a
/// bad value is reported as a field error rather than a rejected body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateSnippetForm {
    pub title: String,
    pub content: String,
    pub expires: String,
    pub csrf_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SnippetValues {
    pub title: String,
    pub content: String,
    pub expires: String,
}

impl Default for SnippetValues {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: "365".into(),
        }
    }
}

impl CreateSnippetForm {
    pub fn values(&self) -> SnippetValues {
        SnippetValues {
            title: self.title.clone(),
            content: self.content.clone(),
            expires: self.expires.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub page: PageContext,
    pub snippets: Vec<Snippet>,
}

#[derive(Debug, Serialize)]
pub struct SnippetPage {
    pub page: PageContext,
    pub snippet: Snippet,
}
