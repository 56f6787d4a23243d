//! Request and response shapes of the admin surface.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::model::{DocumentStatus, Insight, UploadedDocument};
use crate::content::validate::{
    check_display_order, check_filename, check_required_text, check_url, ValidationErrors,
    MAX_DESCRIPTION_LEN, MAX_TITLE_LEN,
};

/// One line of the content editor: an expected section, saved or not, or a
/// stored section outside the expected list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRow {
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Stored text, empty when the section was never saved.
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub saved: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentUpdate {
    pub text: String,
}

/// Insight metadata as submitted by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InsightInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub document_filename: Option<String>,
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub is_active: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl InsightInput {
    /// Trim text and turn blank optional fields into `None`.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            image_url: non_empty(self.image_url),
            document_filename: non_empty(self.document_filename),
            document_url: non_empty(self.document_url),
            display_order: self.display_order,
            is_active: self.is_active,
        }
    }

    /// Field checks. `has_image` is true when an image accompanies the
    /// submission or the insight already has one.
    pub fn check(&self, errors: &mut ValidationErrors, has_image: bool) {
        check_required_text(errors, "title", &self.title, MAX_TITLE_LEN);
        check_required_text(errors, "description", &self.description, MAX_DESCRIPTION_LEN);
        check_url(errors, "image_url", self.image_url.as_deref());
        check_url(errors, "document_url", self.document_url.as_deref());
        if let Some(name) = &self.document_filename {
            check_filename(errors, "document_filename", name);
        }
        check_display_order(errors, self.display_order);
        if self.is_active && self.image_url.is_none() && !has_image {
            errors.push("image_url", "Active insights need an image");
        }
    }
}

/// A file received from the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A bucket document with its publication state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentListing {
    #[serde(flatten)]
    pub document: UploadedDocument,
    pub status: DocumentStatus,
    pub insight: Option<Insight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentDeletion {
    pub name: String,
    pub removed_insights: u64,
}
