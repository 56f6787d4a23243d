//! Field-level validation for operator input.
//!
//! Checks push into a [`ValidationErrors`] collector so a rejected form
//! reports every offending field at once.

use std::fmt;

use serde::Serialize;

pub const MAX_SECTION_LEN: usize = 100;
pub const MAX_CONTENT_TEXT_LEN: usize = 5000;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_URL_LEN: usize = 2048;
pub const MAX_FILENAME_LEN: usize = 255;
pub const MAX_DISPLAY_ORDER: i32 = 10_000;
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/plain",
];

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field-level problem found in one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// First error recorded against `field`.
    pub fn field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "invalid input ({})", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Section keys are non-empty runs of ASCII letters and underscores.
pub fn check_section(errors: &mut ValidationErrors, section: &str) {
    if section.is_empty() {
        errors.push("section", "Section is required");
    } else if section.chars().count() > MAX_SECTION_LEN {
        errors.push(
            "section",
            format!("Section must be at most {MAX_SECTION_LEN} characters"),
        );
    } else if !section.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
        errors.push(
            "section",
            "Section may only contain letters and underscores",
        );
    }
}

pub fn check_content_text(errors: &mut ValidationErrors, text: &str) {
    if text.chars().count() > MAX_CONTENT_TEXT_LEN {
        errors.push(
            "text",
            format!("Text must be at most {MAX_CONTENT_TEXT_LEN} characters"),
        );
    }
}

/// Validate a content edit before anything is written.
pub fn validate_content_update(section: &str, text: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_section(&mut errors, section);
    check_content_text(&mut errors, text);
    errors.into_result()
}

/// Trimmed text of 1..=`max` characters.
pub fn check_required_text(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(field, "This field is required");
    } else if value.chars().count() > max {
        errors.push(field, format!("Must be at most {max} characters"));
    }
}

/// Optional link: absolute http(s) or root-relative.
pub fn check_url(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    let Some(url) = value else {
        return;
    };
    if url.chars().count() > MAX_URL_LEN {
        errors.push(field, format!("URL must be at most {MAX_URL_LEN} characters"));
    } else if !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/'))
    {
        errors.push(field, "URL must start with http://, https:// or /");
    } else if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        errors.push(field, "URL must not contain whitespace");
    }
}

pub fn check_display_order(errors: &mut ValidationErrors, order: i32) {
    if !(0..=MAX_DISPLAY_ORDER).contains(&order) {
        errors.push(
            "display_order",
            format!("Display order must be between 0 and {MAX_DISPLAY_ORDER}"),
        );
    }
}

/// Why a filename cannot name an object in the flat bucket namespace.
pub fn filename_problem(filename: &str) -> Option<&'static str> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Some("Filename cannot be empty");
    }
    if trimmed.chars().count() > MAX_FILENAME_LEN {
        return Some("Filename is too long");
    }
    if trimmed.contains('\0') || trimmed.chars().any(|c| c.is_control()) {
        return Some("Filename must not contain control characters");
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Some("Filename must not contain path separators");
    }
    if trimmed == ".." || trimmed.starts_with('.') {
        return Some("Filename must not start with '.'");
    }
    None
}

pub fn check_filename(errors: &mut ValidationErrors, field: &str, filename: &str) {
    if let Some(problem) = filename_problem(filename) {
        errors.push(field, problem);
    }
}

/// What an upload is for; decides the size limit and accepted types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Document,
    Image,
}

impl UploadKind {
    pub fn max_bytes(self) -> usize {
        match self {
            UploadKind::Document => MAX_DOCUMENT_BYTES,
            UploadKind::Image => MAX_IMAGE_BYTES,
        }
    }

    fn accepted_types(self) -> &'static [&'static str] {
        match self {
            UploadKind::Document => DOCUMENT_TYPES,
            UploadKind::Image => IMAGE_TYPES,
        }
    }

    fn field(self) -> &'static str {
        match self {
            UploadKind::Document => "file",
            UploadKind::Image => "image",
        }
    }
}

/// Check an upload's name, size and type before it is sent to storage.
/// Returns the MIME type to store it under.
///
/// A missing or generic `application/octet-stream` type is replaced by the
/// guess for the file extension.
pub fn validate_upload(
    kind: UploadKind,
    filename: &str,
    content_type: Option<&str>,
    size: usize,
) -> Result<String, ValidationErrors> {
    let field = kind.field();
    let mut errors = ValidationErrors::new();

    check_filename(&mut errors, field, filename);
    if size == 0 {
        errors.push(field, "File is empty");
    } else if size > kind.max_bytes() {
        errors.push(
            field,
            format!(
                "File must be at most {} MB",
                kind.max_bytes() / (1024 * 1024)
            ),
        );
    }

    let declared = content_type
        .map(|t| t.split(';').next().unwrap_or(t).trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty() && t != "application/octet-stream");
    let mime = declared.unwrap_or_else(|| {
        mime_guess::from_path(filename)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string()
    });
    if !kind.accepted_types().contains(&mime.as_str()) {
        errors.push(field, format!("File type {mime} is not allowed"));
    }

    errors.into_result().map(|()| mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_must_be_letters_and_underscores() {
        assert!(validate_content_update("hero_title", "ok").is_ok());
        for bad in ["hero-title", "hero title", "hero1", "héro", "<x>"] {
            let err = validate_content_update(bad, "ok").unwrap_err();
            assert!(err.field("section").is_some(), "{bad} accepted");
            assert!(err.field("text").is_none());
        }
    }

    #[test]
    fn empty_section_is_rejected() {
        let err = validate_content_update("", "text").unwrap_err();
        assert_eq!(err.field("section").unwrap().message, "Section is required");
    }

    #[test]
    fn text_length_is_bounded_in_characters() {
        assert!(validate_content_update("about_intro", &"é".repeat(MAX_CONTENT_TEXT_LEN)).is_ok());
        let err =
            validate_content_update("about_intro", &"a".repeat(MAX_CONTENT_TEXT_LEN + 1)).unwrap_err();
        assert!(err.field("text").is_some());
    }

    #[test]
    fn collects_every_problem() {
        let err = validate_content_update("bad key", &"a".repeat(MAX_CONTENT_TEXT_LEN + 1)).unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert!(err.to_string().contains("section"));
    }

    #[test]
    fn urls_must_be_http_or_relative() {
        let mut errors = ValidationErrors::new();
        check_url(&mut errors, "image_url", Some("https://cdn.example.com/a.png"));
        check_url(&mut errors, "image_url", Some("/static/a.png"));
        check_url(&mut errors, "image_url", None);
        assert!(errors.is_empty());

        check_url(&mut errors, "document_url", Some("javascript:alert(1)"));
        assert!(errors.field("document_url").is_some());
    }

    #[test]
    fn display_order_range() {
        let mut errors = ValidationErrors::new();
        check_display_order(&mut errors, 0);
        check_display_order(&mut errors, MAX_DISPLAY_ORDER);
        assert!(errors.is_empty());
        check_display_order(&mut errors, -1);
        assert_eq!(errors.errors.len(), 1);
    }

    #[test]
    fn filenames_are_flat() {
        assert_eq!(filename_problem("report.pdf"), None);
        assert!(filename_problem("../etc/passwd").is_some());
        assert!(filename_problem("a/b.pdf").is_some());
        assert!(filename_problem(".hidden").is_some());
        assert!(filename_problem("a\r\nb.pdf").is_some());
        assert!(filename_problem("   ").is_some());
    }

    #[test]
    fn upload_type_and_size() {
        let mime = validate_upload(UploadKind::Document, "brief.pdf", Some("application/pdf"), 10).unwrap();
        assert_eq!(mime, "application/pdf");

        let guessed = validate_upload(
            UploadKind::Document,
            "brief.pdf",
            Some("application/octet-stream"),
            10,
        )
        .unwrap();
        assert_eq!(guessed, "application/pdf");

        let err = validate_upload(UploadKind::Document, "tool.exe", None, 10).unwrap_err();
        assert!(err.field("file").is_some());

        let err =
            validate_upload(UploadKind::Image, "big.png", Some("image/png"), MAX_IMAGE_BYTES + 1)
                .unwrap_err();
        assert!(err.field("image").unwrap().message.contains("5 MB"));

        let err = validate_upload(UploadKind::Image, "x.svg", Some("image/svg+xml"), 10).unwrap_err();
        assert!(err.field("image").is_some());
    }
}
