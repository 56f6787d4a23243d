/// Object key conventions in the documents bucket.
///
/// - Document: `{filename}` at the bucket root
/// - Insight image: `images/{millis}-{filename}`
use chrono::{DateTime, Utc};

const IMAGE_PREFIX: &str = "images/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectName {
    Document(String),
    Image(String),
}

impl ObjectName {
    /// Classify a bucket key.
    pub fn parse(key: &str) -> Self {
        match key.strip_prefix(IMAGE_PREFIX) {
            Some(name) if !name.is_empty() => ObjectName::Image(name.to_string()),
            _ => ObjectName::Document(key.to_string()),
        }
    }

    /// Key for a newly uploaded insight image. The timestamp keeps repeated
    /// uploads of the same file from colliding.
    pub fn image_for_upload(filename: &str, now: DateTime<Utc>) -> Self {
        let cleaned: String = filename
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        ObjectName::Image(format!("{}-{cleaned}", now.timestamp_millis()))
    }

    /// Full key inside the bucket.
    pub fn key(&self) -> String {
        match self {
            ObjectName::Document(name) => name.clone(),
            ObjectName::Image(name) => format!("{IMAGE_PREFIX}{name}"),
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, ObjectName::Document(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ObjectName::Image(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_document_key() {
        let name = ObjectName::parse("annual-review.pdf");
        assert_eq!(name, ObjectName::Document("annual-review.pdf".to_string()));
        assert_eq!(name.key(), "annual-review.pdf");
        assert!(name.is_document());
    }

    #[test]
    fn parse_image_key() {
        let name = ObjectName::parse("images/1700000000000-cover.png");
        assert_eq!(name, ObjectName::Image("1700000000000-cover.png".to_string()));
        assert_eq!(name.key(), "images/1700000000000-cover.png");
        assert!(name.is_image());
    }

    #[test]
    fn bare_prefix_is_a_document() {
        assert!(ObjectName::parse("images/").is_document());
    }

    #[test]
    fn upload_names_are_stamped_and_cleaned() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let name = ObjectName::image_for_upload("Team photo (1).JPG", now);
        assert_eq!(name.key(), "images/1700000000000-Team-photo--1-.JPG");
    }
}
