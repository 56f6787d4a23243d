use std::collections::HashMap;

use serde::Serialize;

use super::fallback::CONTENT_SECTIONS;
use super::model::ContentEntry;

/// Section-to-text mapping rendered by the public pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SiteContent {
    entries: HashMap<String, String>,
}

impl SiteContent {
    /// The built-in copy for every expected section.
    pub fn fallback() -> Self {
        let entries = CONTENT_SECTIONS
            .iter()
            .map(|s| (s.key.to_string(), s.fallback.to_string()))
            .collect();
        Self { entries }
    }

    /// Fallback copy overridden by every stored row whose section and text
    /// are both non-empty.
    pub fn from_entries<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a ContentEntry>,
    {
        let mut content = Self::fallback();
        for row in rows {
            content.apply(&row.section, &row.text);
        }
        content
    }

    fn apply(&mut self, section: &str, text: &str) {
        if section.is_empty() || text.is_empty() {
            return;
        }
        self.entries.insert(section.to_string(), text.to_string());
    }

    /// Text for `section`, or `""` when neither the store nor the fallback
    /// table knows it.
    pub fn get(&self, section: &str) -> &str {
        self.entries.get(section).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::fallback::fallback_text;
    use chrono::Utc;
    use uuid::Uuid;

    fn row(section: &str, text: &str) -> ContentEntry {
        ContentEntry {
            id: Uuid::new_v4(),
            section: section.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_sections_use_fallback() {
        let content = SiteContent::from_entries(&[row("hero_title", "Remote title")]);
        for s in CONTENT_SECTIONS.iter().filter(|s| s.key != "hero_title") {
            assert_eq!(content.get(s.key), s.fallback);
            assert!(!content.get(s.key).is_empty());
        }
    }

    #[test]
    fn remote_text_overrides_fallback() {
        let content = SiteContent::from_entries(&[
            row("hero_title", "Remote title"),
            row("brand_new_section", "Extra"),
        ]);
        assert_eq!(content.get("hero_title"), "Remote title");
        assert_eq!(content.get("brand_new_section"), "Extra");
    }

    #[test]
    fn empty_remote_text_keeps_fallback() {
        let content = SiteContent::from_entries(&[row("hero_title", ""), row("", "orphan")]);
        assert_eq!(content.get("hero_title"), fallback_text("hero_title").unwrap());
        assert_eq!(content.get(""), "");
    }

    #[test]
    fn unknown_section_is_empty_string() {
        assert_eq!(SiteContent::fallback().get("does_not_exist"), "");
        assert_eq!(SiteContent::default().get("hero_title"), "");
    }
}
