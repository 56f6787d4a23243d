//! Built-in English copy used when the content store is empty or unreachable.
//!
//! The section keys double as the admin editor's list of expected sections,
//! so every slot below always shows up there even before it is first saved.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::Insight;

/// An editable slot of marketing copy with its built-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDef {
    pub key: &'static str,
    pub label: &'static str,
    pub fallback: &'static str,
}

const fn section(key: &'static str, label: &'static str, fallback: &'static str) -> SectionDef {
    SectionDef {
        key,
        label,
        fallback,
    }
}

pub const CONTENT_SECTIONS: &[SectionDef] = &[
    section(
        "hero_title",
        "Home: hero title",
        "Clear strategy. Measurable growth.",
    ),
    section(
        "hero_subtitle",
        "Home: hero subtitle",
        "We help growing businesses sharpen their strategy, streamline operations and lead through change.",
    ),
    section("hero_cta", "Home: hero button", "Book a consultation"),
    section(
        "home_services_title",
        "Home: services heading",
        "How we help",
    ),
    section(
        "home_insights_title",
        "Home: insights heading",
        "Latest insights",
    ),
    section("about_title", "About: title", "About our firm"),
    section(
        "about_intro",
        "About: introduction",
        "Founded by operators and strategists, we work alongside leadership teams to turn ambition into plans that hold up in the real world.",
    ),
    section(
        "about_mission",
        "About: mission",
        "Our mission is to give every client the clarity, structure and confidence to make their next big decision.",
    ),
    section(
        "about_approach",
        "About: approach",
        "We listen first, measure what matters and stay until the results are visible on the balance sheet.",
    ),
    section("services_title", "Services: title", "Our services"),
    section(
        "services_intro",
        "Services: introduction",
        "Focused engagements that meet you where your business is today.",
    ),
    section("insights_title", "Insights: title", "Insights"),
    section(
        "insights_intro",
        "Insights: introduction",
        "Practical thinking on strategy, operations and leadership from our consultants.",
    ),
    section("contact_title", "Contact: title", "Get in touch"),
    section(
        "contact_intro",
        "Contact: introduction",
        "Tell us about your challenge and we will arrange a no-obligation conversation.",
    ),
    section(
        "contact_email",
        "Contact: email",
        "hello@northgate-advisory.com",
    ),
    section("contact_phone", "Contact: phone", "+44 20 7946 0321"),
    section(
        "contact_address",
        "Contact: address",
        "24 Finsbury Square, London EC2A 1DS",
    ),
    section(
        "cta_title",
        "Call to action: title",
        "Ready to take the next step?",
    ),
    section(
        "cta_text",
        "Call to action: text",
        "Talk to a consultant about where your business is heading.",
    ),
    section(
        "footer_tagline",
        "Footer: tagline",
        "Independent business consulting for ambitious companies.",
    ),
];

/// The built-in text for `key`, if the key is a known section.
pub fn fallback_text(key: &str) -> Option<&'static str> {
    CONTENT_SECTIONS
        .iter()
        .find(|s| s.key == key)
        .map(|s| s.fallback)
}

/// Whether `key` is one of the expected sections.
pub fn is_expected_section(key: &str) -> bool {
    CONTENT_SECTIONS.iter().any(|s| s.key == key)
}

struct FallbackInsight {
    id: u128,
    title: &'static str,
    description: &'static str,
    image_url: &'static str,
}

const FALLBACK_INSIGHTS: &[FallbackInsight] = &[
    FallbackInsight {
        id: 0x0190_0000_0000_7000_8000_0000_0000_0001,
        title: "Building a strategy that survives contact with reality",
        description: "Why most strategic plans stall in the first quarter, and the operating rhythm that keeps them moving.",
        image_url: "/static/images/insights/strategy.jpg",
    },
    FallbackInsight {
        id: 0x0190_0000_0000_7000_8000_0000_0000_0002,
        title: "Five signs your operations are ready to scale",
        description: "A checklist for leadership teams weighing growth against the capacity of their current processes.",
        image_url: "/static/images/insights/operations.jpg",
    },
    FallbackInsight {
        id: 0x0190_0000_0000_7000_8000_0000_0000_0003,
        title: "Leading teams through organisational change",
        description: "Lessons from transformation programmes on communication, sequencing and keeping people on side.",
        image_url: "/static/images/insights/change.jpg",
    },
];

// 2024-01-01T00:00:00Z
const FALLBACK_TIMESTAMP: i64 = 1_704_067_200;

/// The built-in insight list, ordered by `display_order`.
pub fn fallback_insights() -> Vec<Insight> {
    let stamp: DateTime<Utc> = DateTime::from_timestamp(FALLBACK_TIMESTAMP, 0).unwrap_or_default();
    FALLBACK_INSIGHTS
        .iter()
        .enumerate()
        .map(|(order, item)| Insight {
            id: Uuid::from_u128(item.id),
            title: item.title.to_string(),
            description: item.description.to_string(),
            image_url: Some(item.image_url.to_string()),
            document_url: None,
            document_filename: None,
            display_order: order as i32 + 1,
            is_active: true,
            created_at: stamp,
            updated_at: stamp,
        })
        .collect()
}
