use serde::Serialize;

/// A consulting service line with its own detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Service {
    pub slug: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub highlights: &'static [&'static str],
}

pub const SERVICES: &[Service] = &[
    Service {
        slug: "business-strategy",
        title: "Business Strategy",
        summary: "Define where to compete and how to win, with a plan your whole leadership team can execute.",
        highlights: &[
            "Market and competitor assessment",
            "Growth strategy and prioritisation",
            "Board and investor-ready strategic plans",
        ],
    },
    Service {
        slug: "operational-excellence",
        title: "Operational Excellence",
        summary: "Remove friction from the way work gets done so the business can scale without adding cost.",
        highlights: &[
            "Process mapping and redesign",
            "KPI frameworks and performance dashboards",
            "Supply chain and procurement reviews",
        ],
    },
    Service {
        slug: "financial-advisory",
        title: "Financial Advisory",
        summary: "Clear financial insight for confident decisions on investment, pricing and funding.",
        highlights: &[
            "Financial modelling and forecasting",
            "Pricing and profitability analysis",
            "Fundraising and transaction support",
        ],
    },
    Service {
        slug: "change-management",
        title: "Change Management",
        summary: "Lead people through restructuring, new systems and new ways of working.",
        highlights: &[
            "Change readiness assessment",
            "Stakeholder and communication planning",
            "Leadership coaching through transition",
        ],
    },
];

/// Look up a service by its URL slug.
pub fn find_service(slug: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|s| s.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_url_safe_and_unique() {
        for (i, service) in SERVICES.iter().enumerate() {
            assert!(service
                .slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '-'));
            assert!(SERVICES[i + 1..].iter().all(|s| s.slug != service.slug));
        }
    }

    #[test]
    fn find_by_slug() {
        assert_eq!(find_service("financial-advisory").unwrap().title, "Financial Advisory");
        assert!(find_service("unknown").is_none());
    }
}
