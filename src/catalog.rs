//! Built-in descriptors for every documented product module.

use std::{collections::BTreeMap, sync::Arc};

use once_cell::sync::Lazy;
use serde::Serialize;

/// Id prefix used when a module is unknown to the catalog.
pub const FALLBACK_PREFIX: &str = "FLW";

#[derive(Debug, Clone, Serialize)]
pub struct ModuleDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub group: &'static str,
    #[serde(rename = "order")]
    pub rank: u8,
    #[serde(skip)]
    pub prefix: &'static str,
    #[serde(skip)]
    pub summary: &'static str,
    #[serde(skip)]
    pub long_description: &'static str,
    #[serde(skip)]
    pub key_features: &'static [&'static str],
}

impl ModuleDescriptor {
    /// Name of the JSON document holding this module's flows.
    pub fn data_file(&self) -> String {
        format!("{}_user_flows_with_citations.json", self.id)
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    modules: BTreeMap<&'static str, ModuleDescriptor>,
}

static BUILTIN: Lazy<Arc<Catalog>> = Lazy::new(|| Arc::new(Catalog::from_descriptors(builtin_modules())));

impl Catalog {
    pub fn builtin() -> Arc<Catalog> {
        BUILTIN.clone()
    }

    pub fn from_descriptors(descriptors: Vec<ModuleDescriptor>) -> Self {
        Self {
            modules: descriptors.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    /// Modules in id order, which is also the search discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules in display order.
    pub fn sorted(&self) -> Vec<&ModuleDescriptor> {
        let mut all: Vec<_> = self.modules.values().collect();
        all.sort_by_key(|m| m.rank);
        all
    }

    pub fn prefix_for(&self, id: &str) -> &'static str {
        self.get(id).map(|m| m.prefix).unwrap_or(FALLBACK_PREFIX)
    }
}

fn builtin_modules() -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor {
            id: "advertise",
            name: "Advertise",
            description: "Social media advertising and campaign management",
            icon: "megaphone",
            color: "#FF6B6B",
            group: "Marketing & Growth",
            rank: 8,
            prefix: "ADV",
            summary: "Ad campaign management",
            long_description: "Social media advertising and campaign management. Create, manage, and optimize paid social campaigns.",
            key_features: &[
                "Campaign creation",
                "Audience targeting",
                "Budget management",
                "Ad performance tracking",
                "A/B testing",
            ],
        },
        ModuleDescriptor {
            id: "audience",
            name: "Audience",
            description: "Audience analysis and segmentation features",
            icon: "users",
            color: "#4ECDC4",
            group: "Advanced Analytics",
            rank: 10,
            prefix: "AUD",
            summary: "Audience segmentation",
            long_description: "Audience analysis and segmentation features. Understand and segment your social media audiences.",
            key_features: &[
                "Demographic analysis",
                "Interest mapping",
                "Behavior tracking",
                "Segment creation",
                "Audience insights",
            ],
        },
        ModuleDescriptor {
            id: "benchmark",
            name: "Benchmark",
            description: "Competitive benchmarking tools",
            icon: "chart-bar",
            color: "#45B7D1",
            group: "Analysis & Measurement",
            rank: 4,
            prefix: "BEN",
            summary: "Competitive analysis",
            long_description: "Competitive benchmarking tools. Compare your performance against competitors and industry standards.",
            key_features: &[
                "Competitor analysis",
                "Industry benchmarks",
                "Share of voice",
                "Trend comparison",
                "Performance gaps",
            ],
        },
        ModuleDescriptor {
            id: "consumer_research",
            name: "Consumer Research",
            description: "Digital consumer intelligence and search capabilities",
            icon: "search",
            color: "#96CEB4",
            group: "Discovery & Monitoring",
            rank: 2,
            prefix: "CR",
            summary: "Consumer insights",
            long_description: "Digital consumer intelligence and search capabilities. Deep dive into consumer behavior and preferences.",
            key_features: &[
                "Consumer insights",
                "Trend analysis",
                "Audience segmentation",
                "Behavioral patterns",
                "Market research",
            ],
        },
        ModuleDescriptor {
            id: "engage",
            name: "Engage",
            description: "Social media engagement and community management",
            icon: "message-circle",
            color: "#FFEAA7",
            group: "Content & Engagement",
            rank: 6,
            prefix: "ENG",
            summary: "Community management",
            long_description: "Social media engagement and community management. Manage conversations, respond to customers, and track engagement metrics.",
            key_features: &[
                "Unified inbox",
                "Response management",
                "Team collaboration",
                "Workflow automation",
                "Engagement tracking",
            ],
        },
        ModuleDescriptor {
            id: "influence",
            name: "Influence",
            description: "Influencer identification and tracking",
            icon: "star",
            color: "#DDA0DD",
            group: "Marketing & Growth",
            rank: 9,
            prefix: "INF",
            summary: "Influencer tracking",
            long_description: "Influencer identification and tracking. Find and analyze influencers relevant to your brand.",
            key_features: &[
                "Influencer discovery",
                "Audience analysis",
                "Engagement metrics",
                "Campaign tracking",
                "ROI measurement",
            ],
        },
        ModuleDescriptor {
            id: "listen",
            name: "Listen",
            description: "Social listening and monitoring capabilities",
            icon: "headphones",
            color: "#98D8C8",
            group: "Discovery & Monitoring",
            rank: 1,
            prefix: "LST",
            summary: "Social listening and monitoring",
            long_description: "Social listening and monitoring capabilities. Track brand mentions, sentiment, and conversations across social media and online sources.",
            key_features: &[
                "Real-time monitoring",
                "Sentiment analysis",
                "Alert configuration",
                "Query building",
                "Trend detection",
            ],
        },
        ModuleDescriptor {
            id: "measure",
            name: "Measure",
            description: "Performance measurement and analytics dashboards",
            icon: "pie-chart",
            color: "#FFD93D",
            group: "Analysis & Measurement",
            rank: 3,
            prefix: "MEA",
            summary: "Analytics and dashboards",
            long_description: "Performance measurement and analytics dashboards. Create custom reports and visualizations to track social media metrics.",
            key_features: &[
                "Custom dashboards",
                "Widget configuration",
                "Performance metrics",
                "Data export",
                "Comparative analysis",
            ],
        },
        ModuleDescriptor {
            id: "publish",
            name: "Publish",
            description: "Content publishing and scheduling",
            icon: "send",
            color: "#A8E6CF",
            group: "Content & Engagement",
            rank: 5,
            prefix: "PUB",
            summary: "Content scheduling",
            long_description: "Content publishing and scheduling across social platforms. Plan, create, and schedule social media content.",
            key_features: &[
                "Content calendar",
                "Multi-channel publishing",
                "Content approval workflow",
                "Asset library",
                "Performance tracking",
            ],
        },
        ModuleDescriptor {
            id: "reviews",
            name: "Reviews",
            description: "Review management and analysis",
            icon: "star-half",
            color: "#FFB6C1",
            group: "Content & Engagement",
            rank: 7,
            prefix: "REV",
            summary: "Review management",
            long_description: "Review management and analysis. Monitor and manage online reviews across platforms.",
            key_features: &[
                "Review monitoring",
                "Sentiment analysis",
                "Response management",
                "Rating tracking",
                "Competitive analysis",
            ],
        },
        ModuleDescriptor {
            id: "vizia",
            name: "VIZIA",
            description: "Data visualization and command center features",
            icon: "tv",
            color: "#C7CEEA",
            group: "Advanced Analytics",
            rank: 11,
            prefix: "VIZ",
            summary: "Command center displays",
            long_description: "Data visualization and command center features. Large-scale displays for real-time social data.",
            key_features: &[
                "Command center displays",
                "Real-time visualizations",
                "Custom screens",
                "Data streaming",
                "Executive dashboards",
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_eleven_modules_in_id_order() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 11);
        let ids: Vec<_> = catalog.iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn sorted_follows_rank() {
        let catalog = Catalog::builtin();
        let order: Vec<_> = catalog.sorted().iter().map(|m| m.id).collect();
        assert_eq!(order.first(), Some(&"listen"));
        assert_eq!(order.last(), Some(&"vizia"));
        assert_eq!(order[2], "measure");
    }

    #[test]
    fn prefixes_and_files() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.prefix_for("publish"), "PUB");
        assert_eq!(catalog.prefix_for("consumer_research"), "CR");
        assert_eq!(catalog.prefix_for("nope"), FALLBACK_PREFIX);
        assert_eq!(
            catalog.get("listen").map(|m| m.data_file()),
            Some("listen_user_flows_with_citations.json".to_string())
        );
    }

    #[test]
    fn serialized_descriptor_hides_internal_fields() {
        let catalog = Catalog::builtin();
        let v = serde_json::to_value(catalog.get("vizia").unwrap()).unwrap();
        assert_eq!(v["name"], "VIZIA");
        assert_eq!(v["order"], 11);
        assert!(v.get("prefix").is_none());
        assert!(v.get("key_features").is_none());
    }
}
