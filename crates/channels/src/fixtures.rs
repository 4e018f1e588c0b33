//! Static channel and message data.
//!
//! Canonical for demo tenants; the last tier of the chain for live tenants,
//! which have no fixtures and so degrade to an empty list.

use {
    chrono::{DateTime, Utc},
    meridian_common::{Channel, Message},
};

/// 2024-01-15T00:00:00Z
const FIXTURE_DAY: i64 = 1_705_276_800;

struct FixtureChannel {
    id: &'static str,
    name: &'static str,
    unread: u32,
    /// (author, text, hour, minute)
    messages: &'static [(&'static str, &'static str, i64, i64)],
}

const TENANT_A: &[FixtureChannel] = &[
    FixtureChannel {
        id: "a-general",
        name: "general",
        unread: 0,
        messages: &[
            ("Alice", "Hello everyone! Welcome to Tenant A's general channel.", 10, 30),
            ("Bob", "Hi Alice! Thanks for setting this up.", 10, 32),
            ("Charlie", "I'm excited to use this new chat system!", 10, 35),
        ],
    },
    FixtureChannel {
        id: "a-marketing",
        name: "marketing",
        unread: 2,
        messages: &[
            ("Diana", "Let's discuss the new campaign here.", 11, 0),
            ("Alice", "I've prepared some materials, will share soon.", 11, 5),
        ],
    },
    FixtureChannel {
        id: "a-engineering",
        name: "engineering",
        unread: 0,
        messages: &[
            ("Eve", "Any updates on the API integration?", 9, 45),
            ("Frank", "I'm working on it, should be done by EOD.", 9, 50),
            ("Grace", "Let me know if you need any help with testing.", 9, 55),
            ("Frank", "Thanks, will do!", 10, 0),
            ("Eve", "Great, looking forward to it.", 10, 5),
        ],
    },
];

const TENANT_B: &[FixtureChannel] = &[
    FixtureChannel {
        id: "b-general",
        name: "general",
        unread: 0,
        messages: &[
            ("John", "Hello team! This is Tenant B's general channel.", 9, 0),
            ("Kate", "Morning John!", 9, 5),
        ],
    },
    FixtureChannel {
        id: "b-sales",
        name: "sales",
        unread: 3,
        messages: &[
            ("Liam", "Q2 targets are now available in the dashboard.", 8, 30),
            ("Mia", "Thanks Liam, I'll review them today.", 8, 35),
            ("Noah", "Can we discuss the new incentive structure?", 8, 40),
        ],
    },
    FixtureChannel {
        id: "b-support",
        name: "support",
        unread: 1,
        messages: &[
            ("Olivia", "New ticket from Acme Corp - priority high.", 10, 15),
            ("Peter", "I'll take it.", 10, 17),
        ],
    },
];

const TENANT_C: &[FixtureChannel] = &[
    FixtureChannel {
        id: "c-general",
        name: "general",
        unread: 0,
        messages: &[
            ("Quinn", "Welcome to Tenant C's workspace!", 13, 0),
            ("Rachel", "Thanks Quinn, glad to be here.", 13, 5),
        ],
    },
    FixtureChannel {
        id: "c-design",
        name: "design",
        unread: 0,
        messages: &[
            ("Sam", "I've uploaded the new mockups to Figma.", 14, 30),
            ("Taylor", "They look great! Just left some comments.", 14, 45),
        ],
    },
    FixtureChannel {
        id: "c-product",
        name: "product",
        unread: 4,
        messages: &[
            ("Uma", "Roadmap planning session tomorrow at 10 AM.", 15, 0),
            ("Victor", "I'll be there.", 15, 5),
            ("Wendy", "Me too, I have some feature requests to discuss.", 15, 10),
        ],
    },
];

fn tenant_fixtures(tenant_id: &str) -> &'static [FixtureChannel] {
    match tenant_id {
        "tenant-a" => TENANT_A,
        "tenant-b" => TENANT_B,
        "tenant-c" => TENANT_C,
        _ => &[],
    }
}

/// Fixture channels of `tenant_id` in declaration order.
pub fn channels(tenant_id: &str) -> Vec<Channel> {
    tenant_fixtures(tenant_id)
        .iter()
        .map(|c| Channel {
            id: c.id.to_string(),
            name: c.name.to_string(),
            description: None,
            unread_count: c.unread,
            source_tenant_id: tenant_id.to_string(),
        })
        .collect()
}

pub fn has_channel(tenant_id: &str, channel_id: &str) -> bool {
    tenant_fixtures(tenant_id).iter().any(|c| c.id == channel_id)
}

/// True when any demo tenant owns `channel_id`.
pub fn has_channel_anywhere(channel_id: &str) -> bool {
    [TENANT_A, TENANT_B, TENANT_C]
        .iter()
        .any(|set| set.iter().any(|c| c.id == channel_id))
}

/// Messages of a fixture channel, or `None` when `tenant_id` has no such
/// channel.
pub fn messages(tenant_id: &str, channel_id: &str) -> Option<Vec<Message>> {
    let channel = tenant_fixtures(tenant_id)
        .iter()
        .find(|c| c.id == channel_id)?;
    Some(
        channel
            .messages
            .iter()
            .enumerate()
            .map(|(i, (author, text, hour, minute))| Message {
                id: format!("{channel_id}-{}", i + 1),
                author_id: author.to_ascii_lowercase(),
                author_name: (*author).to_string(),
                text: (*text).to_string(),
                timestamp: at(*hour, *minute),
                channel_id: channel_id.to_string(),
            })
            .collect(),
    )
}

fn at(hour: i64, minute: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(FIXTURE_DAY + hour * 3600 + minute * 60, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_demo_tenant_has_three_channels() {
        for tenant in ["tenant-a", "tenant-b", "tenant-c"] {
            let list = channels(tenant);
            assert_eq!(list.len(), 3, "{tenant}");
            assert!(list.iter().all(|c| c.source_tenant_id == tenant));
        }
        assert!(channels("org-42").is_empty());
    }

    #[test]
    fn declaration_order_and_unread() {
        let ids: Vec<_> = channels("tenant-b").into_iter().map(|c| (c.id, c.unread_count)).collect();
        assert_eq!(ids, vec![
            ("b-general".to_string(), 0),
            ("b-sales".to_string(), 3),
            ("b-support".to_string(), 1)
        ]);
    }

    #[test]
    fn messages_are_tenant_scoped() {
        assert!(messages("tenant-a", "b-sales").is_none());
        let msgs = messages("tenant-b", "b-sales").unwrap();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].author_name, "Liam");
        assert!(msgs.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(msgs[0].timestamp.to_rfc3339(), "2024-01-15T08:30:00+00:00");
    }

    #[test]
    fn fixtures_are_stable() {
        assert_eq!(messages("tenant-c", "c-product"), messages("tenant-c", "c-product"));
        assert!(has_channel("tenant-c", "c-design"));
        assert!(!has_channel("tenant-c", "a-general"));
        assert!(has_channel_anywhere("a-general"));
        assert!(!has_channel_anywhere("general"));
    }
}
