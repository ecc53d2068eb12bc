//! Cache key conventions and the per-namespace TTL table.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{GuardError, Result};

/// Entity kind a cache key belongs to.
///
/// Each namespace owns a distinct, colon-terminated prefix, so keys from
/// different namespaces can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Profile,
    Server,
    Member,
    Channel,
    Messages,
    Conversation,
    DirectMessages,
}

impl Namespace {
    /// Every namespace, in declaration order.
    pub const ALL: [Namespace; 7] = [
        Namespace::Profile,
        Namespace::Server,
        Namespace::Member,
        Namespace::Channel,
        Namespace::Messages,
        Namespace::Conversation,
        Namespace::DirectMessages,
    ];

    /// Key prefix, including the trailing separator.
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Profile => "profile:",
            Namespace::Server => "server:",
            Namespace::Member => "member:",
            Namespace::Channel => "channel:",
            Namespace::Messages => "messages:",
            Namespace::Conversation => "conversation:",
            Namespace::DirectMessages => "dm:",
        }
    }

    /// Short label used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Profile => "profile",
            Namespace::Server => "server",
            Namespace::Member => "member",
            Namespace::Channel => "channel",
            Namespace::Messages => "messages",
            Namespace::Conversation => "conversation",
            Namespace::DirectMessages => "direct_messages",
        }
    }

    /// Whether values in this namespace are paginated message lists.
    pub fn is_paginated(self) -> bool {
        matches!(self, Namespace::Messages | Namespace::DirectMessages)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suffix marking the pinned first page of a paginated list.
const FIRST_PAGE: &str = "first";

/// A fully-qualified cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Namespace,
    key: String,
}

impl CacheKey {
    /// Key for a single entity: `{prefix}{id}`.
    pub fn entity(namespace: Namespace, id: &str) -> Self {
        Self {
            namespace,
            key: format!("{}{id}", namespace.prefix()),
        }
    }

    /// Key for the first page of a paginated list: `{prefix}{id}:first`.
    pub fn first_page(namespace: Namespace, id: &str) -> Self {
        Self {
            namespace,
            key: format!("{}{id}:{FIRST_PAGE}", namespace.prefix()),
        }
    }

    /// Key for a page, or `None` for cursor pages.
    ///
    /// Only the first page is ever cached; deeper pages are served live.
    pub fn page(namespace: Namespace, id: &str, cursor: Option<&str>) -> Option<Self> {
        match cursor {
            None => Some(Self::first_page(namespace, id)),
            Some(_) => None,
        }
    }

    pub fn profile(user_id: &str) -> Self {
        Self::entity(Namespace::Profile, user_id)
    }

    pub fn server(server_id: &str) -> Self {
        Self::entity(Namespace::Server, server_id)
    }

    pub fn member(member_id: &str) -> Self {
        Self::entity(Namespace::Member, member_id)
    }

    pub fn channel(channel_id: &str) -> Self {
        Self::entity(Namespace::Channel, channel_id)
    }

    pub fn conversation(conversation_id: &str) -> Self {
        Self::entity(Namespace::Conversation, conversation_id)
    }

    /// First page of a channel's messages.
    pub fn channel_messages(channel_id: &str) -> Self {
        Self::first_page(Namespace::Messages, channel_id)
    }

    /// First page of a conversation's direct messages.
    pub fn direct_messages(conversation_id: &str) -> Self {
        Self::first_page(Namespace::DirectMessages, conversation_id)
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Per-namespace TTLs, in seconds.
///
/// Frequently-mutated message pages get the shortest TTL; slow-changing
/// profiles and conversations the longest. [`validate`](Self::validate)
/// enforces that asymmetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlTable {
    pub profile: u64,
    pub server: u64,
    pub member: u64,
    pub channel: u64,
    pub messages: u64,
    pub conversation: u64,
    pub direct_messages: u64,
}

impl Default for TtlTable {
    fn default() -> Self {
        Self {
            profile: 300,
            server: 180,
            member: 180,
            channel: 120,
            messages: 30,
            conversation: 300,
            direct_messages: 30,
        }
    }
}

impl TtlTable {
    /// TTL in seconds for a namespace.
    pub fn seconds(&self, namespace: Namespace) -> u64 {
        match namespace {
            Namespace::Profile => self.profile,
            Namespace::Server => self.server,
            Namespace::Member => self.member,
            Namespace::Channel => self.channel,
            Namespace::Messages => self.messages,
            Namespace::Conversation => self.conversation,
            Namespace::DirectMessages => self.direct_messages,
        }
    }

    /// TTL for a namespace.
    pub fn ttl(&self, namespace: Namespace) -> Duration {
        Duration::from_secs(self.seconds(namespace))
    }

    /// Reject zero TTLs, and message-page TTLs that are not strictly
    /// shorter than every entity TTL.
    pub fn validate(&self) -> Result<()> {
        for ns in Namespace::ALL {
            if self.seconds(ns) == 0 {
                return Err(GuardError::Configuration(format!(
                    "cache TTL for '{ns}' must be greater than zero"
                )));
            }
        }

        let shortest_entity = Namespace::ALL
            .iter()
            .filter(|ns| !ns.is_paginated())
            .map(|&ns| (ns, self.seconds(ns)))
            .min_by_key(|&(_, secs)| secs);

        if let Some((entity, entity_secs)) = shortest_entity {
            for page in Namespace::ALL.into_iter().filter(|ns| ns.is_paginated()) {
                let page_secs = self.seconds(page);
                if page_secs >= entity_secs {
                    return Err(GuardError::Configuration(format!(
                        "cache TTL for '{page}' ({page_secs}s) must be shorter than \
                         the TTL for '{entity}' ({entity_secs}s)"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_key_uses_prefix() {
        assert_eq!(CacheKey::profile("user_1").as_str(), "profile:user_1");
        assert_eq!(CacheKey::server("s1").as_str(), "server:s1");
        assert_eq!(CacheKey::member("m1").as_str(), "member:m1");
        assert_eq!(CacheKey::channel("c1").as_str(), "channel:c1");
        assert_eq!(CacheKey::conversation("v1").as_str(), "conversation:v1");
    }

    #[test]
    fn first_page_keys_are_pinned() {
        assert_eq!(CacheKey::channel_messages("c1").as_str(), "messages:c1:first");
        assert_eq!(CacheKey::direct_messages("v1").as_str(), "dm:v1:first");
    }

    #[test]
    fn cursor_pages_have_no_key() {
        assert!(CacheKey::page(Namespace::Messages, "c1", Some("msg_9")).is_none());
        assert_eq!(
            CacheKey::page(Namespace::Messages, "c1", None),
            Some(CacheKey::channel_messages("c1"))
        );
    }

    #[test]
    fn same_id_differs_across_namespaces() {
        let keys: Vec<String> = Namespace::ALL
            .iter()
            .map(|&ns| CacheKey::entity(ns, "same").to_string())
            .collect();
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn prefixes_are_not_prefixes_of_each_other() {
        for a in Namespace::ALL {
            for b in Namespace::ALL {
                if a != b {
                    assert!(!a.prefix().starts_with(b.prefix()), "{a} vs {b}");
                }
            }
        }
    }

    #[test]
    fn default_ttls_validate() {
        TtlTable::default().validate().unwrap();
        assert_eq!(
            TtlTable::default().ttl(Namespace::Profile),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn zero_ttl_rejected() {
        let table = TtlTable {
            channel: 0,
            ..TtlTable::default()
        };
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("channel"));
    }

    #[test]
    fn message_ttl_must_be_shortest() {
        let table = TtlTable {
            messages: 120,
            ..TtlTable::default()
        };
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("messages"));
    }
}
