//! The [`Event`] value and its classification enums.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use courier_core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Error returned when parsing one of the event classification enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a lowercase string enum with `Display`, `FromStr` and serde
/// support sharing the same wire names.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The lowercase wire name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok($name::$variant), )+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Deployment environment an event belongs to.
    ///
    /// Pulls and delivery loops are always scoped to exactly one environment.
    EventEnvironment, "environment" {
        Production => "production",
        Staging => "staging",
        Development => "development",
    }
}

string_enum! {
    /// Business domain that produced the event.
    EventOriginDomain, "origin domain" {
        Ecommerce => "ecommerce",
        Warehouse => "warehouse",
        Marketing => "marketing",
        Animals => "animals",
        Test => "test",
    }
}

string_enum! {
    EventMessageType, "message type" {
        Test => "test",
    }
}

string_enum! {
    EventEntityType, "entity type" {
        Test => "test",
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A domain occurrence published on an [`EventBus`](crate::bus::EventBus).
///
/// Events compare field by field. Once published an event is never mutated;
/// the bus alone tracks whether it is pending or acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Partition the event is delivered in.
    pub environment: EventEnvironment,

    /// When the publisher created the event (UTC).
    pub published_at: Timestamp,

    pub origin_domain: EventOriginDomain,
    pub message_type: EventMessageType,
    pub entity_type: EventEntityType,

    /// Identifier of the subject entity. Several events may share it.
    pub entity_id: String,

    /// Opaque string payload.
    #[serde(default)]
    pub extra_data: BTreeMap<String, String>,

    /// Transport-assigned identifier, `None` until a transport sets one.
    #[serde(default)]
    pub id: Option<String>,
}

impl Event {
    /// Create an event stamped with the current time and no extra data.
    pub fn new(
        environment: EventEnvironment,
        origin_domain: EventOriginDomain,
        message_type: EventMessageType,
        entity_type: EventEntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            published_at: Utc::now(),
            origin_domain,
            message_type,
            entity_type,
            entity_id: entity_id.into(),
            extra_data: BTreeMap::new(),
            id: None,
        }
    }

    /// Add a single key/value pair to the payload.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_data.insert(key.into(), value.into());
        self
    }

    /// Replace the whole payload.
    pub fn with_extra_data(mut self, extra_data: BTreeMap<String, String>) -> Self {
        self.extra_data = extra_data;
        self
    }

    /// Override the publish timestamp.
    pub fn with_published_at(mut self, published_at: Timestamp) -> Self {
        self.published_at = published_at;
        self
    }

    /// Set the transport identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(entity_id: &str) -> Event {
        Event::new(
            EventEnvironment::Development,
            EventOriginDomain::Test,
            EventMessageType::Test,
            EventEntityType::Test,
            entity_id,
        )
    }

    #[test]
    fn new_event_has_no_transport_id() {
        let event = sample("42");
        assert_eq!(event.entity_id, "42");
        assert!(event.id.is_none());
        assert!(event.extra_data.is_empty());
    }

    #[test]
    fn equality_is_field_wise() {
        let event = sample("42").with_extra("test", "test");
        let copy = event.clone();
        assert_eq!(event, copy);

        let different_payload = event.clone().with_extra("other", "value");
        assert_ne!(event, different_payload);

        let with_id = event.clone().with_id("abc");
        assert_ne!(event, with_id);
    }

    #[test]
    fn enums_use_lowercase_wire_names() {
        assert_eq!(EventEnvironment::Production.to_string(), "production");
        assert_eq!(EventOriginDomain::Ecommerce.as_str(), "ecommerce");
        assert_eq!(
            "staging".parse::<EventEnvironment>(),
            Ok(EventEnvironment::Staging)
        );
        for domain in EventOriginDomain::ALL {
            assert_eq!(domain.as_str().parse::<EventOriginDomain>(), Ok(*domain));
        }
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let err = "qa".parse::<EventEnvironment>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown environment 'qa'");
    }

    #[test]
    fn serializes_with_wire_names() {
        let event = sample("7").with_extra("sku", "A-1");
        let json = serde_json::to_value(&event).expect("serialization should succeed");

        assert_eq!(json["environment"], "development");
        assert_eq!(json["origin_domain"], "test");
        assert_eq!(json["entity_id"], "7");
        assert_eq!(json["extra_data"]["sku"], "A-1");
        assert!(json["id"].is_null());
    }

    #[test]
    fn deserializes_without_optional_fields() {
        let json = serde_json::json!({
            "environment": "staging",
            "published_at": "2024-05-01T12:00:00Z",
            "origin_domain": "warehouse",
            "message_type": "test",
            "entity_type": "test",
            "entity_id": "crate-9",
        });

        let event: Event = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(event.environment, EventEnvironment::Staging);
        assert_eq!(event.origin_domain, EventOriginDomain::Warehouse);
        assert!(event.extra_data.is_empty());
        assert!(event.id.is_none());
    }
}
