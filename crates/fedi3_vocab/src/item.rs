/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::iri::Iri;

pub const ACTOR_TYPES: [&str; 5] = ["Application", "Group", "Organization", "Person", "Service"];

pub const ACTIVITY_TYPES: [&str; 25] = [
    "Accept", "Add", "Announce", "Block", "Create", "Delete", "Dislike", "Flag", "Follow",
    "Ignore", "Invite", "Join", "Leave", "Like", "Listen", "Move", "Offer", "Read", "Reject",
    "Remove", "TentativeAccept", "TentativeReject", "Undo", "Update", "View",
];

pub const INTRANSITIVE_ACTIVITY_TYPES: [&str; 3] = ["Arrive", "Travel", "Question"];

pub const COLLECTION_TYPES: [&str; 4] = [
    "Collection", "OrderedCollection", "CollectionPage", "OrderedCollectionPage",
];

/// Drops sub-second precision; `published` timestamps are stored truncated
/// to whole seconds in UTC.
pub fn truncate_to_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_nanosecond(0).unwrap_or(t)
}

/// RFC-3339 with whole-second precision, the deterministic on-disk form.
pub(crate) mod ts_secs {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        v: &Option<DateTime<Utc>>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match v {
            Some(t) => s.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|t| Some(super::truncate_to_seconds(t.with_timezone(&Utc))))
                .map_err(serde::de::Error::custom),
        }
    }
}

/// JSON-LD allows a single value wherever an array is expected; decode both,
/// always emit an array.
pub(crate) mod item_vec {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    use super::Item;

    pub fn serialize<S: Serializer>(v: &[Item], s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_seq(v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Vec<Item>, D::Error> {
        let raw = Value::deserialize(d)?;
        match raw {
            Value::Null => Ok(Vec::new()),
            Value::Array(vals) => vals
                .into_iter()
                .map(|v| Item::from_value(v).map_err(serde::de::Error::custom))
                .collect(),
            other => Ok(vec![Item::from_value(other).map_err(serde::de::Error::custom)?]),
        }
    }
}

/// The base shape shared by every objectful item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(default, skip_serializing_if = "Iri::is_empty")]
    pub id: Iri,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub typ: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "attributedTo", default, skip_serializing_if = "Option::is_none")]
    pub attributed_to: Option<Box<Item>>,
    #[serde(rename = "inReplyTo", default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<Box<Item>>,
    #[serde(default, with = "ts_secs", skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(default, with = "ts_secs", skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Box<Item>>,
    #[serde(default, with = "item_vec", skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<Item>,
    #[serde(default, with = "item_vec", skip_serializing_if = "Vec::is_empty")]
    pub bto: Vec<Item>,
    #[serde(default, with = "item_vec", skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<Item>,
    #[serde(default, with = "item_vec", skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<Item>,
    #[serde(default, with = "item_vec", skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Box<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<Box<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<Box<Item>>,
    /// Fields this vocabulary does not model; preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Object {
    pub fn new(id: Iri, typ: impl Into<String>) -> Self {
        Object {
            id,
            typ: typ.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicKey {
    pub id: Iri,
    pub owner: Iri,
    #[serde(rename = "publicKeyPem")]
    pub public_key_pem: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(flatten)]
    pub base: Object,
    #[serde(rename = "preferredUsername", default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbox: Option<Box<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox: Option<Box<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Box<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<Box<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked: Option<Box<Item>>,
    #[serde(default, with = "item_vec", skip_serializing_if = "Vec::is_empty")]
    pub streams: Vec<Item>,
    #[serde(rename = "publicKey", default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(flatten)]
    pub base: Object,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Box<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Box<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Box<Item>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(flatten)]
    pub base: Object,
    #[serde(default, with = "item_vec", skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(rename = "orderedItems", default, with = "item_vec", skip_serializing_if = "Vec::is_empty")]
    pub ordered_items: Vec<Item>,
    #[serde(rename = "totalItems", default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<Box<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<Item>>,
    #[serde(rename = "partOf", default, skip_serializing_if = "Option::is_none")]
    pub part_of: Option<Box<Item>>,
}

impl Collection {
    /// An empty `OrderedCollection` descriptor.
    pub fn ordered(id: Iri) -> Self {
        Collection {
            base: Object::new(id, "OrderedCollection"),
            ..Default::default()
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.base.typ.starts_with("Ordered")
    }

    pub fn members(&self) -> &[Item] {
        if !self.ordered_items.is_empty() {
            &self.ordered_items
        } else {
            &self.items
        }
    }

    pub fn contains(&self, iri: &Iri) -> bool {
        self.members().iter().any(|it| it.id().equals(iri, false))
    }

    /// Appends to the right member list and keeps `totalItems` in sync.
    pub fn push(&mut self, it: Item) {
        if self.is_ordered() {
            self.ordered_items.push(it);
            self.total_items = Some(self.ordered_items.len() as u64);
        } else {
            self.items.push(it);
            self.total_items = Some(self.items.len() as u64);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tombstone {
    #[serde(flatten)]
    pub base: Object,
    #[serde(rename = "formerType", default, skip_serializing_if = "Option::is_none")]
    pub former_type: Option<String>,
    #[serde(default, with = "ts_secs", skip_serializing_if = "Option::is_none")]
    pub deleted: Option<DateTime<Utc>>,
}

/// Any ActivityPub vocabulary variant, including bare IRI references.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Iri(Iri),
    Object(Box<Object>),
    Actor(Box<Actor>),
    Activity(Box<Activity>),
    IntransitiveActivity(Box<Activity>),
    Collection(Box<Collection>),
    Tombstone(Box<Tombstone>),
}

impl Item {
    pub fn id(&self) -> &Iri {
        match self {
            Item::Iri(iri) => iri,
            Item::Object(o) => &o.id,
            Item::Actor(a) => &a.base.id,
            Item::Activity(a) | Item::IntransitiveActivity(a) => &a.base.id,
            Item::Collection(c) => &c.base.id,
            Item::Tombstone(t) => &t.base.id,
        }
    }

    pub fn type_name(&self) -> &str {
        match self.base() {
            Some(base) => &base.typ,
            None => "",
        }
    }

    /// True for a bare IRI reference.
    pub fn is_link(&self) -> bool {
        matches!(self, Item::Iri(_))
    }

    /// True when the item carries data.
    pub fn is_objectful(&self) -> bool {
        !self.is_link()
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Item::Collection(_))
    }

    pub fn base(&self) -> Option<&Object> {
        match self {
            Item::Iri(_) => None,
            Item::Object(o) => Some(o),
            Item::Actor(a) => Some(&a.base),
            Item::Activity(a) | Item::IntransitiveActivity(a) => Some(&a.base),
            Item::Collection(c) => Some(&c.base),
            Item::Tombstone(t) => Some(&t.base),
        }
    }

    pub fn base_mut(&mut self) -> Option<&mut Object> {
        match self {
            Item::Iri(_) => None,
            Item::Object(o) => Some(o),
            Item::Actor(a) => Some(&mut a.base),
            Item::Activity(a) | Item::IntransitiveActivity(a) => Some(&mut a.base),
            Item::Collection(c) => Some(&mut c.base),
            Item::Tombstone(t) => Some(&mut t.base),
        }
    }

    pub fn as_actor(&self) -> Option<&Actor> {
        match self {
            Item::Actor(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_actor_mut(&mut self) -> Option<&mut Actor> {
        match self {
            Item::Actor(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_activity(&self) -> Option<&Activity> {
        match self {
            Item::Activity(a) | Item::IntransitiveActivity(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_activity_mut(&mut self) -> Option<&mut Activity> {
        match self {
            Item::Activity(a) | Item::IntransitiveActivity(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Item::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn from_value(v: Value) -> Result<Item> {
        match v {
            Value::String(s) => Ok(Item::Iri(Iri::new(s))),
            Value::Object(ref map) => {
                let t = type_of(map);
                let item = if ACTOR_TYPES.contains(&t.as_str()) {
                    Item::Actor(Box::new(serde_json::from_value(v)?))
                } else if COLLECTION_TYPES.contains(&t.as_str()) {
                    Item::Collection(Box::new(serde_json::from_value(v)?))
                } else if t == "Tombstone" {
                    Item::Tombstone(Box::new(serde_json::from_value(v)?))
                } else if INTRANSITIVE_ACTIVITY_TYPES.contains(&t.as_str()) {
                    Item::IntransitiveActivity(Box::new(serde_json::from_value(v)?))
                } else if ACTIVITY_TYPES.contains(&t.as_str()) {
                    Item::Activity(Box::new(serde_json::from_value(v)?))
                } else {
                    Item::Object(Box::new(serde_json::from_value(v)?))
                };
                Ok(item)
            }
            other => Err(Error::UnexpectedShape(other.to_string())),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        let v = match self {
            Item::Iri(iri) => Value::String(iri.as_str().to_string()),
            Item::Object(o) => serde_json::to_value(o.as_ref())?,
            Item::Actor(a) => serde_json::to_value(a.as_ref())?,
            Item::Activity(a) | Item::IntransitiveActivity(a) => {
                serde_json::to_value(a.as_ref())?
            }
            Item::Collection(c) => serde_json::to_value(c.as_ref())?,
            Item::Tombstone(t) => serde_json::to_value(t.as_ref())?,
        };
        Ok(v)
    }
}

impl From<Iri> for Item {
    fn from(iri: Iri) -> Self {
        Item::Iri(iri)
    }
}

fn type_of(map: &Map<String, Value>) -> String {
    match map.get("type") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(vals)) => vals
            .iter()
            .find_map(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Fragment-insensitive membership test over a list of items.
pub fn contains_iri(list: &[Item], iri: &Iri) -> bool {
    list.iter().any(|it| it.id().equals(iri, false))
}

impl Serialize for Item {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.to_value() {
            Ok(v) => v.serialize(s),
            Err(e) => Err(serde::ser::Error::custom(e)),
        }
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D>(d: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        Item::from_value(v).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatches_on_type() {
        let person = Item::from_value(json!({"id": "https://example.com/alice", "type": "Person"}))
            .expect("decode");
        assert!(matches!(person, Item::Actor(_)));

        let like = Item::from_value(json!({"id": "https://example.com/1", "type": "Like"}))
            .expect("decode");
        assert!(matches!(like, Item::Activity(_)));

        let arrive = Item::from_value(json!({"id": "https://example.com/2", "type": "Arrive"}))
            .expect("decode");
        assert!(matches!(arrive, Item::IntransitiveActivity(_)));

        let inbox = Item::from_value(json!({"id": "https://example.com/i", "type": "OrderedCollection"}))
            .expect("decode");
        assert!(matches!(inbox, Item::Collection(_)));

        let note = Item::from_value(json!({"id": "https://example.com/n", "type": "Note"}))
            .expect("decode");
        assert!(matches!(note, Item::Object(_)));

        let link = Item::from_value(json!("https://example.com/n")).expect("decode");
        assert!(link.is_link());
    }

    #[test]
    fn unknown_fields_survive() {
        let v = json!({
            "id": "https://example.com/n",
            "type": "Note",
            "content": "hi",
            "sensitive": true,
            "@context": "https://www.w3.org/ns/activitystreams"
        });
        let it = Item::from_value(v.clone()).expect("decode");
        let back = it.to_value().expect("encode");
        assert_eq!(back.get("sensitive"), v.get("sensitive"));
        assert_eq!(back.get("@context"), v.get("@context"));
    }

    #[test]
    fn single_value_audience_becomes_list() {
        let v = json!({
            "id": "https://example.com/n",
            "type": "Note",
            "to": "https://www.w3.org/ns/activitystreams#Public"
        });
        let it = Item::from_value(v).expect("decode");
        let base = it.base().expect("objectful");
        assert_eq!(base.to.len(), 1);
    }

    #[test]
    fn published_truncates_to_seconds() {
        let v = json!({
            "id": "https://example.com/n",
            "type": "Note",
            "published": "2024-03-01T12:30:45.123456789Z"
        });
        let it = Item::from_value(v).expect("decode");
        let published = it.base().expect("objectful").published.expect("published");
        assert_eq!(published.timestamp_subsec_nanos(), 0);

        let back = it.to_value().expect("encode");
        assert_eq!(
            back.get("published").and_then(|v| v.as_str()),
            Some("2024-03-01T12:30:45Z")
        );
    }

    #[test]
    fn collection_push_tracks_total() {
        let mut col = Collection::ordered(Iri::new("https://example.com/inbox"));
        col.push(Item::Iri(Iri::new("https://example.com/1")));
        col.push(Item::Iri(Iri::new("https://example.com/2")));
        assert_eq!(col.total_items, Some(2));
        assert_eq!(col.members().len(), 2);
        assert!(col.contains(&Iri::new("https://example.com/1#frag")));
    }

    #[test]
    fn nested_activity_sides_decode() {
        let v = json!({
            "id": "https://example.com/act/1",
            "type": "Create",
            "actor": "https://example.com/alice",
            "object": {"id": "https://example.com/n/1", "type": "Note", "content": "hello"}
        });
        let it = Item::from_value(v).expect("decode");
        let act = it.as_activity().expect("activity");
        assert!(act.actor.as_deref().is_some_and(Item::is_link));
        assert!(act.object.as_deref().is_some_and(Item::is_objectful));
    }
}
