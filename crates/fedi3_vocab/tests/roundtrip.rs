/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use fedi3_vocab::{decode_item, encode_item, Activity, Collection, Iri, Item, Object};

fn iri() -> impl Strategy<Value = Iri> {
    "[a-z]{1,8}(/[a-z0-9]{1,8}){0,3}"
        .prop_map(|p| Iri::new(format!("https://example.com/{p}")))
}

fn note() -> impl Strategy<Value = Item> {
    (
        iri(),
        prop::option::of("[a-zA-Z0-9 ]{0,24}"),
        prop::option::of(0i64..2_000_000_000i64),
    )
        .prop_map(|(id, content, secs)| {
            let mut o = Object::new(id, "Note");
            o.content = content;
            o.published = secs.map(|s| Utc.timestamp_opt(s, 0).unwrap());
            Item::Object(Box::new(o))
        })
}

fn create() -> impl Strategy<Value = Item> {
    (iri(), iri(), note()).prop_map(|(id, actor, obj)| {
        let mut a = Activity::default();
        a.base = Object::new(id, "Create");
        a.actor = Some(Box::new(Item::Iri(actor)));
        a.object = Some(Box::new(obj));
        Item::Activity(Box::new(a))
    })
}

fn ordered_collection() -> impl Strategy<Value = Item> {
    (iri(), prop::collection::vec(iri(), 0..6)).prop_map(|(id, members)| {
        let mut col = Collection::ordered(id);
        for m in members {
            col.push(Item::Iri(m));
        }
        Item::Collection(Box::new(col))
    })
}

proptest! {
    #[test]
    fn note_round_trips(it in note()) {
        let raw = encode_item(&it).unwrap();
        prop_assert_eq!(decode_item(&raw).unwrap(), it);
    }

    #[test]
    fn create_round_trips(it in create()) {
        let raw = encode_item(&it).unwrap();
        prop_assert_eq!(decode_item(&raw).unwrap(), it);
    }

    #[test]
    fn collection_round_trips(it in ordered_collection()) {
        let raw = encode_item(&it).unwrap();
        prop_assert_eq!(decode_item(&raw).unwrap(), it);
    }

    #[test]
    fn encoding_is_a_function(it in note()) {
        prop_assert_eq!(encode_item(&it).unwrap(), encode_item(&it).unwrap());
    }
}
