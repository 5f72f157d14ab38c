// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for metadata normalization

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use wmex_newsletter::{extract_metadata, MediaHostResolver, MetadataSource, NewsletterMetadata};
use wmex_node::BinaryNode;

fn reply(payload: &Value) -> BinaryNode {
    BinaryNode::new("iq").with_children(vec![
        BinaryNode::new("result").with_bytes(serde_json::to_vec(payload).unwrap())
    ])
}

fn resolver() -> MediaHostResolver {
    MediaHostResolver::new("https://mmg.whatsapp.net")
}

/// Arbitrary JSON leaves, including the wrong types for every field
fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>().prop_map(|f| json!(f)),
        "[0-9]{0,20}".prop_map(Value::String),
        ".{0,12}".prop_map(Value::String),
    ]
}

/// Objects that use the real field names, so lookups hit populated and
/// mistyped branches rather than only missing ones
fn arb_entity() -> impl Strategy<Value = Value> {
    let keys = prop::sample::select(vec![
        "id", "state", "type", "thread_metadata", "viewer_metadata", "creation_time", "name",
        "text", "update_time", "description", "invite", "picture", "preview", "direct_path",
        "settings", "reaction_codes", "value", "subscribers_count", "verification", "role", "mute",
    ]);
    arb_leaf().prop_recursive(4, 64, 6, move |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
            prop::collection::vec((keys.clone(), inner), 0..6).prop_map(|pairs| {
                let map: Map<String, Value> =
                    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
                Value::Object(map)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn test_never_panics_on_partial_trees(entity in arb_entity(), create in any::<bool>()) {
        let source = if create { MetadataSource::Create } else { MetadataSource::Fetch };
        let payload = json!({"data": {(source.path()): entity}});

        let result = extract_metadata(&reply(&payload), source, &resolver());
        prop_assert!(result.is_ok());
    }

    #[test]
    fn test_deleted_unless_both_blocks_present(thread in any::<bool>(), viewer in any::<bool>()) {
        let mut entity = json!({"id": "1@newsletter", "state": {"type": "ACTIVE"}});
        if thread {
            entity["thread_metadata"] = json!({"name": {"text": "Daily"}});
        }
        if viewer {
            entity["viewer_metadata"] = json!({"role": "GUEST"});
        }
        let payload = json!({"data": {"xwa2_newsletter": entity}});

        let metadata = extract_metadata(&reply(&payload), MetadataSource::Fetch, &resolver())
            .unwrap()
            .unwrap();
        prop_assert_eq!(metadata.is_deleted(), !(thread && viewer));
    }

    #[test]
    fn test_creation_time_parses_base_10(time in 0i64..=i64::MAX, as_string in any::<bool>()) {
        let raw = if as_string { json!(time.to_string()) } else { json!(time) };
        let payload = json!({"data": {"xwa2_newsletter": {
            "thread_metadata": {"creation_time": raw, "subscribers_count": time.to_string()},
            "viewer_metadata": {"role": "SUBSCRIBER"}
        }}});

        let metadata = extract_metadata(&reply(&payload), MetadataSource::Fetch, &resolver())
            .unwrap()
            .unwrap();
        let record = metadata.record().unwrap();
        prop_assert_eq!(record.creation_time, time);
        prop_assert_eq!(record.subscribers, time as u64);
    }

    #[test]
    fn test_deleted_shape_is_exact(id in "[0-9]{1,18}@newsletter", state in "[A-Z_]{1,12}") {
        let payload = json!({"data": {"xwa2_newsletter": {
            "id": id,
            "state": {"type": state},
            "thread_metadata": null,
            "viewer_metadata": null
        }}});

        let metadata = extract_metadata(&reply(&payload), MetadataSource::Fetch, &resolver())
            .unwrap()
            .unwrap();
        prop_assert!(matches!(metadata, NewsletterMetadata::Deleted(_)));
        prop_assert_eq!(
            serde_json::to_value(&metadata).unwrap(),
            json!({"id": id, "state": state, "deleted": true})
        );
    }
}

#[test]
fn test_missing_creation_time_defaults_to_zero() {
    let payload = json!({"data": {"xwa2_newsletter": {
        "thread_metadata": {"name": {"text": "x"}},
        "viewer_metadata": {}
    }}});
    let metadata = extract_metadata(&reply(&payload), MetadataSource::Fetch, &resolver())
        .unwrap()
        .unwrap();
    assert_eq!(metadata.record().unwrap().creation_time, 0);
}
