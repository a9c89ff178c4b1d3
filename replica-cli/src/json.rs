//! JSON rendering of replicated values.

use replica_types::{Snapshot, Value};
use serde_json::{json, Map, Value as Json};

/// Render a response as `{ key: { "version": v, "value": ... } }`.
pub fn snapshot_to_json(snapshot: &Snapshot) -> Json {
    let mut out = Map::new();
    for (key, entry) in snapshot.iter() {
        out.insert(
            key.to_string(),
            json!({
                "version": entry.version,
                "value": value_to_json(&entry.value),
            }),
        );
    }
    Json::Object(out)
}

/// Render one value.
///
/// Custom values keep their type name; the payload is decoded from
/// MessagePack without knowing the type.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Nil => Json::Null,
        Value::Bool(b) => Json::from(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => Json::from(*f),
        Value::Str(s) => Json::from(s.as_str()),
        Value::Bytes(b) => Json::from(b.clone()),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::Custom { type_name, payload } => {
            let decoded = rmp_serde::from_slice::<Json>(payload)
                .unwrap_or_else(|_| Json::from(payload.clone()));
            json!({ "type": type_name, "payload": decoded })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn scalars_and_containers() {
        let mut map = BTreeMap::new();
        map.insert("n".to_string(), Value::Nil);
        map.insert("list".to_string(), Value::List(vec![Value::from(1), Value::from("x")]));

        assert_eq!(value_to_json(&Value::Map(map)), json!({"n": null, "list": [1, "x"]}));
        assert_eq!(value_to_json(&Value::from(1.5)), json!(1.5));
        assert_eq!(value_to_json(&Value::bytes(vec![1u8, 2])), json!([1, 2]));
    }

    #[test]
    fn custom_payload_is_decoded_generically() {
        let payload = rmp_serde::to_vec(&("a", 2)).unwrap();
        let value = Value::Custom {
            type_name: "demo.Pair".into(),
            payload,
        };
        assert_eq!(
            value_to_json(&value),
            json!({"type": "demo.Pair", "payload": ["a", 2]})
        );
    }

    #[test]
    fn snapshot_rendering() {
        let mut snapshot = Snapshot::new();
        snapshot.set("motd", 3, "hi");
        assert_eq!(
            snapshot_to_json(&snapshot),
            json!({"motd": {"version": 3, "value": "hi"}})
        );
    }
}
