//! # Schema Merging
//!
//! Combines a base schema (e.g. router-level `baseHeaders`) with a more
//! specific one (route-level `headers`).
//!
//! ## Rules
//!
//! - Absent + absent is absent; absent + present is the present one.
//! - Two object schemas produce an object schema declaring the union of
//!   both property sets. On a name collision the specific schema's property
//!   definition wins, and so does its opinion on whether the field is
//!   required.
//! - Unknown-key policy: strict if either side is strict; otherwise
//!   passthrough if either side is passthrough; otherwise strip. A
//!   passthrough result keeps that side's `additionalProperties` value, so
//!   a sub-schema still constrains the extra keys (the specific side's
//!   wins when both have one).
//! - If either side is not an object schema, the specific schema wins.

use serde_json::{Map, Value};

use crate::schema::{Schema, UnknownKeys};

/// Merge `base` with `specific`, `specific` winning on conflicts.
pub fn merge(base: Option<&Schema>, specific: Option<&Schema>) -> Option<Schema> {
    match (base, specific) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (Some(base), Some(specific)) => {
            if !base.is_object_schema() || !specific.is_object_schema() {
                return Some(specific.clone());
            }
            let document = merge_documents(base, specific);
            // Both halves compiled on their own; a combined failure can only
            // come from colliding `$defs`, where the specific side stands.
            Some(Schema::new(document).unwrap_or_else(|_| specific.clone()))
        }
    }
}

/// Policy of a merged object schema.
pub fn merged_policy(base: UnknownKeys, specific: UnknownKeys) -> UnknownKeys {
    use UnknownKeys::*;
    match (base, specific) {
        (Strict, _) | (_, Strict) => Strict,
        (Passthrough, _) | (_, Passthrough) => Passthrough,
        (Strip, Strip) => Strip,
    }
}

fn merge_documents(base: &Schema, specific: &Schema) -> Value {
    let empty = Map::new();
    let base_props = base.properties().unwrap_or(&empty);
    let specific_props = specific.properties().unwrap_or(&empty);

    let mut properties = base_props.clone();
    for (name, definition) in specific_props {
        properties.insert(name.clone(), definition.clone());
    }

    let mut required: Vec<Value> = Vec::new();
    let base_required = base
        .required()
        .into_iter()
        .filter(|name| !specific_props.contains_key(*name));
    for name in base_required.chain(specific.required()) {
        let name = Value::String(name.to_string());
        if !required.contains(&name) {
            required.push(name);
        }
    }

    let mut document = Map::new();
    document.insert("type".to_string(), Value::String("object".to_string()));
    document.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        document.insert("required".to_string(), Value::Array(required));
    }

    let defs = merge_defs(base.document(), specific.document());
    if !defs.is_empty() {
        document.insert("$defs".to_string(), Value::Object(defs));
    }

    let policy = merged_policy(base.unknown_keys(), specific.unknown_keys());
    let keyword = match policy {
        // Keep the sub-schema of the side that asked for passthrough.
        UnknownKeys::Passthrough => [specific, base]
            .into_iter()
            .filter(|side| side.unknown_keys() == UnknownKeys::Passthrough)
            .find_map(|side| side.document().get("additionalProperties").cloned()),
        _ => policy.keyword_value(),
    };
    if let Some(keyword) = keyword {
        document.insert("additionalProperties".to_string(), keyword);
    }

    Value::Object(document)
}

fn merge_defs(base: &Value, specific: &Value) -> Map<String, Value> {
    let mut defs = Map::new();
    for source in [base, specific] {
        if let Some(entries) = source.get("$defs").and_then(Value::as_object) {
            for (name, definition) in entries {
                defs.insert(name.clone(), definition.clone());
            }
        }
    }
    defs
}
