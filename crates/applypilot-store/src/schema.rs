//! JSON Schemas for stored preference records, one per layout version.

use serde_json::{json, Value};

/// Version 1: a flat record with a single `auto_fill` switch.
pub fn preferences_v1() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["auto_fill"],
        "properties": {
            "version": { "const": 1 },
            "auto_fill": { "type": "boolean" },
            "session": { "$ref": "#/$defs/session" }
        },
        "$defs": { "session": session_def() }
    })
}

/// Version 2: global settings plus optional session overrides.
pub fn preferences_v2() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["version", "global"],
        "properties": {
            "version": { "const": 2 },
            "global": {
                "type": "object",
                "required": ["autofill_enabled", "telemetry_enabled"],
                "properties": {
                    "autofill_enabled": { "type": "boolean" },
                    "telemetry_enabled": { "type": "boolean" }
                }
            },
            "session": { "$ref": "#/$defs/session" }
        },
        "$defs": { "session": session_def() }
    })
}

fn session_def() -> Value {
    json!({
        "type": ["object", "null"],
        "required": ["task_id"],
        "properties": {
            "task_id": { "type": "string", "minLength": 1 },
            "autofill_enabled": { "type": ["boolean", "null"] }
        }
    })
}
