//! # applypilot-store
//!
//! Storage for the applypilot engine.
//!
//! - [`MemoryStore`]: the shared key-value `SessionStore`
//! - [`JsonPreferencesStore`]: versioned `AutomationPreferences` validated
//!   with JSON Schema and migrated forward on read

pub mod memory;
pub mod prefs;
pub mod schema;

pub use memory::MemoryStore;
pub use prefs::{upgrade, JsonPreferencesStore};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use applypilot_contracts::{
        error::PilotError,
        prefs::{AutomationPreferences, SessionOverrides},
    };
    use applypilot_core::{
        keys,
        traits::{PreferencesStore, SessionStore},
    };

    use super::*;

    fn prefs_over(store: &MemoryStore) -> JsonPreferencesStore {
        JsonPreferencesStore::new(Arc::new(store.clone()))
    }

    // ── MemoryStore ───────────────────────────────────────────────────────────

    #[test]
    fn clones_share_entries() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.put("k", json!({ "n": 1 })).unwrap();

        assert_eq!(b.get("k").unwrap(), Some(json!({ "n": 1 })));
        b.remove("k").unwrap();
        assert!(a.get("k").unwrap().is_none());
        b.remove("k").unwrap();
    }

    // ── Preferences ───────────────────────────────────────────────────────────

    #[test]
    fn missing_record_loads_defaults() {
        let store = MemoryStore::new();
        assert_eq!(prefs_over(&store).load().unwrap(), AutomationPreferences::default());
        assert!(store.keys().is_empty(), "load must not write defaults");
    }

    #[test]
    fn save_then_load_keeps_session_overrides() {
        let store = MemoryStore::new();
        let prefs = prefs_over(&store);
        let mut record = AutomationPreferences::default();
        record.session = Some(SessionOverrides {
            task_id: "t1".to_string(),
            autofill_enabled: Some(false),
        });
        prefs.save(&record).unwrap();

        let loaded = prefs.load().unwrap();
        assert!(!loaded.autofill_enabled_for("t1"));
        assert!(loaded.autofill_enabled_for("t2"));
    }

    #[test]
    fn v1_record_is_migrated_and_written_back() {
        let store = MemoryStore::new();
        store
            .put(
                keys::PREFERENCES,
                json!({ "version": 1, "auto_fill": false, "session": { "task_id": "t1", "autofill_enabled": true } }),
            )
            .unwrap();

        let loaded = prefs_over(&store).load().unwrap();
        assert_eq!(loaded.version, 2);
        assert!(!loaded.global.autofill_enabled);
        assert!(loaded.global.telemetry_enabled);
        assert!(loaded.autofill_enabled_for("t1"));

        let stored = store.get(keys::PREFERENCES).unwrap().unwrap();
        assert_eq!(stored["version"], 2);
        assert_eq!(stored["global"]["autofill_enabled"], false);
    }

    #[test]
    fn unversioned_record_is_treated_as_v1() {
        let prefs = upgrade(json!({ "auto_fill": true })).unwrap();
        assert_eq!(prefs.version, 2);
        assert!(prefs.global.autofill_enabled);
        assert!(prefs.session.is_none());
    }

    #[test]
    fn invalid_stored_record_falls_back_to_defaults() {
        let store = MemoryStore::new();
        store
            .put(keys::PREFERENCES, json!({ "version": 2, "global": { "autofill_enabled": "yes" } }))
            .unwrap();

        assert_eq!(prefs_over(&store).load().unwrap(), AutomationPreferences::default());
    }

    #[test]
    fn import_rejects_invalid_records() {
        let store = MemoryStore::new();
        let prefs = prefs_over(&store);

        match prefs.import(json!({ "version": 2, "global": {} })) {
            Err(PilotError::SchemaValidation { reason }) => {
                assert!(reason.contains("autofill_enabled"), "unexpected reason: {reason}")
            }
            other => panic!("expected SchemaValidation, got {:?}", other),
        }
        assert!(store.get(keys::PREFERENCES).unwrap().is_none());
    }

    #[test]
    fn import_rejects_future_versions() {
        match upgrade(json!({ "version": 9, "global": {} })) {
            Err(PilotError::SchemaValidation { reason }) => assert!(reason.contains("newer"), "{reason}"),
            other => panic!("expected SchemaValidation, got {:?}", other),
        }
    }

    #[test]
    fn import_persists_a_valid_v1_record() {
        let store = MemoryStore::new();
        let imported = prefs_over(&store).import(json!({ "version": 1, "auto_fill": false })).unwrap();

        assert!(!imported.global.autofill_enabled);
        let stored: AutomationPreferences = keys::load(&store, keys::PREFERENCES).unwrap().unwrap();
        assert_eq!(stored, imported);
    }
}
