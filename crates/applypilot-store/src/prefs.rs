//! Versioned automation preferences over a `SessionStore`.
//!
//! Records are validated against the JSON Schema for their declared version,
//! migrated forward one version at a time, and validated again at the
//! current version before they are trusted. A record without a `version`
//! field is treated as version 1.
//!
//! | version | layout                                                     |
//! |---------|------------------------------------------------------------|
//! | 1       | `{ auto_fill, session? }`                                  |
//! | 2       | `{ version, global: { autofill_enabled, telemetry_enabled }, session? }` |

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use applypilot_contracts::{
    error::{PilotError, PilotResult},
    prefs::AutomationPreferences,
};
use applypilot_core::{
    keys,
    traits::{PreferencesStore, SessionStore},
};

use crate::schema;

/// A `PreferencesStore` persisting one record under `applypilot.preferences`.
pub struct JsonPreferencesStore {
    store: Arc<dyn SessionStore>,
}

impl JsonPreferencesStore {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

impl PreferencesStore for JsonPreferencesStore {
    /// Read the stored record.
    ///
    /// A missing record yields defaults. So does a record that fails
    /// validation, with a warning: a corrupt preferences blob must never stop
    /// the engine. An older record is migrated and written back.
    fn load(&self) -> PilotResult<AutomationPreferences> {
        let Some(raw) = self.store.get(keys::PREFERENCES)? else {
            debug!("no stored preferences; using defaults");
            return Ok(AutomationPreferences::default());
        };

        let stored_version = declared_version(&raw);
        match upgrade(raw) {
            Ok(prefs) => {
                if stored_version != Some(AutomationPreferences::CURRENT_VERSION) {
                    self.save(&prefs)?;
                }
                Ok(prefs)
            }
            Err(e) => {
                warn!(error = %e, "stored preferences are invalid; falling back to defaults");
                Ok(AutomationPreferences::default())
            }
        }
    }

    fn save(&self, prefs: &AutomationPreferences) -> PilotResult<()> {
        let mut prefs = prefs.clone();
        prefs.version = AutomationPreferences::CURRENT_VERSION;
        keys::save(self.store.as_ref(), keys::PREFERENCES, &prefs)
    }

    /// Unlike `load`, an invalid record is reported to the caller and
    /// nothing is written.
    fn import(&self, raw: Value) -> PilotResult<AutomationPreferences> {
        let prefs = upgrade(raw)?;
        self.save(&prefs)?;
        info!(
            autofill_enabled = prefs.global.autofill_enabled,
            telemetry_enabled = prefs.global.telemetry_enabled,
            "preferences imported"
        );
        Ok(prefs)
    }
}

fn declared_version(raw: &Value) -> Option<u32> {
    raw.get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

/// Validate `raw` at its version, migrate it to the current layout and
/// deserialize it.
pub fn upgrade(raw: Value) -> PilotResult<AutomationPreferences> {
    let mut record = raw;
    let mut version = match record.get("version") {
        None => 1,
        Some(_) => declared_version(&record).ok_or_else(|| PilotError::SchemaValidation {
            reason: format!("preferences version is not a number: {}", record["version"]),
        })?,
    };

    loop {
        match version {
            1 => {
                validate(&schema::preferences_v1(), &record, 1)?;
                record = migrate_v1_to_v2(record);
                debug!("preferences migrated from version 1 to 2");
                version = 2;
            }
            2 => {
                validate(&schema::preferences_v2(), &record, 2)?;
                break;
            }
            other => {
                return Err(PilotError::SchemaValidation {
                    reason: format!(
                        "preferences version {} is newer than supported version {}",
                        other,
                        AutomationPreferences::CURRENT_VERSION
                    ),
                })
            }
        }
    }

    serde_json::from_value(record).map_err(|e| PilotError::SchemaValidation {
        reason: format!("preferences do not deserialize: {}", e),
    })
}

/// `auto_fill` becomes `global.autofill_enabled`; `telemetry_enabled` is new
/// and defaults on.
fn migrate_v1_to_v2(v1: Value) -> Value {
    let autofill = v1.get("auto_fill").and_then(Value::as_bool).unwrap_or(true);
    let session = v1.get("session").cloned().unwrap_or(Value::Null);
    json!({
        "version": 2,
        "global": {
            "autofill_enabled": autofill,
            "telemetry_enabled": true
        },
        "session": session
    })
}

fn validate(schema: &Value, record: &Value, version: u32) -> PilotResult<()> {
    let validator = jsonschema::validator_for(schema).map_err(|e| PilotError::SchemaValidation {
        reason: format!("invalid preferences schema v{}: {}", version, e),
    })?;

    let violations: Vec<String> = validator
        .iter_errors(record)
        .map(|error| format!("at '{}': {}", error.instance_path, error))
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(PilotError::SchemaValidation {
            reason: format!("preferences v{} rejected: {}", version, violations.join("; ")),
        })
    }
}
