//! PII and credential redaction for observability events.
//!
//! Applied to every event before it is queued, so the raw form never sits
//! in memory longer than the `enqueue` call:
//!
//! | what                          | treatment                                  |
//! |-------------------------------|--------------------------------------------|
//! | credential-bearing keys       | removed outright                           |
//! | email addresses (any string)  | `jo***@example.com`                        |
//! | phone-bearing keys            | last four digits kept                      |
//! | name-bearing keys             | first character kept                       |
//! | credential query parameters   | stripped from the event `url`              |
//!
//! Keys are compared after lowercasing and dropping `_` and `-`, so
//! `first_name`, `firstName` and `first-name` are the same key.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use url::Url;

use applypilot_contracts::telemetry::ObservabilityEvent;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([a-z0-9._%+\-]+)@([a-z0-9\-]+(?:\.[a-z0-9\-]+)*\.[a-z]{2,})")
        .expect("email pattern compiles")
});

/// Substrings that mark a key as carrying a credential.
const CREDENTIAL_FRAGMENTS: &[&str] = &[
    "password",
    "passwd",
    "passcode",
    "secret",
    "token",
    "apikey",
    "authorization",
    "cookie",
    "credential",
];

/// Whole keys that carry a credential but are too short to match as fragments.
const CREDENTIAL_KEYS: &[&str] = &["otp", "pin", "mfacode", "verificationcode"];

/// Query parameters that carry one-time codes or signed access in URLs.
const CREDENTIAL_PARAMS: &[&str] = &["code", "sig", "signature", "auth", "key", "ticket"];

const PHONE_KEYS: &[&str] = &["mobile", "tel", "cell", "cellnumber", "mobilenumber"];

const NAME_KEYS: &[&str] = &[
    "name",
    "firstname",
    "lastname",
    "fullname",
    "givenname",
    "familyname",
    "middlename",
    "preferredname",
    "legalname",
    "candidatename",
];

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn is_credential_key(key: &str) -> bool {
    let k = normalize_key(key);
    CREDENTIAL_FRAGMENTS.iter().any(|f| k.contains(f)) || CREDENTIAL_KEYS.contains(&k.as_str())
}

fn is_credential_param(key: &str) -> bool {
    is_credential_key(key) || CREDENTIAL_PARAMS.contains(&normalize_key(key).as_str())
}

fn is_phone_key(key: &str) -> bool {
    let k = normalize_key(key);
    k.contains("phone") || PHONE_KEYS.contains(&k.as_str())
}

fn is_name_key(key: &str) -> bool {
    NAME_KEYS.contains(&normalize_key(key).as_str())
}

/// Mask every email address in `s`, keeping two local-part characters and the domain.
pub fn mask_emails(s: &str) -> String {
    EMAIL
        .replace_all(s, |caps: &Captures| {
            let local: String = caps[1].chars().take(2).collect();
            format!("{}***@{}", local, &caps[2])
        })
        .into_owned()
}

/// Keep only the last four digits of a phone number.
pub fn mask_phone(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("***{}", tail)
}

/// Keep only the first character of a name.
pub fn mask_name(raw: &str) -> String {
    match raw.trim().chars().next() {
        Some(first) => format!("{}***", first),
        None => String::new(),
    }
}

/// Drop credential-bearing query parameters and userinfo from `raw`.
///
/// Strings that do not parse as URLs only get email masking.
pub fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return mask_emails(raw);
    };

    // Userinfo is a credential by definition. Both setters only fail for
    // URLs that cannot carry one, in which case there is nothing to clear.
    let _ = url.set_username("");
    let _ = url.set_password(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !is_credential_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    mask_emails(url.as_str())
}

/// Redact a JSON value in place.
pub fn redact_value(value: &mut Value) {
    match value {
        Value::String(s) => {
            *s = mask_emails(s);
        }
        Value::Array(items) => {
            for item in items {
                redact_value(item);
            }
        }
        Value::Object(map) => {
            map.retain(|k, _| !is_credential_key(k));
            for (key, v) in map.iter_mut() {
                if is_phone_key(key) {
                    mask_scalar(v, mask_phone);
                } else if is_name_key(key) {
                    mask_scalar(v, mask_name);
                } else {
                    redact_value(v);
                }
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn mask_scalar(value: &mut Value, mask: fn(&str) -> String) {
    match value {
        Value::String(s) => *s = mask(s),
        Value::Number(n) => {
            let masked = mask(&n.to_string());
            *value = Value::String(masked);
        }
        other => redact_value(other),
    }
}

/// Redact an event's url and payload in place.
pub fn redact_event(event: &mut ObservabilityEvent) {
    event.url = redact_url(&event.url);
    redact_value(&mut event.payload);
}
