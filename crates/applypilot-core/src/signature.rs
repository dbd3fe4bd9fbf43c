//! Dedup signatures for recheck passes.
//!
//! A signature commits to `(current_url, page_type, task_id)`. `page_type` is
//! a coarse structural fingerprint computed straight from the snapshot,
//! without running any classifier, so an unchanged page can be recognised
//! before any classification work is done.
//!
//! Hash input layout (bytes, in order):
//!   1. url as UTF-8 bytes, then a 0x00 separator
//!   2. page_type as UTF-8 bytes, then a 0x00 separator
//!   3. task_id as UTF-8 bytes

use sha2::{Digest, Sha256};

use url::Url;

use applypilot_contracts::page::PageSnapshot;

/// Hex characters of each digest kept in the page type.
const TEXT_DIGEST_LEN: usize = 16;

/// Coarse fingerprint of what kind of page this is.
///
/// Covers every snapshot field a classifier reads: control counts, password
/// presence, inline errors, the normalised title and visible text, markers,
/// frame hosts, visible button texts and form actions. Frame query strings
/// are left out so a rotating embed token does not defeat the dedup.
pub fn page_type(page: &PageSnapshot) -> String {
    let fillable = page.fillable_inputs().count();
    let password = page.has_password_field();
    let submit = page.has_submit_control();

    format!(
        "fillable={fillable};password={password};submit={submit};errors={};text={};structure={}",
        page.error_markers,
        text_digest(&page.title, &page.visible_text),
        structure_digest(page),
    )
}

/// Compute the dedup signature for one pass. Returns a 64-character hex string.
pub fn recheck_signature(url: &str, page_type: &str, task_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update([0u8]);
    hasher.update(page_type.as_bytes());
    hasher.update([0u8]);
    hasher.update(task_id.as_bytes());
    hex::encode(hasher.finalize())
}

fn text_digest(title: &str, text: &str) -> String {
    let normalized = [title, text]
        .iter()
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");
    short_digest(normalized.as_bytes())
}

fn structure_digest(page: &PageSnapshot) -> String {
    let mut markers: Vec<String> = page.markers.iter().map(|m| m.trim().to_lowercase()).collect();
    markers.sort();
    markers.dedup();

    let mut frames: Vec<String> = page
        .frame_sources
        .iter()
        .map(|src| match Url::parse(src) {
            Ok(url) => url.host_str().unwrap_or_default().to_lowercase(),
            Err(_) => src.trim().to_lowercase(),
        })
        .collect();
    frames.sort();
    frames.dedup();

    let buttons: Vec<String> = page.button_texts().collect();
    let actions: Vec<String> = page.forms.iter().map(|f| f.action.trim().to_lowercase()).collect();

    let mut hasher = Sha256::new();
    for section in [&markers, &frames, &buttons, &actions] {
        for item in section {
            hasher.update(item.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([0xffu8]);
    }
    hex::encode(hasher.finalize())[..TEXT_DIGEST_LEN].to_string()
}

fn short_digest(bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    digest[..TEXT_DIGEST_LEN].to_string()
}
