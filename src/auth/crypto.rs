//! Telegram signature verification
//!
//! The login widget signs its fields with HMAC-SHA256 keyed by
//! SHA-256(bot token). Bot-to-server requests reuse the same key over the
//! raw request body. Comparisons go through `Mac::verify_slice`, which is
//! constant time.

use hmac::{digest::InvalidLength, Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng, RngCore};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_FIELD: &str = "hash";

fn mac_for(bot_token: &str) -> Result<HmacSha256, InvalidLength> {
    let key = Sha256::digest(bot_token.as_bytes());
    HmacSha256::new_from_slice(&key)
}

/// Canonical data-check string: `key=value` lines sorted by key, signature excluded
pub fn widget_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != SIGNATURE_FIELD)
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hex signature the widget would attach to `fields`
pub fn sign_widget_fields(
    fields: &BTreeMap<String, String>,
    bot_token: &str,
) -> Result<String, InvalidLength> {
    let mut mac = mac_for(bot_token)?;
    mac.update(widget_check_string(fields).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check the `hash` entry of `fields` against the remaining fields
pub fn verify_widget_signature(fields: &BTreeMap<String, String>, bot_token: &str) -> bool {
    let Some(signature) = fields.get(SIGNATURE_FIELD) else {
        return false;
    };
    let (Ok(signature), Ok(mut mac)) = (hex::decode(signature), mac_for(bot_token)) else {
        return false;
    };

    mac.update(widget_check_string(fields).as_bytes());
    mac.verify_slice(&signature).is_ok()
}

/// Hex signature over a raw request body
pub fn sign_payload(body: &[u8], bot_token: &str) -> Result<String, InvalidLength> {
    let mut mac = mac_for(bot_token)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_payload_signature(body: &[u8], signature_hex: &str, bot_token: &str) -> bool {
    let (Ok(signature), Ok(mut mac)) = (hex::decode(signature_hex.trim()), mac_for(bot_token))
    else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// 256 random bits, hex-encoded
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Short upper-case alphanumeric code for humans to type
pub fn random_code(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}
