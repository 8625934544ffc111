// Deterministic fingerprinting of advisory requests. The backend and the
// registry contract identify a request by the keccak256 of its canonical
// JSON form, so the bytes hashed here must match the other side exactly:
// assets sorted by (symbol, percentage), struct fields in declaration order,
// None fields omitted, integral numbers printed without a fractional part,
// and every whitespace character stripped before hashing.

use ethers::utils::keccak256;
use serde_json::Value;
use tracing::warn;

use crate::types::AdvisorRequestInput;

/// Sentinel returned when canonicalization fails. Callers must treat it as
/// "no fingerprint", never as a real hash.
pub const ZERO_HASH: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Stable 32-byte fingerprint of an advisory request, hex encoded with a 0x
/// prefix. Never fails; returns [`ZERO_HASH`] if the input cannot be
/// serialized.
pub fn request_hash(input: &AdvisorRequestInput) -> String {
    match canonical_json(input) {
        Ok(canonical) => {
            let digest = keccak256(canonical.as_bytes());
            format!("0x{}", hex::encode(digest))
        }
        Err(e) => {
            warn!("request fingerprint failed, using zero hash: {}", e);
            ZERO_HASH.to_string()
        }
    }
}

fn canonical_json(input: &AdvisorRequestInput) -> Result<String, serde_json::Error> {
    let mut sorted = input.clone();
    sorted.crypto_assets.sort_by(|a, b| {
        a.symbol.cmp(&b.symbol).then(
            a.percentage
                .partial_cmp(&b.percentage)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });

    let mut value = serde_json::to_value(&sorted)?;
    normalize_numbers(&mut value);

    let json = serde_json::to_string(&value)?;
    // The dashboard strips \s globally, including inside string values.
    Ok(json.chars().filter(|c| !c.is_whitespace()).collect())
}

/// JSON.stringify prints 60.0 as "60"; serde_json would print "60.0".
/// Rewrite every integral float as an integer so both sides agree.
fn normalize_numbers(value: &mut Value) {
    match value {
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if n.as_i64().is_none()
                    && n.as_u64().is_none()
                    && f.fract() == 0.0
                    && f.abs() < 9_007_199_254_740_992.0
                {
                    *n = serde_json::Number::from(f as i64);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize_numbers(item);
            }
        }
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                normalize_numbers(v);
            }
        }
        _ => {}
    }
}
