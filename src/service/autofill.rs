//! Values generated for fields the caller left empty: random ids and strings, timestamps.

use crate::config::{FieldDef, LetterCase, ModelTag, RandKind, RandSpec, RandStrSpec};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;

/// Unix seconds.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn rand_uint(spec: &RandSpec) -> u64 {
    let mut rng = rand::thread_rng();
    if spec.kind == RandKind::DatePrefix {
        return date_prefix(&mut rng);
    }
    if let Some((start, end)) = spec.range {
        return rng.gen_range(start..end);
    }
    match spec.kind {
        RandKind::Uint32 => rng.gen::<u32>() as u64,
        RandKind::Uint | RandKind::Uint64 | RandKind::DatePrefix => rng.gen::<u64>(),
    }
}

/// `YYYYMMDD` followed by ten random digits.
fn date_prefix(rng: &mut impl Rng) -> u64 {
    let day: u64 = chrono::Utc::now()
        .format("%Y%m%d")
        .to_string()
        .parse()
        .unwrap_or(0);
    day * 10_000_000_000 + rng.gen_range(0..10_000_000_000u64)
}

pub fn rand_string(spec: &RandStrSpec) -> String {
    let s: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(spec.len)
        .map(char::from)
        .collect();
    match spec.case {
        Some(LetterCase::Upper) => s.to_uppercase(),
        Some(LetterCase::Lower) => s.to_lowercase(),
        None => s,
    }
}

/// Random value for a `rand` or `randstr` tag; `None` for any other tag.
/// Tags were validated at registration, so parse failures only skip generation.
pub fn random_for_tag(tag: &ModelTag) -> Option<Value> {
    match tag.name.as_str() {
        "rand" => RandSpec::parse(tag).ok().map(|s| Value::Number(rand_uint(&s).into())),
        "randstr" => RandStrSpec::parse(tag).ok().map(|s| Value::String(rand_string(&s))),
        _ => None,
    }
}

/// Regenerate a field's random value from its tags, if it has a random tag.
pub fn regenerate(field: &FieldDef) -> Option<Value> {
    field.tags.iter().find_map(random_for_tag)
}
