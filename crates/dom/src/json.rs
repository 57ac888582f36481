//! JSON decoding and tree walks that do not run out of stack on deep documents.
//!
//! A snapshot nests two JSON levels per element, so serde_json's default nesting
//! limit of 128 would cap mirrored trees at roughly 63 elements deep. Decoding here
//! lifts that limit and grows the stack on the heap instead.
use serde::Deserialize;
use serde::de::DeserializeOwned;

const RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// `serde_json::from_str` without the nesting limit.
pub fn from_str<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

/// Runs one level of a recursive walk, moving to a fresh stack segment when the
/// current one is nearly exhausted.
pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_GROWTH, f)
}
