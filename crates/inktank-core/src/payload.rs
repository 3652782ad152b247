//! Allow-listed request payloads and the validation helpers they share.
//!
//! Every create or patch body is parsed against an explicit field list before
//! serde sees it, so an unexpected key is reported by name instead of being
//! silently merged into a document.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result};

/// A JSON body accepted by a create or update operation.
pub trait Payload: DeserializeOwned {
  /// Top-level keys this payload accepts. Anything else is rejected.
  const FIELDS: &'static [&'static str];

  /// Field-level checks that serde cannot express.
  fn validate(&self) -> Result<()> { Ok(()) }

  /// Parse and validate a raw JSON body.
  fn parse(value: Value) -> Result<Self> {
    let object = value
      .as_object()
      .ok_or_else(|| Error::validation("body", "expected a JSON object"))?;

    if let Some(unknown) = object
      .keys()
      .find(|key| !Self::FIELDS.contains(&key.as_str()))
    {
      return Err(Error::validation(unknown.as_str(), "unknown field"));
    }

    let payload: Self = serde_json::from_value(value)
      .map_err(|e| Error::validation("body", e.to_string()))?;
    payload.validate()?;
    Ok(payload)
  }
}

// ─── Field checks ─────────────────────────────────────────────────────────────

/// A required string must carry something other than whitespace.
pub(crate) fn required(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::validation(field, "must not be empty"));
  }
  Ok(())
}

/// Like [`required`], but for a value that may be absent.
pub(crate) fn required_if_present(field: &str, value: Option<&str>) -> Result<()> {
  value.map_or(Ok(()), |v| required(field, v))
}

/// Ratings are whole stars, one through five.
pub(crate) fn rating(value: i64) -> Result<u8> {
  match u8::try_from(value) {
    Ok(v @ 1..=5) => Ok(v),
    _ => Err(Error::validation("rating", format!("{value} is outside 1..=5"))),
  }
}

/// A book has at least one page.
pub(crate) fn length(value: i64) -> Result<u32> {
  match u32::try_from(value) {
    Ok(v) if v >= 1 => Ok(v),
    _ => Err(Error::validation("length", format!("{value} is less than 1"))),
  }
}

/// Sub-document patches only write strings that are present and non-empty;
/// an empty string leaves the stored value alone.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;
  use serde_json::json;

  use super::*;

  #[derive(Debug, Deserialize)]
  struct Probe {
    text: String,
  }

  impl Payload for Probe {
    const FIELDS: &'static [&'static str] = &["text"];

    fn validate(&self) -> Result<()> { required("text", &self.text) }
  }

  #[test]
  fn unknown_key_is_named_in_the_error() {
    let err = Probe::parse(json!({ "text": "hi", "comments": [] })).unwrap_err();
    match err {
      Error::ValidationFailed { field, .. } => assert_eq!(field, "comments"),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn non_object_body_is_rejected() {
    assert!(matches!(
      Probe::parse(json!(["text"])),
      Err(Error::ValidationFailed { .. })
    ));
  }

  #[test]
  fn validate_runs_after_deserialising() {
    assert!(matches!(
      Probe::parse(json!({ "text": "   " })),
      Err(Error::ValidationFailed { .. })
    ));
    assert_eq!(Probe::parse(json!({ "text": "ok" })).unwrap().text, "ok");
  }

  #[test]
  fn rating_bounds_are_inclusive() {
    assert_eq!(rating(1).unwrap(), 1);
    assert_eq!(rating(5).unwrap(), 5);
    assert!(rating(0).is_err());
    assert!(rating(6).is_err());
    assert!(rating(-3).is_err());
  }

  #[test]
  fn empty_patch_strings_are_dropped() {
    assert_eq!(non_empty(Some(String::new())), None);
    assert_eq!(non_empty(Some("  ".into())), None);
    assert_eq!(non_empty(Some("x".into())), Some("x".into()));
    assert_eq!(non_empty(None), None);
  }
}
