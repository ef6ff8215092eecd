use serde::Serialize;
use serde_json::Value;

use crate::{MIN_SOURCE_LENGTH, SessionType, SessionTypes, ValidationError, checksum};

/// A stored JSON document owned by a `source` and partitioned by `type`.
///
/// `data` is kept as structured JSON so that field-level queries work, and
/// `checksum` is always derived from it: the two are only ever changed
/// together. `id` stays `None` until the repository assigns or accepts one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    source: String,
    #[serde(rename = "type")]
    session_type: SessionType,
    data: Value,
    #[serde(skip)]
    checksum: String,
}

impl Session {
    /// Validate and construct a session from caller input.
    ///
    /// Reports every violation at once: a short `source`, an unrecognized
    /// `type` and an unparseable payload all end up in the same error.
    pub fn new(
        source: &str,
        session_type: &str,
        raw_data: &str,
        types: &SessionTypes,
    ) -> Result<Self, ValidationError> {
        let mut violations = Vec::new();
        if let Err(err) = validate_source(source) {
            violations.extend(err.violations().iter().cloned());
        }
        let session_type = match types.parse(session_type) {
            Ok(t) => Some(t),
            Err(err) => {
                violations.extend(err.violations().iter().cloned());
                None
            },
        };
        let data = match parse_data(raw_data) {
            Ok(d) => Some(d),
            Err(err) => {
                violations.extend(err.violations().iter().cloned());
                None
            },
        };
        if let Some(err) = ValidationError::from_violations(violations) {
            return Err(err);
        }
        match (session_type, data) {
            (Some(session_type), Some(data)) => {
                let checksum = checksum(&data);
                Ok(Self { id: None, source: source.to_owned(), session_type, data, checksum })
            },
            _ => Err(ValidationError::new("session could not be constructed")),
        }
    }

    /// Rebuild a session that was already persisted.
    #[must_use]
    pub fn restore(
        id: String,
        source: String,
        session_type: SessionType,
        data: Value,
        checksum: String,
    ) -> Self {
        Self { id: Some(id), source, session_type, data, checksum }
    }

    /// Attach a caller-supplied identifier (strict create).
    pub fn with_id(mut self, id: &str) -> Result<Self, ValidationError> {
        if id.trim().is_empty() {
            return Err(ValidationError::new("id must not be blank"));
        }
        self.id = Some(id.to_owned());
        Ok(self)
    }

    /// Record the identifier assigned by the store.
    pub fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    /// Replace the payload, recomputing the checksum.
    ///
    /// On error the session is left untouched.
    pub fn replace_data(&mut self, raw_data: &str) -> Result<(), ValidationError> {
        let data = parse_data(raw_data)?;
        self.checksum = checksum(&data);
        self.data = data;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub const fn session_type(&self) -> &SessionType {
        &self.session_type
    }

    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

/// `source` must be at least [`MIN_SOURCE_LENGTH`] characters.
pub fn validate_source(source: &str) -> Result<(), ValidationError> {
    if source.chars().count() < MIN_SOURCE_LENGTH {
        return Err(ValidationError::new(format!(
            "source has a minimum length of {MIN_SOURCE_LENGTH}"
        )));
    }
    Ok(())
}

/// Parse a raw payload into a JSON object or array.
pub fn parse_data(raw_data: &str) -> Result<Value, ValidationError> {
    let data: Value = serde_json::from_str(raw_data)
        .map_err(|e| ValidationError::new(format!("data is not valid JSON: {e}")))?;
    if !(data.is_object() || data.is_array()) {
        return Err(ValidationError::new("data must be a JSON object or array"));
    }
    Ok(data)
}
