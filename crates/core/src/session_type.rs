//! Deployment-defined session types.
//!
//! A type selects the physical collection a session is stored in, so every
//! recognized name doubles as a storage identifier and is restricted to
//! `^[a-z][a-z0-9_]{0,39}$`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::{DEFAULT_SESSION_TYPES, SESSION_TYPES_ENV, ValidationError, split_list};

static TYPE_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,39}$").unwrap());

/// A session type drawn from the recognized set.
///
/// Only obtainable through [`SessionTypes::parse`], which guarantees the
/// name is recognized and safe to use as a collection identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionType(String);

impl SessionType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The set of session types a deployment recognizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTypes {
    names: Vec<String>,
}

impl SessionTypes {
    /// Build a registry from type names.
    ///
    /// Duplicates are dropped; an empty set or a name that is not a valid
    /// collection identifier is an error.
    pub fn new<I, S>(names: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut accepted: Vec<String> = Vec::new();
        let mut violations = Vec::new();
        for name in names {
            let name = name.into();
            if !TYPE_NAME.is_match(&name) {
                violations.push(format!(
                    "invalid session type name '{name}': expected lowercase letters, digits and \
                     underscores, starting with a letter"
                ));
            } else if !accepted.contains(&name) {
                accepted.push(name);
            }
        }
        if accepted.is_empty() && violations.is_empty() {
            violations.push("at least one session type must be configured".to_owned());
        }
        match ValidationError::from_violations(violations) {
            Some(err) => Err(err),
            None => Ok(Self { names: accepted }),
        }
    }

    /// Read the recognized set from `SESSION_TYPES`, or the defaults when unset.
    pub fn from_env() -> Result<Self, ValidationError> {
        match std::env::var(SESSION_TYPES_ENV) {
            Ok(raw) => Self::new(split_list(&raw)),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Resolve a caller-supplied type name.
    pub fn parse(&self, raw: &str) -> Result<SessionType, ValidationError> {
        self.names
            .iter()
            .find(|name| name.as_str() == raw)
            .map(|name| SessionType(name.clone()))
            .ok_or_else(|| ValidationError::new(self.invalid_type_message()))
    }

    #[must_use]
    pub fn contains(&self, raw: &str) -> bool {
        self.names.iter().any(|name| name == raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = SessionType> + '_ {
        self.names.iter().map(|name| SessionType(name.clone()))
    }

    /// e.g. `valid types are: 'main_session' and 'virtual_cohort'`
    #[must_use]
    pub fn invalid_type_message(&self) -> String {
        let quoted: Vec<String> = self.names.iter().map(|n| format!("'{n}'")).collect();
        let listed = match quoted.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} and {last}", rest.join(", ")),
            Some((only, _)) => only.clone(),
            None => String::new(),
        };
        if quoted.len() == 1 {
            format!("valid type is: {listed}")
        } else {
            format!("valid types are: {listed}")
        }
    }
}

impl Default for SessionTypes {
    fn default() -> Self {
        Self { names: DEFAULT_SESSION_TYPES.iter().map(|&n| n.to_owned()).collect() }
    }
}
