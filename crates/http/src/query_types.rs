//! Request/query types (Deserialize)

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FieldQuery {
    pub field: String,
    pub value: String,
}

/// Optional caller-chosen id for strict create.
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionQuery {
    pub id: Option<String>,
}
