//! School directory record.

use serde::{Deserialize, Serialize};

/// A school registered in the directory. `(name, county)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: String,
    pub name: String,
    pub county: String,
    pub created_at: String,
}

/// Request body for registering a new school.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolRequest {
    pub name: String,
    pub county: String,
}

/// Query parameters for listing schools.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolQuery {
    #[serde(default)]
    pub county: Option<String>,
}
