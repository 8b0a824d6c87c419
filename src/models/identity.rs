//! Authenticated identity and role model.

use serde::{Deserialize, Serialize};

/// Portal role, stored in the identity provider's user metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Student,
    Teacher,
    SchoolHead,
    CountyOfficer,
    Parent,
    MinistryOfficial,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "STUDENT",
            UserRole::Teacher => "TEACHER",
            UserRole::SchoolHead => "SCHOOL_HEAD",
            UserRole::CountyOfficer => "COUNTY_OFFICER",
            UserRole::Parent => "PARENT",
            UserRole::MinistryOfficial => "MINISTRY_OFFICIAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STUDENT" => Some(UserRole::Student),
            "TEACHER" => Some(UserRole::Teacher),
            "SCHOOL_HEAD" => Some(UserRole::SchoolHead),
            "COUNTY_OFFICER" => Some(UserRole::CountyOfficer),
            "PARENT" => Some(UserRole::Parent),
            "MINISTRY_OFFICIAL" => Some(UserRole::MinistryOfficial),
            _ => None,
        }
    }
}

/// Metadata attached to a user record at the identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// The signed-in user with role-derived attributes.
///
/// Role, school and county are fixed for the lifetime of a session; only the
/// display fields change through profile updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: UserRole,
    pub school_id: String,
    pub county: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
}

impl Identity {
    /// Build an identity from provider metadata.
    ///
    /// Returns `None` when the metadata is incomplete: role and county are always
    /// required, and every role except county officer also needs a school id.
    pub fn from_metadata(id: &str, email: Option<&str>, metadata: &UserMetadata) -> Option<Self> {
        let role = metadata.role.as_deref().and_then(UserRole::parse)?;
        let county = non_blank(metadata.county.as_deref())?;
        let school_id = match non_blank(metadata.school_id.as_deref()) {
            Some(school_id) => school_id,
            None if role == UserRole::CountyOfficer => String::new(),
            None => return None,
        };

        Some(Self {
            id: id.to_string(),
            email: email.map(str::to_string),
            role,
            school_id,
            county,
            display_name: metadata.full_name.clone(),
            avatar_ref: metadata.avatar_url.clone(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Request body for a profile update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(role: &str, school_id: Option<&str>, county: Option<&str>) -> UserMetadata {
        UserMetadata {
            role: Some(role.to_string()),
            school_id: school_id.map(str::to_string),
            county: county.map(str::to_string),
            full_name: Some("asha".to_string()),
            avatar_url: None,
        }
    }

    #[test]
    fn test_complete_identity() {
        let meta = metadata("TEACHER", Some("sch-1"), Some("Nairobi"));
        let identity = Identity::from_metadata("u1", Some("a@school.ac.ke"), &meta).unwrap();
        assert_eq!(identity.role, UserRole::Teacher);
        assert_eq!(identity.school_id, "sch-1");
        assert_eq!(identity.display_name.as_deref(), Some("asha"));
    }

    #[test]
    fn test_missing_school_is_incomplete_for_teacher() {
        let meta = metadata("TEACHER", None, Some("Nairobi"));
        assert!(Identity::from_metadata("u1", None, &meta).is_none());
    }

    #[test]
    fn test_county_officer_without_school() {
        let meta = metadata("COUNTY_OFFICER", Some("  "), Some("Kisumu"));
        let identity = Identity::from_metadata("u2", None, &meta).unwrap();
        assert_eq!(identity.school_id, "");
        assert_eq!(identity.county, "Kisumu");
    }

    #[test]
    fn test_unknown_role_is_incomplete() {
        let meta = metadata("JANITOR", Some("sch-1"), Some("Nairobi"));
        assert!(Identity::from_metadata("u3", None, &meta).is_none());
    }

    #[test]
    fn test_role_roundtrip_strings() {
        for role in [
            UserRole::Student,
            UserRole::Teacher,
            UserRole::SchoolHead,
            UserRole::CountyOfficer,
            UserRole::Parent,
            UserRole::MinistryOfficial,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
    }
}
