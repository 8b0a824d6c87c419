//! Per-user settings kept in the key-value store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Attendance;

/// A student's chosen grade and subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudentSettings {
    pub grade_level: u8,
    pub current_subject: String,
}

/// Stored settings, or a signal that the setup flow must run first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentSettingsView {
    pub setup_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<StudentSettings>,
}

/// Stored attendance overrides for one class, keyed by student id.
pub type AttendanceMap = HashMap<String, Attendance>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceSlot {
    Morning,
    Evening,
}

/// Request body for flipping one attendance checkbox.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceToggle {
    pub student_id: String,
    pub slot: AttendanceSlot,
}

/// Teacher guidance passed to the AI tutor for their students.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Customization {
    pub text: String,
}
