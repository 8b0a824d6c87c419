//! Tutoring chat models.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Coarse classification of a student's learning environment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceLevel {
    #[serde(alias = "LOW")]
    Low,
    #[serde(alias = "MEDIUM")]
    Medium,
    #[serde(alias = "HIGH")]
    High,
}

impl ResourceLevel {
    pub const ALL: [ResourceLevel; 3] = [ResourceLevel::Low, ResourceLevel::Medium, ResourceLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceLevel::Low => "low",
            ResourceLevel::Medium => "medium",
            ResourceLevel::High => "high",
        }
    }

    /// Case-insensitive parse.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(ResourceLevel::Low),
            "medium" => Some(ResourceLevel::Medium),
            "high" => Some(ResourceLevel::High),
            _ => None,
        }
    }
}

/// The tuple that parameterizes one tutoring conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    pub grade_level: u8,
    pub subject: String,
    pub resource_level: ResourceLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization: Option<String>,
}

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 12;

impl ChatContext {
    /// Build a validated context. Blank customization text is treated as absent.
    pub fn new(
        grade_level: u8,
        subject: &str,
        resource_level: ResourceLevel,
        customization: Option<String>,
    ) -> Result<Self, AppError> {
        if !(MIN_GRADE..=MAX_GRADE).contains(&grade_level) {
            return Err(AppError::Validation(format!(
                "Grade level must be between {} and {}",
                MIN_GRADE, MAX_GRADE
            )));
        }
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(AppError::Validation("Subject is required".to_string()));
        }

        Ok(Self {
            grade_level,
            subject: subject.to_string(),
            resource_level,
            customization: customization.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Point-in-time view of a chat session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: u64,
    pub context: ChatContext,
    pub transcript: Vec<ChatMessage>,
    pub in_flight: bool,
}

/// Request body for establishing a tutoring session.
///
/// Resource level and customization are looked up for the student when omitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstablishSessionRequest {
    pub grade_level: u8,
    pub subject: String,
    #[serde(default)]
    pub resource_level: Option<ResourceLevel>,
    #[serde(default)]
    pub customization: Option<String>,
}

/// Request body for one chat turn.
///
/// `session_id` pins the turn to the session the client is looking at; when
/// omitted the currently active session is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<u64>,
}
