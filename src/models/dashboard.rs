//! Role dashboard payloads produced by the dashboard data provider.

use serde::{Deserialize, Serialize};

/// A headline figure with an optional trend delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kpi {
    pub title: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<i64>,
}

impl Kpi {
    pub fn new(title: &str, value: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            value: value.into(),
            change: None,
        }
    }

    pub fn with_change(mut self, change: i64) -> Self {
        self.change = Some(change);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassPerformance {
    pub name: String,
    pub performance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDashboard {
    pub kpis: Vec<Kpi>,
    pub performance_data: Vec<ClassPerformance>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherClass {
    pub id: String,
    pub name: String,
    pub student_count: i64,
}

/// Morning/evening roll call for one student.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attendance {
    pub morning: bool,
    pub evening: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterEntry {
    pub id: String,
    pub name: String,
    pub attendance: Attendance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub name: String,
    pub status: String,
    pub level: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Announcement {
    pub id: u32,
    pub title: String,
    pub date: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchoolHeadDashboard {
    pub kpis: Vec<Kpi>,
    pub resource_inventory: Vec<InventoryItem>,
    pub announcements: Vec<Announcement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngagementPoint {
    pub name: String,
    pub students: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Initiative {
    pub id: u32,
    pub name: String,
    pub status: String,
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountyDashboard {
    pub kpis: Vec<Kpi>,
    pub engagement_data: Vec<EngagementPoint>,
    pub initiatives: Vec<Initiative>,
}

/// Dashboard for whichever role is asking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum Dashboard {
    Teacher(TeacherDashboard),
    SchoolHead(SchoolHeadDashboard),
    County(CountyDashboard),
}
