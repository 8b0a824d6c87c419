//! Role-gated view selection.

use serde::Serialize;

use crate::models::UserRole;

/// Screens a signed-in user can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum View {
    TeacherDashboard,
    TeacherHub,
    SchoolHeadDashboard,
    CountyOfficerDashboard,
    CountyAddSchool,
    StudentTutor,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::TeacherDashboard => "Teacher Dashboard",
            View::TeacherHub => "My Hub",
            View::SchoolHeadDashboard => "School Dashboard",
            View::CountyOfficerDashboard => "County Dashboard",
            View::CountyAddSchool => "Add New School",
            View::StudentTutor => "Mwalimu AI",
        }
    }

    /// Sidebar label; differs from the title only for the teacher dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            View::TeacherDashboard => "Dashboard",
            other => other.title(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TeacherDashboard" => Some(View::TeacherDashboard),
            "TeacherHub" => Some(View::TeacherHub),
            "SchoolHeadDashboard" => Some(View::SchoolHeadDashboard),
            "CountyOfficerDashboard" => Some(View::CountyOfficerDashboard),
            "CountyAddSchool" => Some(View::CountyAddSchool),
            "StudentTutor" => Some(View::StudentTutor),
            _ => None,
        }
    }
}

/// Views available to `role`, in sidebar order.
pub fn views_for(role: UserRole) -> &'static [View] {
    match role {
        UserRole::Student => &[View::StudentTutor],
        UserRole::Teacher => &[View::TeacherDashboard, View::TeacherHub],
        UserRole::SchoolHead => &[View::SchoolHeadDashboard],
        UserRole::CountyOfficer => &[View::CountyOfficerDashboard, View::CountyAddSchool],
        UserRole::Parent | UserRole::MinistryOfficial => &[],
    }
}

/// The view opened right after sign-in.
pub fn default_view(role: UserRole) -> Option<View> {
    views_for(role).first().copied()
}

/// Header title for the active view, falling back to the role's default.
pub fn header_title(active: Option<View>, role: UserRole) -> &'static str {
    active
        .filter(|view| views_for(role).contains(view))
        .or_else(|| default_view(role))
        .map(|view| view.title())
        .unwrap_or("SyncSenta")
}

/// Navigation state sent to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub views: Vec<NavItem>,
    pub default_view: Option<View>,
    pub title: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavItem {
    pub view: View,
    pub label: &'static str,
}

impl Navigation {
    pub fn for_role(role: UserRole, active: Option<View>) -> Self {
        Self {
            views: views_for(role)
                .iter()
                .map(|&view| NavItem {
                    view,
                    label: view.label(),
                })
                .collect(),
            default_view: default_view(role),
            title: header_title(active, role),
        }
    }

    /// Navigation for a session whose profile is incomplete.
    pub fn empty() -> Self {
        Self {
            views: Vec::new(),
            default_view: None,
            title: "SyncSenta",
        }
    }
}
