//! Data models for the portal service.
//!
//! Field names serialize in camelCase to match the browser client's interfaces.

mod analysis;
mod auth;
mod chat;
mod dashboard;
mod identity;
mod school;
mod settings;

pub use analysis::*;
pub use auth::*;
pub use chat::*;
pub use dashboard::*;
pub use identity::*;
pub use school::*;
pub use settings::*;
