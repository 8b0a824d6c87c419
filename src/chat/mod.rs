//! Tutoring chat sessions.
//!
//! A [`ChatController`] owns the single live conversation for one student and
//! merges streamed fragments into its transcript. [`ChatRegistry`] hands out one
//! controller per student.

mod controller;
mod registry;

pub use controller::*;
pub use registry::*;
