//! Per-student controller registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::ChatController;
use crate::ai::AiGateway;

/// Maps student ids to their chat controller.
#[derive(Default)]
pub struct ChatRegistry {
    controllers: RwLock<HashMap<String, Arc<ChatController>>>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing controller for a student, if one was ever created.
    pub async fn get(&self, student_id: &str) -> Option<Arc<ChatController>> {
        self.controllers.read().await.get(student_id).cloned()
    }

    /// Controller for a student, created on first use.
    pub async fn get_or_create(&self, student_id: &str, gateway: &AiGateway) -> Arc<ChatController> {
        if let Some(controller) = self.get(student_id).await {
            return controller;
        }

        let mut controllers = self.controllers.write().await;
        Arc::clone(
            controllers
                .entry(student_id.to_string())
                .or_insert_with(|| Arc::new(ChatController::new(gateway.clone()))),
        )
    }

    /// Tear down and forget a student's controller, e.g. on sign-out.
    pub async fn remove(&self, student_id: &str) {
        if let Some(controller) = self.controllers.write().await.remove(student_id) {
            controller.teardown();
        }
    }
}
