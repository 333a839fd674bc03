//! # Notification Dispatcher
//!
//! Consumes `notify.users` and pushes one `HolidayDetected` frame to the group of every
//! listed user. The frame is built once and shared by pointer across all recipients.
//! Each user is attempted independently: an unreachable user delivers nothing and does not
//! affect the others.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use super::message::ServerMessage;
use super::registry::ConnectionRegistry;
use crate::bus::consumer::MessageHandler;
use crate::error::HandlerError;
use crate::model::NotifyCommand;

/// Outcome of dispatching one command.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    /// Users listed in the command.
    pub users: usize,
    /// Users with at least one live connection.
    pub reached_users: usize,
    /// Frames queued across all connections.
    pub connections: usize,
}

pub struct NotificationDispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl NotificationDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Delivers the command's alert to every live connection of every listed user.
    pub fn dispatch(&self, command: &NotifyCommand) -> DispatchReport {
        let mut report = DispatchReport {
            users: command.user_ids.len(),
            ..Default::default()
        };
        if command.user_ids.is_empty() {
            return report;
        }

        let frame = Arc::new(ServerMessage::HolidayDetected(command.alert()));

        for user_id in &command.user_ids {
            let delivered = self.registry.send_to_group(user_id, Arc::clone(&frame));
            if delivered == 0 {
                debug!(user_id = %user_id, "No live connections, skipping");
                continue;
            }
            report.reached_users += 1;
            report.connections += delivered;
        }

        info!(
            country = %command.holiday.country_code,
            holiday = %command.holiday.name,
            users = report.users,
            reached = report.reached_users,
            connections = report.connections,
            "Holiday alert dispatched"
        );
        report
    }
}

#[async_trait]
impl MessageHandler for NotificationDispatcher {
    type Message = NotifyCommand;

    fn name(&self) -> &'static str {
        "notification-dispatcher"
    }

    async fn handle(&self, message: NotifyCommand) -> Result<(), HandlerError> {
        self.dispatch(&message);
        Ok(())
    }
}
