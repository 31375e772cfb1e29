//! Outbound notification channels
//!
//! Webhook-style sinks for operator alerting: a Slack Block Kit
//! notifier for real-time messages and a generic ticket webhook for
//! the critical-only tracking path.

mod slack;
mod ticket;

pub use slack::{SlackMessage, SlackNotifier};
pub use ticket::WebhookTicketTracker;
