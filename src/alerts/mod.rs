//! Alert delivery
//!
//! Audits format a [`Notification`] and hand it to the [`AlertChannel`],
//! which prefixes the environment label and publishes through a
//! [`Notifier`] sink.

pub mod channel;
pub mod notifier;

pub use channel::{AlertChannel, Notification, MAX_SUBJECT_LEN};
pub use notifier::{LogNotifier, Notifier, NotifierError, WebhookNotifier};
