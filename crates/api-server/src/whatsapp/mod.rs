//! WhatsApp webhook processing
//!
//! Turns one inbound WhatsApp notification into an agent query and sends the
//! agent's text replies back to the sender.

mod relay;

pub use relay::{handle_notification, RelayError};
