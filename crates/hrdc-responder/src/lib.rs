pub mod config;
pub mod error;
pub mod reply;
pub mod scripted;
pub mod traits;
pub mod webhook;

pub use config::WebhookConfig;
pub use error::{ResponderError, Result};
pub use reply::{ResponderReply, MESSAGE_FIELDS};
pub use scripted::ScriptedResponder;
pub use traits::{Responder, ResponderRequest, UserProfile};
pub use webhook::WebhookResponder;
