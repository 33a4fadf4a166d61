mod client;

pub use client::WebhookResponder;
