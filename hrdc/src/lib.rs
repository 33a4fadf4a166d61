//! # HRDC - chat core for an HR consulting assistant
//!
//! HRDC keeps an authenticated user's conversation threads in sync with a
//! hosted store, relays messages to an external AI responder and meters
//! usage against subscription plans:
//! - **Sessions** (identity provider events, profile enrichment, account cleanup)
//! - **Conversations** (thread state published on `watch` channels, send pipeline with fallback reply)
//! - **Responder** (webhook client with tolerant reply parsing)
//! - **Billing** (free and standard plans, Paystack checkout and verification)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hrdc::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = AppBuilder::new()
//!         .supabase("https://xyz.supabase.co", std::env::var("SUPABASE_ANON_KEY")?)
//!         .responder_url("https://agents.customcx.com/webhook/HDRC")
//!         .build()
//!         .await?;
//!     app.start().await;
//!
//!     app.session().login("ada@example.com", "secret").await?;
//!     let reply = app.submit("How should I structure a probation review?").await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **hrdc-types**: identity, thread, message and billing types
//! - **hrdc-persist**: store traits, PostgREST client and in-memory store
//! - **hrdc-responder**: responder trait and webhook client
//! - **hrdc-auth**: session manager, GoTrue client, session artifacts
//! - **hrdc-chat**: conversation synchronizer
//! - **hrdc-billing**: plans, checkout and payment verification
//!
//! ## Features
//!
//! - `full` (default): All features enabled
//! - `postgrest`: Supabase-backed collaborators and [`AppBuilder::supabase`]

// Re-export all public APIs
pub use hrdc_auth as auth;
pub use hrdc_billing as billing;
pub use hrdc_chat as chat;
pub use hrdc_persist as persist;
pub use hrdc_responder as responder;
pub use hrdc_types as types;

// Re-export commonly used types
pub use hrdc_auth::{IdentityProvider, SessionManager, SessionState};
pub use hrdc_billing::{BillingService, PaymentVerifier};
pub use hrdc_chat::{ChatState, ConversationSynchronizer};
pub use hrdc_responder::Responder;
pub use hrdc_types::{Identity, Message, Thread};

pub mod app;
pub mod builder;
pub mod error;
pub mod tokens;

pub use app::App;
pub use builder::AppBuilder;
pub use error::AppError;
pub use tokens::AccessTokenSink;

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::app::App;
    pub use crate::builder::AppBuilder;
    pub use crate::error::AppError;
    pub use crate::types::{Identity, Message, PlanType, Thread};
    pub use anyhow::Result;
}
