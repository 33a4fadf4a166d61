#[cfg(feature = "postgrest")]
pub mod builder;
pub mod dbs;
pub mod error;
pub mod models;
pub mod trait_client;

#[cfg(feature = "postgrest")]
pub use builder::StoreBuilder;
pub use dbs::memory::{Fault, MemoryStore, StoreOp, FREE_DAILY_QUERY_LIMIT};
#[cfg(feature = "postgrest")]
pub use dbs::postgrest::PostgrestClient;
pub use error::{PersistError, Result};
pub use models::{
    MessageRecord, NewMessage, NewThread, NewTransaction, SubscriptionRecord, SubscriptionUpsert,
    ThreadRecord, TransactionRecord,
};
pub use trait_client::{AdminStore, BillingStore, ConversationStore, ProfileStore, UsageStore};
