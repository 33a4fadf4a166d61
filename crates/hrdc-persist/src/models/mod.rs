mod db_billing;
mod db_message;
mod db_thread;

// Row models as the store serializes them
pub use db_billing::{NewTransaction, SubscriptionRecord, SubscriptionUpsert, TransactionRecord};
pub use db_message::{MessageRecord, NewMessage};
pub use db_thread::{NewThread, ThreadRecord};
