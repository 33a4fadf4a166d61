mod client;

pub use client::PostgrestClient;
