mod client;

pub use client::GoTrueProvider;
