pub mod memory;

#[cfg(feature = "postgrest")]
pub mod postgrest;
