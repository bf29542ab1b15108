//! Client-side state: the query cache, the optimistic data layer, the
//! activity ledger, and persisted session records.

pub mod activity_log;
pub mod cache;
pub mod persist;
pub mod session;
pub mod user_store;
