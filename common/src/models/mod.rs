// common/src/models/mod.rs
pub mod catalog;
pub mod listing;
pub mod order;
pub mod session;
