//! Table integration tests
//!
//! End-to-end behaviour through the public `doctable` facade.

mod common;

mod composite_index;
mod concurrency;
mod expiry;
mod index_consistency;
mod spatial;
mod wire_scan;
