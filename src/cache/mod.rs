//! Cache module for the local APOD store
//!
//! This module provides the on-disk store that maps calendar dates to the
//! downloaded picture and its caption. The whole document is read, mutated and
//! written back in one piece; there is no locking between processes, so two
//! concurrent invocations can lose each other's update.

mod store;

pub use store::{CacheEntry, CacheError, CacheStore, STORE_FILE_NAME};
