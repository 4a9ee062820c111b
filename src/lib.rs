//! cosmowall library
//!
//! Fetches NASA's Astronomy Picture of the Day, keeps a local cache of the
//! pictures and their captions, and drives the optional wallpaper, viewer and
//! narration features. The modules are exposed for the binary and for
//! integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod desktop;
pub mod logging;
pub mod narration;
pub mod reconciler;
pub mod ui;
