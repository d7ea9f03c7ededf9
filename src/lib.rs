//! photo-fs - browse a photo library as a virtual filesystem
//!
//! This crate indexes the EXIF metadata of a real photo tree and exposes it as
//! four read/write views:
//! - `date`: year / month / day folders
//! - `albums`: one folder per label, with a `selects` subfolder
//! - `tags`: nested folders of applied tags
//! - `camera`: alternating attribute / value folders
//!
//! The index lives in SQLite, is owned by a single writer process per root,
//! and is kept in step with the real tree by a scan at startup and a live
//! filesystem watcher afterwards.

pub mod config;
pub mod fs;
pub mod metadata;
pub mod service;
pub mod state_machine;
pub mod storage;
pub mod sync;
#[cfg(test)]
pub mod testutil;
pub mod views;
