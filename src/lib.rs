//! trackmux - track-level editing for media files
//!
//! This library crate exposes the front end's config loading for
//! integration testing. The domain lives in `trackmux-core` and
//! `trackmux-av`.

pub mod config;
