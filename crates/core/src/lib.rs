//! Fernmart Core - Shared types library.
//!
//! This crate provides common types used across all Fernmart components:
//! - `storefront` - client engine for the Fernmart commerce API
//! - `cli` - command-line admin console
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, phone numbers,
//!   money parsing, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
