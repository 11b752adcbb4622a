//! # cmsc Common Library
//!
//! Shared code for the cmsc command-line tools including:
//! - Error type used across crates
//! - Bootstrap configuration loading (TOML)
//! - Slug generation
//! - Identifier utilities

pub mod config;
pub mod error;
pub mod slug;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use slug::slugify;
