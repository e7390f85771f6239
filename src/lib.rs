//! The library code for the `runestone` static site generator. A build runs
//! in three steps:
//!
//! 1. Loading content items from Markdown sources ([`crate::loader`])
//! 2. Deriving the named collections templates read from
//!    ([`crate::collection`])
//! 3. Rendering pages, copying static files, and writing the feed
//!    ([`crate::build`])
//!
//! The second step is the interesting one. Besides the `posts` collection it
//! derives the tag list, which excludes the structural tags in
//! [`collection::RESERVED_TAGS`], and the series list, which groups the items
//! of each multi-part series and orders them by date.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod collection;
pub mod config;
pub mod feed;
pub mod filters;
pub mod item;
pub mod loader;
pub mod markdown;
pub mod shortcode;
pub mod value;
pub mod write;
