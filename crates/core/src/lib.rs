//! Content model, caching and store access for the advisory firm's website.
//!
//! The public pages read through [`site::SiteData`], which caches the
//! content-fetch client's results and substitutes the built-in fallback copy
//! whenever the content store cannot be reached. Operators write through
//! [`admin::AdminService`].

pub mod admin;
pub mod auth;
pub mod cache;
pub mod config;
pub mod content;
pub mod events;
pub mod fetch;
pub mod site;
pub mod sitemap;
pub mod store;
