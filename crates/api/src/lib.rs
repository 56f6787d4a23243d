//! HTTP surface of the advisory site: public pages, the admin dashboard and
//! its JSON API.

pub mod background;
pub mod config;
pub mod error;
pub mod middleware;
pub mod pages;
pub mod routes;
pub mod state;

pub use routes::build_router;
