//! HTTP route handlers for the shipping mark web application.
//!
//! Listing routes return JSON, label routes return PDF bytes. Every error is
//! a JSON `{ "error": message }` body.

mod api;
mod labels;
mod pages;

pub use api::{addresses, pdf_files, profiles};
pub use labels::{generate, preview};
pub use pages::index;
