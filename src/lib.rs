//! Admin back office for blog posts: CRUD with tags, categories, a header
//! image and slug generation, served as a JSON API over axum.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
