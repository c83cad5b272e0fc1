//! The build pipeline: table to static site.
//!
//! `SiteGenerator` drives one run; everything else is a stage it composes.

pub mod assembler;
pub mod assets;
pub mod cache;
pub mod context;
pub mod html;
pub mod links;
pub mod page;
pub mod render;
pub mod scheduler;
pub mod sitemap;
pub mod tree;

pub use assembler::{BuildError, GenerateOptions, SiteGenerator};
