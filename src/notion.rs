//! The remote boundary of the pipeline: fetching the site table and page
//! trees from the www.notion.so `api/v3` endpoints.

mod client;
mod parse;

pub use client::{NotionClient, NotionError};
