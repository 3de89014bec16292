pub mod app;
pub mod cache;
pub mod checksum;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod jobs;
pub mod metadata;
pub mod output;
pub mod select;
pub mod store;
pub mod summary;
pub mod worker;
