//! Application services layer.

pub mod auth;
pub mod error;
pub mod filter;
pub mod forms;
pub mod news;
pub mod pagination;
pub mod repos;
