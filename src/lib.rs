pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod identity;
pub mod output;
pub mod providers;
pub mod runner;
pub mod search;
pub mod store;
