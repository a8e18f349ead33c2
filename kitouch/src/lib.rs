//! KITouch library
//!
//! Contact records and the reminder scheduling engine, exposed for the
//! binary and for integration tests.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
