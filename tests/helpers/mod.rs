//! Test helpers module
//!
//! This module provides utilities and helpers for testing the EventHub service.
//! It includes the router test context, upstream mock servers, test data
//! builders and the optional Postgres helper.

#![allow(dead_code)]

pub mod database_helper;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use test_context::*;
pub use test_data::*;
