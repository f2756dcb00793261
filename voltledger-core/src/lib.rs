// src/lib.rs

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod eventbus;
pub mod payments;
pub mod push;
pub mod repositories;
pub mod services;
pub mod tasks;
pub mod test_utils;

pub use db::Database;
pub use voltledger_common::error::Error;
