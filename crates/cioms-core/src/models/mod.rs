//! Data models and configuration.

pub mod catalog;
pub mod config;
pub mod form;
