//! Configuration, store filters and CLI output types.

pub mod config;
pub mod db;
pub mod output;
