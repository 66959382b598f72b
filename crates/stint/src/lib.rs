//! Stint - issue hierarchy and sequencing.
//!
//! Projects own issues arranged in ordered scopes: the root issues of a
//! project, and the children of each root issue. The [`engine`] keeps every
//! scope's positions contiguous through create, move, reparent, detach and
//! delete, enforces project roles, and writes an audit record in the same
//! storage transaction as each mutation.
//!
//! This crate provides both a CLI application and a library over pluggable
//! storage backends.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod domain;
pub mod engine;
pub mod error;
pub mod storage;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

pub mod app;
pub mod config;
pub mod output;
