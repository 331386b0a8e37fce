//! services/api/src/lib.rs
//!
//! The HTTP and WebSocket service for vocabulary exams. The binaries in
//! `src/bin` wire these modules together.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
