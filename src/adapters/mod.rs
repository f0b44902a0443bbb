//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, file I/O, metrics export).
//!
//! Adapter categories:
//! - `api`: Polymarket Gamma, CLOB and Data-API REST clients
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: JSON scan snapshots and JSONL signal logging

pub mod api;
pub mod metrics;
pub mod persistence;
