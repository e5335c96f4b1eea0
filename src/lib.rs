//! Core library for the `strest-cluster` controller.
//!
//! Controllers of one cluster share an agent registry and a TTL cache and
//! otherwise never talk to each other. Each one reconciles the registry
//! against the agents attached to it, drains commands other controllers
//! posted for its region, polls system snapshots on request, and answers
//! per-user capacity queries. The binary wires these pieces to SQLite and a
//! TCP agent listener; the library APIs may evolve with it.
pub mod agents;
pub mod args;
pub mod cluster;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod logger;
pub mod ports;
pub mod scheduler;
pub mod shutdown;
pub mod store;
