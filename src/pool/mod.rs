//! # Pool de Workers
//! src/pool/mod.rs
//!
//! Ejecuta las conexiones aceptadas con concurrencia acotada. El acceptor
//! nunca bloquea al enviar: la tarea se ejecuta, se encola o se rechaza.

pub mod policy;
pub mod queue;
pub mod stats;
pub mod worker_pool;

/// Unidad de trabajo del pool
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub use policy::{DropAndLog, RejectionPolicy};
pub use stats::PoolStats;
pub use worker_pool::{PoolConfig, Submission, WorkerPool};
