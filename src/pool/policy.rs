//! # Política de Rechazo
//! src/pool/policy.rs
//!
//! Qué hacer con una tarea cuando el pool no la puede admitir (cola llena
//! con todos los workers ocupados, o pool apagándose). Se ejecuta en el
//! thread que llamó a `submit` (el acceptor), así que no debe bloquear.

use super::stats::PoolStats;
use super::Task;
use tracing::error;

pub trait RejectionPolicy: Send + Sync {
    /// Recibe la tarea rechazada. Al soltarla se cierra la conexión que
    /// contiene.
    fn rejected(&self, task: Task, stats: &PoolStats);
}

/// Política por defecto: registrar la saturación y descartar la tarea
#[derive(Debug, Default, Clone, Copy)]
pub struct DropAndLog;

impl RejectionPolicy for DropAndLog {
    fn rejected(&self, task: Task, stats: &PoolStats) {
        error!(
            pool_size = stats.pool_size,
            queue_depth = stats.queue_depth,
            active = stats.active_connections,
            "conexión rechazada: pool saturado"
        );
        drop(task);
    }
}

/// Cualquier closure compatible sirve como política
impl<F> RejectionPolicy for F
where
    F: Fn(Task, &PoolStats) + Send + Sync,
{
    fn rejected(&self, task: Task, stats: &PoolStats) {
        self(task, stats)
    }
}
