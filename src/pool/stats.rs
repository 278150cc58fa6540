//! # Estadísticas del Pool
//! src/pool/stats.rs

use serde::Serialize;
use std::fmt;

/// Snapshot de los contadores del pool
///
/// Los campos se leen uno por uno: no es una foto linealizable, solo una
/// lectura aproximada del momento.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Workers vivos
    pub pool_size: usize,

    /// Workers ejecutando una tarea
    pub active_workers: usize,

    /// Tareas esperando en la cola
    pub queue_depth: usize,

    /// Tareas terminadas (con éxito o con panic)
    pub completed_tasks: u64,

    /// Conexiones recibidas desde el arranque
    pub total_connections: u64,

    /// Conexiones admitidas que todavía no terminaron
    pub active_connections: usize,
}

impl PoolStats {
    /// Representación JSON para logs
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PoolStats{{poolSize={}, active={}, queue={}, completed={}, total={}, current={}}}",
            self.pool_size,
            self.active_workers,
            self.queue_depth,
            self.completed_tasks,
            self.total_connections,
            self.active_connections
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let stats = PoolStats {
            pool_size: 4,
            active_workers: 2,
            queue_depth: 1,
            completed_tasks: 10,
            total_connections: 13,
            active_connections: 3,
        };
        assert_eq!(
            stats.to_string(),
            "PoolStats{poolSize=4, active=2, queue=1, completed=10, total=13, current=3}"
        );
    }

    #[test]
    fn test_json() {
        let json = PoolStats::default().to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pool_size"], 0);
        assert_eq!(value["active_connections"], 0);
    }
}
