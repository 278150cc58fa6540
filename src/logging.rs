//! # Logging
//! src/logging.rs
//!
//! Los componentes emiten eventos `tracing`; este módulo solo arma el
//! subscriber del binario. Formato: timestamp, nivel, nombre del thread
//! (`acceptor`, `worker-N`) y los campos del span `conn`.

use tracing_subscriber::EnvFilter;

/// Filtro de eventos: `RUST_LOG` si está definido, si no `level`
///
/// Un nivel inválido cae a `info`.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Instala el subscriber global
///
/// Si ya había uno instalado (tests, llamadas repetidas) no hace nada.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(false)
        .with_thread_names(true)
        .try_init();
}
