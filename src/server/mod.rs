//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! - `tcp`: socket de escucha, thread acceptor y ciclo de vida del servidor
//! - `handler`: lo que hace un worker con cada conexión aceptada
//!
//! ```text
//! acceptor ──accept──► WorkerPool::submit ──► worker-N ──► ConnectionHandler::run
//! ```

pub mod handler;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use handler::{ConnectionHandler, ConnectionState};
pub use tcp::Server;
