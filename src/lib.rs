//! # Static Server
//! src/lib.rs
//!
//! Servidor HTTP/1.x de archivos estáticos con concurrencia acotada: un
//! thread acepta conexiones y un pool elástico de workers (con cola
//! acotada y política de rechazo) las atiende, una petición por conexión.
//!
//! ## Arquitectura
//!
//! - `config`: configuración por CLI, entorno y archivo JSON
//! - `logging`: subscriber de `tracing`
//! - `http`: parsing de requests, construcción de responses, MIME
//! - `files`: normalización de URIs, contención en el document root, listados
//! - `pool`: pool de workers con cola acotada y admisión explícita
//! - `server`: acceptor y manejo de cada conexión
//! - `error`: errores que terminan en una respuesta HTTP
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use static_server::config::Config;
//! use static_server::server::Server;
//!
//! let config = Config::default();
//! config.prepare_document_root().unwrap();
//!
//! let server = Server::start(config).unwrap();
//! println!("escuchando en {}", server.local_addr());
//! server.shutdown();
//! ```

pub mod config;
pub mod error;
pub mod files;
pub mod http;
pub mod logging;
pub mod pool;
pub mod server;
