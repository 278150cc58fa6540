//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementación del protocolo HTTP/1.x escrita a mano. Incluye:
//!
//! - Parsing de requests desde el stream de la conexión
//! - Construcción y serialización de responses
//! - Tabla de status codes
//! - Resolución de tipos MIME
//!
//! ## Alcance
//!
//! Una petición por conexión. No hay keep-alive, pipelining ni chunked
//! transfer encoding: toda respuesta lleva `Connection: close` y un
//! `Content-Length` exacto.

pub mod mime; // Content-Type por extensión
pub mod request; // Parsing de HTTP requests
pub mod response; // Construcción de HTTP responses
pub mod status; // Códigos de estado HTTP

// Re-exportamos los tipos principales para facilitar su uso
pub use request::{Method, Request};
pub use response::{escape_html, Response};
pub use status::StatusCode;
