//! # Archivos Estáticos
//! src/files/mod.rs
//!
//! ```text
//! URI → NormalizedPath → StaticFiles::resolve → Response (archivo | listado)
//! ```
//!
//! - `normalize`: decodificación y limpieza de la URI
//! - `resolver`: contención dentro del document root y lectura de archivos
//! - `listing`: HTML para directorios sin `index.html`

pub mod listing;
pub mod normalize;
pub mod resolver;

pub use normalize::NormalizedPath;
pub use resolver::StaticFiles;
