//! # Tipos MIME
//! src/http/mime.rs
//!
//! Resolución de `Content-Type` por extensión de archivo.

use std::path::Path;

/// Tipo usado cuando la extensión no se reconoce
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Content-Type para un archivo según su extensión
///
/// Los tipos textuales llevan `; charset=UTF-8`.
///
/// # Ejemplo
/// ```
/// use static_server::http::mime::content_type_for;
///
/// assert_eq!(content_type_for("index.html"), "text/html; charset=UTF-8");
/// assert_eq!(content_type_for("logo.png"), "image/png");
/// assert_eq!(content_type_for("archivo"), "application/octet-stream");
/// ```
pub fn content_type_for<P: AsRef<Path>>(path: P) -> String {
    let mime = match mime_guess::from_path(path.as_ref()).first() {
        Some(mime) => mime,
        None => return DEFAULT_MIME_TYPE.to_string(),
    };

    let essence = mime.essence_str();
    if is_textual(&mime) {
        format!("{}; charset=UTF-8", essence)
    } else {
        essence.to_string()
    }
}

fn is_textual(mime: &mime_guess::Mime) -> bool {
    if mime.type_() == mime_guess::mime::TEXT {
        return true;
    }
    matches!(
        mime.essence_str(),
        "application/javascript" | "application/json" | "application/xml"
    )
}
