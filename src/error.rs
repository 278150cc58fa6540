//! # Errores del Servidor
//! src/error.rs
//!
//! Fallas que terminan en una respuesta HTTP de error. Cada variante tiene
//! exactamente un status code (ver [`ServeError::status`]).
//!
//! | Variante            | Status |
//! |---------------------|--------|
//! | `MalformedRequest`  | 400    |
//! | `UnsupportedMethod` | 405    |
//! | `TraversalAttempt`  | 403    |
//! | `PermissionDenied`  | 403    |
//! | `MissingResource`   | 404    |
//! | `Internal`          | 500    |
//!
//! La saturación del pool y los timeouts de socket no pasan por aquí:
//! nunca llegan a producir una respuesta.

use crate::http::{Response, StatusCode};
use std::io;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServeError {
    #[error("malformed request line")]
    MalformedRequest,

    #[error("method not allowed: {0}")]
    UnsupportedMethod(String),

    #[error("path escapes the document root: {0}")]
    TraversalAttempt(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("resource not found: {0}")]
    MissingResource(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServeError {
    /// Status code de la respuesta para este error
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::MalformedRequest => StatusCode::BadRequest,
            ServeError::UnsupportedMethod(_) => StatusCode::MethodNotAllowed,
            ServeError::TraversalAttempt(_) | ServeError::PermissionDenied(_) => {
                StatusCode::Forbidden
            }
            ServeError::MissingResource(_) => StatusCode::NotFound,
            ServeError::Internal(_) => StatusCode::InternalServerError,
        }
    }

    /// Página de error para enviar al cliente
    ///
    /// El mensaje visible es la frase de razón; el detalle interno
    /// (rutas del filesystem, errores de I/O) queda solo en el log.
    pub fn to_response(&self) -> Response {
        let status = self.status();
        Response::error(status, status.reason_phrase())
    }

    /// Clasifica un error de I/O del filesystem para el recurso `uri`
    pub fn from_io(err: &io::Error, uri: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ServeError::MissingResource(uri.to_string()),
            io::ErrorKind::PermissionDenied => ServeError::PermissionDenied(uri.to_string()),
            _ => ServeError::Internal(format!("{}: {}", uri, err)),
        }
    }
}
