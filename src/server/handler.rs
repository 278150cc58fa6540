//! # Manejo de una Conexión
//! src/server/handler.rs
//!
//! Ciclo de vida de cada conexión aceptada:
//!
//! ```text
//! Reading ──► Parsed ───► Routed ──────► Resolved ──► Sent ──► Closed
//!    │          │            │                         ▲
//!    │          └► Malformed ┴► RoutingFailed ─────────┘
//!    └──────────────────────────────────────────────────────► Closed
//! ```
//!
//! Un error de lectura (timeout incluido) cierra sin responder. Cualquier
//! otra falla termina en una respuesta de error. Un panic durante la
//! resolución se convierte en 500 y nunca llega al pool.

use crate::error::ServeError;
use crate::files::{NormalizedPath, StaticFiles};
use crate::http::{Method, Request, Response};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, trace, warn};

/// Estados por los que pasa una conexión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Reading,
    Parsed,
    Malformed,
    Routed,
    RoutingFailed,
    Resolved,
    Sent,
    Closed,
}

/// Atiende conexiones contra un document root
///
/// No tiene estado mutable: se comparte entre workers con un `Arc`.
#[derive(Debug, Clone)]
pub struct ConnectionHandler {
    files: Arc<StaticFiles>,
}

impl ConnectionHandler {
    pub fn new(files: Arc<StaticFiles>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &StaticFiles {
        &self.files
    }

    /// Atiende una conexión TCP completa y la cierra
    pub fn run(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let span = info_span!("conn", peer = %peer);
        let _enter = span.enter();

        match stream.try_clone() {
            Ok(read_half) => {
                self.handle(BufReader::new(read_half), &stream);
            }
            Err(e) => error!(error = %e, "no se pudo clonar el socket"),
        }

        close(&stream);
    }

    /// Lee un request de `reader`, escribe la respuesta en `writer` y
    /// retorna el último estado alcanzado antes de cerrar (`Sent` si la
    /// respuesta se envió completa, `Closed` si no).
    pub fn handle<R, W>(&self, reader: R, writer: W) -> ConnectionState
    where
        R: BufRead,
        W: Write,
    {
        let start = Instant::now();
        trace!(state = ?ConnectionState::Reading);

        let request = match Request::parse(reader) {
            Ok(request) => request,
            Err(e) => {
                log_read_error(&e);
                return ConnectionState::Closed;
            }
        };

        let (response, state) = self.respond(&request);
        trace!(state = ?state);

        let include_body = Method::from_token(request.method()) != Some(Method::Head);
        match response.write_to(writer, include_body) {
            Ok(()) => {
                info!(
                    method = request.method(),
                    uri = request.uri(),
                    status = response.status(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "request atendido"
                );
                ConnectionState::Sent
            }
            Err(e) => {
                warn!(error = %e, status = response.status(), "error enviando la respuesta");
                ConnectionState::Closed
            }
        }
    }

    /// Decide la respuesta para un request ya parseado
    ///
    /// Retorna también el estado en que terminó el ruteo: `Malformed`,
    /// `RoutingFailed` o `Resolved`.
    pub fn respond(&self, request: &Request) -> (Response, ConnectionState) {
        if !request.is_valid() {
            debug!("request malformado");
            return (
                ServeError::MalformedRequest.to_response(),
                ConnectionState::Malformed,
            );
        }
        trace!(state = ?ConnectionState::Parsed, request = %request);

        if Method::from_token(request.method()).is_none() {
            debug!(method = request.method(), "método no permitido");
            let response = ServeError::UnsupportedMethod(request.method().to_string())
                .to_response()
                .with_header("Allow", "GET, HEAD");
            return (response, ConnectionState::RoutingFailed);
        }
        trace!(state = ?ConnectionState::Routed);

        let path = NormalizedPath::from_uri(request.uri());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.files.resolve(&path)));

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                match &err {
                    ServeError::Internal(detail) => error!(%detail, "falla resolviendo el recurso"),
                    other => debug!(error = %other, "recurso no servido"),
                }
                err.to_response()
            }
            Err(_) => {
                error!(uri = request.uri(), "panic resolviendo el recurso");
                ServeError::Internal(request.uri().to_string()).to_response()
            }
        };
        (response, ConnectionState::Resolved)
    }
}

fn log_read_error(e: &io::Error) {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
            warn!("timeout leyendo el request, cerrando conexión")
        }
        _ => warn!(error = %e, "error leyendo el request"),
    }
}

fn close(stream: &TcpStream) {
    if let Err(e) = stream.shutdown(Shutdown::Both) {
        // NotConnected es normal si el cliente ya cerró
        if e.kind() != io::ErrorKind::NotConnected {
            debug!(error = %e, "error cerrando el socket");
        }
    }
    trace!(state = ?ConnectionState::Closed);
}
