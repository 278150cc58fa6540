//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! API para construir respuestas y serializarlas al socket.
//!
//! ## Formato en el cable
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Date: Sat, 17 Oct 2026 10:00:00 GMT\r\n
//! Server: static_server/0.1.0\r\n
//! Connection: close\r\n
//! Content-Type: text/plain; charset=UTF-8\r\n
//! Content-Length: 5\r\n
//! \r\n
//! hello
//! ```
//!
//! El orden de los headers es el de inserción: primero `Date`, `Server` y
//! `Connection`, luego los que agregue quien construye la respuesta.
//! Reemplazar un header existente conserva su posición.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use static_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "text/plain; charset=UTF-8")
//!     .with_body(b"hello".to_vec());
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::status::{reason_phrase, StatusCode};
use std::io::{self, BufWriter, Write};
use std::time::SystemTime;

/// Identificador del servidor para el header `Server`
pub const SERVER_TOKEN: &str = concat!("static_server/", env!("CARGO_PKG_VERSION"));

/// Content-Type por defecto de los bodies de texto
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// Representa una respuesta HTTP completa
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Código numérico (puede no estar en la tabla)
    status: u16,

    /// Headers en orden de inserción
    headers: Vec<(String, String)>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta con los headers por defecto
    /// (`Date`, `Server`, `Connection: close`) y sin body
    pub fn new(status: StatusCode) -> Self {
        Self::with_status_code(status.as_u16())
    }

    /// Igual que [`Response::new`] pero acepta cualquier código numérico.
    /// Códigos fuera de la tabla se muestran como "Unknown".
    pub fn with_status_code(status: u16) -> Self {
        let mut response = Self {
            status,
            headers: Vec::with_capacity(6),
            body: Vec::new(),
        };
        response.add_header("Date", &httpdate::fmt_http_date(SystemTime::now()));
        response.add_header("Server", SERVER_TOKEN);
        response.add_header("Connection", "close");
        response
    }

    /// Agrega o reemplaza un header (versión encadenable)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Agrega o reemplaza un header
    ///
    /// Los nombres se comparan sin distinguir mayúsculas. Si el header ya
    /// existe se sobrescribe en su posición original.
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Establece el body binario y su `Content-Length`
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.add_header("Content-Length", &body.len().to_string());
        self.body = body;
        self
    }

    /// Establece un body de texto. Si todavía no hay `Content-Type` se usa
    /// `text/html; charset=UTF-8`.
    pub fn with_text(self, body: &str) -> Self {
        let mut response = self.with_body(body.as_bytes().to_vec());
        if response.header("Content-Type").is_none() {
            response.add_header("Content-Type", HTML_CONTENT_TYPE);
        }
        response
    }

    /// 200 OK con body HTML
    pub fn ok_html(html: &str) -> Self {
        Self::new(StatusCode::Ok).with_text(html)
    }

    /// Respuesta de error con una página HTML mínima
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::{Response, StatusCode};
    ///
    /// let response = Response::error(StatusCode::NotFound, "Not Found");
    /// let body = String::from_utf8(response.body().to_vec()).unwrap();
    /// assert!(body.contains("<h1>404 Not Found</h1>"));
    /// ```
    pub fn error(status: StatusCode, message: &str) -> Self {
        let html = format!(
            "<!DOCTYPE html>\n\
             <html>\n\
             <head><title>{code} {reason}</title></head>\n\
             <body>\n\
             <h1>{code} {reason}</h1>\n\
             <p>{message}</p>\n\
             <hr>\n\
             <p><em>{server}</em></p>\n\
             </body>\n\
             </html>",
            code = status.as_u16(),
            reason = status.reason_phrase(),
            message = escape_html(message),
            server = SERVER_TOKEN,
        );
        Self::new(status).with_text(&html)
    }

    /// Serializa la respuesta al writer y hace un único flush al final
    ///
    /// Con `include_body == false` (HEAD) se escriben status line y
    /// headers, incluyendo `Content-Length`, pero no el body.
    pub fn write_to<W: Write>(&self, writer: W, include_body: bool) -> io::Result<()> {
        let mut out = BufWriter::new(writer);

        // 1. Status line
        write!(out, "HTTP/1.1 {} {}\r\n", self.status, self.reason())?;

        // 2. Headers
        for (name, value) in &self.headers {
            write!(out, "{}: {}\r\n", name, value)?;
        }

        // 3. Línea vacía que separa headers del body
        out.write_all(b"\r\n")?;

        // 4. Body
        if include_body {
            out.write_all(&self.body)?;
        }

        out.flush()
    }

    /// Convierte la respuesta completa a bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());
        // Escribir en un Vec no falla
        let _ = self.write_to(&mut result, true);
        result
    }

    /// Código numérico de la respuesta
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Frase de razón de la status line
    pub fn reason(&self) -> &'static str {
        reason_phrase(self.status)
    }

    /// Headers en orden de inserción
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Valor de un header sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Escapa `& < > " '` para insertar texto en HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_names(response: &Response) -> Vec<&str> {
        response.headers().iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Separa head y body de la salida serializada
    fn split_wire(bytes: &[u8]) -> (String, Vec<u8>) {
        let pos = bytes
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("missing header terminator");
        (
            String::from_utf8(bytes[..pos].to_vec()).unwrap(),
            bytes[pos + 4..].to_vec(),
        )
    }

    #[test]
    fn test_default_headers_in_order() {
        let response = Response::new(StatusCode::Ok);
        assert_eq!(header_names(&response), vec!["Date", "Server", "Connection"]);
        assert_eq!(response.header("connection"), Some("close"));
        assert_eq!(response.header("Server"), Some(SERVER_TOKEN));
        assert!(response.header("Date").unwrap().ends_with(" GMT"));
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_caller_headers_follow_defaults() {
        let response = Response::new(StatusCode::Ok)
            .with_header("X-First", "1")
            .with_body(b"abc".to_vec())
            .with_header("Content-Type", "text/plain");

        assert_eq!(
            header_names(&response),
            vec!["Date", "Server", "Connection", "X-First", "Content-Length", "Content-Type"]
        );
    }

    #[test]
    fn test_replacing_header_keeps_position() {
        let response = Response::new(StatusCode::Ok)
            .with_header("X-A", "1")
            .with_header("X-B", "2")
            .with_header("x-a", "3");

        assert_eq!(header_names(&response), vec!["Date", "Server", "Connection", "X-A", "X-B"]);
        assert_eq!(response.header("X-A"), Some("3"));
    }

    #[test]
    fn test_with_text_defaults_content_type() {
        let response = Response::new(StatusCode::Ok).with_text("<p>x</p>");
        assert_eq!(response.header("Content-Type"), Some(HTML_CONTENT_TYPE));

        let response = Response::new(StatusCode::Ok)
            .with_header("Content-Type", "text/plain")
            .with_text("x");
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn test_serialization_round_trip() {
        let body: Vec<u8> = (0u8..=255).chain(b"\r\n\r\n".iter().copied()).collect();
        let response = Response::new(StatusCode::Ok).with_body(body.clone());

        let (head, parsed_body) = split_wire(&response.to_bytes());
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));

        let content_length: usize = head
            .lines()
            .find_map(|l| l.strip_prefix("Content-Length: "))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(content_length, body.len());
        assert_eq!(parsed_body, body);
    }

    #[test]
    fn test_wire_header_order() {
        let response = Response::new(StatusCode::NotFound).with_header("X-Test", "v");
        let (head, body) = split_wire(&response.to_bytes());
        let lines: Vec<&str> = head.split("\r\n").collect();

        assert_eq!(lines[0], "HTTP/1.1 404 Not Found");
        assert!(lines[1].starts_with("Date: "));
        assert_eq!(lines[2], format!("Server: {}", SERVER_TOKEN));
        assert_eq!(lines[3], "Connection: close");
        assert_eq!(lines[4], "X-Test: v");
        assert!(body.is_empty());
    }

    #[test]
    fn test_unknown_status_code() {
        let response = Response::with_status_code(299);
        assert!(response.to_bytes().starts_with(b"HTTP/1.1 299 Unknown\r\n"));
    }

    #[test]
    fn test_head_omits_body_but_keeps_length() {
        let response = Response::new(StatusCode::Ok).with_body(b"hello".to_vec());
        let mut out = Vec::new();
        response.write_to(&mut out, false).unwrap();

        let (head, body) = split_wire(&out);
        assert!(head.contains("Content-Length: 5"));
        assert!(body.is_empty());
    }

    #[test]
    fn test_error_page() {
        let response = Response::error(StatusCode::MethodNotAllowed, "Method Not Allowed");
        let body = String::from_utf8(response.body().to_vec()).unwrap();

        assert_eq!(response.status(), 405);
        assert!(body.contains("<title>405 Method Not Allowed</title>"));
        assert!(body.contains(SERVER_TOKEN));
        assert_eq!(response.header("Content-Length"), Some(body.len().to_string().as_str()));
    }

    #[test]
    fn test_error_message_is_escaped() {
        let response = Response::error(StatusCode::BadRequest, "<script>");
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"a&b<c>"d"'e'"#), "a&amp;b&lt;c&gt;&quot;d&quot;&#39;e&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }

    /// Writer que cuenta los flush recibidos
    struct FlushCounter {
        data: Vec<u8>,
        flushes: usize,
    }

    impl Write for FlushCounter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_single_flush() {
        let mut sink = FlushCounter { data: Vec::new(), flushes: 0 };
        Response::ok_html("hi").write_to(&mut sink, true).unwrap();

        assert_eq!(sink.flushes, 1);
        assert!(sink.data.ends_with(b"\r\n\r\nhi"));
    }
}
