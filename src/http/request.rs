//! # Parsing de Requests HTTP/1.x
//! src/http/request.rs
//!
//! Parser que lee directamente del stream de la conexión (un `BufRead`).
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /docs/index.html?v=2 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! User-Agent: curl/8.0\r\n
//! \r\n
//! ```
//!
//! ## Reglas
//!
//! 1. **Request Line**: exactamente tres tokens separados por un espacio.
//!    Cualquier otra cantidad produce un request inválido.
//! 2. **Headers**: `Name: Value`, nombre en minúsculas, ambos recortados.
//!    Líneas sin `:` se ignoran. Un duplicado reemplaza al anterior.
//! 3. **Body**: solo para POST/PUT con un `content-length` en `(0, 1 MiB)`.
//! 4. **Límites**: cada línea tiene a lo sumo [`MAX_LINE_SIZE`] bytes y hay
//!    a lo sumo [`MAX_HEADER_LINES`] líneas de headers. Pasarse de
//!    cualquiera produce un request inválido sin leer el resto del stream.
//!
//! Un request inválido no es un error de I/O: el parser retorna
//! `Ok(Request)` con `is_valid() == false`. Solo los errores del socket
//! (timeout, reset) se propagan como `Err`.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Read};

/// Tamaño máximo (exclusivo) de un body que el parser acepta leer
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Bytes máximos de una línea (request line o header), terminador incluido
pub const MAX_LINE_SIZE: usize = 8192;

/// Líneas máximas en la sección de headers
pub const MAX_HEADER_LINES: usize = 100;

/// Métodos que el servidor enruta hacia contenido
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    Get,

    /// HEAD - Como GET pero sin body en la respuesta
    Head,
}

impl Method {
    /// Reconoce GET y HEAD (sin distinguir mayúsculas). Cualquier otro
    /// token retorna `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("GET") {
            Some(Method::Get)
        } else if token.eq_ignore_ascii_case("HEAD") {
            Some(Method::Head)
        } else {
            None
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
        }
    }
}

/// Representa un request HTTP parseado
///
/// Se construye una vez por conexión y no se modifica después.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Token del método tal como llegó (ej: "GET")
    method: String,

    /// URI sin procesar (ej: "/docs/a%20b.txt?x=1")
    uri: String,

    /// Versión del protocolo (ej: "HTTP/1.1")
    version: String,

    /// Headers con nombre en minúsculas
    headers: HashMap<String, String>,

    /// Body, solo presente para POST/PUT con content-length válido
    body: Option<Vec<u8>>,

    /// `true` si la request line y los headers se parsearon bien
    valid: bool,
}

impl Request {
    /// Request marcado como inválido (request line ausente o malformada)
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Parsea un request leyendo del stream
    ///
    /// # Errores
    ///
    /// Solo errores de I/O del stream (incluyendo timeouts de lectura).
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use static_server::http::Request;
    ///
    /// let raw: &[u8] = b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert!(request.is_valid());
    /// assert_eq!(request.uri(), "/index.html");
    /// assert_eq!(request.header("HOST"), Some("x"));
    /// ```
    pub fn parse<R: BufRead>(mut reader: R) -> io::Result<Self> {
        // 1. Request line
        let request_line = match read_line(&mut reader)? {
            Line::Text(line) if !line.is_empty() => line,
            _ => return Ok(Self::invalid()),
        };

        let parts: Vec<&str> = request_line.split(' ').collect();
        if parts.len() != 3 {
            return Ok(Self::invalid());
        }

        let mut request = Request {
            method: parts[0].to_string(),
            uri: parts[1].to_string(),
            version: parts[2].to_string(),
            ..Self::default()
        };

        // 2. Headers hasta la línea vacía o fin del stream
        let mut header_lines = 0;
        loop {
            let line = match read_line(&mut reader)? {
                Line::Text(line) => line,
                Line::End => break,
                Line::TooLong => return Ok(Self::invalid()),
            };
            if line.is_empty() {
                break;
            }
            header_lines += 1;
            if header_lines > MAX_HEADER_LINES {
                return Ok(Self::invalid());
            }
            if let Some((name, value)) = split_header(&line) {
                request.headers.insert(name, value);
            }
        }

        // 3. Body (POST/PUT). Un body incompleto no invalida el request.
        if request.expects_body() {
            if let Some(length) = request.content_length() {
                let mut body = Vec::with_capacity(length);
                (&mut reader).take(length as u64).read_to_end(&mut body)?;
                if !body.is_empty() {
                    request.body = Some(body);
                }
            }
        }

        request.valid = true;
        Ok(request)
    }

    fn expects_body(&self) -> bool {
        self.method.eq_ignore_ascii_case("POST") || self.method.eq_ignore_ascii_case("PUT")
    }

    /// `content-length` utilizable: entero en `(0, MAX_BODY_SIZE)`.
    /// Valores ausentes, inválidos, cero o demasiado grandes dan `None`.
    fn content_length(&self) -> Option<usize> {
        self.header("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&len| len > 0 && len < MAX_BODY_SIZE)
    }

    // === Métodos públicos para acceder a los campos ===

    /// Token del método (vacío si el request es inválido)
    pub fn method(&self) -> &str {
        &self.method
    }

    /// URI sin normalizar
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Todos los headers (nombres en minúsculas)
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// Body del request, si se leyó alguno
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// `true` si la request line tenía sus tres campos
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// El cliente pidió `Connection: keep-alive`. El servidor igual
    /// responde siempre con `Connection: close`.
    pub fn is_keep_alive(&self) -> bool {
        self.header("connection")
            .map(|v| v.eq_ignore_ascii_case("keep-alive"))
            .unwrap_or(false)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.uri, self.version)
    }
}

/// Resultado de leer una línea del stream
enum Line {
    /// Línea sin el terminador (`\n` o `\r\n`)
    Text(String),
    /// Fin del stream
    End,
    /// Se alcanzó `MAX_LINE_SIZE` sin encontrar `\n`
    TooLong,
}

/// Lee una línea de a lo sumo `MAX_LINE_SIZE` bytes
fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Line> {
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE_SIZE as u64)
        .read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(Line::End);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() >= MAX_LINE_SIZE {
        return Ok(Line::TooLong);
    }
    Ok(Line::Text(String::from_utf8_lossy(&buf).into_owned()))
}

/// Separa `Name: Value` en el primer `:`. Sin `:` (o con nombre vacío) se ignora.
fn split_header(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_ascii_lowercase(), value.trim().to_string()))
}
