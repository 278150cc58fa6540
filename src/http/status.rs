//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Tabla fija de códigos que el servidor sabe nombrar. Cualquier otro
//! código numérico se muestra con la frase "Unknown".
//!
//! - **2xx**: Éxito (200, 201, 204)
//! - **3xx**: Redirección (301, 304)
//! - **4xx**: Error del cliente (400, 403, 404, 405)
//! - **5xx**: Error del servidor (500, 501, 503)

/// Códigos de estado HTTP con frase de razón conocida
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,

    /// 201 Created
    Created = 201,

    /// 204 No Content - Petición exitosa sin contenido en el body
    NoContent = 204,

    /// 301 Moved Permanently
    MovedPermanently = 301,

    /// 304 Not Modified
    NotModified = 304,

    /// 400 Bad Request - Request line malformada
    BadRequest = 400,

    /// 403 Forbidden - Fuera del document root o sin permisos de lectura
    Forbidden = 403,

    /// 404 Not Found - El recurso no existe
    NotFound = 404,

    /// 405 Method Not Allowed - Solo se aceptan GET y HEAD
    MethodNotAllowed = 405,

    /// 500 Internal Server Error - Error inesperado resolviendo el recurso
    InternalServerError = 500,

    /// 501 Not Implemented
    NotImplemented = 501,

    /// 503 Service Unavailable
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Todos los códigos de la tabla, en orden numérico
    pub const ALL: [StatusCode; 12] = [
        StatusCode::Ok,
        StatusCode::Created,
        StatusCode::NoContent,
        StatusCode::MovedPermanently,
        StatusCode::NotModified,
        StatusCode::BadRequest,
        StatusCode::Forbidden,
        StatusCode::NotFound,
        StatusCode::MethodNotAllowed,
        StatusCode::InternalServerError,
        StatusCode::NotImplemented,
        StatusCode::ServiceUnavailable,
    ];

    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Busca el código en la tabla
    pub fn from_u16(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_u16() == code)
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Verifica si el código indica éxito (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// Verifica si el código indica error del cliente (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

/// Frase de razón para un código numérico arbitrario
///
/// # Ejemplo
/// ```
/// use static_server::http::status::reason_phrase;
/// assert_eq!(reason_phrase(405), "Method Not Allowed");
/// assert_eq!(reason_phrase(418), "Unknown");
/// ```
pub fn reason_phrase(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .map(|s| s.reason_phrase())
        .unwrap_or("Unknown")
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
