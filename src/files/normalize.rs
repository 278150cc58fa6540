//! # Normalización de URIs
//! src/files/normalize.rs
//!
//! Convierte la URI de un request en un path relativo al document root.
//!
//! Pasos, en orden:
//! 1. Quitar la query string (desde el primer `?`)
//! 2. Decodificar `%XX` (hex inválido queda literal) y `+` → espacio
//! 3. Colapsar `//` y segmentos `/./`
//! 4. Si aparece `../` o `..\` en cualquier lugar, usar `/`
//! 5. Si termina en `/`, agregar `index.html`
//!
//! Este filtro no es la frontera de seguridad: un `..` final o un symlink
//! todavía pueden apuntar afuera. La contención real la hace el resolver
//! canonicalizando (ver `resolver.rs`).

use percent_encoding::percent_decode_str;
use std::fmt;

/// Archivo que se sirve para URIs de directorio
pub const INDEX_FILE: &str = "index.html";

/// Path decodificado y sin traversal explícito, siempre con `/` inicial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    path: String,
    traversal_rewritten: bool,
    index_appended: bool,
}

impl NormalizedPath {
    /// Normaliza una URI cruda
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::files::NormalizedPath;
    ///
    /// assert_eq!(NormalizedPath::from_uri("/a%20b//c.txt?x=1").as_str(), "/a b/c.txt");
    /// assert_eq!(NormalizedPath::from_uri("/docs/").as_str(), "/docs/index.html");
    /// assert_eq!(NormalizedPath::from_uri("/../etc/passwd").as_str(), "/index.html");
    /// ```
    pub fn from_uri(uri: &str) -> Self {
        // 1. Query string
        let without_query = match uri.find('?') {
            Some(pos) => &uri[..pos],
            None => uri,
        };

        // 2. Decodificación. `+` se reemplaza antes para que `%2B` siga siendo `+`.
        let plus_as_space = without_query.replace('+', " ");
        let decoded = percent_decode_str(&plus_as_space)
            .decode_utf8_lossy()
            .into_owned();

        // 3. `//` y `/./`
        let mut path = collapse(&format!("/{}", decoded));

        // 4. Traversal explícito
        let traversal_rewritten = path.contains("../") || path.contains("..\\");
        if traversal_rewritten {
            path = "/".to_string();
        }

        // 5. Directorios
        let index_appended = path.ends_with('/');
        if index_appended {
            path.push_str(INDEX_FILE);
        }

        Self {
            path,
            traversal_rewritten,
            index_appended,
        }
    }

    /// Path con `/` inicial (ej: "/docs/index.html")
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Path sin el `/` inicial, listo para unir al document root
    pub fn relative(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    /// `true` si la URI traía `../` o `..\` y se reemplazó por la raíz
    pub fn traversal_rewritten(&self) -> bool {
        self.traversal_rewritten
    }

    /// Directorio pedido (con `/` final) si `index.html` fue agregado en
    /// la normalización
    pub fn directory(&self) -> Option<&str> {
        if self.index_appended {
            self.path.strip_suffix(INDEX_FILE)
        } else {
            None
        }
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Colapsa barras repetidas y segmentos `/./` hasta que no quede ninguno
fn collapse(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    while out.contains("/./") {
        out = out.replace("/./", "/");
    }
    out
}
