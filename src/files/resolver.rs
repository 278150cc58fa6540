//! # Resolución de Archivos Estáticos
//! src/files/resolver.rs
//!
//! Mapea un [`NormalizedPath`] a un archivo dentro del document root y
//! construye la respuesta.
//!
//! ## Frontera de seguridad
//!
//! El candidato se canonicaliza (resolviendo `..` y symlinks) y debe tener
//! al root canonicalizado como prefijo. Si no existe, se verifica la
//! contención de forma léxica para decidir entre 403 y 404.

use super::listing;
use super::normalize::{NormalizedPath, INDEX_FILE};
use crate::error::ServeError;
use crate::http::mime::content_type_for;
use crate::http::{Response, StatusCode};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Resolver de archivos con el document root fijo
#[derive(Debug, Clone)]
pub struct StaticFiles {
    /// Root tal como se configuró
    root: PathBuf,

    /// Root absoluto con symlinks resueltos
    canonical_root: PathBuf,
}

impl StaticFiles {
    /// Crea el resolver. El document root debe existir.
    pub fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let canonical_root = fs::canonicalize(&root)?;
        if !canonical_root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("document root is not a directory: {}", root.display()),
            ));
        }
        Ok(Self {
            root,
            canonical_root,
        })
    }

    /// Document root configurado
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Document root canonicalizado
    pub fn canonical_root(&self) -> &Path {
        &self.canonical_root
    }

    /// Resuelve un path normalizado a una respuesta 200 (archivo o listado)
    ///
    /// # Errores
    ///
    /// - `TraversalAttempt` si el path sale del document root (403)
    /// - `MissingResource` si no existe (404)
    /// - `PermissionDenied` si no se puede leer (403)
    /// - `Internal` para cualquier otra falla de I/O (500)
    pub fn resolve(&self, path: &NormalizedPath) -> Result<Response, ServeError> {
        let uri = path.as_str();
        if path.traversal_rewritten() {
            warn!(uri, "URI con traversal explícito");
            return Err(ServeError::TraversalAttempt(uri.to_string()));
        }
        // "/dir/" sin index.html cae al directorio (listado)
        let (target, uri) = match (self.contain(path.relative(), uri), path.directory()) {
            (Err(ServeError::MissingResource(_)), Some(dir)) => {
                (self.contain(dir.trim_start_matches('/'), dir)?, dir)
            }
            (result, _) => (result?, uri),
        };

        let metadata = fs::metadata(&target).map_err(|e| ServeError::from_io(&e, uri))?;
        if metadata.is_dir() {
            let index = target.join(INDEX_FILE);
            if index.is_file() {
                // index.html puede ser un symlink hacia afuera
                let index = self.check_inside(&index, uri)?;
                return self.serve_file(&index, uri);
            }
            debug!(uri, "generando listado de directorio");
            let html = listing::render(&target, uri).map_err(|e| ServeError::from_io(&e, uri))?;
            return Ok(Response::ok_html(&html));
        }

        self.serve_file(&target, uri)
    }

    /// Canonicaliza `root/relative` y verifica que quede dentro del root
    pub fn contain(&self, relative: &str, uri: &str) -> Result<PathBuf, ServeError> {
        if relative.contains('\0') {
            return Err(ServeError::TraversalAttempt(uri.to_string()));
        }

        let candidate = self.canonical_root.join(relative);
        match fs::canonicalize(&candidate) {
            Ok(canonical) => {
                if canonical.starts_with(&self.canonical_root) {
                    Ok(canonical)
                } else {
                    warn!(uri, "intento de salir del document root");
                    Err(ServeError::TraversalAttempt(uri.to_string()))
                }
            }
            Err(e) if is_missing(&e) => {
                if lexically_contained(relative) {
                    debug!(uri, "archivo no encontrado");
                    Err(ServeError::MissingResource(uri.to_string()))
                } else {
                    warn!(uri, "intento de salir del document root");
                    Err(ServeError::TraversalAttempt(uri.to_string()))
                }
            }
            Err(e) => {
                let err = ServeError::from_io(&e, uri);
                if let ServeError::Internal(detail) = &err {
                    warn!(%detail, "no se pudo canonicalizar el candidato");
                }
                Err(err)
            }
        }
    }

    fn check_inside(&self, path: &Path, uri: &str) -> Result<PathBuf, ServeError> {
        let canonical = fs::canonicalize(path).map_err(|e| ServeError::from_io(&e, uri))?;
        if canonical.starts_with(&self.canonical_root) {
            Ok(canonical)
        } else {
            warn!(uri, "index.html apunta fuera del document root");
            Err(ServeError::TraversalAttempt(uri.to_string()))
        }
    }

    fn serve_file(&self, file: &Path, uri: &str) -> Result<Response, ServeError> {
        let mut handle = File::open(file).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => {
                warn!(uri, "no se puede leer el archivo");
                ServeError::PermissionDenied(uri.to_string())
            }
            _ => ServeError::from_io(&e, uri),
        })?;

        let metadata = handle
            .metadata()
            .map_err(|e| ServeError::from_io(&e, uri))?;
        let mut content = Vec::with_capacity(metadata.len() as usize);
        handle
            .read_to_end(&mut content)
            .map_err(|e| ServeError::from_io(&e, uri))?;

        let mut response = Response::new(StatusCode::Ok)
            .with_header("Content-Type", &content_type_for(file));
        if let Ok(modified) = metadata.modified() {
            response.add_header("Last-Modified", &httpdate::fmt_http_date(modified));
        }

        debug!(uri, bytes = content.len(), "sirviendo archivo");
        Ok(response.with_body(content))
    }
}

/// El candidato (o algún directorio intermedio) no existe
fn is_missing(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// `true` si el path relativo nunca sube por encima de su base
fn lexically_contained(relative: &str) -> bool {
    let mut depth: usize = 0;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}
