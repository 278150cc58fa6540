//! # Listado de Directorios
//! src/files/listing.rs
//!
//! Genera la página HTML para un directorio sin `index.html`.

use crate::http::escape_html;
use crate::http::response::SERVER_TOKEN;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fs;
use std::io;
use std::path::Path;

/// Caracteres que se codifican en cada segmento de un href (`/` queda igual)
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'+');

/// Una entrada del listado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Lee las entradas inmediatas de `dir`, ordenadas por nombre
pub fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        // Seguir symlinks; si el destino no existe se muestra como archivo vacío
        let metadata = fs::metadata(entry.path()).or_else(|_| entry.metadata())?;
        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: metadata.is_dir(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Renderiza el listado de `dir`, que se pidió con la URI `uri`
pub fn render(dir: &Path, uri: &str) -> io::Result<String> {
    let entries = read_entries(dir)?;
    Ok(render_entries(uri, &entries))
}

/// Renderiza el HTML a partir de entradas ya leídas
pub fn render_entries(uri: &str, entries: &[ListingEntry]) -> String {
    let title = escape_html(uri);
    let base = encode_path(uri.trim_end_matches('/'));

    let mut html = String::with_capacity(512 + entries.len() * 96);
    html.push_str("<!DOCTYPE html>\n<html>\n");
    html.push_str(&format!("<head><title>Directory Listing: {}</title>", title));
    html.push_str(
        "<style>body{font-family:Arial,sans-serif;margin:20px;}\
         h1{border-bottom:1px solid #ccc;}\
         ul{list-style:none;padding:0;}\
         li{padding:5px 0;}\
         a{text-decoration:none;color:#0066cc;}\
         a:hover{text-decoration:underline;}</style></head>\n",
    );
    html.push_str("<body>\n");
    html.push_str(&format!("<h1>Directory Listing: {}</h1>\n", title));
    html.push_str("<ul>\n");

    if let Some(parent) = parent_uri(uri) {
        html.push_str(&format!(
            "<li><a href=\"{}\" class=\"dir parent\">..</a></li>\n",
            escape_html(&encode_path(parent))
        ));
    }

    for entry in entries {
        let href = format!("{}/{}", base, utf8_percent_encode(&entry.name, SEGMENT));
        let name = escape_html(&entry.name);
        if entry.is_dir {
            html.push_str(&format!(
                "<li><a href=\"{}/\" class=\"dir\">{}/</a></li>\n",
                escape_html(&href),
                name
            ));
        } else {
            html.push_str(&format!(
                "<li><a href=\"{}\" class=\"file\">{}</a> ({})</li>\n",
                escape_html(&href),
                name,
                format_size(entry.size)
            ));
        }
    }

    html.push_str("</ul>\n<hr>\n");
    html.push_str(&format!("<p><em>{}</em></p>\n", SERVER_TOKEN));
    html.push_str("</body>\n</html>");
    html
}

/// Codifica cada segmento de un path decodificado para usarlo en un href
fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, SEGMENT).to_string()
}

/// URI del directorio padre; `None` en la raíz
fn parent_uri(uri: &str) -> Option<&str> {
    let trimmed = uri.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) | None => Some("/"),
        Some(pos) => Some(&trimmed[..pos]),
    }
}

/// Tamaño legible: `B`, `KB`, `MB`, `GB` con un decimal
pub fn format_size(size: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes = size as f64;
    if size < 1024 {
        format!("{} B", size)
    } else if bytes < MB {
        format!("{:.1} KB", bytes / KB)
    } else if bytes < GB {
        format!("{:.1} MB", bytes / MB)
    } else {
        format!("{:.1} GB", bytes / GB)
    }
}
