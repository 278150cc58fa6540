//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración con soporte para argumentos CLI, variables de entorno y
//! un archivo JSON opcional.
//!
//! ## Precedencia
//!
//! 1. Argumento CLI o variable de entorno
//! 2. Archivo `--config`
//! 3. Valor por defecto
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./static_server --port 8080 \
//!   --document-root ./www \
//!   --pool-core 10 \
//!   --pool-max 50 \
//!   --pool-queue 100
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 DOCUMENT_ROOT=/srv/www ./static_server
//! ```
//!
//! ### Archivo JSON
//! ```json
//! {
//!   "server": { "port": 8080, "document_root": "www", "backlog": 50 },
//!   "pool":   { "core_size": 10, "max_size": 50, "queue_capacity": 100, "keep_alive_secs": 60 },
//!   "socket": { "timeout_ms": 30000, "accept_timeout_ms": 1000 },
//!   "log":    { "level": "info" }
//! }
//! ```

use crate::pool::PoolConfig;
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Configuración del servidor de archivos estáticos
#[derive(Debug, Clone, Parser)]
#[command(name = "static_server")]
#[command(about = "Servidor HTTP/1.x de archivos estáticos con concurrencia acotada")]
#[command(version)]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Puerto en el que escucha el servidor (0 = efímero)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Conexiones pendientes en el socket de escucha
    #[arg(long, default_value = "50", env = "HTTP_BACKLOG")]
    pub backlog: u32,

    /// Timeout del accept en milisegundos (cada cuánto se revisa el shutdown)
    #[arg(long = "accept-timeout", default_value = "1000", env = "ACCEPT_TIMEOUT_MS")]
    pub accept_timeout_ms: u64,

    /// Timeout de lectura/escritura por conexión en milisegundos
    #[arg(long = "socket-timeout", default_value = "30000", env = "SOCKET_TIMEOUT_MS")]
    pub socket_timeout_ms: u64,

    /// Directorio desde el que se sirven los archivos
    #[arg(short = 'r', long = "document-root", default_value = "www", env = "DOCUMENT_ROOT")]
    pub document_root: PathBuf,

    // === Pool ===

    /// Workers base del pool
    #[arg(long = "pool-core", default_value = "10", env = "POOL_CORE_SIZE")]
    pub core_pool_size: usize,

    /// Máximo de workers del pool
    #[arg(long = "pool-max", default_value = "50", env = "POOL_MAX_SIZE")]
    pub max_pool_size: usize,

    /// Capacidad de la cola de conexiones en espera
    #[arg(long = "pool-queue", default_value = "100", env = "POOL_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Segundos que un worker ocioso espera antes de terminar
    #[arg(long = "pool-keep-alive", default_value = "60", env = "POOL_KEEP_ALIVE_SECS")]
    pub keep_alive_secs: u64,

    // === Logging ===

    /// Nivel de log (trace, debug, info, warn, error). `RUST_LOG` tiene prioridad.
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Archivo JSON de configuración
    #[arg(short = 'c', long = "config", env = "SERVER_CONFIG")]
    pub config_file: Option<PathBuf>,
}

/// Errores al cargar la configuración
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("could not read config file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid config file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Contenido del archivo JSON. Todo es opcional.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerSection,
    pub pool: PoolSection,
    pub socket: SocketSection,
    pub log: LogSection,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub backlog: Option<u32>,
    pub document_root: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    pub core_size: Option<usize>,
    pub max_size: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub keep_alive_secs: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SocketSection {
    pub timeout_ms: Option<u64>,
    pub accept_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: Option<String>,
}

impl FileConfig {
    /// Lee y parsea el archivo
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Config {
    /// Carga la configuración desde los argumentos del proceso
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(std::env::args_os())
    }

    /// Carga la configuración desde `args` (el primero es el nombre del
    /// programa). Si hay `--config`, completa con el archivo los valores
    /// que no vinieron por CLI ni por entorno.
    pub fn load_from<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let mut config = Self::from_arg_matches(&matches)?;

        if let Some(path) = config.config_file.clone() {
            let file = FileConfig::read(&path)?;
            config.apply_file(file, &matches);
        }
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig, matches: &ArgMatches) {
        let defaulted = |id: &str| {
            matches!(
                matches.value_source(id),
                None | Some(ValueSource::DefaultValue)
            )
        };
        fn fill<T>(slot: &mut T, value: Option<T>, allowed: bool) {
            if let (true, Some(value)) = (allowed, value) {
                *slot = value;
            }
        }

        fill(&mut self.host, file.server.host, defaulted("host"));
        fill(&mut self.port, file.server.port, defaulted("port"));
        fill(&mut self.backlog, file.server.backlog, defaulted("backlog"));
        fill(
            &mut self.document_root,
            file.server.document_root,
            defaulted("document_root"),
        );
        fill(&mut self.core_pool_size, file.pool.core_size, defaulted("core_pool_size"));
        fill(&mut self.max_pool_size, file.pool.max_size, defaulted("max_pool_size"));
        fill(
            &mut self.queue_capacity,
            file.pool.queue_capacity,
            defaulted("queue_capacity"),
        );
        fill(
            &mut self.keep_alive_secs,
            file.pool.keep_alive_secs,
            defaulted("keep_alive_secs"),
        );
        fill(
            &mut self.socket_timeout_ms,
            file.socket.timeout_ms,
            defaulted("socket_timeout_ms"),
        );
        fill(
            &mut self.accept_timeout_ms,
            file.socket.accept_timeout_ms,
            defaulted("accept_timeout_ms"),
        );
        fill(&mut self.log_level, file.log.level, defaulted("log_level"));
    }

    /// Obtiene la dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    /// Parámetros del pool de workers
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            core_size: self.core_pool_size,
            max_size: self.max_pool_size,
            queue_capacity: self.queue_capacity,
            keep_alive: Duration::from_secs(self.keep_alive_secs),
            ..PoolConfig::default()
        }
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        // Validar pool
        if self.core_pool_size == 0 {
            return Err("Pool core size must be >= 1".to_string());
        }
        if self.max_pool_size == 0 {
            return Err("Pool max size must be >= 1".to_string());
        }
        if self.core_pool_size > self.max_pool_size {
            return Err(format!(
                "Pool core size ({}) must not exceed max size ({})",
                self.core_pool_size, self.max_pool_size
            ));
        }
        if self.queue_capacity == 0 {
            return Err("Pool queue capacity must be >= 1".to_string());
        }

        // Validar timeouts
        if self.accept_timeout_ms == 0 {
            return Err("Accept timeout must be > 0".to_string());
        }
        if self.socket_timeout_ms == 0 {
            return Err("Socket timeout must be > 0".to_string());
        }

        if self.backlog == 0 {
            return Err("Backlog must be >= 1".to_string());
        }

        Ok(())
    }

    /// Crea el document root si no existe
    pub fn prepare_document_root(&self) -> io::Result<()> {
        if !self.document_root.exists() {
            fs::create_dir_all(&self.document_root)?;
            info!(root = %self.document_root.display(), "document root creado");
        }
        Ok(())
    }

    /// Registra un resumen de la configuración efectiva
    pub fn print_summary(&self) {
        info!(
            address = %self.address(),
            document_root = %self.document_root.display(),
            backlog = self.backlog,
            "red"
        );
        info!(
            core = self.core_pool_size,
            max = self.max_pool_size,
            queue = self.queue_capacity,
            keep_alive_secs = self.keep_alive_secs,
            "pool"
        );
        info!(
            accept_ms = self.accept_timeout_ms,
            socket_ms = self.socket_timeout_ms,
            "timeouts"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backlog: 50,
            accept_timeout_ms: 1_000,
            socket_timeout_ms: 30_000,
            document_root: PathBuf::from("www"),
            core_pool_size: 10,
            max_pool_size: 50,
            queue_capacity: 100,
            keep_alive_secs: 60,
            log_level: "info".to_string(),
            config_file: None,
        }
    }
}
