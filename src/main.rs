//! # Static Server - Entry Point
//! src/main.rs
//!
//! Configuración → logging → servidor → espera de señal → apagado ordenado.

use anyhow::{bail, Context};
use clap::Parser;
use static_server::config::{Config, ConfigError};
use static_server::logging;
use static_server::server::Server;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    let (config, file_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(ConfigError::Cli(e)) => e.exit(),
        // Archivo ilegible: seguir solo con CLI, entorno y defaults
        Err(e) => (Config::parse(), Some(e)),
    };

    logging::init(&config.log_level);
    if let Some(e) = file_error {
        warn!(error = %e, "no se pudo cargar el archivo de configuración, usando valores por defecto");
    }

    if let Err(e) = config.validate() {
        bail!("configuración inválida: {}", e);
    }
    config.print_summary();
    config
        .prepare_document_root()
        .with_context(|| format!("creando document root {}", config.document_root.display()))?;

    let address = config.address();
    let server = Server::start(config).with_context(|| format!("iniciando servidor en {}", address))?;

    wait_for_shutdown_signal()?;

    server.shutdown();
    Ok(())
}

#[cfg(unix)]
fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("instalando manejadores de señales")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "señal recibida, apagando");
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    info!("presione Enter para detener el servidor");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("leyendo stdin")?;
    Ok(())
}
