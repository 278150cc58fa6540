//! # Servidor TCP con Pool Acotado
//! src/server/tcp.rs
//!
//! Un thread `acceptor` acepta conexiones y las envía al [`WorkerPool`].
//! El acceptor nunca bloquea en el pool: si está saturado, la conexión se
//! rechaza y se cierra sin respuesta.
//!
//! El socket de escucha tiene un timeout de accept (SO_RCVTIMEO) para que
//! el loop revise el flag `running` periódicamente aunque no lleguen
//! conexiones.

use super::handler::ConnectionHandler;
use crate::config::Config;
use crate::files::StaticFiles;
use crate::pool::{PoolStats, WorkerPool};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Tiempo máximo esperando que termine el acceptor al cerrar
const ACCEPTOR_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Espera máxima entre errores consecutivos de accept
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Servidor en ejecución
///
/// Se obtiene con [`Server::start`] y se detiene con [`Server::shutdown`]
/// (o al soltarlo).
pub struct Server {
    local_addr: SocketAddr,
    listener: Arc<Socket>,
    running: Arc<AtomicBool>,
    pool: Arc<WorkerPool>,
    acceptor: Mutex<Option<JoinHandle<()>>>,
}

/// Lo que el acceptor necesita por conexión
struct Acceptor {
    listener: Arc<Socket>,
    running: Arc<AtomicBool>,
    pool: Arc<WorkerPool>,
    handler: Arc<ConnectionHandler>,
    socket_timeout: Duration,
}

impl Server {
    /// Abre el socket de escucha y arranca el acceptor
    ///
    /// El document root debe existir (ver `Config::prepare_document_root`).
    pub fn start(config: Config) -> io::Result<Self> {
        let files = StaticFiles::new(&config.document_root).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("document root {}: {}", config.document_root.display(), e),
            )
        })?;
        info!(root = %files.canonical_root().display(), "document root");

        let listener = Arc::new(bind(&config)?);
        let local_addr = listener
            .local_addr()?
            .as_socket()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not an inet address"))?;

        let running = Arc::new(AtomicBool::new(true));
        let pool = Arc::new(WorkerPool::new(config.pool_config()));

        let acceptor = Acceptor {
            listener: Arc::clone(&listener),
            running: Arc::clone(&running),
            pool: Arc::clone(&pool),
            handler: Arc::new(ConnectionHandler::new(Arc::new(files))),
            socket_timeout: config.socket_timeout(),
        };
        let handle = thread::Builder::new()
            .name("acceptor".to_string())
            .spawn(move || acceptor.run())?;

        info!(address = %local_addr, "servidor escuchando");

        Ok(Self {
            local_addr,
            listener,
            running,
            pool,
            acceptor: Mutex::new(Some(handle)),
        })
    }

    /// Dirección real de escucha (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Contadores del pool
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Detiene el servidor
    ///
    /// Deja de aceptar, espera al acceptor (acotado) y cierra el pool con
    /// sus dos períodos de gracia. Llamarlo más de una vez no tiene efecto.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            info!("el servidor no está corriendo");
            return;
        }
        info!("deteniendo servidor");

        // Desbloquea el accept en curso
        if let Err(e) = self.listener.shutdown(Shutdown::Both) {
            debug!(error = %e, "shutdown del socket de escucha");
        }

        let handle = self
            .acceptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            join_with_timeout(handle, ACCEPTOR_JOIN_TIMEOUT);
        }

        self.pool.shutdown();

        let stats = self.pool.stats();
        info!(
            total = stats.total_connections,
            completadas = stats.completed_tasks,
            "servidor detenido"
        );
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown();
        }
    }
}

impl Acceptor {
    fn run(self) {
        info!("acceptor iniciado");

        let mut failures: u32 = 0;
        while self.running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((socket, addr)) => {
                    failures = 0;
                    if let Err(e) = self.configure(&socket) {
                        warn!(error = %e, "no se pudo configurar el socket, se descarta");
                        continue;
                    }
                    debug!(peer = ?addr.as_socket(), "conexión aceptada");

                    let stream: TcpStream = socket.into();
                    let handler = Arc::clone(&self.handler);
                    self.pool.submit(move || handler.run(stream));
                }
                Err(e) if is_accept_timeout(&e) => failures = 0,
                Err(_) if !self.running.load(Ordering::SeqCst) => break,
                Err(e) if listener_is_broken(&self.listener, &e) => {
                    error!(error = %e, "socket de escucha inválido");
                    break;
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let wait = accept_backoff(failures);
                    warn!(error = %e, failures, wait_ms = wait.as_millis() as u64, "error aceptando conexión");
                    thread::sleep(wait);
                }
            }
        }

        info!("acceptor terminado");
    }

    fn configure(&self, socket: &Socket) -> io::Result<()> {
        socket.set_read_timeout(Some(self.socket_timeout))?;
        socket.set_write_timeout(Some(self.socket_timeout))?;
        socket.set_keepalive(true)?;
        Ok(())
    }
}

/// Crea el socket de escucha con backlog y timeout de accept
fn bind(config: &Config) -> io::Result<Socket> {
    let address = config.address();
    let addr = address.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no address for {}", address),
        )
    })?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(config.backlog.min(i32::MAX as u32) as i32)?;
    socket.set_read_timeout(Some(config.accept_timeout()))?;

    debug!(%addr, backlog = config.backlog, "socket de escucha creado");
    Ok(socket)
}

fn is_accept_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// El error no es transitorio: el socket de escucha ya no sirve
/// (descriptor inválido, no es un socket, o no se puede consultar).
fn listener_is_broken(listener: &Socket, e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::InvalidInput || listener.local_addr().is_err()
}

/// Espera antes de reintentar tras `failures` errores seguidos
fn accept_backoff(failures: u32) -> Duration {
    let millis = 10u64 << failures.saturating_sub(1).min(7);
    Duration::from_millis(millis).min(MAX_ACCEPT_BACKOFF)
}

fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if handle.is_finished() {
            if handle.join().is_err() {
                error!("el acceptor terminó con panic");
            }
            return;
        }
        thread::sleep(Duration::from_millis(20));
    }
    warn!("el acceptor no terminó a tiempo");
}
