//! # Pool de Workers Elástico
//! src/pool/worker_pool.rs
//!
//! Pool con `core_size` workers base que crece hasta `max_size` cuando la
//! carga lo exige, y una cola acotada delante. El orden de admisión de una
//! tarea es:
//!
//! 1. menos de `core_size` workers: nuevo worker con la tarea
//! 2. hay workers ociosos de sobra: se encola para que uno la tome
//! 3. menos de `max_size` workers: nuevo worker con la tarea
//! 4. cola con lugar: se encola
//! 5. si no: se rechaza y se entrega a la `RejectionPolicy`
//!
//! Los workers ociosos por más de `keep_alive` terminan. Los base también
//! si `allow_core_timeout` está activo.

use super::policy::{DropAndLog, RejectionPolicy};
use super::queue::BoundedQueue;
use super::stats::PoolStats;
use super::Task;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Cada cuántas tareas completadas se registra el estado del pool
const STATUS_LOG_INTERVAL: u64 = 10;

/// Parámetros del pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub core_size: usize,
    pub max_size: usize,
    pub queue_capacity: usize,
    pub keep_alive: Duration,
    pub allow_core_timeout: bool,

    /// Espera para que terminen las tareas en curso y encoladas
    pub shutdown_grace: Duration,

    /// Espera extra tras descartar la cola
    pub shutdown_force_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_size: 10,
            max_size: 50,
            queue_capacity: 100,
            keep_alive: Duration::from_secs(60),
            allow_core_timeout: true,
            shutdown_grace: Duration::from_secs(60),
            shutdown_force_grace: Duration::from_secs(10),
        }
    }
}

/// Resultado de `submit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// La tarea se entregó directamente a un worker
    Executed,
    /// La tarea espera en la cola
    Queued,
    /// El pool no la admitió
    Rejected,
}

struct PoolState {
    queue: BoundedQueue<Task>,
    workers: usize,
    idle: usize,
    running: usize,
    shutdown: bool,
    next_worker_id: usize,
}

struct Shared {
    config: PoolConfig,
    state: Mutex<PoolState>,
    /// Hay tareas en la cola o el pool se está cerrando
    available: Condvar,
    /// El último worker terminó
    terminated: Condvar,
    completed: AtomicU64,
    total_connections: AtomicU64,
    active_connections: AtomicUsize,
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    policy: Box<dyn RejectionPolicy>,
}

impl WorkerPool {
    /// Crea el pool con la política de rechazo por defecto
    ///
    /// No arranca workers: se crean a demanda con las primeras tareas.
    pub fn new(config: PoolConfig) -> Self {
        Self::with_policy(config, DropAndLog)
    }

    pub fn with_policy<P>(mut config: PoolConfig, policy: P) -> Self
    where
        P: RejectionPolicy + 'static,
    {
        config.max_size = config.max_size.max(1);
        config.core_size = config.core_size.min(config.max_size);

        info!(
            core = config.core_size,
            max = config.max_size,
            queue = config.queue_capacity,
            keep_alive_secs = config.keep_alive.as_secs(),
            "pool de workers inicializado"
        );

        let state = PoolState {
            queue: BoundedQueue::new(config.queue_capacity),
            workers: 0,
            idle: 0,
            running: 0,
            shutdown: false,
            next_worker_id: 0,
        };

        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
                available: Condvar::new(),
                terminated: Condvar::new(),
                completed: AtomicU64::new(0),
                total_connections: AtomicU64::new(0),
                active_connections: AtomicUsize::new(0),
            }),
            policy: Box::new(policy),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Admite una tarea sin bloquear
    ///
    /// Cuenta la conexión en el total y en las activas. Si se rechaza, el
    /// contador de activas se devuelve antes de llamar a la política.
    pub fn submit<F>(&self, task: F) -> Submission
    where
        F: FnOnce() + Send + 'static,
    {
        let shared = &self.shared;
        shared.total_connections.fetch_add(1, Ordering::SeqCst);
        shared.active_connections.fetch_add(1, Ordering::SeqCst);

        let task: Task = Box::new(task);
        let mut state = shared.lock();

        if state.shutdown {
            drop(state);
            debug!("tarea enviada a un pool cerrado");
            return self.reject(task);
        }

        if state.workers < shared.config.core_size {
            return self.start_worker(state, task);
        }

        let task = if state.idle > state.queue.len() {
            match state.queue.push(task) {
                Ok(()) => {
                    shared.available.notify_one();
                    return Submission::Executed;
                }
                Err(task) => task,
            }
        } else {
            task
        };

        if state.workers < shared.config.max_size {
            return self.start_worker(state, task);
        }

        match state.queue.push(task) {
            Ok(()) => {
                shared.available.notify_one();
                Submission::Queued
            }
            Err(task) => {
                drop(state);
                self.reject(task)
            }
        }
    }

    /// Snapshot de contadores
    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.lock().shutdown
    }

    /// Cierra el pool
    ///
    /// Deja de admitir tareas y espera `shutdown_grace` a que se vacíe la
    /// cola y terminen las tareas en curso. Si no alcanza, descarta lo que
    /// quede en la cola y espera `shutdown_force_grace` más. Devuelve `true`
    /// si todos los workers terminaron. Llamarlo de nuevo no tiene efecto.
    pub fn shutdown(&self) -> bool {
        let shared = &self.shared;
        {
            let mut state = shared.lock();
            if state.shutdown {
                return state.workers == 0;
            }
            state.shutdown = true;
        }
        shared.available.notify_all();
        info!("cerrando pool de workers");

        let mut clean = shared.await_termination(shared.config.shutdown_grace);
        if !clean {
            let dropped = shared.lock().queue.drain();
            let count = dropped.len();
            shared.active_connections.fetch_sub(count, Ordering::SeqCst);
            drop(dropped);
            warn!(descartadas = count, "el pool no terminó a tiempo, forzando cierre");

            clean = shared.await_termination(shared.config.shutdown_force_grace);
            if !clean {
                error!(
                    workers = shared.lock().workers,
                    "workers que no terminaron; se abandonan"
                );
            }
        }

        info!(
            total = shared.total_connections.load(Ordering::SeqCst),
            completadas = shared.completed.load(Ordering::SeqCst),
            "pool cerrado"
        );
        clean
    }

    fn start_worker(&self, mut state: MutexGuard<'_, PoolState>, task: Task) -> Submission {
        let id = state.next_worker_id;
        state.next_worker_id += 1;
        state.workers += 1;
        state.running += 1;

        match spawn_worker(Arc::clone(&self.shared), id, task) {
            Ok(()) => Submission::Executed,
            Err(e) => {
                state.workers -= 1;
                state.running -= 1;
                drop(state);
                // La tarea se perdió junto con el closure del thread
                self.shared.active_connections.fetch_sub(1, Ordering::SeqCst);
                error!(error = %e, "no se pudo crear el worker");
                Submission::Rejected
            }
        }
    }

    fn reject(&self, task: Task) -> Submission {
        self.shared.active_connections.fetch_sub(1, Ordering::SeqCst);
        let stats = self.stats();
        self.policy.rejected(task, &stats);
        Submission::Rejected
    }
}

impl Drop for WorkerPool {
    /// Sin esperar: los workers terminan solos al vaciar la cola
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.available.notify_all();
    }
}

fn spawn_worker(shared: Arc<Shared>, id: usize, first: Task) -> io::Result<()> {
    thread::Builder::new()
        .name(format!("worker-{}", id))
        .spawn(move || {
            debug!("worker iniciado");
            let mut next = Some(first);
            while let Some(task) = next.take() {
                shared.run(task);
                next = shared.next_task();
            }
            debug!("worker terminado");
        })
        .map(|_| ())
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Las tareas corren fuera del lock, un panic no deja el estado a medias
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, task: Task) {
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            error!("la tarea terminó con panic");
        }
        self.active_connections.fetch_sub(1, Ordering::SeqCst);

        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if done % STATUS_LOG_INTERVAL == 0 {
            debug!(stats = %self.stats(), "estado del pool");
        }
    }

    /// Bloquea hasta tener otra tarea. `None` significa que el worker debe
    /// terminar.
    fn next_task(&self) -> Option<Task> {
        let mut state = self.lock();
        state.running -= 1;

        loop {
            if let Some(task) = state.queue.pop() {
                state.running += 1;
                return Some(task);
            }
            if state.shutdown {
                self.retire(&mut state);
                return None;
            }

            state.idle += 1;
            let (guard, timeout) = self
                .available
                .wait_timeout(state, self.config.keep_alive)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            state.idle -= 1;

            let may_expire =
                state.workers > self.config.core_size || self.config.allow_core_timeout;
            if timeout.timed_out() && state.queue.is_empty() && !state.shutdown && may_expire {
                self.retire(&mut state);
                debug!("worker ocioso expiró");
                return None;
            }
        }
    }

    fn retire(&self, state: &mut PoolState) {
        state.workers -= 1;
        if state.workers == 0 {
            self.terminated.notify_all();
        }
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.workers > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .terminated
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            pool_size: state.workers,
            active_workers: state.running,
            queue_depth: state.queue.len(),
            completed_tasks: self.completed.load(Ordering::SeqCst),
            total_connections: self.total_connections.load(Ordering::SeqCst),
            active_connections: self.active_connections.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    /// Barrera simple: las tareas bloquean hasta que el test la abre
    #[derive(Clone, Default)]
    struct Gate(Arc<(Mutex<bool>, Condvar)>);

    impl Gate {
        fn wait(&self) {
            let (lock, cvar) = &*self.0;
            let mut open = lock.lock().unwrap();
            while !*open {
                open = cvar.wait(open).unwrap();
            }
        }

        fn open(&self) {
            let (lock, cvar) = &*self.0;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }
    }

    fn small_config(core: usize, max: usize, queue: usize) -> PoolConfig {
        PoolConfig {
            core_size: core,
            max_size: max,
            queue_capacity: queue,
            keep_alive: Duration::from_secs(5),
            allow_core_timeout: true,
            shutdown_grace: Duration::from_secs(5),
            shutdown_force_grace: Duration::from_secs(1),
        }
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    #[test]
    fn test_runs_tasks() {
        let pool = WorkerPool::new(small_config(2, 4, 10));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(pool.shutdown());
        let stats = pool.stats();
        assert_eq!(stats.total_connections, 20);
        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.pool_size, 0);
        // Lo que no fue rechazado se ejecutó
        assert_eq!(counter.load(Ordering::SeqCst) as u64, stats.completed_tasks);
    }

    #[test]
    fn test_saturation_admits_max_plus_queue() {
        let rejected = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&rejected);
        let pool = WorkerPool::with_policy(small_config(2, 4, 3), move |_t: Task, _s: &PoolStats| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let gate = Gate::default();
        let executed = Arc::new(AtomicUsize::new(0));
        let mut outcomes = Vec::new();

        for _ in 0..12 {
            let gate = gate.clone();
            let executed = Arc::clone(&executed);
            outcomes.push(pool.submit(move || {
                gate.wait();
                executed.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let count = |s: Submission| outcomes.iter().filter(|o| **o == s).count();
        assert_eq!(count(Submission::Executed), 4);
        assert_eq!(count(Submission::Queued), 3);
        assert_eq!(count(Submission::Rejected), 5);
        assert_eq!(rejected.load(Ordering::SeqCst), 5);

        let stats = pool.stats();
        assert_eq!(stats.pool_size, 4);
        assert_eq!(stats.queue_depth, 3);
        assert_eq!(stats.active_connections, 7);
        assert_eq!(stats.total_connections, 12);

        gate.open();
        assert!(pool.shutdown());
        assert_eq!(executed.load(Ordering::SeqCst), 7);
        assert_eq!(pool.stats().active_connections, 0);
        assert_eq!(pool.stats().completed_tasks, 7);
    }

    #[test]
    fn test_idle_worker_takes_queued_task() {
        let pool = WorkerPool::new(small_config(1, 3, 5));

        assert_eq!(pool.submit(|| {}), Submission::Executed);
        assert!(wait_until(|| pool.stats().active_workers == 0 && pool.stats().completed_tasks == 1));

        // El único worker está ocioso: no hace falta crear otro
        assert_eq!(pool.submit(|| {}), Submission::Executed);
        assert!(wait_until(|| pool.stats().completed_tasks == 2));
        assert_eq!(pool.stats().pool_size, 1);

        pool.shutdown();
    }

    #[test]
    fn test_panicking_task_releases_worker() {
        let pool = WorkerPool::new(small_config(1, 1, 5));
        let ran = Arc::new(AtomicBool::new(false));

        pool.submit(|| panic!("falla dentro de la tarea"));
        let flag = Arc::clone(&ran);
        pool.submit(move || flag.store(true, Ordering::SeqCst));

        assert!(pool.shutdown());
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(pool.stats().completed_tasks, 2);
        assert_eq!(pool.stats().active_connections, 0);
    }

    #[test]
    fn test_idle_workers_expire() {
        let mut config = small_config(1, 2, 5);
        config.keep_alive = Duration::from_millis(50);
        let pool = WorkerPool::new(config);

        pool.submit(|| {});
        assert!(wait_until(|| pool.stats().pool_size == 0));

        // Se vuelve a crear a demanda
        assert_eq!(pool.submit(|| {}), Submission::Executed);
        pool.shutdown();
    }

    #[test]
    fn test_core_workers_stay_without_core_timeout() {
        let mut config = small_config(1, 2, 5);
        config.keep_alive = Duration::from_millis(20);
        config.allow_core_timeout = false;
        let pool = WorkerPool::new(config);

        pool.submit(|| {});
        thread::sleep(Duration::from_millis(150));
        assert_eq!(pool.stats().pool_size, 1);

        assert!(pool.shutdown());
        assert_eq!(pool.stats().pool_size, 0);
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::new(small_config(1, 1, 1));
        assert!(pool.shutdown());
        assert!(pool.is_shutdown());

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        assert_eq!(
            pool.submit(move || flag.store(true, Ordering::SeqCst)),
            Submission::Rejected
        );
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(pool.stats().active_connections, 0);
        assert_eq!(pool.stats().total_connections, 1);

        // Segundo shutdown no hace nada
        assert!(pool.shutdown());
    }

    #[test]
    fn test_forced_shutdown_drops_queue() {
        let mut config = small_config(1, 1, 4);
        config.shutdown_grace = Duration::from_millis(50);
        config.shutdown_force_grace = Duration::from_millis(50);
        let pool = WorkerPool::new(config);

        let gate = Gate::default();
        let executed = Arc::new(AtomicUsize::new(0));

        let blocker = gate.clone();
        assert_eq!(pool.submit(move || blocker.wait()), Submission::Executed);
        for _ in 0..3 {
            let executed = Arc::clone(&executed);
            assert_eq!(
                pool.submit(move || {
                    executed.fetch_add(1, Ordering::SeqCst);
                }),
                Submission::Queued
            );
        }

        assert!(!pool.shutdown());
        assert_eq!(pool.stats().queue_depth, 0);
        // Solo queda la tarea bloqueada
        assert_eq!(pool.stats().active_connections, 1);

        gate.open();
        assert!(wait_until(|| pool.stats().pool_size == 0));
        assert_eq!(executed.load(Ordering::SeqCst), 0);
        assert_eq!(pool.stats().active_connections, 0);
    }

    #[test]
    fn test_core_is_clamped_to_max() {
        let pool = WorkerPool::new(small_config(8, 2, 1));
        assert_eq!(pool.config().core_size, 2);
        assert_eq!(pool.config().max_size, 2);
    }
}
