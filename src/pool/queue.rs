//! # Cola FIFO Acotada
//! src/pool/queue.rs
//!
//! Cola de admisión del pool. No tiene sincronización propia: vive dentro
//! del `Mutex` del estado del pool, junto a los contadores de workers, para
//! que "hay lugar" y "encolar" sean una sola decisión atómica.

use std::collections::VecDeque;

/// Cola FIFO con capacidad máxima fija
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    max_capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Crea una cola vacía con capacidad máxima
    pub fn new(max_capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(max_capacity.min(1024)),
            max_capacity,
        }
    }

    /// Encola al final
    ///
    /// Si la cola está llena devuelve el elemento en `Err` para que quien
    /// llama decida qué hacer con él.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Desencola el elemento más antiguo
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Vacía la cola devolviendo todo lo pendiente, en orden
    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    /// Tamaño actual
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max_capacity
    }

    /// Capacidad máxima
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }
}
