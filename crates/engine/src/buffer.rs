//! Bounded rolling price history

/// FIFO buffer of recent closes for streaming evaluation.
///
/// Appending past capacity evicts the oldest close. Owned by a single
/// `SignalEngine`; concurrent writers must serialize around the engine.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    prices: Vec<f64>,
    capacity: usize,
}

impl RollingBuffer {
    /// Panics on zero capacity; that is a construction bug, not data.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        Self {
            prices: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, price: f64) {
        self.prices.push(price);
        if self.prices.len() > self.capacity {
            self.prices.remove(0);
        }
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
