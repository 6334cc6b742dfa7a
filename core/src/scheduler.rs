use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct GateState {
    in_flight: usize,
    peak: usize,
    admitted: u64,
}

#[derive(Debug)]
struct GateInner {
    capacity: usize,
    state: Mutex<GateState>,
    released: Condvar,
}

/// Counting semaphore bounding how many segment fetches run at once.
///
/// `acquire` blocks until a slot is free and hands back a [`GatePermit`];
/// the slot returns to the gate when the permit is dropped.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(GateInner {
                capacity: capacity.max(1),
                state: Mutex::new(GateState::default()),
                released: Condvar::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn acquire(&self) -> GatePermit {
        let mut state = self.lock();
        while state.in_flight >= self.inner.capacity {
            state = self
                .inner
                .released
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        state.in_flight += 1;
        state.admitted += 1;
        if state.in_flight > state.peak {
            state.peak = state.in_flight;
        }
        GatePermit {
            gate: self.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Highest in-flight count seen since the gate was created.
    pub fn peak(&self) -> usize {
        self.lock().peak
    }

    pub fn admitted(&self) -> u64 {
        self.lock().admitted
    }

    fn release(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.inner.released.notify_one();
    }

    // Counters stay consistent across a panic in a fetch thread, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One admitted slot on an [`AdmissionGate`].
#[derive(Debug)]
pub struct GatePermit {
    gate: AdmissionGate,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
