//! Lock-free counter without rate tracking.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Serialize, Serializer};

#[derive(Debug, Default)]
pub struct BasicCounter {
    value: AtomicU64,
}

impl BasicCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.set(0);
    }

    pub fn set(&self, v: u64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Serialize for BasicCounter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.get())
    }
}
