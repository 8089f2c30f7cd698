//! Point-in-time value.

use std::sync::{PoisonError, RwLock};

use serde::{Serialize, Serializer};

/// Float gauge. NaN means "never observed".
#[derive(Debug)]
pub struct Gauge {
    value: RwLock<f64>,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: RwLock::new(f64::NAN),
        }
    }

    pub fn reset(&self) {
        self.set(f64::NAN);
    }

    pub fn set(&self, v: f64) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = v;
    }

    pub fn get(&self) -> f64 {
        *self.value.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_nan(&self) -> bool {
        self.get().is_nan()
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-finite values serialize as `null`.
impl Serialize for Gauge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.get())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fresh_gauge_is_nan() {
        let g = Gauge::new();
        assert!(g.get().is_nan());
        assert!(g.is_nan());
    }

    #[test]
    fn set_then_get_is_exact() {
        let g = Gauge::new();
        for x in [0.0, -1.5, 42.125, f64::MAX, f64::MIN_POSITIVE] {
            g.set(x);
            assert_eq!(g.get(), x);
        }
        g.reset();
        assert!(g.is_nan());
    }

    #[test]
    fn nan_serializes_as_null() {
        let g = Gauge::new();
        assert_eq!(serde_json::to_string(&g).unwrap(), "null");
        g.set(1.5);
        assert_eq!(serde_json::to_string(&g).unwrap(), "1.5");
    }
}
