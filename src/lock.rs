//! Locking primitives.
//!
//! Interrupt handlers never take these locks. `EngineMutex` guards the
//! simulated register file and only exists with `std`; `EngineOnce` holds
//! the process-wide engine on either build.

#[cfg(feature = "std")]
#[derive(Debug)]
pub struct EngineMutex<T>(std::sync::Mutex<T>);

#[cfg(feature = "std")]
impl<T> EngineMutex<T> {
    pub const fn new(value: T) -> Self {
        Self(std::sync::Mutex::new(value))
    }

    /// Lock, recovering the data if a previous holder panicked.
    pub fn lock(&self) -> std::sync::MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Write-once cell for the process-wide engine instance.
pub type EngineOnce<T> = spin::Once<T>;
