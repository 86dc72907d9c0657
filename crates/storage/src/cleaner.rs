//! Expiry reaper background task
//!
//! The table never evicts expired records on its own. [`ExpiryReaper`] is the
//! optional external actor: a background thread that periodically purges
//! records whose expiry has passed, through the table's normal write path.
//!
//! # Design Notes
//!
//! - Uses `Table::purge_expired` under the write lock, like any other writer
//! - Graceful shutdown via atomic flag
//! - Interval comes from `TableConfig::reaper_interval` unless overridden

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use doctable_core::Timestamp;
use tracing::debug;

use crate::config::ConfigError;
use crate::table::Table;

/// Background expiry reaper
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use doctable_storage::{ExpiryReaper, Table};
///
/// let table = Arc::new(Table::new());
/// let reaper = ExpiryReaper::new(Arc::clone(&table), Duration::from_millis(50)).unwrap();
/// let handle = reaper.start();
///
/// // ... use the table ...
///
/// reaper.shutdown();
/// handle.join().unwrap();
/// ```
pub struct ExpiryReaper {
    /// Table to sweep
    table: Arc<Table>,
    /// Sleep between sweeps
    interval: Duration,
    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl ExpiryReaper {
    /// Reaper with an explicit interval
    ///
    /// A zero interval is rejected; the thread would never sleep.
    pub fn new(table: Arc<Table>, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroReaperInterval);
        }
        Ok(Self {
            table,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Reaper using the table's configured interval
    pub fn for_table(table: Arc<Table>) -> Result<Self, ConfigError> {
        let interval = table.config().reaper_interval;
        Self::new(table, interval)
    }

    /// Sleep between sweeps
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one sweep now; returns the number of records removed
    pub fn sweep(&self) -> usize {
        self.table.purge_expired(Timestamp::now())
    }

    /// Start the background thread
    ///
    /// The thread sleeps first, then sweeps, until `shutdown()` is called.
    pub fn start(&self) -> JoinHandle<()> {
        let table = Arc::clone(&self.table);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;

        thread::spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                // Short naps so shutdown is noticed promptly
                let nap = Duration::from_millis(100).min(interval);
                let mut elapsed = Duration::ZERO;
                while elapsed < interval {
                    if shutdown.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(nap);
                    elapsed += nap;
                }

                let removed = table.purge_expired(Timestamp::now());
                if removed > 0 {
                    debug!(target: "doctable::reaper", removed, "expired records reaped");
                }
            }
        })
    }

    /// Signal shutdown; the thread exits on its next check
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown has been signaled
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
