//! Bounded pool of reusable SQLite connections.
//!
//! Connections are checked out with [`ConnectionPool::acquire`] and returned
//! automatically when the guard drops. The pool never opens more than
//! `max_connections` handles; a caller that cannot get one within
//! `acquire_timeout` receives [`StoreError::PoolTimeout`] rather than
//! hanging.

use crate::error::StoreError;
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: usize,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

struct PoolState {
    idle: Vec<Connection>,
    /// Total open connections, idle and checked out. Never exceeds
    /// `max_connections`.
    active: usize,
}

pub struct ConnectionPool {
    db_path: PathBuf,
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    /// Create a pool for the given database path, opening one connection
    /// up front so schema problems surface immediately.
    pub fn new(db_path: &Path, config: PoolConfig) -> Result<Self, StoreError> {
        let pool = Self {
            db_path: db_path.to_path_buf(),
            config,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                active: 0,
            }),
            available: Condvar::new(),
        };

        let conn = pool.open_connection()?;
        {
            let mut state = pool.state.lock().expect("pool mutex poisoned");
            state.idle.push(conn);
            state.active = 1;
        }

        log::debug!(
            "Connection pool ready for {} (max {})",
            pool.db_path.display(),
            pool.config.max_connections
        );
        Ok(pool)
    }

    fn open_connection(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys=ON;
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA busy_timeout=5000;
        ",
        )?;
        Ok(conn)
    }

    /// Check out a connection: an idle one if available, a freshly opened
    /// one while under the limit, otherwise wait for a release until the
    /// configured timeout.
    pub fn acquire(&self) -> Result<PooledConnection<'_>, StoreError> {
        let deadline = Instant::now() + self.config.acquire_timeout;
        let mut state = self.state.lock().expect("pool mutex poisoned");

        loop {
            if let Some(conn) = state.idle.pop() {
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(conn),
                });
            }

            if state.active < self.config.max_connections {
                state.active += 1;
                drop(state);
                return match self.open_connection() {
                    Ok(conn) => Ok(PooledConnection {
                        pool: self,
                        conn: Some(conn),
                    }),
                    Err(e) => {
                        let mut state = self.state.lock().expect("pool mutex poisoned");
                        state.active -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                log::error!("Timed out waiting for a database connection");
                return Err(StoreError::PoolTimeout(self.config.acquire_timeout));
            }

            let (guard, _wait) = self
                .available
                .wait_timeout(state, deadline - now)
                .expect("pool mutex poisoned");
            state = guard;
        }
    }

    fn release(&self, conn: Connection) {
        let mut state = self.state.lock().expect("pool mutex poisoned");
        if state.idle.len() < self.config.max_connections {
            state.idle.push(conn);
        } else {
            // Pool already holds a full complement of idle handles.
            let _ = conn.close();
            state.active -= 1;
        }
        drop(state);
        self.available.notify_one();
    }

    /// Open handles (idle plus checked out), for diagnostics.
    pub fn active_connections(&self) -> usize {
        self.state.lock().expect("pool mutex poisoned").active
    }
}

/// A checked-out connection. Dereferences to [`rusqlite::Connection`] and
/// returns itself to the pool on drop.
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl std::fmt::Debug for PooledConnection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("checked_out", &self.conn.is_some())
            .finish()
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection already released")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection already released")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_pool(max: usize, timeout_ms: u64) -> (ConnectionPool, TempDir) {
        let temp = TempDir::new().unwrap();
        let pool = ConnectionPool::new(
            &temp.path().join("pool_test.db"),
            PoolConfig {
                max_connections: max,
                acquire_timeout: Duration::from_millis(timeout_ms),
            },
        )
        .unwrap();
        (pool, temp)
    }

    #[test]
    fn test_acquire_and_release_reuses_connection() {
        let (pool, _temp) = test_pool(2, 1000);
        {
            let conn = pool.acquire().unwrap();
            conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        }
        // Released handle is reused, not reopened
        assert_eq!(pool.active_connections(), 1);
        let conn = pool.acquire().unwrap();
        conn.execute("INSERT INTO t (x) VALUES (1)", []).unwrap();
        assert_eq!(pool.active_connections(), 1);
    }

    #[test]
    fn test_pool_never_exceeds_max_connections() {
        let (pool, _temp) = test_pool(3, 100);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();
        assert_eq!(pool.active_connections(), 3);

        // Saturated: the next acquire times out instead of opening a fourth
        let err = pool.acquire().unwrap_err();
        assert!(matches!(err, StoreError::PoolTimeout(_)));
        assert_eq!(pool.active_connections(), 3);

        drop((a, b, c));
        assert_eq!(pool.active_connections(), 3);
    }

    #[test]
    fn test_blocked_acquire_wakes_on_release() {
        use std::sync::Arc;

        let temp = TempDir::new().unwrap();
        let pool = Arc::new(
            ConnectionPool::new(
                &temp.path().join("pool_test.db"),
                PoolConfig {
                    max_connections: 1,
                    acquire_timeout: Duration::from_secs(5),
                },
            )
            .unwrap(),
        );

        let held = pool.acquire().unwrap();
        let waiter = {
            let pool = pool.clone();
            std::thread::spawn(move || pool.acquire().map(|_| ()))
        };

        std::thread::sleep(Duration::from_millis(50));
        drop(held);

        waiter.join().unwrap().unwrap();
        assert_eq!(pool.active_connections(), 1);
    }
}
