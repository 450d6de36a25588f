//! Shared test-only helpers for scenetree_core.

use crate::config::Config;
use crate::models::NodePath;
use crate::session::Session;
use std::sync::{Mutex, OnceLock};

/// Global lock serializing environment mutation across test threads.
pub(crate) fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

#[allow(unused_unsafe)]
fn set_env_var(key: &str, value: &str) {
    // SAFETY: callers hold `env_lock` while mutating.
    unsafe {
        std::env::set_var(key, value);
    }
}

#[allow(unused_unsafe)]
fn remove_env_var(key: &str) {
    // SAFETY: callers hold `env_lock` while mutating.
    unsafe {
        std::env::remove_var(key);
    }
}

/// Restores an environment variable value on drop.
pub(crate) struct EnvGuard {
    key: String,
    previous: Option<String>,
}

impl EnvGuard {
    pub(crate) fn set(key: &str, value: &str) -> Self {
        let previous = std::env::var(key).ok();
        set_env_var(key, value);
        Self {
            key: key.to_string(),
            previous,
        }
    }

    pub(crate) fn remove(key: &str) -> Self {
        let previous = std::env::var(key).ok();
        remove_env_var(key);
        Self {
            key: key.to_string(),
            previous,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.previous.as_deref() {
            Some(previous) => set_env_var(&self.key, previous),
            None => remove_env_var(&self.key),
        }
    }
}

/// Session on the bare default scene (services only, no samples, no buffers).
pub(crate) fn bare_session() -> Session {
    Session::new(Config {
        seed_samples: false,
        ..Config::default()
    })
}

pub(crate) fn workspace() -> NodePath {
    NodePath::from_segments(["Workspace"])
}

pub(crate) fn sss() -> NodePath {
    NodePath::from_segments(["ServerScriptService"])
}

/// Asserts that every open buffer resolves to a live Script node.
///
/// # Panics
/// Panics when a buffer points at a missing or non-Script node.
pub(crate) fn assert_buffers_consistent(session: &Session) {
    for buffer in session.buffers().buffers() {
        let node = session
            .tree()
            .resolve(buffer.path())
            .unwrap_or_else(|_| panic!("buffer {} points at a missing node", buffer.path()));
        assert!(
            node.is_script(),
            "buffer {} points at a {}",
            buffer.path(),
            node.class()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{env_lock, EnvGuard};

    #[test]
    fn env_guard_restores_previous_value() {
        let _lock = env_lock().lock().expect("env lock");
        let key = "SCENETREE_TEST_ENV_GUARD_RESTORE";
        let _baseline = EnvGuard::set(key, "before");
        {
            let _override = EnvGuard::set(key, "after");
            assert_eq!(std::env::var(key).ok().as_deref(), Some("after"));
        }
        assert_eq!(std::env::var(key).ok().as_deref(), Some("before"));
    }

    #[test]
    fn env_guard_remove_restores_missing_value() {
        let _lock = env_lock().lock().expect("env lock");
        let key = "SCENETREE_TEST_ENV_GUARD_REMOVE";
        {
            let _removed = EnvGuard::remove(key);
            assert!(std::env::var(key).is_err());
        }
        assert!(std::env::var(key).is_err());
    }
}
