//! Process-wide default backend.
//!
//! Set once at startup with [`set_index_backend`]; calls that do not carry an
//! explicit backend fall back to it.

use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::backend::IndexBackend;
use crate::error::{DualdexError, Result};

lazy_static! {
    static ref DEFAULT_BACKEND: RwLock<Option<Arc<dyn IndexBackend>>> = RwLock::new(None);
}

/// Install `backend` as the default, replacing any previous one.
pub fn set_index_backend(backend: Arc<dyn IndexBackend>) {
    *DEFAULT_BACKEND.write() = Some(backend);
}

/// The current default backend, if one is installed.
pub fn index_backend() -> Option<Arc<dyn IndexBackend>> {
    DEFAULT_BACKEND.read().clone()
}

pub fn clear_index_backend() {
    *DEFAULT_BACKEND.write() = None;
}

/// `explicit` if given, else the default backend.
pub fn resolve_backend(explicit: Option<Arc<dyn IndexBackend>>) -> Result<Arc<dyn IndexBackend>> {
    explicit.or_else(index_backend).ok_or_else(|| {
        DualdexError::config("no index backend configured; call set_index_backend first")
    })
}
