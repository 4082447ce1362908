//! Compiled view cache.
//!
//! Compiling a definition scopes its stylesheet under a fresh attribute, so views
//! created from the same text with [`View::compile`] never share styles. [`View::cached`]
//! goes through this cache instead and returns the same definition every time.
//!
//! Definitions aren't thread-safe, so every thread has its own cache. It's enabled
//! by default in production (`release`), and disabled in development (`debug`).
use super::{Error, View};
use crate::config::get_config;

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::debug;

thread_local! {
    static VIEWS: RefCell<Views> = RefCell::new(Views::new());
}

/// Views cache, keyed by source text.
#[derive(Default)]
pub struct Views {
    views: HashMap<String, View>,
}

impl Views {
    /// Create new empty view cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a view from the cache, compiling it if it's not there.
    pub fn get(&mut self, text: &str) -> Result<View, Error> {
        self.fetch(text, get_config().general.cache_views)
    }

    fn fetch(&mut self, text: &str, cache: bool) -> Result<View, Error> {
        if let Some(view) = self.views.get(text) {
            return Ok(view.clone());
        }

        let view = View::compile(text)?;

        if cache {
            debug!("Caching view ({} bytes)", text.len());
            self.views.insert(text.to_string(), view.clone());
        }

        Ok(view)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Remove all views from the cache. Views already handed out keep working.
    pub fn clear(&mut self) {
        self.views.clear();
    }

    /// Run `f` with this thread's cache.
    pub fn with<T>(f: impl FnOnce(&mut Views) -> T) -> T {
        VIEWS.with(|views| f(&mut views.borrow_mut()))
    }
}
