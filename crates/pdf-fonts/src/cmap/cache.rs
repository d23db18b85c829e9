//! Process-wide cache of parsed CMap programs.

use core::fmt;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::debug;

use crate::{
    cmap::{CodeTable, UnicodeTable},
    errors::Error,
};

/// Source of named CMap resources.
///
/// The crate resolves CMap names (e.g. `90ms-RKSJ-H` or a ToUnicode name)
/// through this interface; packaging of the precompiled character-collection
/// data stays with the caller. Returning `None` means the name is unknown.
pub trait CMapResources: Send + Sync {
    /// Loads the raw bytes of a named CMap program.
    fn load(&self, name: &str) -> Option<Vec<u8>>;
}

/// Cache of parsed CMap programs, keyed by resource name.
///
/// Each distinct name is resolved and parsed at most once; all callers share
/// the same immutable [`CodeTable`] / [`UnicodeTable`] instance. The lock is
/// held across the parse, so concurrent first-time lookups of one name still
/// produce exactly one parse. Failures are never cached: a later call with
/// corrected resources succeeds.
///
/// The cache is an explicitly constructed object rather than process-global
/// state; share one instance via [`Arc`], or build a private one per test.
pub struct CMapCache {
    resources: Arc<dyn CMapResources>,
    code_tables: Mutex<HashMap<String, Arc<CodeTable>>>,
    unicode_tables: Mutex<HashMap<String, Arc<UnicodeTable>>>,
}

impl CMapCache {
    /// Creates a cache resolving names through the provided resources.
    pub fn new(resources: Arc<dyn CMapResources>) -> Self {
        Self {
            resources,
            code_tables: Mutex::new(HashMap::new()),
            unicode_tables: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the code→CID table registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceNotFound`] for an unknown name and
    /// [`Error::MalformedCMap`] if the resource fails to parse.
    pub fn code_table(&self, name: &str) -> Result<Arc<CodeTable>, Error> {
        let mut tables = self.code_tables.lock().expect("CMap cache lock poisoned");
        if let Some(table) = tables.get(name) {
            return Ok(Arc::clone(table));
        }

        debug!("parsing code table `{name}`");
        let data = self.load(name)?;
        let table = Arc::new(CodeTable::parse(name, &data)?);
        tables.insert(name.to_owned(), Arc::clone(&table));
        Ok(table)
    }

    /// Returns the CID→Unicode table registered under `name`.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::code_table()`].
    pub fn unicode_table(&self, name: &str) -> Result<Arc<UnicodeTable>, Error> {
        let mut tables = self
            .unicode_tables
            .lock()
            .expect("CMap cache lock poisoned");
        if let Some(table) = tables.get(name) {
            return Ok(Arc::clone(table));
        }

        debug!("parsing ToUnicode table `{name}`");
        let data = self.load(name)?;
        let table = Arc::new(UnicodeTable::parse(name, &data)?);
        tables.insert(name.to_owned(), Arc::clone(&table));
        Ok(table)
    }

    fn load(&self, name: &str) -> Result<Vec<u8>, Error> {
        self.resources
            .load(name)
            .ok_or_else(|| Error::ResourceNotFound {
                name: name.to_owned(),
            })
    }
}

impl fmt::Debug for CMapCache {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("CMapCache").finish_non_exhaustive()
    }
}
