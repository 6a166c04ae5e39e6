//! Lazily populated directory cache.

/// Single-slot cache holding the full channel directory of one connector.
///
/// The cache is plain owned state: it is populated through `&mut self` and is
/// therefore confined to whichever thread currently owns the connector.
#[derive(Debug, Clone)]
pub struct DirectoryCache<T> {
    entries: Option<Vec<T>>,
}

impl<T> Default for DirectoryCache<T> {
    fn default() -> Self {
        Self { entries: None }
    }
}

impl<T> DirectoryCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entries, calling `fetch` first if the cache is empty.
    ///
    /// A failed fetch leaves the cache empty.
    pub fn get_or_try_populate<E, F>(&mut self, fetch: F) -> Result<&[T], E>
    where
        F: FnOnce() -> Result<Vec<T>, E>,
    {
        if self.entries.is_none() {
            let entries = fetch()?;
            tracing::debug!(entries = entries.len(), "directory cache populated");
            self.entries = Some(entries);
        }
        Ok(self.entries.as_deref().unwrap_or(&[]))
    }

    /// Drop the cached entries so the next read refetches.
    pub fn invalidate(&mut self) {
        if self.entries.take().is_some() {
            tracing::debug!("directory cache invalidated");
        }
    }

    pub fn is_populated(&self) -> bool {
        self.entries.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
