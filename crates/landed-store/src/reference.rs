use std::sync::Arc;

use landed_models::Country;
use moka::sync::Cache;

use crate::directory::CountryDirectory;
use crate::error::StoreError;

/// Read-through cache in front of a [`CountryDirectory`].
///
/// Hits are kept until [`CachedDirectory::refresh`] is called; there is no
/// TTL. Misses are not cached, so newly seeded countries become visible
/// immediately while previously resolved ones keep serving the stored copy.
pub struct CachedDirectory {
    inner: Arc<dyn CountryDirectory>,
    entries: Cache<String, Country>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn CountryDirectory>, max_capacity: u64) -> Self {
        Self {
            inner,
            entries: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Drop every cached entry. The next lookups read through again.
    pub fn refresh(&self) {
        self.entries.invalidate_all();
        tracing::debug!("Country reference cache invalidated");
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    fn read_through(
        &self,
        key: String,
        load: impl FnOnce() -> Result<Option<Country>, StoreError>,
    ) -> Result<Option<Country>, StoreError> {
        if let Some(country) = self.entries.get(&key) {
            return Ok(Some(country));
        }
        let loaded = load()?;
        if let Some(country) = &loaded {
            self.entries.insert(key, country.clone());
        }
        Ok(loaded)
    }
}

impl CountryDirectory for CachedDirectory {
    fn find_by_alpha2(&self, code: &str) -> Result<Option<Country>, StoreError> {
        self.read_through(format!("a2:{}", code.to_uppercase()), || {
            self.inner.find_by_alpha2(code)
        })
    }

    fn find_by_alpha3(&self, code: &str) -> Result<Option<Country>, StoreError> {
        self.read_through(format!("a3:{}", code.to_uppercase()), || {
            self.inner.find_by_alpha3(code)
        })
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Country>, StoreError> {
        self.read_through(format!("name:{}", name.to_lowercase()), || {
            self.inner.find_by_name(name)
        })
    }
}
