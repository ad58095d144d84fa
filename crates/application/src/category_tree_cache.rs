use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use catalogue_core::AppResult;
use catalogue_domain::RoleCatalog;

use crate::RoleCatalogRepository;

/// Validated catalog snapshot together with its load time.
#[derive(Debug, Clone)]
pub struct CachedRoleCatalog {
    /// Immutable catalog shared by concurrent requests.
    pub catalog: Arc<RoleCatalog>,
    /// When the snapshot was read from storage.
    pub cached_at: DateTime<Utc>,
}

/// Process-wide cache of the role catalog and its category tree.
///
/// Writers of categories or roles must call [`CategoryTreeCache::invalidate`]
/// so the next reader rebuilds the snapshot.
pub struct CategoryTreeCache {
    repository: Arc<dyn RoleCatalogRepository>,
    entry: RwLock<Option<CachedRoleCatalog>>,
}

impl CategoryTreeCache {
    /// Creates an empty cache on top of the catalog repository.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleCatalogRepository>) -> Self {
        Self {
            repository,
            entry: RwLock::new(None),
        }
    }

    /// Returns the cached catalog, loading it on first use.
    pub async fn catalog(&self) -> AppResult<Arc<RoleCatalog>> {
        Ok(self.load(false).await?.catalog)
    }

    /// Returns the cached snapshot, rebuilding it from storage when empty or
    /// when `force_refresh` is set.
    ///
    /// A snapshot that fails integrity validation is never cached.
    pub async fn load(&self, force_refresh: bool) -> AppResult<CachedRoleCatalog> {
        if !force_refresh {
            if let Some(entry) = self.entry.read().await.as_ref() {
                return Ok(entry.clone());
            }
        }

        let mut entry = self.entry.write().await;
        if !force_refresh {
            if let Some(existing) = entry.as_ref() {
                return Ok(existing.clone());
            }
        }

        let categories = self.repository.list_role_categories().await?;
        let roles = self.repository.list_roles().await?;
        let catalog = RoleCatalog::build(categories, roles).inspect_err(|error| {
            tracing::error!(%error, "role catalog failed integrity validation");
        })?;

        let loaded = CachedRoleCatalog {
            catalog: Arc::new(catalog),
            cached_at: Utc::now(),
        };
        *entry = Some(loaded.clone());
        tracing::debug!(
            categories = loaded.catalog.tree().len(),
            "role catalog cache refreshed"
        );

        Ok(loaded)
    }

    /// Drops the cached snapshot.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}
