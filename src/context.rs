//! The application context (spec §9 redesign: "replace ambient globals with
//! a single constructed context object; dependency edges must form a DAG").
//! One [`AppContext`] is built once at startup and handed by reference to
//! every request handler and scheduled job; nothing in the crate reaches
//! for a global or a `Lazy`/`OnceCell` singleton.

use std::sync::Arc;

use crate::{
    config::AppConfig,
    store::{CatalogStore, DirectoryLayout, DirectoryStore},
};

/// Everything a request handler or scheduled job needs, constructed once
/// from [`AppConfig`] at startup. `catalog` and `directory` are trait
/// objects behind `Arc` so the context itself can be cheaply cloned and
/// shared across worker threads without the stores ever owning the
/// context back — a one-way edge, not a cycle.
#[derive(Clone)]
pub struct AppContext {
    pub catalog: Arc<dyn CatalogStore>,
    pub directory: Arc<dyn DirectoryStore>,
    pub directory_layout: DirectoryLayout,
    pub config: Arc<AppConfig>,
}

impl AppContext {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        directory: Arc<dyn DirectoryStore>,
        config: AppConfig,
    ) -> Self {
        let directory_layout = DirectoryLayout {
            base_dn: config.directory.base_dn.clone(),
            data_container: format!("{},{}", config.directory.data_container, config.directory.base_dn),
            nc_data_container: format!("{},{}", config.directory.nc_data_container, config.directory.base_dn),
        };
        Self {
            catalog,
            directory,
            directory_layout,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryCatalog, InMemoryDirectory};
    use std::collections::HashMap;

    fn config() -> AppConfig {
        let mut vars = HashMap::new();
        vars.insert("PKD_CATALOG_HOST".to_string(), "db.internal".to_string());
        vars.insert("PKD_CATALOG_NAME".to_string(), "pkd".to_string());
        vars.insert("PKD_CATALOG_USER".to_string(), "pkd_svc".to_string());
        vars.insert("PKD_CATALOG_PASSWORD".to_string(), "secret".to_string());
        vars.insert("PKD_DIRECTORY_WRITE_HOST".to_string(), "ldap.internal".to_string());
        vars.insert("PKD_DIRECTORY_BIND_DN".to_string(), "cn=admin,o=pkd".to_string());
        vars.insert("PKD_DIRECTORY_BIND_PASSWORD".to_string(), "secret".to_string());
        vars.insert("PKD_DIRECTORY_BASE_DN".to_string(), "o=pkd".to_string());
        vars.insert("PKD_CRYPTO_TRUST_ANCHOR_PATH".to_string(), "/etc/pkd/anchors".to_string());
        AppConfig::from_map(&vars).unwrap()
    }

    #[test]
    fn derives_directory_layout_from_config() {
        let ctx = AppContext::new(
            Arc::new(InMemoryCatalog::new()),
            Arc::new(InMemoryDirectory::new()),
            config(),
        );
        assert_eq!(ctx.directory_layout.base_dn, "o=pkd");
        assert_eq!(ctx.directory_layout.data_container, "ou=data,o=pkd");
        assert_eq!(ctx.directory_layout.nc_data_container, "ou=nc-data,o=pkd");
    }
}
