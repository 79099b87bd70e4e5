//! Named connection pools for the template store and every tenant database.
//!
//! The registry is built once at startup and handed to whoever needs a
//! connection. Tenant membership here is what "known database" means: a
//! template may only target names registered as tenants.

use std::collections::BTreeMap;

use querybank_core::error::CoreError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::DbPool;

/// Connection settings shared by all tenant databases. Tenants live on one
/// server and differ only by database name.
#[derive(Debug, Clone)]
pub struct TenantSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub max_connections: u32,
    pub names: Vec<String>,
}

impl TenantSettings {
    fn connect_options(&self, database: &str) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(database);
        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseRegistry {
    store: DbPool,
    tenants: BTreeMap<String, DbPool>,
}

impl DatabaseRegistry {
    /// Build a registry from pools that are already open.
    pub fn new(store: DbPool, tenants: impl IntoIterator<Item = (String, DbPool)>) -> Self {
        Self {
            store,
            tenants: tenants.into_iter().collect(),
        }
    }

    /// Register one lazily-connecting pool per tenant name.
    ///
    /// Tenant pools open connections on first use, so an unreachable tenant
    /// does not prevent startup; it surfaces as an execution error instead.
    pub fn with_tenants(store: DbPool, settings: &TenantSettings) -> Self {
        let tenants = settings
            .names
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| {
                let name = name.trim().to_string();
                let pool = PgPoolOptions::new()
                    .min_connections(0)
                    .max_connections(settings.max_connections)
                    .connect_lazy_with(settings.connect_options(&name));
                (name, pool)
            });
        Self::new(store, tenants)
    }

    /// The template-store pool.
    pub fn store(&self) -> &DbPool {
        &self.store
    }

    /// The pool for a tenant, or [`CoreError::UnavailableDatabase`].
    pub fn tenant(&self, name: &str) -> Result<&DbPool, CoreError> {
        self.tenants
            .get(name)
            .ok_or_else(|| CoreError::UnavailableDatabase {
                requested: name.to_string(),
                allowed: self.tenant_names(),
            })
    }

    /// Registered tenant names, sorted.
    pub fn tenant_names(&self) -> Vec<String> {
        self.tenants.keys().cloned().collect()
    }

    /// Close every pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        for (name, pool) in &self.tenants {
            pool.close().await;
            tracing::debug!(database = %name, "Tenant pool closed");
        }
        self.store.close().await;
    }
}
