//! Builds a [`Resources`] snapshot of an account from the account management API.
//!
//! Stages run one after the other because each one needs the full result of the
//! previous ones: tenants, boundaries, policies, groups, users, service users.
//! Inside a stage, per-entity requests run concurrently and the stage only
//! completes once every request finished. Any error aborts the whole download.

mod boundaries;
mod groups;
mod policies;
mod tenants;
mod users;

use crate::client::AccountClient;
use crate::config::{FeatureFlags, DEFAULT_MAX_CONCURRENCY};
use crate::error::{AccountError, Result};
use crate::types::Resources;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

pub use boundaries::Boundaries;
pub use groups::Groups;
pub use policies::Policies;
pub use tenants::Tenant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub name: String,
    pub uuid: String,
}

impl fmt::Display for AccountInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uuid)
    }
}

pub struct Downloader {
    client: Arc<dyn AccountClient>,
    account: AccountInfo,
    features: FeatureFlags,
    permits: Arc<Semaphore>,
}

impl Downloader {
    pub fn new(client: Arc<dyn AccountClient>, account: AccountInfo, features: FeatureFlags) -> Self {
        Self {
            client,
            account,
            features,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY)),
        }
    }

    /// Caps the number of requests a stage has in flight at once.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
        self
    }

    pub fn account(&self) -> &AccountInfo {
        &self.account
    }

    /// Downloads all account resources. Returns either a complete snapshot or an error.
    #[instrument(skip(self), fields(account = %self.account))]
    pub async fn download_resources(&self) -> Result<Resources> {
        info!("Starting download of account resources");
        let account = self.account.to_string();

        let tenants = self
            .fetch_tenants()
            .await
            .map_err(|e| AccountError::download("fetch environments", &account, e))?;

        let boundaries = if self.features.boundaries {
            self.fetch_boundaries()
                .await
                .map_err(|e| AccountError::download("fetch boundaries", &account, e))?
        } else {
            Boundaries::default()
        };

        let policies = self
            .fetch_policies()
            .await
            .map_err(|e| AccountError::download("fetch policies", &account, e))?;

        let groups = self
            .fetch_groups(&tenants, &policies, &boundaries)
            .await
            .map_err(|e| AccountError::download("fetch groups", &account, e))?;

        let users = self
            .fetch_users(&groups)
            .await
            .map_err(|e| AccountError::download("fetch users", &account, e))?;

        let service_users = if self.features.service_users {
            self.fetch_service_users(&groups)
                .await
                .map_err(|e| AccountError::download("fetch service users", &account, e))?
        } else {
            Vec::new()
        };

        let resources = Resources {
            policies: keyed("policy", policies.into_custom(), |p| p.id.clone()),
            groups: keyed("group", groups.into_groups(), |g| g.id.clone()),
            users: keyed("user", users, |u| u.email.clone()),
            service_users: keyed("service user", service_users, |s| s.id.clone()),
            boundaries: keyed("boundary", boundaries.into_boundaries(), |b| b.id.clone()),
        };

        info!(
            "✅ Downloaded {} policies, {} groups, {} users, {} service users, {} boundaries",
            resources.policies.len(),
            resources.groups.len(),
            resources.users.len(),
            resources.service_users.len(),
            resources.boundaries.len()
        );
        Ok(resources)
    }

    /// Runs `task` for every item concurrently and returns the results in item order.
    ///
    /// The first failing task fails the stage; dropping the `JoinSet` aborts the
    /// tasks still in flight and their results are discarded.
    async fn fan_out<I, T, F, Fut>(&self, items: Vec<I>, task: F) -> Result<Vec<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(Arc<dyn AccountClient>, I) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut join_set = JoinSet::new();
        for (index, item) in items.into_iter().enumerate() {
            let work = task(Arc::clone(&self.client), item);
            let permits = Arc::clone(&self.permits);
            join_set.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| AccountError::Task(e.to_string()))?;
                work.await.map(|value| (index, value))
            });
        }

        let mut results = Vec::with_capacity(join_set.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(AccountError::Task(e.to_string())),
            }
        }

        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, value)| value).collect())
    }
}

/// Keys the entities by their ID. A later entity with the same ID replaces the
/// earlier one.
fn keyed<T, F>(kind: &str, items: Vec<T>, key: F) -> BTreeMap<String, T>
where
    F: Fn(&T) -> String,
{
    let mut map = BTreeMap::new();
    for item in items {
        let id = key(&item);
        if map.insert(id.clone(), item).is_some() {
            warn!("Two {} entries share the ID '{}', keeping the last one", kind, id);
        }
    }
    map
}
