use super::Downloader;
use crate::client::ManagementZoneDto;
use crate::error::Result;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// An environment of the account with the management zones it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub management_zones: Vec<ManagementZoneDto>,
}

impl Tenant {
    pub fn management_zone_name(&self, zone_id: &str) -> Option<&str> {
        self.management_zones
            .iter()
            .find(|mz| mz.id == zone_id)
            .map(|mz| mz.name.as_str())
    }
}

impl Downloader {
    #[instrument(skip(self))]
    pub(super) async fn fetch_tenants(&self) -> Result<Vec<Tenant>> {
        let (environments, zones) = self
            .client
            .get_environments_and_management_zones(&self.account.uuid)
            .await?;

        let mut zones_by_parent: HashMap<String, Vec<ManagementZoneDto>> = HashMap::new();
        for zone in zones {
            zones_by_parent.entry(zone.parent.clone()).or_default().push(zone);
        }

        let tenants: Vec<Tenant> = environments
            .into_iter()
            .map(|env| {
                let management_zones = zones_by_parent.remove(&env.id).unwrap_or_default();
                debug!("Environment {} has {} management zones", env.id, management_zones.len());
                Tenant {
                    id: env.id,
                    name: env.name,
                    management_zones,
                }
            })
            .collect();

        info!("Fetched {} environments", tenants.len());
        Ok(tenants)
    }
}
