use super::Downloader;
use crate::client::PolicyOverviewDto;
use crate::error::{AccountError, Result};
use crate::reference::Ref;
use crate::sanitize::sanitize;
use crate::types::{Policy, PolicyLevel, LEVEL_ACCOUNT, LEVEL_ENVIRONMENT};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Every policy visible to the account. Only custom policies carry a domain
/// [`Policy`]; built-in ones are kept by name so bindings can point at them.
#[derive(Debug, Default)]
pub struct Policies {
    entries: Vec<PolicyEntry>,
    by_uuid: HashMap<String, usize>,
}

#[derive(Debug)]
struct PolicyEntry {
    uuid: String,
    name: String,
    custom: Option<Policy>,
}

impl Policies {
    /// Reference for a bound policy: an ID for custom policies, the name for built-in ones.
    pub fn reference(&self, uuid: &str) -> Option<Ref> {
        let entry = &self.entries[*self.by_uuid.get(uuid)?];
        Some(match &entry.custom {
            Some(policy) => Ref::id(policy.id.clone()),
            None => Ref::name(entry.name.clone()),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_custom(self) -> Vec<Policy> {
        self.entries.into_iter().filter_map(|e| e.custom).collect()
    }

    fn push(&mut self, entry: PolicyEntry) {
        self.by_uuid.insert(entry.uuid.clone(), self.entries.len());
        self.entries.push(entry);
    }
}

pub(super) fn is_custom(overview: &PolicyOverviewDto) -> bool {
    overview.level_type == LEVEL_ACCOUNT || overview.level_type == LEVEL_ENVIRONMENT
}

fn policy_level(overview: &PolicyOverviewDto) -> Result<PolicyLevel> {
    if overview.level_type == LEVEL_ACCOUNT {
        return Ok(PolicyLevel::Account);
    }
    if overview.level_id.trim().is_empty() {
        return Err(AccountError::MissingDetail {
            kind: "policy",
            name: overview.name.clone(),
            detail: "environment ID",
        });
    }
    Ok(PolicyLevel::Environment {
        environment: overview.level_id.clone(),
    })
}

impl Downloader {
    #[instrument(skip(self))]
    pub(super) async fn fetch_policies(&self) -> Result<Policies> {
        let overviews = self.client.get_policies(&self.account.uuid).await?;
        let (custom, builtin): (Vec<_>, Vec<_>) = overviews.into_iter().partition(is_custom);
        debug!("{} custom and {} built-in policies", custom.len(), builtin.len());

        let definitions = self
            .fan_out(custom, |client, overview| async move {
                let definition = client.get_policy_definition(&overview).await?;
                match definition {
                    Some(definition) => Ok((overview, definition)),
                    None => Err(AccountError::MissingDetail {
                        kind: "policy",
                        name: overview.name,
                        detail: "definition",
                    }),
                }
            })
            .await?;

        let mut policies = Policies::default();
        for (overview, definition) in definitions {
            let level = policy_level(&overview)?;
            let description = if definition.description.is_empty() {
                overview.description.clone()
            } else {
                definition.description
            };
            policies.push(PolicyEntry {
                uuid: overview.uuid.clone(),
                name: overview.name.clone(),
                custom: Some(Policy {
                    id: sanitize(&overview.name),
                    name: overview.name,
                    level,
                    description,
                    policy: definition.statement_query,
                    origin_object_id: Some(overview.uuid),
                }),
            });
        }
        for overview in builtin {
            policies.push(PolicyEntry {
                uuid: overview.uuid,
                name: overview.name,
                custom: None,
            });
        }

        info!("Fetched {} policies", policies.len());
        Ok(policies)
    }
}
