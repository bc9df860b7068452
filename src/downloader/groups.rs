use super::{Boundaries, Downloader, Policies, Tenant};
use crate::client::{
    GroupDto, LevelPolicyBindingsDto, PermissionsGroupDto, SCOPE_TYPE_ACCOUNT,
    SCOPE_TYPE_MANAGEMENT_ZONE, SCOPE_TYPE_TENANT,
};
use crate::error::{AccountError, Result};
use crate::reference::Ref;
use crate::sanitize::sanitize;
use crate::types::{
    AccountScope, EnvironmentScope, Group, ManagementZoneScope, PolicyBinding, LEVEL_ACCOUNT,
    LEVEL_ENVIRONMENT,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

/// Downloaded groups, addressable by their backend UUID.
#[derive(Debug, Default)]
pub struct Groups {
    groups: Vec<Group>,
    by_uuid: HashMap<String, usize>,
}

impl Groups {
    pub fn new(groups: Vec<Group>) -> Self {
        let by_uuid = groups
            .iter()
            .enumerate()
            .filter_map(|(i, g)| g.origin_object_id.clone().map(|uuid| (uuid, i)))
            .collect();
        Self { groups, by_uuid }
    }

    pub fn reference(&self, uuid: &str) -> Option<Ref> {
        self.by_uuid
            .get(uuid)
            .map(|&i| Ref::id(self.groups[i].id.clone()))
    }

    /// References for the given group UUIDs in the same order. UUIDs of groups
    /// that were not downloaded are left out.
    pub fn references<'a, I>(&self, uuids: I) -> Vec<Ref>
    where
        I: IntoIterator<Item = &'a str>,
    {
        uuids
            .into_iter()
            .filter_map(|uuid| {
                let reference = self.reference(uuid);
                if reference.is_none() {
                    debug!("Dropping membership of unknown group {}", uuid);
                }
                reference
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_groups(self) -> Vec<Group> {
        self.groups
    }
}

/// Policy bindings at account level and for every environment.
pub(super) struct Bindings {
    account: LevelPolicyBindingsDto,
    environments: Vec<(String, LevelPolicyBindingsDto)>,
}

/// What a group gets resolved against.
pub(super) struct Lookups<'a> {
    pub tenants: &'a [Tenant],
    pub policies: &'a Policies,
    pub boundaries: &'a Boundaries,
    pub bindings: &'a Bindings,
}

impl Downloader {
    #[instrument(skip(self, tenants, policies, boundaries))]
    pub(super) async fn fetch_groups(
        &self,
        tenants: &[Tenant],
        policies: &Policies,
        boundaries: &Boundaries,
    ) -> Result<Groups> {
        let dtos = self.client.get_groups(&self.account.uuid).await?;
        let bindings = self.fetch_bindings(tenants).await?;

        let account_uuid = self.account.uuid.clone();
        let permissions = self
            .fan_out(dtos, move |client, dto| {
                let account_uuid = account_uuid.clone();
                async move {
                    let permissions = client
                        .get_permissions_for_group(&account_uuid, &dto.uuid)
                        .await?;
                    match permissions {
                        Some(permissions) => Ok((dto, permissions)),
                        None => Err(AccountError::MissingDetail {
                            kind: "group",
                            name: dto.name,
                            detail: "permissions",
                        }),
                    }
                }
            })
            .await?;

        let lookups = Lookups {
            tenants,
            policies,
            boundaries,
            bindings: &bindings,
        };
        let groups: Vec<Group> = permissions
            .iter()
            .map(|(dto, permissions)| build_group(dto, permissions, &lookups))
            .collect();

        info!("Fetched {} groups", groups.len());
        Ok(Groups::new(groups))
    }

    async fn fetch_bindings(&self, tenants: &[Tenant]) -> Result<Bindings> {
        let account = self
            .client
            .get_policy_group_bindings(LEVEL_ACCOUNT, &self.account.uuid)
            .await?
            .unwrap_or_default();

        let tenant_ids: Vec<String> = tenants.iter().map(|t| t.id.clone()).collect();
        let environments = self
            .fan_out(tenant_ids, |client, tenant_id| async move {
                let bindings = client
                    .get_policy_group_bindings(LEVEL_ENVIRONMENT, &tenant_id)
                    .await?
                    .unwrap_or_default();
                Ok((tenant_id, bindings))
            })
            .await?;

        Ok(Bindings {
            account,
            environments,
        })
    }
}

pub(super) fn build_group(
    dto: &GroupDto,
    permissions: &PermissionsGroupDto,
    lookups: &Lookups<'_>,
) -> Group {
    let mut account_permissions = Vec::new();
    let mut tenant_permissions: BTreeMap<String, Vec<String>> = BTreeMap::new();
    // Keyed by (tenant ID, zone ID); zones of one tenant may share a name.
    let mut zone_permissions: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();

    for permission in &permissions.permissions {
        let name = permission.permission_name.clone();
        match permission.scope_type.as_str() {
            SCOPE_TYPE_ACCOUNT => account_permissions.push(name),
            SCOPE_TYPE_TENANT => tenant_permissions
                .entry(permission.scope.clone())
                .or_default()
                .push(name),
            SCOPE_TYPE_MANAGEMENT_ZONE => match permission.scope.split_once(':') {
                Some((tenant_id, zone_id)) => zone_permissions
                    .entry((tenant_id.to_string(), zone_id.to_string()))
                    .or_default()
                    .push(name),
                None => warn!(
                    "Group '{}' has management zone permission '{}' with malformed scope '{}'",
                    dto.name, name, permission.scope
                ),
            },
            other => warn!(
                "Group '{}' has permission '{}' with unknown scope type '{}'",
                dto.name, name, other
            ),
        }
    }

    let account_policies = bound_policies(&dto.uuid, &lookups.bindings.account, lookups);
    let account = if account_permissions.is_empty() && account_policies.is_empty() {
        None
    } else {
        Some(AccountScope {
            permissions: sorted(account_permissions),
            policies: account_policies,
        })
    };

    let mut environment_policies: BTreeMap<String, Vec<PolicyBinding>> = BTreeMap::new();
    for (tenant_id, bindings) in &lookups.bindings.environments {
        let policies = bound_policies(&dto.uuid, bindings, lookups);
        if !policies.is_empty() {
            environment_policies.insert(tenant_id.clone(), policies);
        }
    }

    let mut environment_ids: Vec<String> = tenant_permissions
        .keys()
        .chain(environment_policies.keys())
        .cloned()
        .collect();
    environment_ids.sort();
    environment_ids.dedup();

    let environments = environment_ids
        .into_iter()
        .map(|environment| EnvironmentScope {
            permissions: sorted(tenant_permissions.remove(&environment).unwrap_or_default()),
            policies: environment_policies.remove(&environment).unwrap_or_default(),
            environment,
        })
        .collect();

    let mut management_zones: Vec<ManagementZoneScope> = zone_permissions
        .into_iter()
        .map(|((environment, zone_id), permissions)| ManagementZoneScope {
            management_zone: management_zone_name(lookups.tenants, &environment, &zone_id),
            environment,
            permissions: sorted(permissions),
        })
        .collect();
    management_zones.sort_by(|a, b| {
        (&a.environment, &a.management_zone).cmp(&(&b.environment, &b.management_zone))
    });

    Group {
        id: sanitize(&dto.name),
        name: dto.name.clone(),
        description: dto.description.clone().unwrap_or_default(),
        federated_attribute_values: sorted(dto.federated_attribute_values.clone()),
        account,
        environments,
        management_zones,
        origin_object_id: Some(dto.uuid.clone()),
    }
}

/// Policies of `bindings` granted to the group, in backend order.
fn bound_policies(
    group_uuid: &str,
    bindings: &LevelPolicyBindingsDto,
    lookups: &Lookups<'_>,
) -> Vec<PolicyBinding> {
    bindings
        .policy_bindings
        .iter()
        .filter(|binding| binding.groups.iter().any(|g| g == group_uuid))
        .filter_map(|binding| {
            let policy = lookups.policies.reference(&binding.policy_uuid);
            if policy.is_none() {
                debug!("Dropping binding of unknown policy {}", binding.policy_uuid);
            }
            Some(PolicyBinding {
                policy: policy?,
                boundaries: binding
                    .boundaries
                    .iter()
                    .filter_map(|uuid| lookups.boundaries.reference(uuid))
                    .collect(),
            })
        })
        .collect()
}

fn management_zone_name(tenants: &[Tenant], tenant_id: &str, zone_id: &str) -> String {
    match tenants
        .iter()
        .find(|t| t.id == tenant_id)
        .and_then(|t| t.management_zone_name(zone_id))
    {
        Some(name) => name.to_string(),
        None => {
            warn!(
                "Management zone {} of environment {} is unknown, keeping its ID",
                zone_id, tenant_id
            );
            zone_id.to_string()
        }
    }
}

fn sorted(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ManagementZoneDto, PermissionDto, PolicyBindingDto};

    fn permission(name: &str, scope: &str, scope_type: &str) -> PermissionDto {
        PermissionDto {
            permission_name: name.to_string(),
            scope: scope.to_string(),
            scope_type: scope_type.to_string(),
        }
    }

    fn tenants() -> Vec<Tenant> {
        vec![Tenant {
            id: "abc12345".to_string(),
            name: "Production".to_string(),
            management_zones: vec![ManagementZoneDto {
                parent: "abc12345".to_string(),
                id: "-3664092122630505211".to_string(),
                name: "Team A".to_string(),
            }],
        }]
    }

    #[test]
    fn test_build_group_buckets_permissions_by_scope() {
        let tenants = tenants();
        let policies = Policies::default();
        let boundaries = Boundaries::default();
        let bindings = Bindings {
            account: LevelPolicyBindingsDto::default(),
            environments: vec![],
        };
        let lookups = Lookups {
            tenants: &tenants,
            policies: &policies,
            boundaries: &boundaries,
            bindings: &bindings,
        };

        let dto = GroupDto {
            uuid: "group-uuid".to_string(),
            name: "Ops Team".to_string(),
            description: Some("Operators".to_string()),
            federated_attribute_values: vec!["b".to_string(), "a".to_string()],
            owner: None,
        };
        let permissions = PermissionsGroupDto {
            group_id: "group-uuid".to_string(),
            name: "Ops Team".to_string(),
            permissions: vec![
                permission("account-viewer", "acc-uuid", "account"),
                permission("tenant-viewer", "abc12345", "tenant"),
                permission("tenant-logviewer", "abc12345", "tenant"),
                permission("tenant-viewer", "abc12345:-3664092122630505211", "management-zone"),
                permission("tenant-viewer", "abc12345:42", "management-zone"),
            ],
        };

        let group = build_group(&dto, &permissions, &lookups);

        assert_eq!(group.id, "ops-team");
        assert_eq!(group.description, "Operators");
        assert_eq!(group.federated_attribute_values, vec!["a", "b"]);
        assert_eq!(group.origin_object_id.as_deref(), Some("group-uuid"));

        let account = group.account.unwrap();
        assert_eq!(account.permissions, vec!["account-viewer"]);
        assert!(account.policies.is_empty());

        assert_eq!(group.environments.len(), 1);
        assert_eq!(group.environments[0].environment, "abc12345");
        assert_eq!(
            group.environments[0].permissions,
            vec!["tenant-logviewer", "tenant-viewer"]
        );

        assert_eq!(group.management_zones.len(), 2);
        assert_eq!(group.management_zones[0].management_zone, "42");
        assert_eq!(group.management_zones[1].management_zone, "Team A");
        assert_eq!(group.management_zones[1].environment, "abc12345");
    }

    #[test]
    fn test_zones_sharing_a_name_stay_separate() {
        let mut tenants = tenants();
        tenants[0].management_zones.push(ManagementZoneDto {
            parent: "abc12345".to_string(),
            id: "99".to_string(),
            name: "Team A".to_string(),
        });
        let policies = Policies::default();
        let boundaries = Boundaries::default();
        let bindings = Bindings {
            account: LevelPolicyBindingsDto::default(),
            environments: vec![],
        };
        let lookups = Lookups {
            tenants: &tenants,
            policies: &policies,
            boundaries: &boundaries,
            bindings: &bindings,
        };
        let dto = GroupDto {
            uuid: "g".to_string(),
            name: "Zoned".to_string(),
            ..Default::default()
        };
        let permissions = PermissionsGroupDto {
            permissions: vec![
                permission("tenant-viewer", "abc12345:-3664092122630505211", "management-zone"),
                permission("tenant-viewer", "abc12345:99", "management-zone"),
                permission("tenant-logviewer", "abc12345:99", "management-zone"),
            ],
            ..Default::default()
        };

        let group = build_group(&dto, &permissions, &lookups);

        assert_eq!(group.management_zones.len(), 2);
        assert!(group
            .management_zones
            .iter()
            .all(|mz| mz.management_zone == "Team A"));
        let mut counts: Vec<usize> = group
            .management_zones
            .iter()
            .map(|mz| mz.permissions.len())
            .collect();
        counts.sort();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn test_group_without_grants_has_no_scopes() {
        let policies = Policies::default();
        let boundaries = Boundaries::default();
        let bindings = Bindings {
            account: LevelPolicyBindingsDto {
                level_type: "account".to_string(),
                level_id: "acc".to_string(),
                policy_bindings: vec![PolicyBindingDto {
                    policy_uuid: "p".to_string(),
                    groups: vec!["other-group".to_string()],
                    boundaries: vec![],
                }],
            },
            environments: vec![],
        };
        let lookups = Lookups {
            tenants: &[],
            policies: &policies,
            boundaries: &boundaries,
            bindings: &bindings,
        };
        let dto = GroupDto {
            uuid: "g".to_string(),
            name: "Empty".to_string(),
            ..Default::default()
        };

        let group = build_group(&dto, &PermissionsGroupDto::default(), &lookups);

        assert!(group.account.is_none());
        assert!(group.environments.is_empty());
        assert!(group.management_zones.is_empty());
    }
}
