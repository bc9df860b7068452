#![allow(dead_code)]

use account_resources::client::*;
use account_resources::error::{AccountError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ACCOUNT_UUID: &str = "0c1d2e3f-account";
pub const TENANT_ID: &str = "abc12345";
pub const ZONE_ID: &str = "-3664092122630505211";

/// In-memory account backend. Details that are missing from the maps are
/// answered with `None`, the same way the API answers 404.
#[derive(Default)]
pub struct MockAccountClient {
    pub environments: Vec<EnvironmentDto>,
    pub management_zones: Vec<ManagementZoneDto>,
    pub boundaries: Vec<BoundaryDto>,
    pub policies: Vec<PolicyOverviewDto>,
    pub definitions: HashMap<String, PolicyDto>,
    pub groups: Vec<GroupDto>,
    pub permissions: HashMap<String, PermissionsGroupDto>,
    /// Keyed by (level type, level ID).
    pub bindings: HashMap<(String, String), LevelPolicyBindingsDto>,
    pub users: Vec<UserDto>,
    pub service_users: Vec<ServiceUserDto>,
    pub memberships: HashMap<String, GroupUserDto>,
    /// Collection endpoints that fail with a server error.
    pub failing: HashSet<&'static str>,
    pub calls: AtomicUsize,
}

impl MockAccountClient {
    fn call(&self, endpoint: &'static str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(endpoint) {
            return Err(AccountError::Api {
                status: 500,
                body: format!("{} is down", endpoint),
            });
        }
        Ok(())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn add_custom_policy(&mut self, uuid: &str, name: &str, level_type: &str, level_id: &str, statement: &str) {
        self.policies.push(PolicyOverviewDto {
            uuid: uuid.to_string(),
            name: name.to_string(),
            description: format!("{} description", name),
            level_type: level_type.to_string(),
            level_id: level_id.to_string(),
        });
        self.definitions.insert(
            uuid.to_string(),
            PolicyDto {
                uuid: uuid.to_string(),
                name: name.to_string(),
                description: String::new(),
                statement_query: statement.to_string(),
            },
        );
    }

    pub fn add_builtin_policy(&mut self, uuid: &str, name: &str) {
        self.policies.push(PolicyOverviewDto {
            uuid: uuid.to_string(),
            name: name.to_string(),
            description: String::new(),
            level_type: "global".to_string(),
            level_id: "global".to_string(),
        });
    }

    pub fn add_group(&mut self, uuid: &str, name: &str, permissions: Vec<PermissionDto>) {
        self.groups.push(GroupDto {
            uuid: uuid.to_string(),
            name: name.to_string(),
            description: Some(format!("{} members", name)),
            ..Default::default()
        });
        self.permissions.insert(
            uuid.to_string(),
            PermissionsGroupDto {
                group_id: uuid.to_string(),
                name: name.to_string(),
                permissions,
            },
        );
    }

    pub fn bind(&mut self, level_type: &str, level_id: &str, binding: PolicyBindingDto) {
        self.bindings
            .entry((level_type.to_string(), level_id.to_string()))
            .or_insert_with(|| LevelPolicyBindingsDto {
                level_type: level_type.to_string(),
                level_id: level_id.to_string(),
                policy_bindings: vec![],
            })
            .policy_bindings
            .push(binding);
    }

    pub fn add_user(&mut self, email: &str, group_uuids: &[&str]) {
        self.users.push(UserDto {
            uid: format!("uid-{}", email),
            email: email.to_string(),
            name: None,
            surname: None,
        });
        self.memberships.insert(email.to_string(), membership(email, group_uuids));
    }

    pub fn add_service_user(&mut self, uid: &str, name: &str, group_uuids: &[&str]) {
        let email = format!("{}@service.example.com", uid);
        self.service_users.push(ServiceUserDto {
            uid: uid.to_string(),
            email: email.clone(),
            name: name.to_string(),
            description: Some(format!("{} robot", name)),
        });
        self.memberships.insert(email.clone(), membership(&email, group_uuids));
    }
}

fn membership(email: &str, group_uuids: &[&str]) -> GroupUserDto {
    GroupUserDto {
        uid: format!("uid-{}", email),
        email: email.to_string(),
        groups: group_uuids
            .iter()
            .map(|uuid| AccountGroupDto {
                group_uuid: uuid.to_string(),
                group_name: String::new(),
            })
            .collect(),
    }
}

pub fn permission(name: &str, scope: &str, scope_type: &str) -> PermissionDto {
    PermissionDto {
        permission_name: name.to_string(),
        scope: scope.to_string(),
        scope_type: scope_type.to_string(),
    }
}

pub fn binding(policy_uuid: &str, groups: &[&str], boundaries: &[&str]) -> PolicyBindingDto {
    PolicyBindingDto {
        policy_uuid: policy_uuid.to_string(),
        groups: groups.iter().map(|g| g.to_string()).collect(),
        boundaries: boundaries.iter().map(|b| b.to_string()).collect(),
    }
}

/// An account with one environment, a management zone, a boundary, custom and
/// built-in policies, two groups, users and a service user.
pub fn sample_account() -> MockAccountClient {
    let mut client = MockAccountClient {
        environments: vec![EnvironmentDto {
            id: TENANT_ID.to_string(),
            name: "Production".to_string(),
        }],
        management_zones: vec![ManagementZoneDto {
            parent: TENANT_ID.to_string(),
            id: ZONE_ID.to_string(),
            name: "Team A".to_string(),
        }],
        boundaries: vec![BoundaryDto {
            uuid: "b-1".to_string(),
            name: "Team A only".to_string(),
            boundary_query: "environment:management-zone IN (\"Team A\");".to_string(),
        }],
        ..Default::default()
    };

    client.add_custom_policy("p-1", "Read Settings", "account", ACCOUNT_UUID, "ALLOW settings:objects:read;");
    client.add_custom_policy("p-2", "Env Logs", "environment", TENANT_ID, "ALLOW storage:logs:read;");
    client.add_builtin_policy("p-3", "Environment role - Viewer");

    client.add_group(
        "g-1",
        "Operators",
        vec![
            permission("account-viewer", ACCOUNT_UUID, SCOPE_TYPE_ACCOUNT),
            permission("tenant-viewer", TENANT_ID, SCOPE_TYPE_TENANT),
            permission(
                "tenant-logviewer",
                &format!("{}:{}", TENANT_ID, ZONE_ID),
                SCOPE_TYPE_MANAGEMENT_ZONE,
            ),
        ],
    );
    client.add_group("g-2", "Auditors", vec![]);

    client.bind("account", ACCOUNT_UUID, binding("p-1", &["g-1", "g-2"], &[]));
    client.bind("environment", TENANT_ID, binding("p-3", &["g-1"], &["b-1"]));
    client.bind("environment", TENANT_ID, binding("p-2", &["g-2"], &[]));

    client.add_user("jane@example.com", &["g-1", "g-2"]);
    client.add_user("john@example.com", &["g-2", "g-unknown"]);
    client.add_service_user("su-1", "Deploy Bot", &["g-1"]);

    client
}

#[async_trait]
impl AccountClient for MockAccountClient {
    async fn get_environments_and_management_zones(
        &self,
        _account_uuid: &str,
    ) -> Result<(Vec<EnvironmentDto>, Vec<ManagementZoneDto>)> {
        self.call("environments")?;
        Ok((self.environments.clone(), self.management_zones.clone()))
    }

    async fn get_boundaries(&self, _account_uuid: &str) -> Result<Vec<BoundaryDto>> {
        self.call("boundaries")?;
        Ok(self.boundaries.clone())
    }

    async fn get_policies(&self, _account_uuid: &str) -> Result<Vec<PolicyOverviewDto>> {
        self.call("policies")?;
        Ok(self.policies.clone())
    }

    async fn get_policy_definition(
        &self,
        overview: &PolicyOverviewDto,
    ) -> Result<Option<PolicyDto>> {
        self.call("policy definition")?;
        Ok(self.definitions.get(&overview.uuid).cloned())
    }

    async fn get_groups(&self, _account_uuid: &str) -> Result<Vec<GroupDto>> {
        self.call("groups")?;
        Ok(self.groups.clone())
    }

    async fn get_permissions_for_group(
        &self,
        _account_uuid: &str,
        group_uuid: &str,
    ) -> Result<Option<PermissionsGroupDto>> {
        self.call("permissions")?;
        Ok(self.permissions.get(group_uuid).cloned())
    }

    async fn get_policy_group_bindings(
        &self,
        level_type: &str,
        level_id: &str,
    ) -> Result<Option<LevelPolicyBindingsDto>> {
        self.call("bindings")?;
        Ok(self
            .bindings
            .get(&(level_type.to_string(), level_id.to_string()))
            .cloned())
    }

    async fn get_users(&self, _account_uuid: &str) -> Result<Vec<UserDto>> {
        self.call("users")?;
        Ok(self.users.clone())
    }

    async fn get_group_memberships(
        &self,
        _account_uuid: &str,
        email: &str,
    ) -> Result<Option<GroupUserDto>> {
        self.call("memberships")?;
        Ok(self.memberships.get(email).cloned())
    }

    async fn get_service_users(&self, _account_uuid: &str) -> Result<Vec<ServiceUserDto>> {
        self.call("service users")?;
        Ok(self.service_users.clone())
    }
}
