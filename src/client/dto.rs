//! Response shapes of the account management API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementZoneDto {
    /// ID of the environment the zone belongs to.
    pub parent: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentResourcesDto {
    #[serde(default)]
    pub data: Vec<EnvironmentDto>,
    #[serde(default)]
    pub management_zone_resources: Vec<ManagementZoneDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryDto {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub boundary_query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOverviewDto {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `account` and `environment` mark custom policies, `global` built-in ones.
    pub level_type: String,
    #[serde(default)]
    pub level_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOverviewListDto {
    #[serde(default)]
    pub policy_overview_list: Vec<PolicyOverviewDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDto {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub statement_query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub federated_attribute_values: Vec<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDto {
    pub permission_name: String,
    /// Account UUID, environment ID or `<environment>:<management zone>`.
    pub scope: String,
    pub scope_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsGroupDto {
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<PermissionDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBindingDto {
    pub policy_uuid: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub boundaries: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelPolicyBindingsDto {
    #[serde(default)]
    pub level_type: String,
    #[serde(default)]
    pub level_id: String,
    #[serde(default)]
    pub policy_bindings: Vec<PolicyBindingDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountGroupDto {
    pub group_uuid: String,
    #[serde(default)]
    pub group_name: String,
}

/// Group memberships of a user or service user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUserDto {
    #[serde(default)]
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub groups: Vec<AccountGroupDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUserDto {
    pub uid: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One page of a collection endpoint. The endpoints name the item list and the
/// total differently, the aliases cover all of them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new", alias = "content", alias = "results")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_key: Option<String>,
    #[serde(default, alias = "count")]
    pub total_count: Option<usize>,
}
