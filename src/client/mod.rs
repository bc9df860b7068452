//! Access to the account management API, one method per backend collection.

pub mod dto;
pub mod http;

pub use dto::*;
pub use http::HttpAccountClient;

use crate::error::Result;
use async_trait::async_trait;

pub const SCOPE_TYPE_ACCOUNT: &str = "account";
pub const SCOPE_TYPE_TENANT: &str = "tenant";
pub const SCOPE_TYPE_MANAGEMENT_ZONE: &str = "management-zone";

/// The calls the downloader makes against an account.
///
/// Collection methods return every item across all pages. Lookups of a single
/// detail return `Ok(None)` when the backend answers 404, so callers can tell
/// "does not exist" apart from a transport failure.
#[async_trait]
pub trait AccountClient: Send + Sync {
    async fn get_environments_and_management_zones(
        &self,
        account_uuid: &str,
    ) -> Result<(Vec<EnvironmentDto>, Vec<ManagementZoneDto>)>;

    async fn get_boundaries(&self, account_uuid: &str) -> Result<Vec<BoundaryDto>>;

    async fn get_policies(&self, account_uuid: &str) -> Result<Vec<PolicyOverviewDto>>;

    async fn get_policy_definition(
        &self,
        overview: &PolicyOverviewDto,
    ) -> Result<Option<PolicyDto>>;

    async fn get_groups(&self, account_uuid: &str) -> Result<Vec<GroupDto>>;

    async fn get_permissions_for_group(
        &self,
        account_uuid: &str,
        group_uuid: &str,
    ) -> Result<Option<PermissionsGroupDto>>;

    async fn get_policy_group_bindings(
        &self,
        level_type: &str,
        level_id: &str,
    ) -> Result<Option<LevelPolicyBindingsDto>>;

    async fn get_users(&self, account_uuid: &str) -> Result<Vec<UserDto>>;

    async fn get_group_memberships(
        &self,
        account_uuid: &str,
        email: &str,
    ) -> Result<Option<GroupUserDto>>;

    async fn get_service_users(&self, account_uuid: &str) -> Result<Vec<ServiceUserDto>>;
}
