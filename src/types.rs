use crate::reference::Ref;
use std::collections::BTreeMap;

pub const LEVEL_ACCOUNT: &str = "account";
pub const LEVEL_ENVIRONMENT: &str = "environment";

pub type PolicyId = String;
pub type GroupId = String;
pub type UserId = String;
pub type ServiceUserId = String;
pub type BoundaryId = String;

/// The account resources of one account, keyed by stable IDs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resources {
    pub policies: BTreeMap<PolicyId, Policy>,
    pub groups: BTreeMap<GroupId, Group>,
    /// Keyed by email.
    pub users: BTreeMap<UserId, User>,
    pub service_users: BTreeMap<ServiceUserId, ServiceUser>,
    pub boundaries: BTreeMap<BoundaryId, Boundary>,
}

impl Resources {
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
            && self.groups.is_empty()
            && self.users.is_empty()
            && self.service_users.is_empty()
            && self.boundaries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyLevel {
    Account,
    Environment { environment: String },
}

impl PolicyLevel {
    pub fn level_type(&self) -> &'static str {
        match self {
            PolicyLevel::Account => LEVEL_ACCOUNT,
            PolicyLevel::Environment { .. } => LEVEL_ENVIRONMENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub id: PolicyId,
    pub name: String,
    pub level: PolicyLevel,
    pub description: String,
    /// The policy statement body.
    pub policy: String,
    pub origin_object_id: Option<String>,
}

/// A policy granted to a group, optionally restricted by boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyBinding {
    pub policy: Ref,
    pub boundaries: Vec<Ref>,
}

impl PolicyBinding {
    pub fn new(policy: Ref) -> Self {
        Self {
            policy,
            boundaries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountScope {
    pub permissions: Vec<String>,
    pub policies: Vec<PolicyBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentScope {
    pub environment: String,
    pub permissions: Vec<String>,
    pub policies: Vec<PolicyBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManagementZoneScope {
    pub environment: String,
    pub management_zone: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub federated_attribute_values: Vec<String>,
    pub account: Option<AccountScope>,
    pub environments: Vec<EnvironmentScope>,
    pub management_zones: Vec<ManagementZoneScope>,
    pub origin_object_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub email: UserId,
    pub groups: Vec<Ref>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceUser {
    pub id: ServiceUserId,
    pub name: String,
    pub description: String,
    pub groups: Vec<Ref>,
    pub origin_object_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub id: BoundaryId,
    pub name: String,
    pub query: String,
    pub origin_object_id: Option<String>,
}
