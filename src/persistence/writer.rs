use super::model;
use crate::config::FeatureFlags;
use crate::error::{AccountError, Result};
use crate::types::{
    AccountScope, Boundary, EnvironmentScope, Group, ManagementZoneScope, Policy, PolicyBinding,
    PolicyLevel, Resources, ServiceUser, User, LEVEL_ACCOUNT, LEVEL_ENVIRONMENT,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument};

pub const POLICIES_FILE: &str = "policies.yaml";
pub const GROUPS_FILE: &str = "groups.yaml";
pub const USERS_FILE: &str = "users.yaml";
pub const SERVICE_USERS_FILE: &str = "service-users.yaml";
pub const BOUNDARIES_FILE: &str = "boundaries.yaml";

/// Where and what to write.
#[derive(Debug, Clone)]
pub struct WriterContext {
    pub output_folder: PathBuf,
    pub project_folder: String,
    pub features: FeatureFlags,
}

impl WriterContext {
    pub fn new(output_folder: impl Into<PathBuf>, project_folder: impl Into<String>) -> Self {
        Self {
            output_folder: output_folder.into(),
            project_folder: project_folder.into(),
            features: FeatureFlags::default(),
        }
    }

    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    pub fn target_dir(&self) -> PathBuf {
        self.output_folder.join(&self.project_folder)
    }
}

/// Writes one YAML file per non-empty resource kind into the project folder.
///
/// Output is sorted so that writing the same resources twice yields identical
/// files. A failing file does not stop the others; all failures are reported
/// together afterwards.
#[instrument(skip_all, fields(dir = %ctx.target_dir().display()))]
pub fn write(ctx: &WriterContext, resources: &Resources) -> Result<()> {
    let dir = ctx.target_dir();
    fs::create_dir_all(&dir).map_err(|source| {
        AccountError::Write(vec![AccountError::WriteFile {
            path: dir.clone(),
            source,
        }])
    })?;

    let mut files = vec![
        (
            POLICIES_FILE,
            model::File {
                policies: resources.policies.values().map(policy_repr).collect(),
                ..Default::default()
            },
        ),
        (
            GROUPS_FILE,
            model::File {
                groups: resources.groups.values().map(group_repr).collect(),
                ..Default::default()
            },
        ),
        (
            USERS_FILE,
            model::File {
                users: resources.users.values().map(user_repr).collect(),
                ..Default::default()
            },
        ),
    ];
    if ctx.features.service_users {
        let mut service_users: Vec<&ServiceUser> = resources.service_users.values().collect();
        service_users.sort_by(|a, b| {
            (&a.name, &a.origin_object_id, &a.id).cmp(&(&b.name, &b.origin_object_id, &b.id))
        });
        files.push((
            SERVICE_USERS_FILE,
            model::File {
                service_users: service_users.into_iter().map(service_user_repr).collect(),
                ..Default::default()
            },
        ));
    }
    if ctx.features.boundaries {
        files.push((
            BOUNDARIES_FILE,
            model::File {
                boundaries: resources.boundaries.values().map(boundary_repr).collect(),
                ..Default::default()
            },
        ));
    }

    let mut errors = Vec::new();
    for (name, file) in files {
        if is_empty(&file) {
            debug!("Nothing to write for {}", name);
            continue;
        }
        let path = dir.join(name);
        match write_file(&path, &file) {
            Ok(()) => info!("Wrote {}", path.display()),
            Err(e) => {
                error!("Failed to write {}: {}", path.display(), e);
                errors.push(e);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AccountError::Write(errors))
    }
}

fn is_empty(file: &model::File) -> bool {
    file.policies.is_empty()
        && file.groups.is_empty()
        && file.users.is_empty()
        && file.service_users.is_empty()
        && file.boundaries.is_empty()
}

fn write_file(path: &Path, file: &model::File) -> Result<()> {
    let content = serde_yaml::to_string(file).map_err(|source| AccountError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(|source| AccountError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

fn sorted(values: &[String]) -> Vec<String> {
    let mut values = values.to_vec();
    values.sort();
    values
}

fn policy_repr(policy: &Policy) -> model::Policy {
    let level = match &policy.level {
        PolicyLevel::Account => model::Level {
            kind: LEVEL_ACCOUNT.to_string(),
            environment: String::new(),
        },
        PolicyLevel::Environment { environment } => model::Level {
            kind: LEVEL_ENVIRONMENT.to_string(),
            environment: environment.clone(),
        },
    };
    model::Policy {
        id: policy.id.clone(),
        name: policy.name.clone(),
        level,
        description: policy.description.clone(),
        policy: policy.policy.clone(),
        origin_object_id: policy.origin_object_id.clone(),
    }
}

fn binding_repr(binding: &PolicyBinding) -> model::PolicyBinding {
    if binding.boundaries.is_empty() {
        model::PolicyBinding::Plain(binding.policy.clone())
    } else {
        model::PolicyBinding::Bounded {
            policy: binding.policy.clone(),
            boundaries: binding.boundaries.clone(),
        }
    }
}

fn account_repr(account: &AccountScope) -> Option<model::Account> {
    if account.permissions.is_empty() && account.policies.is_empty() {
        return None;
    }
    Some(model::Account {
        permissions: sorted(&account.permissions),
        policies: account.policies.iter().map(binding_repr).collect(),
    })
}

fn environment_repr(env: &EnvironmentScope) -> model::Environment {
    model::Environment {
        environment: env.environment.clone(),
        permissions: sorted(&env.permissions),
        policies: env.policies.iter().map(binding_repr).collect(),
    }
}

fn management_zone_repr(mz: &ManagementZoneScope) -> model::ManagementZone {
    model::ManagementZone {
        environment: mz.environment.clone(),
        management_zone: mz.management_zone.clone(),
        permissions: sorted(&mz.permissions),
    }
}

fn group_repr(group: &Group) -> model::Group {
    let mut environments: Vec<model::Environment> =
        group.environments.iter().map(environment_repr).collect();
    environments.sort_by(|a, b| a.environment.cmp(&b.environment));

    let mut management_zones: Vec<model::ManagementZone> =
        group.management_zones.iter().map(management_zone_repr).collect();
    management_zones.sort_by(|a, b| {
        (&a.environment, &a.management_zone).cmp(&(&b.environment, &b.management_zone))
    });

    model::Group {
        id: group.id.clone(),
        name: group.name.clone(),
        description: group.description.clone(),
        federated_attribute_values: sorted(&group.federated_attribute_values),
        account: group.account.as_ref().and_then(account_repr),
        environments,
        management_zones,
        origin_object_id: group.origin_object_id.clone(),
    }
}

fn user_repr(user: &User) -> model::User {
    model::User {
        email: user.email.clone(),
        groups: user.groups.clone(),
    }
}

fn service_user_repr(service_user: &ServiceUser) -> model::ServiceUser {
    model::ServiceUser {
        name: service_user.name.clone(),
        description: service_user.description.clone(),
        groups: service_user.groups.clone(),
        origin_object_id: service_user.origin_object_id.clone(),
    }
}

fn boundary_repr(boundary: &Boundary) -> model::Boundary {
    model::Boundary {
        id: boundary.id.clone(),
        name: boundary.name.clone(),
        query: boundary.query.clone(),
        origin_object_id: boundary.origin_object_id.clone(),
    }
}
