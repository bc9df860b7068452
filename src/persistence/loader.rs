use super::model::{self, PolicyBinding as BindingRepr};
use super::model::{KEY_CONFIGS, KEY_DELETE, KEY_GROUPS, KEY_POLICIES, KEY_USERS};
use crate::error::{AccountError, Result};
use crate::reference::Ref;
use crate::sanitize::sanitize;
use crate::types::{
    AccountScope, Boundary, EnvironmentScope, Group, ManagementZoneScope, Policy, PolicyBinding,
    PolicyLevel, Resources, ServiceUser, User, LEVEL_ACCOUNT, LEVEL_ENVIRONMENT,
};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Loads every account resource file found under `root`.
///
/// `root` may be a directory, searched recursively for `.yaml`/`.yml` files, or a
/// single file. A root that does not exist yields empty resources. Files holding
/// `configs` or `delete` entries belong to other formats and are skipped.
#[instrument(skip_all, fields(root = %root.as_ref().display()))]
pub fn load(root: impl AsRef<Path>) -> Result<Resources> {
    let root = root.as_ref();
    if !root.exists() {
        info!("No account resources found, '{}' does not exist", root.display());
        return Ok(Resources::default());
    }

    let mut merged = Merged::default();
    for path in collect_yaml_files(root)? {
        if let Some(file) = read_file(&path)? {
            merged.merge(&path, file)?;
        }
    }
    merged.validate_references()?;

    let resources = merged.into_resources();
    info!(
        "Loaded {} policies, {} groups, {} users, {} service users, {} boundaries",
        resources.policies.len(),
        resources.groups.len(),
        resources.users.len(),
        resources.service_users.len(),
        resources.boundaries.len()
    );
    Ok(resources)
}

/// YAML files below `root` in path order. Symlinked directories are not
/// entered, so a link back into the tree cannot load a file twice.
fn collect_yaml_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| AccountError::Read {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && is_yaml(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Parses one file; `None` for files of a foreign format.
fn read_file(path: &Path) -> Result<Option<model::File>> {
    let content = fs::read_to_string(path).map_err(|source| AccountError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&content).map_err(|source| AccountError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    let Some(mapping) = value.as_mapping() else {
        debug!("Skipping '{}', it holds no mapping", path.display());
        return Ok(None);
    };

    let has_key = |key: &str| mapping.contains_key(Value::from(key));
    if has_key(KEY_CONFIGS) || has_key(KEY_DELETE) {
        if has_key(KEY_USERS) || has_key(KEY_GROUPS) || has_key(KEY_POLICIES) {
            return Err(AccountError::MixedFile(path.to_path_buf()));
        }
        warn!(
            "Skipping '{}', it is a configuration or delete file",
            path.display()
        );
        return Ok(None);
    }

    let file = serde_yaml::from_value(value).map_err(|source| AccountError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(file))
}

/// Entities of all files merged so far, each with the file it came from.
#[derive(Default)]
struct Merged {
    policies: BTreeMap<String, (PathBuf, model::Policy)>,
    groups: BTreeMap<String, (PathBuf, model::Group)>,
    users: BTreeMap<String, (PathBuf, model::User)>,
    service_users: BTreeMap<String, (PathBuf, model::ServiceUser)>,
    boundaries: BTreeMap<String, (PathBuf, model::Boundary)>,
}

fn insert_unique<T>(
    map: &mut BTreeMap<String, (PathBuf, T)>,
    kind: &'static str,
    id: String,
    path: &Path,
    item: T,
) -> Result<()> {
    if map.contains_key(&id) {
        return Err(AccountError::Duplicate {
            kind,
            id,
            path: path.to_path_buf(),
        });
    }
    map.insert(id, (path.to_path_buf(), item));
    Ok(())
}

fn invalid(path: &Path, kind: &'static str, message: String) -> AccountError {
    AccountError::Validation {
        path: path.to_path_buf(),
        kind,
        message,
    }
}

fn require(path: &Path, kind: &'static str, owner: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            path,
            kind,
            format!("{} has no '{}' field", owner, field),
        ));
    }
    Ok(())
}

impl Merged {
    fn merge(&mut self, path: &Path, file: model::File) -> Result<()> {
        debug!(
            "Merging '{}': {} policies, {} groups, {} users",
            path.display(),
            file.policies.len(),
            file.groups.len(),
            file.users.len()
        );

        for policy in file.policies {
            validate_policy(path, &policy)?;
            insert_unique(&mut self.policies, "policy", policy.id.clone(), path, policy)?;
        }
        for group in file.groups {
            validate_group(path, &group)?;
            insert_unique(&mut self.groups, "group", group.id.clone(), path, group)?;
        }
        for user in file.users {
            require(path, "user", "user", "email", &user.email)?;
            insert_unique(&mut self.users, "user", user.email.clone(), path, user)?;
        }
        for service_user in file.service_users {
            require(path, "service user", "service user", "name", &service_user.name)?;
            let id = sanitize(&service_user.name);
            insert_unique(&mut self.service_users, "service user", id, path, service_user)?;
        }
        for boundary in file.boundaries {
            let owner = format!("boundary '{}'", boundary.id);
            require(path, "boundary", &owner, "id", &boundary.id)?;
            require(path, "boundary", &owner, "name", &boundary.name)?;
            require(path, "boundary", &owner, "query", &boundary.query)?;
            insert_unique(&mut self.boundaries, "boundary", boundary.id.clone(), path, boundary)?;
        }
        Ok(())
    }

    /// Every internal reference must point at a loaded resource of the right kind.
    fn validate_references(&self) -> Result<()> {
        for (email, (_, user)) in &self.users {
            let owner = format!("user '{}'", email);
            for group in &user.groups {
                check_ref(group, "group", &owner, |id| self.groups.contains_key(id))?;
            }
        }

        for (id, (_, service_user)) in &self.service_users {
            let owner = format!("service user '{}'", id);
            for group in &service_user.groups {
                check_ref(group, "group", &owner, |id| self.groups.contains_key(id))?;
            }
        }

        for (id, (_, group)) in &self.groups {
            let owner = format!("group '{}'", id);
            let account_bindings = group.account.iter().flat_map(|a| a.policies.iter());
            let environment_bindings = group.environments.iter().flat_map(|e| e.policies.iter());
            for binding in account_bindings.chain(environment_bindings) {
                let (policy, boundaries) = binding_parts(binding);
                check_ref(policy, "policy", &owner, |id| self.policies.contains_key(id))?;
                for boundary in boundaries {
                    check_ref(boundary, "boundary", &owner, |id| {
                        self.boundaries.contains_key(id)
                    })?;
                }
            }
        }
        Ok(())
    }

    fn into_resources(self) -> Resources {
        Resources {
            policies: self
                .policies
                .into_iter()
                .map(|(id, (_, p))| (id, convert_policy(p)))
                .collect(),
            groups: self
                .groups
                .into_iter()
                .map(|(id, (_, g))| (id, convert_group(g)))
                .collect(),
            users: self
                .users
                .into_iter()
                .map(|(email, (_, u))| {
                    let user = User {
                        email: email.clone(),
                        groups: u.groups,
                    };
                    (email, user)
                })
                .collect(),
            service_users: self
                .service_users
                .into_iter()
                .map(|(id, (_, s))| {
                    let service_user = ServiceUser {
                        id: id.clone(),
                        name: s.name,
                        description: s.description,
                        groups: s.groups,
                        origin_object_id: s.origin_object_id,
                    };
                    (id, service_user)
                })
                .collect(),
            boundaries: self
                .boundaries
                .into_iter()
                .map(|(id, (_, b))| {
                    let boundary = Boundary {
                        id: id.clone(),
                        name: b.name,
                        query: b.query,
                        origin_object_id: b.origin_object_id,
                    };
                    (id, boundary)
                })
                .collect(),
        }
    }
}

fn validate_policy(path: &Path, policy: &model::Policy) -> Result<()> {
    let owner = format!("policy '{}'", policy.id);
    require(path, "policy", &owner, "id", &policy.id)?;
    require(path, "policy", &owner, "name", &policy.name)?;
    match policy.level.kind.as_str() {
        LEVEL_ACCOUNT => {}
        LEVEL_ENVIRONMENT => {
            require(path, "policy", &owner, "level.environment", &policy.level.environment)?
        }
        other => {
            return Err(invalid(
                path,
                "policy",
                format!(
                    "{} has level type '{}', expected '{}' or '{}'",
                    owner, other, LEVEL_ACCOUNT, LEVEL_ENVIRONMENT
                ),
            ))
        }
    }
    require(path, "policy", &owner, "policy", &policy.policy)
}

fn validate_group(path: &Path, group: &model::Group) -> Result<()> {
    let owner = format!("group '{}'", group.id);
    require(path, "group", &owner, "id", &group.id)?;
    require(path, "group", &owner, "name", &group.name)?;
    for environment in &group.environments {
        require(path, "group", &owner, "environments.environment", &environment.environment)?;
    }
    for zone in &group.management_zones {
        require(path, "group", &owner, "managementZones.environment", &zone.environment)?;
        require(path, "group", &owner, "managementZones.managementZone", &zone.management_zone)?;
    }
    Ok(())
}

fn check_ref<F>(reference: &Ref, kind: &'static str, owner: &str, exists: F) -> Result<()>
where
    F: Fn(&str) -> bool,
{
    match reference {
        Ref::Id(id) if id.trim().is_empty() => Err(AccountError::MissingReferenceId {
            kind,
            owner: owner.to_string(),
        }),
        Ref::Id(id) if !exists(id) => Err(AccountError::DanglingReference {
            kind,
            id: id.clone(),
            owner: owner.to_string(),
        }),
        Ref::Name(name) if name.trim().is_empty() => Err(AccountError::EmptyStringReference {
            kind,
            owner: owner.to_string(),
        }),
        _ => Ok(()),
    }
}

fn binding_parts(binding: &BindingRepr) -> (&Ref, &[Ref]) {
    match binding {
        BindingRepr::Plain(policy) => (policy, &[][..]),
        BindingRepr::Bounded { policy, boundaries } => (policy, boundaries.as_slice()),
    }
}

fn convert_binding(binding: BindingRepr) -> PolicyBinding {
    match binding {
        BindingRepr::Plain(policy) => PolicyBinding::new(policy),
        BindingRepr::Bounded { policy, boundaries } => PolicyBinding { policy, boundaries },
    }
}

fn convert_policy(policy: model::Policy) -> Policy {
    let level = if policy.level.kind == LEVEL_ENVIRONMENT {
        PolicyLevel::Environment {
            environment: policy.level.environment,
        }
    } else {
        PolicyLevel::Account
    };
    Policy {
        id: policy.id,
        name: policy.name,
        level,
        description: policy.description,
        policy: policy.policy,
        origin_object_id: policy.origin_object_id,
    }
}

fn convert_group(group: model::Group) -> Group {
    Group {
        id: group.id,
        name: group.name,
        description: group.description,
        federated_attribute_values: group.federated_attribute_values,
        // An account section without grants means the same as no section
        account: group
            .account
            .map(|a| AccountScope {
                permissions: a.permissions,
                policies: a.policies.into_iter().map(convert_binding).collect(),
            })
            .filter(|a| !a.permissions.is_empty() || !a.policies.is_empty()),
        environments: group
            .environments
            .into_iter()
            .map(|e| EnvironmentScope {
                environment: e.environment,
                permissions: e.permissions,
                policies: e.policies.into_iter().map(convert_binding).collect(),
            })
            .collect(),
        management_zones: group
            .management_zones
            .into_iter()
            .map(|mz| ManagementZoneScope {
                environment: mz.environment,
                management_zone: mz.management_zone,
                permissions: mz.permissions,
            })
            .collect(),
        origin_object_id: group.origin_object_id,
    }
}
