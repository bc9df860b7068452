use super::{Downloader, Groups};
use crate::client::GroupUserDto;
use crate::error::{AccountError, Result};
use crate::sanitize::sanitize;
use crate::types::{ServiceUser, User};
use tracing::{info, instrument};

impl Downloader {
    #[instrument(skip(self, groups))]
    pub(super) async fn fetch_users(&self, groups: &Groups) -> Result<Vec<User>> {
        let dtos = self.client.get_users(&self.account.uuid).await?;
        let emails: Vec<String> = dtos.into_iter().map(|u| u.email).collect();

        let memberships = self.fetch_memberships("user", emails).await?;
        let users: Vec<User> = memberships
            .into_iter()
            .map(|(email, membership)| User {
                groups: groups.references(group_uuids(&membership)),
                email,
            })
            .collect();

        info!("Fetched {} users", users.len());
        Ok(users)
    }

    #[instrument(skip(self, groups))]
    pub(super) async fn fetch_service_users(&self, groups: &Groups) -> Result<Vec<ServiceUser>> {
        let dtos = self.client.get_service_users(&self.account.uuid).await?;
        let emails: Vec<String> = dtos.iter().map(|s| s.email.clone()).collect();

        let memberships = self.fetch_memberships("service user", emails).await?;
        let service_users: Vec<ServiceUser> = dtos
            .into_iter()
            .zip(memberships)
            .map(|(dto, (_, membership))| ServiceUser {
                id: sanitize(&dto.name),
                groups: groups.references(group_uuids(&membership)),
                name: dto.name,
                description: dto.description.unwrap_or_default(),
                origin_object_id: Some(dto.uid),
            })
            .collect();

        info!("Fetched {} service users", service_users.len());
        Ok(service_users)
    }

    /// Group memberships per email, in the order of `emails`. Every email must
    /// resolve to a membership record, even an empty one.
    async fn fetch_memberships(
        &self,
        kind: &'static str,
        emails: Vec<String>,
    ) -> Result<Vec<(String, GroupUserDto)>> {
        let account_uuid = self.account.uuid.clone();
        self.fan_out(emails, move |client, email| {
            let account_uuid = account_uuid.clone();
            async move {
                let membership = client.get_group_memberships(&account_uuid, &email).await?;
                match membership {
                    Some(membership) => Ok((email, membership)),
                    None => Err(AccountError::MissingDetail {
                        kind,
                        name: email,
                        detail: "group memberships",
                    }),
                }
            }
        })
        .await
    }
}

fn group_uuids(membership: &GroupUserDto) -> impl Iterator<Item = &str> {
    membership.groups.iter().map(|g| g.group_uuid.as_str())
}
