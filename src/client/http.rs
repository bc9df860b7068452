use super::dto::{
    BoundaryDto, EnvironmentDto, EnvironmentResourcesDto, GroupDto, GroupUserDto,
    LevelPolicyBindingsDto, ManagementZoneDto, Page, PermissionsGroupDto, PolicyDto,
    PolicyOverviewDto, PolicyOverviewListDto, ServiceUserDto, UserDto,
};
use super::AccountClient;
use crate::config::MAX_PAGE_SIZE;
use crate::error::{AccountError, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `AccountClient` backed by the account management REST API.
#[derive(Debug, Clone)]
pub struct HttpAccountClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: usize,
    token: Option<String>,
}

impl HttpAccountClient {
    pub fn new(base_url: &str, page_size: usize) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AccountError::Config(format!("Invalid API URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AccountError::Config(format!(
                "API URL '{}' cannot carry a path",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET returning `None` on 404 and an `Api` error for any other non-2xx status.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let mut request = self.http.get(url.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("GET {} returned 404", url);
            return Ok(None);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(AccountError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Walks every page of a collection. Follows `nextPageKey` while the server
    /// hands out a new one, otherwise asks for the next page number until the
    /// reported total is reached or a page comes back empty.
    async fn get_all_pages<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>> {
        let mut items: Vec<T> = Vec::new();
        let mut page_number = 1usize;
        let mut query = self.page_query(page_number);
        let mut seen_keys = HashSet::new();

        loop {
            let page: Page<T> = match self.get_json(url.clone(), &query).await? {
                Some(page) => page,
                None => break,
            };
            let received = page.items.len();
            items.extend(page.items);
            debug!("Fetched page {} of {} ({} items)", page_number, url, received);

            if matches!(page.total_count, Some(total) if items.len() >= total) {
                break;
            }
            if let Some(key) = page.next_page_key.filter(|k| !k.is_empty()) {
                if !seen_keys.insert(key.clone()) {
                    warn!("{} handed out page key '{}' twice, stopping", url, key);
                    break;
                }
                page_number += 1;
                query = vec![("nextPageKey", key)];
                continue;
            }
            match page.total_count {
                Some(total) if received > 0 && items.len() < total => {
                    page_number += 1;
                    query = self.page_query(page_number);
                }
                _ => break,
            }
        }

        Ok(items)
    }

    fn page_query(&self, page_number: usize) -> Vec<(&'static str, String)> {
        vec![
            ("pageSize", self.page_size.to_string()),
            ("page", page_number.to_string()),
        ]
    }
}

#[async_trait]
impl AccountClient for HttpAccountClient {
    #[instrument(skip(self))]
    async fn get_environments_and_management_zones(
        &self,
        account_uuid: &str,
    ) -> Result<(Vec<EnvironmentDto>, Vec<ManagementZoneDto>)> {
        let url = self.url(&["env", "v2", "accounts", account_uuid, "environments"]);
        let resources: EnvironmentResourcesDto = self
            .get_json(url, &[])
            .await?
            .unwrap_or_default();
        Ok((resources.data, resources.management_zone_resources))
    }

    #[instrument(skip(self))]
    async fn get_boundaries(&self, account_uuid: &str) -> Result<Vec<BoundaryDto>> {
        let url = self.url(&["iam", "v1", "repo", "account", account_uuid, "boundaries"]);
        self.get_all_pages(url).await
    }

    #[instrument(skip(self))]
    async fn get_policies(&self, account_uuid: &str) -> Result<Vec<PolicyOverviewDto>> {
        let url = self.url(&[
            "iam", "v1", "repo", "account", account_uuid, "policies", "aggregate",
        ]);
        let list: PolicyOverviewListDto = self.get_json(url, &[]).await?.unwrap_or_default();
        Ok(list.policy_overview_list)
    }

    #[instrument(skip(self, overview), fields(policy = %overview.name))]
    async fn get_policy_definition(
        &self,
        overview: &PolicyOverviewDto,
    ) -> Result<Option<PolicyDto>> {
        let url = self.url(&[
            "iam",
            "v1",
            "repo",
            &overview.level_type,
            &overview.level_id,
            "policies",
            &overview.uuid,
        ]);
        self.get_json(url, &[]).await
    }

    #[instrument(skip(self))]
    async fn get_groups(&self, account_uuid: &str) -> Result<Vec<GroupDto>> {
        let url = self.url(&["iam", "v1", "accounts", account_uuid, "groups"]);
        self.get_all_pages(url).await
    }

    #[instrument(skip(self))]
    async fn get_permissions_for_group(
        &self,
        account_uuid: &str,
        group_uuid: &str,
    ) -> Result<Option<PermissionsGroupDto>> {
        let url = self.url(&[
            "iam", "v1", "accounts", account_uuid, "groups", group_uuid, "permissions",
        ]);
        self.get_json(url, &[]).await
    }

    #[instrument(skip(self))]
    async fn get_policy_group_bindings(
        &self,
        level_type: &str,
        level_id: &str,
    ) -> Result<Option<LevelPolicyBindingsDto>> {
        let url = self.url(&["iam", "v1", "repo", level_type, level_id, "bindings"]);
        self.get_json(url, &[]).await
    }

    #[instrument(skip(self))]
    async fn get_users(&self, account_uuid: &str) -> Result<Vec<UserDto>> {
        let url = self.url(&["iam", "v1", "accounts", account_uuid, "users"]);
        self.get_all_pages(url).await
    }

    #[instrument(skip(self))]
    async fn get_group_memberships(
        &self,
        account_uuid: &str,
        email: &str,
    ) -> Result<Option<GroupUserDto>> {
        let url = self.url(&["iam", "v1", "accounts", account_uuid, "users", email]);
        self.get_json(url, &[]).await
    }

    #[instrument(skip(self))]
    async fn get_service_users(&self, account_uuid: &str) -> Result<Vec<ServiceUserDto>> {
        let url = self.url(&["iam", "v1", "accounts", account_uuid, "service-users"]);
        self.get_all_pages(url).await
    }
}
