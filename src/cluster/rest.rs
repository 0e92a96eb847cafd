//! REST implementation of the cluster API
//!
//! All four services hang off one root URL (`/api/<service>/v1/...`). List
//! endpoints return envelopes with a `continuationToken` cursor; this client
//! follows the cursor until exhausted, so callers always see complete
//! listings. Ids contain `/` and `*`, so every id lands in the URL as a
//! single encoded path segment.
//!
//! Reads retry on connect errors, timeouts and 5xx with exponential
//! backoff. Mutations are sent exactly once: the reconciler reports the
//! failing step and stops, and replaying a half-applied mutation is worse
//! than stopping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::ClusterConfig;
use crate::error::{ClusterError, ClusterResult};
use crate::resources::{Binding, Client, Hook, Role, Secret, WorkerPool};
use crate::util::SecretString;

use super::api::ClusterApi;

/// REST client for the cluster-management service
pub struct RestClusterClient {
    http: HttpClient,
    base_url: String,
    credentials: Option<Credentials>,
    max_retries: u32,
}

struct Credentials {
    client_id: String,
    access_token: SecretString,
}

impl RestClusterClient {
    /// Create a client from configuration.
    ///
    /// In proxy mode requests go to the proxy URL without credential
    /// headers; the proxy is expected to authenticate on our behalf.
    pub fn new(config: &ClusterConfig) -> ClusterResult<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(format!("deckhand/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let credentials = if config.proxy_url.is_some() {
            None
        } else {
            match (&config.client_id, &config.access_token) {
                (Some(client_id), Some(token)) => Some(Credentials {
                    client_id: client_id.clone(),
                    access_token: token.clone(),
                }),
                _ => None,
            }
        };

        Ok(Self {
            http,
            base_url: config.base_url(),
            credentials,
            max_retries: config.max_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(creds) => request
                .header("X-Cluster-Client-Id", &creds.client_id)
                .header("X-Cluster-Access-Token", creds.access_token.expose_secret()),
            None => request,
        }
    }

    /// Execute a read, retrying transport failures and 5xx responses
    async fn execute_read(&self, request: RequestBuilder) -> ClusterResult<Response> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
                debug!("retrying request (attempt {})", attempt + 1);
            }

            let req = request.try_clone().ok_or_else(|| {
                ClusterError::InvalidResponse("cannot clone request".to_string())
            })?;

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && attempt < self.max_retries {
                        warn!(status = status.as_u16(), "server error, will retry");
                        let body = response.text().await.unwrap_or_default();
                        last_error = Some(ClusterError::from_response(status.as_u16(), &body));
                        continue;
                    }
                    return handle_response(response).await;
                }
                Err(e) => {
                    warn!("request failed: {}", e);
                    let error = ClusterError::Request(e);
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ClusterError::InvalidResponse("unknown error".to_string())))
    }

    /// Execute a mutation, exactly once
    async fn execute_once(&self, request: RequestBuilder) -> ClusterResult<Response> {
        let response = request.send().await?;
        handle_response(response).await
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClusterResult<T> {
        let request = self.authenticate(self.http.get(self.url(path)));
        let response = self.execute_read(request).await?;
        response.json().await.map_err(|e| {
            ClusterError::InvalidResponse(format!("failed to parse response: {}", e))
        })
    }

    #[instrument(skip(self, body), fields(path = %path))]
    async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ClusterResult<()> {
        let request = self.authenticate(self.http.put(self.url(path)).json(body));
        self.execute_once(request).await?;
        Ok(())
    }

    #[instrument(skip(self, body), fields(path = %path))]
    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ClusterResult<()> {
        let request = self.authenticate(self.http.post(self.url(path)).json(body));
        self.execute_once(request).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &str) -> ClusterResult<()> {
        let request = self.authenticate(self.http.delete(self.url(path)));
        self.execute_once(request).await?;
        Ok(())
    }

    /// Fetch every page of a list endpoint
    async fn get_paged<P: Page>(&self, path: &str) -> ClusterResult<Vec<P::Item>> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let url = match &token {
                Some(t) => format!("{}?continuationToken={}", path, encode_segment(t)),
                None => path.to_string(),
            };
            let page: P = self.get(&url).await?;
            let (batch, next) = page.into_parts();
            items.extend(batch);
            match next {
                Some(t) => token = Some(t),
                None => break,
            }
        }

        Ok(items)
    }
}

async fn handle_response(response: Response) -> ClusterResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClusterError::from_response(status.as_u16(), &body))
}

/// URL-encode an id for use as a single path segment
fn encode_segment(value: &str) -> String {
    urlencoding::encode(value).to_string()
}

/// A list-endpoint envelope that may carry a continuation cursor
trait Page: DeserializeOwned {
    type Item;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RolesPage {
    roles: Vec<Role>,
    continuation_token: Option<String>,
}

impl Page for RolesPage {
    type Item = Role;
    fn into_parts(self) -> (Vec<Role>, Option<String>) {
        (self.roles, self.continuation_token)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientsPage {
    clients: Vec<Client>,
    continuation_token: Option<String>,
}

impl Page for ClientsPage {
    type Item = Client;
    fn into_parts(self) -> (Vec<Client>, Option<String>) {
        (self.clients, self.continuation_token)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HooksPage {
    hooks: Vec<HookApi>,
    continuation_token: Option<String>,
}

impl Page for HooksPage {
    type Item = HookApi;
    fn into_parts(self) -> (Vec<HookApi>, Option<String>) {
        (self.hooks, self.continuation_token)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkerPoolsPage {
    worker_pools: Vec<WorkerPool>,
    continuation_token: Option<String>,
}

impl Page for WorkerPoolsPage {
    type Item = WorkerPool;
    fn into_parts(self) -> (Vec<WorkerPool>, Option<String>) {
        (self.worker_pools, self.continuation_token)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretsPage {
    secrets: Vec<String>,
    continuation_token: Option<String>,
}

impl Page for SecretsPage {
    type Item = String;
    fn into_parts(self) -> (Vec<String>, Option<String>) {
        (self.secrets, self.continuation_token)
    }
}

#[derive(Deserialize)]
struct HookGroups {
    groups: Vec<String>,
}

#[derive(Deserialize)]
struct SecretValue {
    secret: serde_json::Value,
}

/// Hook as the hooks service represents it: the human-facing fields nest
/// under `metadata`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HookApi {
    hook_group_id: String,
    hook_id: String,
    metadata: HookApiMetadata,
    #[serde(default)]
    schedule: Vec<String>,
    #[serde(default)]
    bindings: Vec<Binding>,
    task: serde_json::Value,
    #[serde(default)]
    trigger_schema: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HookApiMetadata {
    name: String,
    description: String,
    owner: String,
    email_on_error: bool,
}

impl From<HookApi> for Hook {
    fn from(api: HookApi) -> Self {
        Hook {
            hook_group_id: api.hook_group_id,
            hook_id: api.hook_id,
            name: api.metadata.name,
            description: api.metadata.description,
            owner: api.metadata.owner,
            email_on_error: api.metadata.email_on_error,
            schedule: api.schedule,
            bindings: api.bindings,
            task: api.task,
            trigger_schema: api.trigger_schema,
        }
    }
}

#[async_trait]
impl ClusterApi for RestClusterClient {
    async fn list_roles(&self) -> ClusterResult<Vec<Role>> {
        self.get_paged::<RolesPage>("/api/auth/v1/roles").await
    }

    async fn create_role(&self, role: &Role) -> ClusterResult<()> {
        let path = format!("/api/auth/v1/role/{}", encode_segment(&role.role_id));
        self.put(&path, &role.to_api()).await
    }

    async fn update_role(&self, role: &Role) -> ClusterResult<()> {
        let path = format!("/api/auth/v1/role/{}", encode_segment(&role.role_id));
        self.post(&path, &role.to_api()).await
    }

    async fn delete_role(&self, role_id: &str) -> ClusterResult<()> {
        let path = format!("/api/auth/v1/role/{}", encode_segment(role_id));
        self.delete(&path).await
    }

    async fn list_clients(&self) -> ClusterResult<Vec<Client>> {
        self.get_paged::<ClientsPage>("/api/auth/v1/clients").await
    }

    async fn create_client(&self, client: &Client) -> ClusterResult<()> {
        let path = format!("/api/auth/v1/client/{}", encode_segment(&client.client_id));
        self.put(&path, &client.to_api()).await
    }

    async fn update_client(&self, client: &Client) -> ClusterResult<()> {
        let path = format!("/api/auth/v1/client/{}", encode_segment(&client.client_id));
        self.post(&path, &client.to_api()).await
    }

    async fn delete_client(&self, client_id: &str) -> ClusterResult<()> {
        let path = format!("/api/auth/v1/client/{}", encode_segment(client_id));
        self.delete(&path).await
    }

    async fn list_hook_groups(&self) -> ClusterResult<Vec<String>> {
        let response: HookGroups = self.get("/api/hooks/v1/groups").await?;
        Ok(response.groups)
    }

    async fn list_hooks(&self, hook_group_id: &str) -> ClusterResult<Vec<Hook>> {
        let path = format!("/api/hooks/v1/hooks/{}", encode_segment(hook_group_id));
        let hooks = self.get_paged::<HooksPage>(&path).await?;
        Ok(hooks.into_iter().map(Hook::from).collect())
    }

    async fn create_hook(&self, hook: &Hook) -> ClusterResult<()> {
        let path = format!(
            "/api/hooks/v1/hooks/{}/{}",
            encode_segment(&hook.hook_group_id),
            encode_segment(&hook.hook_id)
        );
        self.put(&path, &hook.to_api()).await
    }

    async fn update_hook(&self, hook: &Hook) -> ClusterResult<()> {
        let path = format!(
            "/api/hooks/v1/hooks/{}/{}",
            encode_segment(&hook.hook_group_id),
            encode_segment(&hook.hook_id)
        );
        self.post(&path, &hook.to_api()).await
    }

    async fn delete_hook(&self, hook_group_id: &str, hook_id: &str) -> ClusterResult<()> {
        let path = format!(
            "/api/hooks/v1/hooks/{}/{}",
            encode_segment(hook_group_id),
            encode_segment(hook_id)
        );
        self.delete(&path).await
    }

    async fn list_worker_pools(&self) -> ClusterResult<Vec<WorkerPool>> {
        self.get_paged::<WorkerPoolsPage>("/api/worker-manager/v1/worker-pools")
            .await
    }

    async fn create_worker_pool(&self, pool: &WorkerPool) -> ClusterResult<()> {
        let path = format!(
            "/api/worker-manager/v1/worker-pool/{}",
            encode_segment(&pool.worker_pool_id)
        );
        self.put(&path, &pool.to_api()).await
    }

    async fn update_worker_pool(&self, pool: &WorkerPool) -> ClusterResult<()> {
        let path = format!(
            "/api/worker-manager/v1/worker-pool/{}",
            encode_segment(&pool.worker_pool_id)
        );
        self.post(&path, &pool.to_api()).await
    }

    async fn delete_worker_pool(&self, worker_pool_id: &str) -> ClusterResult<()> {
        let path = format!(
            "/api/worker-manager/v1/worker-pool/{}",
            encode_segment(worker_pool_id)
        );
        self.delete(&path).await
    }

    async fn list_secret_names(&self) -> ClusterResult<Vec<String>> {
        self.get_paged::<SecretsPage>("/api/secrets/v1/secrets")
            .await
    }

    async fn get_secret(&self, name: &str) -> ClusterResult<serde_json::Value> {
        let path = format!("/api/secrets/v1/secret/{}", encode_segment(name));
        let response: SecretValue = self.get(&path).await?;
        Ok(response.secret)
    }

    async fn set_secret(&self, secret: &Secret) -> ClusterResult<()> {
        let body = secret.to_api().map_err(|e| {
            ClusterError::InvalidResponse(format!("refusing to write secret: {}", e))
        })?;
        let path = format!("/api/secrets/v1/secret/{}", encode_segment(&secret.name));
        self.put(&path, &body).await
    }

    async fn delete_secret(&self, name: &str) -> ClusterResult<()> {
        let path = format!("/api/secrets/v1/secret/{}", encode_segment(name));
        self.delete(&path).await
    }
}
