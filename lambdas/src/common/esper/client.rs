use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::common::config::Config;
use crate::common::esper::error::ApiError;
use crate::common::esper::models::{
    AppVersion, Application, Command, CommandRequest, CommandStatus, Device, ErrorBody, Page,
};

/// Create the HTTP client shared by every invocation of a warm lambda.
pub fn build_http_client(config: &Config) -> Result<Client, ApiError> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
        .map_err(|e| ApiError::Client(format!("invalid api key header: {}", e)))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    Client::builder()
        .timeout(config.request_timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| ApiError::Client(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct EsperClient {
    client: Client,
    base_url: String,
    enterprise_id: String,
}

impl EsperClient {
    pub fn new(config: &Config, client: &Client) -> Self {
        Self {
            client: client.clone(),
            base_url: config.base_url.clone(),
            enterprise_id: config.enterprise_id.clone(),
        }
    }

    fn enterprise_url(&self, path: &str) -> String {
        format!("{}/enterprise/{}/{}", self.base_url, self.enterprise_id, path)
    }

    fn commands_url(&self, path: &str) -> String {
        format!("{}/v0/enterprise/{}/{}", self.base_url, self.enterprise_id, path)
    }

    pub async fn list_devices(&self, name: &str) -> Result<Vec<Device>, ApiError> {
        let request = self
            .client
            .get(self.enterprise_url("device/"))
            .query(&[("name", name)]);
        self.all_pages(request).await
    }

    pub async fn list_applications(
        &self,
        package_name: &str,
    ) -> Result<Vec<Application>, ApiError> {
        let request = self
            .client
            .get(self.enterprise_url("application/"))
            .query(&[("package_name", package_name)]);
        self.all_pages(request).await
    }

    pub async fn list_app_versions(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<AppVersion>, ApiError> {
        let url = self.enterprise_url(&format!("application/{}/version/", application_id));
        let request = self.client.get(url);
        self.all_pages(request).await
    }

    pub async fn create_command(&self, command: &CommandRequest) -> Result<Command, ApiError> {
        let url = self.commands_url("command/");
        let response = self.client.post(&url).json(command).send().await?;
        decode(url, response).await
    }

    pub async fn command_status(&self, command_id: Uuid) -> Result<Vec<CommandStatus>, ApiError> {
        let url = self.commands_url(&format!("command/{}/status/", command_id));
        let response = self.client.get(&url).send().await?;
        let page: Page<CommandStatus> = decode(url, response).await?;
        Ok(page.results)
    }

    /// Follows `next` links until the listing is exhausted.
    async fn all_pages<T: DeserializeOwned>(
        &self,
        first: RequestBuilder,
    ) -> Result<Vec<T>, ApiError> {
        let response = first.send().await?;
        let url = response.url().to_string();
        let mut page: Page<T> = decode(url, response).await?;
        debug!("listing reports {} results", page.count);

        let mut results = std::mem::take(&mut page.results);
        while let Some(next) = page.next.take() {
            info!("Fetching next page: {}", next);
            let response = self.client.get(&next).send().await?;
            page = decode(next, response).await?;
            results.append(&mut page.results);
        }

        Ok(results)
    }
}

async fn decode<T: DeserializeOwned>(url: String, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|err| err.message)
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        return Err(ApiError::Status { status, message });
    }

    serde_json::from_str(&body).map_err(|source| ApiError::Decode { url, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::PollSettings;
    use mockito::{Matcher, Server, ServerGuard};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    const DEVICE_ID: &str = "8c0b5a5e-1b46-4bf2-9d4b-4c3c7d4b3e01";
    const APP_ID: &str = "2b1f1c7e-5d5a-4a5e-8f4e-3f1f0a9b6c02";
    const VERSION_ID: &str = "f7d3f9a2-0d0e-4d4a-9f0f-7d2e6a3b9c10";
    const COMMAND_ID: &str = "6a3c1f0e-9a41-4a0c-b9de-41a51c0b7d03";

    async fn setup() -> (ServerGuard, EsperClient) {
        let server = Server::new_async().await;
        let config = Config {
            base_url: server.url(),
            api_key: "secret".into(),
            enterprise_id: "ent".into(),
            request_timeout: Duration::from_secs(5),
            poll: PollSettings::default(),
        };
        let http = build_http_client(&config).unwrap();
        let client = EsperClient::new(&config, &http);
        (server, client)
    }

    #[tokio::test]
    async fn lists_devices_with_bearer_auth() {
        let (mut server, client) = setup().await;

        let mock = server
            .mock("GET", "/enterprise/ent/device/")
            .match_header("authorization", "Bearer secret")
            .match_query(Matcher::UrlEncoded("name".into(), "ABC-DEF-1234".into()))
            .with_status(200)
            .with_body(
                json!({
                    "count": 1,
                    "next": null,
                    "previous": null,
                    "results": [{"id": DEVICE_ID, "device_name": "ABC-DEF-1234"}],
                })
                .to_string(),
            )
            .create_async()
            .await;

        let devices = client.list_devices("ABC-DEF-1234").await.unwrap();
        mock.assert_async().await;

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id.to_string(), DEVICE_ID);
        assert_eq!(devices[0].device_name, "ABC-DEF-1234");
    }

    #[tokio::test]
    async fn follows_next_page() {
        let (mut server, client) = setup().await;
        let next = format!("{}/page/2", server.url());

        let first = server
            .mock("GET", format!("/enterprise/ent/application/{}/version/", APP_ID).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "count": 2,
                    "next": next,
                    "results": [{"id": VERSION_ID, "build_number": "5"}],
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/page/2")
            .with_status(200)
            .with_body(
                json!({
                    "count": 2,
                    "next": null,
                    "results": [{"id": VERSION_ID, "build_number": "7", "version_code": "1.7"}],
                })
                .to_string(),
            )
            .create_async()
            .await;

        let versions = client
            .list_app_versions(Uuid::parse_str(APP_ID).unwrap())
            .await
            .unwrap();
        first.assert_async().await;
        second.assert_async().await;

        let builds: Vec<Option<&str>> = versions
            .iter()
            .map(|v| v.build_number.as_deref())
            .collect();
        assert_eq!(builds, vec![Some("5"), Some("7")]);
        assert_eq!(versions[1].version_code.as_deref(), Some("1.7"));
    }

    #[tokio::test]
    async fn posts_install_command() {
        let (mut server, client) = setup().await;

        let mock = server
            .mock("POST", "/v0/enterprise/ent/command/")
            .match_body(Matcher::PartialJson(json!({
                "command": "INSTALL",
                "devices": [DEVICE_ID],
                "command_args": {"app_version": VERSION_ID},
            })))
            .with_status(201)
            .with_body(json!({"id": COMMAND_ID, "command": "INSTALL"}).to_string())
            .create_async()
            .await;

        let request = CommandRequest::install(
            Uuid::parse_str(DEVICE_ID).unwrap(),
            Uuid::parse_str(VERSION_ID).unwrap(),
        );
        let command = client.create_command(&request).await.unwrap();
        mock.assert_async().await;

        assert_eq!(command.id.to_string(), COMMAND_ID);
    }

    #[tokio::test]
    async fn error_message_comes_from_body() {
        let (mut server, client) = setup().await;

        let _mock = server
            .mock("POST", "/v0/enterprise/ent/command/")
            .with_status(400)
            .with_body(
                json!({"errors": [], "message": "  Device is offline \n", "status": 400})
                    .to_string(),
            )
            .create_async()
            .await;

        let request = CommandRequest::install(
            Uuid::parse_str(DEVICE_ID).unwrap(),
            Uuid::parse_str(VERSION_ID).unwrap(),
        );
        let err = client.create_command(&request).await.unwrap_err();

        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Device is offline");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn error_without_body_uses_status_text() {
        let (mut server, client) = setup().await;

        let _mock = server
            .mock("GET", format!("/v0/enterprise/ent/command/{}/status/", COMMAND_ID).as_str())
            .with_status(404)
            .create_async()
            .await;

        let err = client
            .command_status(Uuid::parse_str(COMMAND_ID).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not Found");
    }
}
