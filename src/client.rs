//! Blocking HTTP client for the base open API.
//!
//! Authenticates with the app credentials for a tenant access token on first
//! use and then issues record list/get/update calls against a single base.
//! Every response is an envelope `{code, msg, data}`; a non-zero code is
//! reported as `StoreError::Api`.

use std::cell::RefCell;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::error::{ConfigError, StoreError};
use crate::store::{Page, Record, RecordStore};

/// Records requested per list call; the API maximum.
pub const PAGE_SIZE: u32 = 500;

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
}

#[derive(Deserialize)]
struct ListData {
    #[serde(default)]
    items: Option<Vec<Record>>,
    #[serde(default)]
    page_token: Option<String>,
    #[serde(default)]
    has_more: Option<bool>,
}

#[derive(Deserialize)]
struct RecordData {
    record: Record,
}

pub struct BaseClient {
    http: Client,
    api_base: String,
    app_id: String,
    app_secret: String,
    app_token: String,
    token: RefCell<Option<String>>,
}

impl BaseClient {
    /// Build a client for the base named in `config`.
    ///
    /// Fails without touching the network when credentials or the base token
    /// are missing.
    pub fn new(config: &Config) -> Result<Self, ClientInitError> {
        config.require_base()?;
        let http = Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| ClientInitError::Http(StoreError::Http(e)))?;
        Ok(BaseClient {
            http,
            api_base: config.api_base.clone(),
            app_id: config.app_id.clone().unwrap_or_default(),
            app_secret: config.app_secret.clone().unwrap_or_default(),
            app_token: config.app_token.clone().unwrap_or_default(),
            token: RefCell::new(None),
        })
    }

    fn records_url(&self, table: &str) -> String {
        format!(
            "{}/open-apis/bitable/v1/apps/{}/tables/{}/records",
            self.api_base, self.app_token, table
        )
    }

    /// Return the cached tenant access token, fetching one on first use.
    fn tenant_token(&self) -> Result<String, StoreError> {
        if let Some(token) = self.token.borrow().as_ref() {
            return Ok(token.clone());
        }

        let url = format!("{}/open-apis/auth/v3/tenant_access_token/internal", self.api_base);
        log::debug!("requesting tenant access token");
        let resp = self
            .http
            .post(url)
            .json(&json!({ "app_id": self.app_id, "app_secret": self.app_secret }))
            .send()?;
        let body: TokenResponse = read_json(resp)?;
        if body.code != 0 {
            return Err(StoreError::Api { code: body.code, msg: body.msg });
        }
        let token = body
            .tenant_access_token
            .ok_or_else(|| StoreError::Malformed("auth response has no tenant_access_token".into()))?;
        *self.token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let token = self.tenant_token()?;
        let resp = request.bearer_auth(token).send()?;
        let envelope: Envelope<T> = read_json(resp)?;
        if envelope.code != 0 {
            return Err(StoreError::Api { code: envelope.code, msg: envelope.msg });
        }
        envelope
            .data
            .ok_or_else(|| StoreError::Malformed("response has no data".into()))
    }
}

/// Check the HTTP status, then decode the body.
fn read_json<T: DeserializeOwned>(resp: reqwest::blocking::Response) -> Result<T, StoreError> {
    let status = resp.status();
    let text = resp.text()?;
    if !status.is_success() {
        // The API often explains failures in an envelope even on 4xx.
        if let Ok(Envelope::<Value> { code, msg, .. }) = serde_json::from_str(&text) {
            if code != 0 {
                return Err(StoreError::Api { code, msg });
            }
        }
        return Err(StoreError::Status { status: status.as_u16(), body: text });
    }
    serde_json::from_str(&text).map_err(|e| StoreError::Malformed(e.to_string()))
}

impl RecordStore for BaseClient {
    fn list_records(&self, table: &str, page_token: Option<&str>) -> Result<Page, StoreError> {
        let mut query: Vec<(&str, String)> = vec![("page_size", PAGE_SIZE.to_string())];
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }
        let data: ListData = self.call(self.http.get(self.records_url(table)).query(&query))?;

        let more = data.has_more.unwrap_or(data.page_token.is_some());
        Ok(Page {
            items: data.items.unwrap_or_default(),
            next_page_token: if more { data.page_token } else { None },
        })
    }

    fn get_record(&self, table: &str, record_id: &str) -> Result<Record, StoreError> {
        let url = format!("{}/{}", self.records_url(table), record_id);
        let data: RecordData = self.call(self.http.get(url))?;
        Ok(data.record)
    }

    fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.records_url(table), record_id);
        let _: Value = self.call(self.http.put(url).json(&json!({ "fields": fields })))?;
        Ok(())
    }
}

/// Building the client failed before any request was made.
#[derive(Debug, thiserror::Error)]
pub enum ClientInitError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("could not build HTTP client: {0}")]
    Http(StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::fetcher::fetch_all;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_auth(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/open-apis/auth/v3/tenant_access_token/internal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "msg": "ok",
                "tenant_access_token": "t-test",
                "expire": 7200
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    const RECORDS: &str = "/open-apis/bitable/v1/apps/bascnTest/tables/tblTasks/records";

    #[tokio::test(flavor = "multi_thread")]
    async fn fetches_every_page_with_one_token() {
        let server = MockServer::start().await;
        mount_auth(&server).await;

        Mock::given(method("GET"))
            .and(path(RECORDS))
            .and(query_param("page_token", "p2"))
            .and(header("authorization", "Bearer t-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "msg": "success",
                "data": {
                    "has_more": false,
                    "items": [{ "record_id": "rec3", "fields": { "タスク名": "C" } }]
                }
            })))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(RECORDS))
            .and(query_param("page_size", "500"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "msg": "success",
                "data": {
                    "has_more": true,
                    "page_token": "p2",
                    "items": [
                        { "record_id": "rec1", "fields": { "タスク名": "A" } },
                        { "record_id": "rec2", "fields": { "タスク名": "B" } }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let cfg = test_config(&server.uri());
        let records = tokio::task::spawn_blocking(move || {
            let client = BaseClient::new(&cfg).unwrap();
            fetch_all(&client, "tblTasks")
        })
        .await
        .unwrap()
        .unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, ["rec1", "rec2", "rec3"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn null_items_are_an_empty_table() {
        let server = MockServer::start().await;
        mount_auth(&server).await;
        Mock::given(method("GET"))
            .and(path(RECORDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "msg": "success",
                "data": { "has_more": false, "items": null, "total": 0 }
            })))
            .mount(&server)
            .await;

        let cfg = test_config(&server.uri());
        let records = tokio::task::spawn_blocking(move || {
            fetch_all(&BaseClient::new(&cfg).unwrap(), "tblTasks")
        })
        .await
        .unwrap()
        .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn api_error_code_becomes_fetch_error() {
        let server = MockServer::start().await;
        mount_auth(&server).await;
        Mock::given(method("GET"))
            .and(path(RECORDS))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 91402,
                "msg": "NOTEXIST"
            })))
            .mount(&server)
            .await;

        let cfg = test_config(&server.uri());
        let err = tokio::task::spawn_blocking(move || {
            fetch_all(&BaseClient::new(&cfg).unwrap(), "tblTasks")
        })
        .await
        .unwrap()
        .unwrap_err();

        assert_eq!(err.table, "tblTasks");
        assert!(matches!(err.source, StoreError::Api { code: 91402, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_credentials_fail_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/open-apis/auth/v3/tenant_access_token/internal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 10003,
                "msg": "invalid param"
            })))
            .mount(&server)
            .await;

        let cfg = test_config(&server.uri());
        let err = tokio::task::spawn_blocking(move || {
            BaseClient::new(&cfg).unwrap().get_record("tblTasks", "rec1")
        })
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, StoreError::Api { code: 10003, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_sends_fields_body() {
        let server = MockServer::start().await;
        mount_auth(&server).await;
        Mock::given(method("PUT"))
            .and(path(format!("{RECORDS}/rec9")))
            .and(body_json(json!({ "fields": { "完了率": 0.4 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "msg": "success",
                "data": { "record": { "record_id": "rec9", "fields": { "完了率": 0.4 } } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = test_config(&server.uri());
        tokio::task::spawn_blocking(move || {
            let mut fields = Map::new();
            fields.insert("完了率".to_string(), json!(0.4));
            BaseClient::new(&cfg).unwrap().update_record("tblTasks", "rec9", fields)
        })
        .await
        .unwrap()
        .unwrap();
    }

    #[test]
    fn missing_credentials_fail_before_network() {
        let mut cfg = test_config("http://127.0.0.1:1");
        cfg.app_secret = None;
        let err = BaseClient::new(&cfg).err().unwrap();
        assert!(matches!(err, ClientInitError::Config(ConfigError::Missing("LARK_APP_SECRET"))));
    }
}
