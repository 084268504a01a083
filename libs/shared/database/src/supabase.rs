use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::auth::Doctor;

/// Thin client over the PostgREST endpoints exposed by Supabase.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Insert rows and return their stored representation.
    pub async fn insert(&self, table: &str, body: Value, auth_token: &str) -> Result<Vec<Value>> {
        let path = format!("/rest/v1/{}", table);
        self.request_with_headers(
            Method::POST,
            &path,
            Some(auth_token),
            Some(body),
            Some(Self::representation_headers()),
        ).await
    }

    /// Patch the rows matched by `filter` (a PostgREST query string) and return them.
    pub async fn update(&self, table: &str, filter: &str, body: Value, auth_token: &str) -> Result<Vec<Value>> {
        let path = format!("/rest/v1/{}?{}", table, filter);
        self.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(Self::representation_headers()),
        ).await
    }

    pub async fn delete(&self, table: &str, filter: &str, auth_token: &str) -> Result<()> {
        let path = format!("/rest/v1/{}?{}", table, filter);
        let _: Vec<Value> = self.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(Self::representation_headers()),
        ).await?;
        Ok(())
    }

    pub async fn select(&self, table: &str, query: &str, auth_token: &str) -> Result<Vec<Value>> {
        let path = if query.is_empty() {
            format!("/rest/v1/{}", table)
        } else {
            format!("/rest/v1/{}?{}", table, query)
        };
        self.request(Method::GET, &path, Some(auth_token), None).await
    }

    pub async fn get_doctor(&self, doctor_id: i64, auth_token: &str) -> Result<Option<Doctor>> {
        let rows = self.select(
            "users",
            &format!("id=eq.{}&select=id,name,email,crm,specialty,role,is_active,created_at,updated_at", doctor_id),
            auth_token,
        ).await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}
