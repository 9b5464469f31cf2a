//! HTTP client over a resolved contract.

use std::collections::BTreeMap;
use std::time::Duration;

use accord_core::{Method, Router};
use accord_schema::{validate, ValidateOptions};
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::operation::{CallArgs, Operation, PreparedRequest};
use crate::query::encode_query;

/// A decoded response.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientResponse {
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: BTreeMap<String, String>,
    /// JSON body, the body text for non-JSON responses, `Null` when empty.
    pub body: Value,
}

impl ClientResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Calls the routes of one contract on one service.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
    operations: IndexMap<String, Operation>,
}

impl Client {
    /// Create a client with one operation per contract route.
    pub fn new(contract: &Router, config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        let operations = contract
            .flatten()
            .into_iter()
            .map(|(key, route)| (key.clone(), Operation::new(key, route.clone())))
            .collect();

        Ok(Self {
            http,
            config,
            operations,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn operation(&self, key: &str) -> Option<&Operation> {
        self.operations.get(key)
    }

    /// Operations in contract definition order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Validate, build and send the call for operation `key`.
    ///
    /// Base headers from the configuration are added unless `args` sets the
    /// same header.
    pub async fn call(&self, key: &str, args: CallArgs) -> Result<ClientResponse, ClientError> {
        let operation = self
            .operation(key)
            .ok_or_else(|| ClientError::UnknownOperation(key.to_string()))?;

        let mut args = args;
        for (name, value) in &self.config.base_headers {
            args.headers
                .entry(name.clone())
                .or_insert_with(|| Value::String(value.clone()));
        }

        let prepared = operation.build_request(&args, self.config.json_query)?;
        let endpoint = format!("{} {}", prepared.method, prepared.path);
        let url = self.url_for(&prepared)?;
        tracing::debug!(operation = key, %endpoint, "sending request");

        let mut request = self
            .http
            .request(reqwest_method(prepared.method), url)
            .headers(header_map(&prepared.headers)?);
        if let Some(body) = &prepared.body {
            request = attach_body(request, &prepared.content_type, body);
        }

        let resp = request.send().await.map_err(|e| ClientError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        let response = decode_response(resp, &endpoint).await?;
        tracing::debug!(operation = key, status = response.status, "received response");

        if !self.config.validate_response {
            return Ok(response);
        }
        let schema = operation
            .route()
            .response_for(response.status)
            .and_then(|entry| entry.schema());
        match schema {
            Some(schema) => {
                let body = validate(&response.body, Some(schema), ValidateOptions::STRIP).map_err(
                    |source| ClientError::ResponseValidation {
                        endpoint,
                        status: response.status,
                        source,
                    },
                )?;
                Ok(ClientResponse { body, ..response })
            }
            None => Ok(response),
        }
    }

    fn url_for(&self, prepared: &PreparedRequest) -> Result<Url, ClientError> {
        let raw = format!(
            "{}{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            prepared.path_and_query()
        );
        Url::parse(&raw).map_err(|e| ClientError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ClientError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader(name.clone()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn attach_body(
    request: reqwest::RequestBuilder,
    content_type: &str,
    body: &Value,
) -> reqwest::RequestBuilder {
    if is_json(content_type) {
        return request.json(body);
    }
    let text = match body {
        Value::Object(map) if content_type == "application/x-www-form-urlencoded" => {
            encode_query(map, false)
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    request.header(CONTENT_TYPE, content_type).body(text)
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence == "application/json" || essence.ends_with("+json")
}

async fn decode_response(resp: reqwest::Response, endpoint: &str) -> Result<ClientResponse, ClientError> {
    let status = resp.status().as_u16();
    let headers: BTreeMap<String, String> = resp
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let json = headers.get("content-type").map(|ct| is_json(ct)).unwrap_or(false);

    let text = resp.text().await.map_err(|e| ClientError::Http {
        endpoint: endpoint.to_string(),
        source: e,
    })?;
    let body = if text.is_empty() {
        Value::Null
    } else if json {
        serde_json::from_str(&text).map_err(|e| ClientError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?
    } else {
        Value::String(text)
    };

    Ok(ClientResponse {
        status,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_core::Route;

    fn client() -> Client {
        let contract = Router::new()
            .route("health", Route::get("/health"))
            .router("posts", Router::new().route("get", Route::get("/posts/:id")));
        let config = ClientConfig::new(Url::parse("http://localhost:9000/api/").unwrap());
        Client::new(&contract, config).unwrap()
    }

    #[test]
    fn one_operation_per_route_in_order() {
        let client = client();
        let keys: Vec<&str> = client.operations().map(Operation::key).collect();
        assert_eq!(keys, vec!["health", "posts.get"]);
        assert!(client.operation("posts.get").is_some());
        assert!(client.operation("posts").is_none());
    }

    #[test]
    fn urls_join_base_path_and_route_path() {
        let client = client();
        let prepared = client
            .operation("posts.get")
            .unwrap()
            .build_request(&CallArgs::new().param("id", 5), false)
            .unwrap();
        assert_eq!(
            client.url_for(&prepared).unwrap().as_str(),
            "http://localhost:9000/api/posts/5"
        );
    }

    #[test]
    fn json_content_types() {
        assert!(is_json("application/json"));
        assert!(is_json("application/json; charset=utf-8"));
        assert!(is_json("application/problem+json"));
        assert!(!is_json("text/plain"));
    }

    #[test]
    fn invalid_header_names_are_rejected() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(header_map(&headers), Err(ClientError::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn unknown_operation_is_an_error() {
        let err = client().call("nope", CallArgs::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::UnknownOperation(key) if key == "nope"));
    }
}
