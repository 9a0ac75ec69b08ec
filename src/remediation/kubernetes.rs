//! Namespace deletion through the Kubernetes API.
//!
//! # Responsibilities
//! - Authenticate with the pod's service account token (or none, e.g. behind `kubectl proxy`)
//! - Trust the cluster CA when one is configured
//! - Issue `DELETE /api/v1/namespaces/{target}`
//!
//! # Design Decisions
//! - The token is re-read on every call; projected tokens rotate
//! - A 404 is success only when the API server says the namespace is NotFound;
//!   a bare 404 means the endpoint is wrong

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{header, Certificate, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::config::KubernetesConfig;
use crate::remediation::{RemediationError, RemediationTarget, Remediator};

/// The parts of a Kubernetes `Status` object used to classify failures.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    reason: String,
}

fn is_namespace_not_found(body: &str) -> bool {
    serde_json::from_str::<ApiStatus>(body).is_ok_and(|s| s.kind == "Status" && s.reason == "NotFound")
}

/// Deletes the target namespace and everything in it.
pub struct KubernetesNamespaceRemediator {
    client: Client,
    api_url: Url,
    token_path: Option<PathBuf>,
    propagation_policy: String,
}

impl KubernetesNamespaceRemediator {
    pub fn new(config: &KubernetesConfig) -> Result<Self, RemediationError> {
        let mut api_url = Url::parse(&config.api_url).map_err(|e| RemediationError::InvalidEndpoint {
            url: config.api_url.clone(),
            reason: e.to_string(),
        })?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(ca_path) = &config.ca_path {
            let pem = fs::read(ca_path).map_err(|source| RemediationError::Credentials {
                path: PathBuf::from(ca_path),
                source,
            })?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            client: builder.build()?,
            api_url,
            token_path: config.token_path.as_ref().map(PathBuf::from),
            propagation_policy: config.propagation_policy.clone(),
        })
    }

    fn namespace_url(&self, target: &RemediationTarget) -> Result<Url, RemediationError> {
        let path = format!("api/v1/namespaces/{}", target.as_str());
        self.api_url.join(&path).map_err(|e| RemediationError::InvalidEndpoint {
            url: format!("{}{}", self.api_url, path),
            reason: e.to_string(),
        })
    }

    async fn bearer_token(&self) -> Result<Option<String>, RemediationError> {
        let Some(path) = &self.token_path else {
            return Ok(None);
        };
        let token = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RemediationError::Credentials {
                path: path.clone(),
                source,
            })?;
        Ok(Some(token.trim().to_string()))
    }
}

#[async_trait]
impl Remediator for KubernetesNamespaceRemediator {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    async fn remediate(&self, target: &RemediationTarget) -> Result<(), RemediationError> {
        let url = self.namespace_url(target)?;
        tracing::warn!(namespace = %target, url = %url, "Deleting namespace");

        let mut request = self
            .client
            .delete(url)
            .header(header::ACCEPT, "application/json")
            .json(&json!({
                "kind": "DeleteOptions",
                "apiVersion": "v1",
                "propagationPolicy": self.propagation_policy,
            }));
        if let Some(token) = self.bearer_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            tracing::warn!(namespace = %target, status = %status, "Namespace deletion accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND && is_namespace_not_found(&body) {
            tracing::info!(namespace = %target, "Namespace already deleted");
            return Ok(());
        }

        Err(RemediationError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::{HeaderMap, Method, Uri}, routing::any, Router};
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Seen(Arc<Mutex<Vec<(Method, String, Option<String>)>>>);

    const NAMESPACE_NOT_FOUND: &str =
        r#"{"kind":"Status","apiVersion":"v1","status":"Failure","reason":"NotFound","code":404}"#;

    async fn start_api(status: u16) -> (SocketAddr, Seen) {
        start_api_with_body(status, "").await
    }

    async fn start_api_with_body(status: u16, body: &'static str) -> (SocketAddr, Seen) {
        let seen = Seen::default();
        let app = Router::new()
            .route(
                "/{*path}",
                any(move |State(seen): State<Seen>, method: Method, uri: Uri, headers: HeaderMap| async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    seen.0.lock().unwrap().push((method, uri.path().to_string(), auth));
                    (axum::http::StatusCode::from_u16(status).unwrap(), body)
                }),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (addr, seen)
    }

    fn config_for(addr: SocketAddr, token_path: Option<String>) -> KubernetesConfig {
        KubernetesConfig {
            api_url: format!("http://{}", addr),
            token_path,
            ca_path: None,
            ..KubernetesConfig::default()
        }
    }

    #[tokio::test]
    async fn test_deletes_target_namespace_with_token() {
        let (addr, seen) = start_api(200).await;
        let token_path = std::env::temp_dir().join(format!("loop-breaker-token-{}", std::process::id()));
        fs::write(&token_path, "s3cr3t\n").unwrap();

        let remediator =
            KubernetesNamespaceRemediator::new(&config_for(addr, Some(token_path.display().to_string()))).unwrap();
        let target = RemediationTarget::new("looping").unwrap();
        remediator.remediate(&target).await.unwrap();

        let seen = seen.0.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, Method::DELETE);
        assert_eq!(seen[0].1, "/api/v1/namespaces/looping");
        assert_eq!(seen[0].2.as_deref(), Some("Bearer s3cr3t"));

        fs::remove_file(&token_path).unwrap_or_default();
    }

    #[tokio::test]
    async fn test_not_found_counts_as_success() {
        let (addr, _) = start_api_with_body(404, NAMESPACE_NOT_FOUND).await;
        let remediator = KubernetesNamespaceRemediator::new(&config_for(addr, None)).unwrap();
        let target = RemediationTarget::new("gone").unwrap();
        assert!(remediator.remediate(&target).await.is_ok());
    }

    #[tokio::test]
    async fn test_bare_not_found_is_rejected() {
        let (addr, _) = start_api_with_body(404, "404 page not found").await;
        let remediator = KubernetesNamespaceRemediator::new(&config_for(addr, None)).unwrap();
        let target = RemediationTarget::new("gone").unwrap();

        let err = remediator.remediate(&target).await.unwrap_err();
        assert!(matches!(err, RemediationError::Rejected { status: 404, .. }));
    }

    #[test]
    fn test_not_found_status_classification() {
        assert!(is_namespace_not_found(NAMESPACE_NOT_FOUND));
        assert!(!is_namespace_not_found(r#"{"kind":"Status","reason":"Forbidden"}"#));
        assert!(!is_namespace_not_found("not json"));
    }

    #[tokio::test]
    async fn test_forbidden_is_rejected() {
        let (addr, _) = start_api(403).await;
        let remediator = KubernetesNamespaceRemediator::new(&config_for(addr, None)).unwrap();
        let target = RemediationTarget::new("locked").unwrap();

        let err = remediator.remediate(&target).await.unwrap_err();
        assert!(matches!(err, RemediationError::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_missing_token_file_is_credentials_error() {
        let (addr, seen) = start_api(200).await;
        let remediator =
            KubernetesNamespaceRemediator::new(&config_for(addr, Some("/does/not/exist".into()))).unwrap();
        let target = RemediationTarget::new("looping").unwrap();

        let err = remediator.remediate(&target).await.unwrap_err();
        assert!(matches!(err, RemediationError::Credentials { .. }));
        assert!(seen.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_api_url_with_path_prefix() {
        let config = KubernetesConfig {
            api_url: "http://127.0.0.1:8001/proxy".into(),
            token_path: None,
            ca_path: None,
            ..KubernetesConfig::default()
        };
        let remediator = KubernetesNamespaceRemediator::new(&config).unwrap();
        let url = remediator.namespace_url(&RemediationTarget::new("ns").unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8001/proxy/api/v1/namespaces/ns");
    }

    #[test]
    fn test_rejects_invalid_api_url() {
        let config = KubernetesConfig {
            api_url: "not a url".into(),
            ..KubernetesConfig::default()
        };
        assert!(matches!(
            KubernetesNamespaceRemediator::new(&config),
            Err(RemediationError::InvalidEndpoint { .. })
        ));
    }
}
