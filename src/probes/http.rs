//! HTTP family drivers (§4.5, §6.1): plain HTTP, keyword-in-body, and
//! JSON-query assertions. Grounded in the teacher's `checker.rs` HTTP check
//! path — `reqwest::Client` per probe, status-code acceptance, keyword
//! search, redirect following — generalized to the accepted-status DSL and
//! widened auth set from §4.5.
//!
//! TLS chain capture: `reqwest` doesn't expose the peer certificate chain,
//! so for `https://` targets this driver performs a secondary bare
//! `tokio-rustls` handshake against the same host:port purely to read back
//! the chain, mirroring the teacher's separate `tls_info` collection pass
//! in `checker.rs` rather than threading it through the request itself.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rustls_pki_types::ServerName;
use x509_parser::prelude::FromDer;

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{AuthConfig, BodyEncoding, HttpMethod, HttpProbeConfig, Monitor, ProbeConfig, Status, TlsCertEntry, TlsInfo};

/// Recursively collects every field whose key ends in "content" (case
/// insensitive), depth-first, returning its dotted/indexed path alongside
/// its value (§4.5, §11 content-parameter scan).
fn collect_content_fields(value: &serde_json::Value, path: &str, out: &mut Vec<(String, serde_json::Value)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                if key.to_ascii_lowercase().ends_with("content") {
                    out.push((child_path.clone(), child.clone()));
                }
                collect_content_fields(child, &child_path, out);
            }
        }
        serde_json::Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_content_fields(item, &format!("{path}[{i}]"), out);
            }
        }
        _ => {}
    }
}

/// Parses the response body as either a single JSON document or an SSE
/// stream of `data: ` frames (ignoring the `[DONE]` sentinel), and returns
/// every `*content` field found across it.
pub fn scan_content_fields(body: &str) -> Vec<(String, serde_json::Value)> {
    let mut out = Vec::new();
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        collect_content_fields(&json, "", &mut out);
        return out;
    }
    for line in body.lines() {
        let Some(data) = line.strip_prefix("data: ") else { continue };
        if data.trim() == "[DONE]" {
            continue;
        }
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(data) {
            collect_content_fields(&json, "", &mut out);
        }
    }
    out
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn build_client(config: &HttpProbeConfig, timeout: std::time::Duration) -> CoreResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
        .danger_accept_invalid_certs(config.ignore_tls)
        .user_agent(format!("Pulsewatch/{}", env!("CARGO_PKG_VERSION")));

    if let Some(proxy_url) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| CoreError::Config(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    if let AuthConfig::Mtls { client_cert_pem, client_key_pem } = &config.auth {
        let mut pem_bundle = client_cert_pem.clone();
        pem_bundle.push('\n');
        pem_bundle.push_str(client_key_pem);
        let identity = reqwest::Identity::from_pem(pem_bundle.as_bytes()).map_err(|e| CoreError::Config(e.to_string()))?;
        builder = builder.identity(identity);
    }

    builder.build().map_err(|e| CoreError::Config(e.to_string()))
}

async fn apply_auth(request: reqwest::RequestBuilder, auth: &AuthConfig, client: &reqwest::Client) -> CoreResult<reqwest::RequestBuilder> {
    match auth {
        AuthConfig::None | AuthConfig::Mtls { .. } => Ok(request),
        AuthConfig::Basic { username, password } => Ok(request.basic_auth(username, Some(password))),
        AuthConfig::Bearer { token } => Ok(request.bearer_auth(token)),
        AuthConfig::OAuth2ClientCredentials {
            token_url,
            client_id,
            client_secret,
            scope,
        } => {
            let mut form = vec![("grant_type", "client_credentials")];
            if let Some(scope) = scope {
                form.push(("scope", scope));
            }
            let resp = client
                .post(token_url)
                .basic_auth(client_id, Some(client_secret))
                .form(&form)
                .send()
                .await
                .map_err(|e| CoreError::Network(format!("oauth2 token request failed: {e}")))?;
            let body: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| CoreError::Network(format!("oauth2 token response not JSON: {e}")))?;
            let token = body
                .get("access_token")
                .and_then(|v| v.as_str())
                .ok_or_else(|| CoreError::Network("oauth2 response missing access_token".to_string()))?;
            Ok(request.bearer_auth(token))
        }
    }
}

async fn execute(config: &HttpProbeConfig, ctx: &ProbeContext) -> CoreResult<(reqwest::StatusCode, String, i64)> {
    let client = build_client(config, ctx.timeout)?;
    let mut request = client.request(reqwest_method(config.method), &config.url);
    for (name, value) in &config.headers {
        request = request.header(name, value);
    }
    request = apply_auth(request, &config.auth, &client).await?;
    request = match &config.body {
        Some(BodyEncoding::Json(value)) => request.json(value),
        Some(BodyEncoding::Xml(xml)) => request.header("Content-Type", "application/xml").body(xml.clone()),
        None => request,
    };

    let start = Instant::now();
    let response = request.send().await.map_err(|e| CoreError::Network(e.to_string()))?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let ping_ms = start.elapsed().as_millis() as i64;

    Ok((status, body, ping_ms))
}

/// Captures the peer certificate chain for `https://` URLs. Returns `None`
/// for plain `http://` targets or when the handshake itself fails — a TLS
/// capture failure never fails the probe outcome, only omits `tls_info`.
async fn capture_tls_chain(monitor_id: &str, url: &str) -> Option<TlsInfo> {
    let parsed = reqwest::Url::parse(url).ok()?;
    if parsed.scheme() != "https" {
        return None;
    }
    let host = parsed.host_str()?.to_string();
    let port = parsed.port_or_known_default().unwrap_or(443);

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let connector = tokio_rustls::TlsConnector::from(Arc::new(tls_config));

    let tcp = tokio::net::TcpStream::connect((host.as_str(), port)).await.ok()?;
    let server_name = ServerName::try_from(host.clone()).ok()?;
    let tls_stream = connector.connect(server_name, tcp).await.ok()?;
    let (_, session) = tls_stream.get_ref();
    let certs = session.peer_certificates()?;

    let mut chain = Vec::new();
    for cert in certs {
        let (_, parsed_cert) = x509_parser::certificate::X509Certificate::from_der(cert.as_ref()).ok()?;
        let not_after = parsed_cert.validity().not_after.timestamp();
        let days_remaining = (not_after - chrono::Utc::now().timestamp()) / 86_400;
        let fingerprint = {
            use sha2::{Digest, Sha256};
            hex::encode(Sha256::digest(cert.as_ref()))
        };
        chain.push(TlsCertEntry {
            subject_cn: parsed_cert.subject().to_string(),
            cert_type: if chain.is_empty() { "server".to_string() } else { "intermediate".to_string() },
            fingerprint256: fingerprint,
            days_remaining,
            valid: parsed_cert.validity().is_valid(),
            issuer_certificate: None,
        });
    }

    Some(TlsInfo {
        monitor_id: monitor_id.to_string(),
        chain,
    })
}

fn http_config(monitor: &Monitor) -> CoreResult<&HttpProbeConfig> {
    match &monitor.probe {
        ProbeConfig::Http(c) | ProbeConfig::Keyword(c, _) | ProbeConfig::JsonQuery(c, _) => Ok(c),
        _ => Err(CoreError::Config("probe is not an HTTP-family config".to_string())),
    }
}

pub struct HttpDriver;

#[async_trait]
impl ProbeDriver for HttpDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let config = http_config(monitor)?;
        let (status, body, ping_ms) = execute(config, ctx).await?;

        let mut outcome = if config.accepted_status.matches(status.as_u16()) {
            ProbeOutcome::up(format!("{} - Ok", status.as_u16())).with_ping(ping_ms)
        } else {
            ProbeOutcome::down(format!("{} - unexpected status code", status.as_u16())).with_ping(ping_ms)
        };

        if outcome.status == Status::Up && config.check_content_parameter {
            let fields = scan_content_fields(&body);
            if !fields.is_empty() && fields.iter().all(|(_, v)| v.is_null()) {
                let paths = fields.iter().map(|(path, _)| path.as_str()).collect::<Vec<_>>().join(", ");
                outcome = ProbeOutcome::down(format!("all content fields are null, listing field paths: {paths}")).with_ping(ping_ms);
            }
        }

        if let Some(tls_info) = capture_tls_chain(&monitor.id, &config.url).await {
            outcome = outcome.with_tls(tls_info);
        }
        Ok(outcome)
    }
}

pub struct KeywordDriver;

#[async_trait]
impl ProbeDriver for KeywordDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let config = http_config(monitor)?;
        let ProbeConfig::Keyword(_, keyword_config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a keyword probe".to_string()));
        };

        let (status, body, ping_ms) = execute(config, ctx).await?;
        if !config.accepted_status.matches(status.as_u16()) {
            return Ok(ProbeOutcome::down(format!("{} - unexpected status code", status.as_u16())).with_ping(ping_ms));
        }

        let found = body.contains(&keyword_config.keyword);
        let passed = found != keyword_config.invert_keyword;
        let outcome = if passed {
            ProbeOutcome::up(format!("keyword \"{}\" {}", keyword_config.keyword, if found { "found" } else { "not found, as expected" }))
        } else {
            ProbeOutcome::down(format!(
                "keyword \"{}\" {}",
                keyword_config.keyword,
                if found { "found but was expected absent" } else { "not found" }
            ))
        };
        Ok(outcome.with_ping(ping_ms))
    }
}

pub struct JsonQueryDriver;

#[async_trait]
impl ProbeDriver for JsonQueryDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let config = http_config(monitor)?;
        let ProbeConfig::JsonQuery(_, query_config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a json-query probe".to_string()));
        };

        let (status, body, ping_ms) = execute(config, ctx).await?;
        if !config.accepted_status.matches(status.as_u16()) {
            return Ok(ProbeOutcome::down(format!("{} - unexpected status code", status.as_u16())).with_ping(ping_ms));
        }

        let json: serde_json::Value = serde_json::from_str(&body).map_err(|e| CoreError::ProbePredicate(format!("response was not JSON: {e}")))?;
        let expr = jmespath::compile(&query_config.json_path).map_err(|e| CoreError::Config(format!("bad json_path: {e}")))?;
        let data = jmespath::Variable::try_from(json).map_err(|e| CoreError::ProbePredicate(e.to_string()))?;
        let result = expr.search(data).map_err(|e| CoreError::ProbePredicate(e.to_string()))?;
        let actual = result.as_string().cloned().unwrap_or_else(|| result.to_string());

        let outcome = if actual == query_config.expected_value {
            ProbeOutcome::up(format!("json query matched: {actual}"))
        } else {
            ProbeOutcome::down(format!("json query mismatch: expected \"{}\", got \"{actual}\"", query_config.expected_value))
        };
        Ok(outcome.with_ping(ping_ms))
    }
}
