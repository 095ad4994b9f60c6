use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    thread::sleep,
    time::Duration,
};

use base64::{engine::general_purpose::STANDARD, Engine};
use hdx_config::Configuration;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use ureq::{http::Response, Agent, Body};
use url::Url;

use crate::{
    error::{RemoteError, Result},
    http_client::{apply_headers, ClientConfig},
    multipart::Multipart,
};

/// A file sent as a multipart part named `field`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub field: String,
    pub path: PathBuf,
}

impl FileUpload {
    pub fn new(field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            field: field.into(),
            path: path.into(),
        }
    }
}

/// Operations the HDX objects need from a CKAN server.
pub trait RemoteCkan: Send + Sync {
    /// Calls `action` with `data` and returns the unwrapped `result`. When
    /// `files` is not empty the request is sent as `multipart/form-data`.
    fn call_action(&self, action: &str, data: &Value, files: &[FileUpload]) -> Result<Value>;

    /// Fetches a URL as text.
    fn fetch_text(&self, url: &str) -> Result<String>;

    /// Downloads a URL to `path`, returning the number of bytes written.
    fn download(&self, url: &str, path: &Path) -> Result<u64>;

    /// Sends a HEAD request without following redirects and returns the
    /// `Location` of a redirect response.
    fn redirect_location(&self, url: &str) -> Result<Option<String>> {
        let _ = url;
        Ok(None)
    }
}

/// `RemoteCkan` over HTTP using a `ureq` agent.
pub struct HttpCkan {
    agent: Agent,
    client_config: ClientConfig,
    site_url: String,
    apikey: Option<String>,
    basic_auth: Option<String>,
}

impl HttpCkan {
    pub fn new(
        site_url: impl Into<String>,
        apikey: Option<String>,
        client_config: ClientConfig,
    ) -> Self {
        Self {
            agent: client_config.build(),
            client_config,
            site_url: site_url.into().trim_end_matches('/').to_string(),
            apikey,
            basic_auth: None,
        }
    }

    /// Sets up a client for the configured site, API key, user agent and site
    /// credentials.
    pub fn from_configuration(configuration: &Configuration) -> Result<Self> {
        let mut ckan = Self::new(
            configuration.get_hdx_site_url(),
            configuration.get_api_key().map(String::from),
            ClientConfig::from_configuration(configuration),
        );
        if let Some((username, password)) = configuration.get_credentials()? {
            ckan = ckan.with_basic_auth(&username, &password);
        }
        Ok(ckan)
    }

    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic_auth = Some(format!(
            "Basic {}",
            STANDARD.encode(format!("{username}:{password}"))
        ));
        self
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn action_url(&self, action: &str) -> Result<Url> {
        let url = format!("{}/api/3/action/{action}", self.site_url);
        Url::parse(&url).map_err(|source| RemoteError::InvalidUrl { url, source })
    }

    fn auth_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        match (&self.basic_auth, &self.apikey) {
            (Some(basic), key) => {
                headers.push(("Authorization", basic.clone()));
                if let Some(key) = key {
                    headers.push(("X-CKAN-API-Key", key.clone()));
                }
            }
            (None, Some(key)) => headers.push(("Authorization", key.clone())),
            (None, None) => {}
        }
        headers
    }

    fn post(&self, url: &str, data: &Value, files: &[FileUpload]) -> Result<Response<Body>> {
        let mut req = apply_headers(self.agent.post(url), &self.client_config.headers);
        for (name, value) in self.auth_headers() {
            req = req.header(name, &value);
        }

        let resp = if files.is_empty() {
            req.send_json(data)?
        } else {
            let form = build_form(data, files)?;
            let content_type = form.content_type();
            req.header("Content-Type", &content_type)
                .send(form.finish())?
        };
        Ok(resp)
    }

    fn get(&self, url: &str, authenticated: bool) -> Result<Response<Body>> {
        let mut req = apply_headers(self.agent.get(url), &self.client_config.headers);
        if authenticated {
            for (name, value) in self.auth_headers() {
                req = req.header(name, &value);
            }
        }
        Ok(req.call()?)
    }

    fn is_site_url(&self, url: &str) -> bool {
        url.starts_with(&self.site_url)
    }
}

/// Builds a multipart form: every field of `data` as a form value and each
/// upload as a file part named after the file.
fn build_form(data: &Value, files: &[FileUpload]) -> Result<Multipart> {
    let mut form = Multipart::new();
    if let Value::Object(fields) = data {
        for (name, value) in fields {
            form.field(name, value);
        }
    }
    for upload in files {
        let content = fs::read(&upload.path).map_err(|source| {
            RemoteError::Io {
                action: format!("reading {}", upload.path.display()),
                source,
            }
        })?;
        let filename = upload
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| upload.field.clone());
        form.file(&upload.field, &filename, &content);
    }
    Ok(form)
}

fn retry_after(resp: &Response<Body>) -> Option<u64> {
    if resp.status().as_u16() != 429 {
        return None;
    }
    resp.headers()
        .get("Retry-After")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Sends a request, sleeping and retrying once when a 429 response carries a
/// `Retry-After` header.
fn with_retry<F>(mut send: F) -> Result<Response<Body>>
where
    F: FnMut() -> Result<Response<Body>>,
{
    let resp = send()?;
    match retry_after(&resp) {
        Some(seconds) => {
            warn!("429 Too Many Requests response. Sleeping for {seconds} seconds.");
            sleep(Duration::from_secs(seconds));
            send()
        }
        None => Ok(resp),
    }
}

/// Unwraps a CKAN action response envelope.
///
/// `{"success": true, "result": ...}` gives the result. Failures map the
/// error `__type` onto [`RemoteError`] variants.
pub fn unwrap_envelope(action: &str, url: &str, status: u16, body: &str) -> Result<Value> {
    let envelope: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if status == 404 => {
            return Err(RemoteError::NotFound {
                action: action.to_string(),
                message: format!("HTTP 404: {url}"),
            })
        }
        Err(_) if !(200..300).contains(&status) => {
            return Err(RemoteError::HttpError {
                status,
                url: url.to_string(),
            })
        }
        Err(_) => {
            return Err(RemoteError::InvalidResponse {
                url: url.to_string(),
            })
        }
    };

    if envelope.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(envelope.get("result").cloned().unwrap_or(Value::Null));
    }

    let Some(Value::Object(error)) = envelope.get("error") else {
        return Err(RemoteError::HttpError {
            status,
            url: url.to_string(),
        });
    };
    let kind = error
        .get("__type")
        .and_then(Value::as_str)
        .unwrap_or("Error")
        .to_string();
    let message = error_message(error);
    let action = action.to_string();
    Err(match kind.as_str() {
        "Not Found Error" => RemoteError::NotFound { action, message },
        "Validation Error" => RemoteError::Validation { action, message },
        "Authorization Error" => RemoteError::NotAuthorized { action, message },
        _ => RemoteError::Ckan {
            action,
            kind,
            message,
        },
    })
}

fn error_message(error: &Map<String, Value>) -> String {
    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    let details: Map<String, Value> = error
        .iter()
        .filter(|(key, _)| key.as_str() != "__type")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Value::Object(details).to_string()
}

impl RemoteCkan for HttpCkan {
    fn call_action(&self, action: &str, data: &Value, files: &[FileUpload]) -> Result<Value> {
        let url = self.action_url(action)?.to_string();
        debug!("POST {url}");
        let mut resp = with_retry(|| self.post(&url, data, files))?;
        let status = resp.status().as_u16();
        let body = resp.body_mut().read_to_string()?;
        unwrap_envelope(action, &url, status, &body)
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        debug!("GET {url}");
        let mut resp = with_retry(|| self.get(url, self.is_site_url(url)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.body_mut().read_to_string()?)
    }

    fn download(&self, url: &str, path: &Path) -> Result<u64> {
        debug!("Downloading {url} to {}", path.display());
        let resp = with_retry(|| self.get(url, self.is_site_url(url)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let io_error = |source| {
            RemoteError::Io {
                action: format!("writing {}", path.display()),
                source,
            }
        };
        let mut file = File::create(path).map_err(io_error)?;
        let mut reader = resp.into_body().into_reader();
        io::copy(&mut reader, &mut file).map_err(io_error)
    }

    fn redirect_location(&self, url: &str) -> Result<Option<String>> {
        debug!("HEAD {url}");
        let req = self
            .agent
            .head(url)
            .config()
            .max_redirects(0)
            .max_redirects_will_error(false)
            .build();
        let resp = apply_headers(req, &self.client_config.headers).call()?;
        if !resp.status().is_redirection() {
            return Ok(None);
        }
        Ok(resp
            .headers()
            .get("Location")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string))
    }
}

impl std::fmt::Debug for HttpCkan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCkan")
            .field("site_url", &self.site_url)
            .field("apikey", &self.apikey.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const URL: &str = "https://data.humdata.org/api/3/action/package_show";

    #[test]
    fn test_unwrap_success() {
        let body = r#"{"success": true, "result": {"name": "test-dataset"}}"#;
        let result = unwrap_envelope("package_show", URL, 200, body).unwrap();
        assert_eq!(result, json!({"name": "test-dataset"}));
    }

    #[test]
    fn test_unwrap_not_found() {
        let body = r#"{"success": false, "error": {"__type": "Not Found Error", "message": "Not found"}}"#;
        let err = unwrap_envelope("package_show", URL, 404, body).unwrap_err();
        assert!(err.is_not_found());

        let err = unwrap_envelope("package_show", URL, 404, "<html></html>").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unwrap_validation_error() {
        let body = r#"{"success": false, "error": {"__type": "Validation Error", "name": ["That URL is already in use."]}}"#;
        match unwrap_envelope("package_create", URL, 409, body).unwrap_err() {
            RemoteError::Validation { action, message } => {
                assert_eq!(action, "package_create");
                assert_eq!(message, r#"{"name":["That URL is already in use."]}"#);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unwrap_other_errors() {
        let body = r#"{"success": false, "error": {"__type": "Authorization Error", "message": "Access denied"}}"#;
        assert!(matches!(
            unwrap_envelope("package_update", URL, 403, body),
            Err(RemoteError::NotAuthorized { .. })
        ));
        assert!(matches!(
            unwrap_envelope("package_update", URL, 502, "Bad gateway"),
            Err(RemoteError::HttpError { status: 502, .. })
        ));
        assert!(matches!(
            unwrap_envelope("package_update", URL, 200, "not json"),
            Err(RemoteError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_auth_headers() {
        let ckan = HttpCkan::new(
            "https://data.humdata.org/",
            Some("abcd".into()),
            ClientConfig::default(),
        );
        assert_eq!(ckan.site_url(), "https://data.humdata.org");
        assert_eq!(ckan.auth_headers(), vec![("Authorization", "abcd".to_string())]);
        assert_eq!(
            ckan.action_url("package_show").unwrap().as_str(),
            "https://data.humdata.org/api/3/action/package_show"
        );

        let ckan = ckan.with_basic_auth("user", "pass");
        assert_eq!(
            ckan.auth_headers(),
            vec![
                ("Authorization", "Basic dXNlcjpwYXNz".to_string()),
                ("X-CKAN-API-Key", "abcd".to_string()),
            ]
        );
        assert!(ckan.is_site_url("https://data.humdata.org/dataset/x/download/a.csv"));
        assert!(!ckan.is_site_url("https://example.com/a.csv"));
    }

    #[test]
    fn test_build_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();

        let data = json!({"match": "{\"id\":\"x\"}", "private": false});
        let form = build_form(&data, &[FileUpload::new("update__resources__0__upload", &path)]).unwrap();
        let body = String::from_utf8(form.finish()).unwrap();
        assert!(body.contains("name=\"private\"\r\n\r\nfalse"));
        assert!(body.contains("name=\"update__resources__0__upload\"; filename=\"data.csv\""));
        assert!(body.contains("a,b\n1,2\n"));

        let missing = FileUpload::new("upload", dir.path().join("missing.csv"));
        assert!(matches!(
            build_form(&data, &[missing]),
            Err(RemoteError::Io { .. })
        ));
    }
}
