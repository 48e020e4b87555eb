use crate::{document::PactDocument, error::Error};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hyper::{header, Body, Client, Request};
use hyper_tls::HttpsConnector;
use lazy_static::lazy_static;
use regex::Regex;
use std::{fs, path::PathBuf};

lazy_static! {
    static ref WEB_URI_REGEX: Regex = Regex::new(r"^https?://").unwrap();
}

pub(crate) fn is_web_uri(uri: &str) -> bool {
    WEB_URI_REGEX.is_match(uri)
}

/// Credentials for fetching a pact from a broker that requires basic auth.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", BASE64.encode(credentials))
    }
}

/// Where a pact document comes from, decided once by the shape of the URI:
/// scheme-qualified addresses are fetched over the network, anything else is
/// read as a local file.
#[derive(Debug)]
pub enum PactSource {
    File { path: PathBuf },
    Web { uri: String, auth: Option<BasicAuth> },
}

impl PactSource {
    pub fn from_uri<S: Into<String>>(uri: S, auth: Option<BasicAuth>) -> Self {
        let uri = uri.into();
        if is_web_uri(&uri) {
            PactSource::Web { uri, auth }
        } else {
            PactSource::File {
                path: PathBuf::from(uri),
            }
        }
    }

    /// Fetches, parses and validates the pact document. A single attempt;
    /// read and transport failures surface as `SourceUnavailable`.
    pub async fn read(&self) -> Result<PactDocument, Error> {
        let raw = match self {
            PactSource::File { path } => fs::read(path).map_err(|e| {
                Error::SourceUnavailable(format!(
                    "could not read pact file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            PactSource::Web { uri, auth } => fetch_remote(uri, auth.as_ref()).await?,
        };

        let document: PactDocument = serde_json::from_slice(&raw)?;
        document.validate()?;
        Ok(document)
    }
}

async fn fetch_remote(uri: &str, auth: Option<&BasicAuth>) -> Result<Vec<u8>, Error> {
    let mut request_builder = Request::get(uri).header(header::ACCEPT, "application/json");
    if let Some(auth) = auth {
        request_builder = request_builder.header(header::AUTHORIZATION, auth.header_value());
    }
    let request = request_builder
        .body(Body::empty())
        .map_err(|e| Error::SourceUnavailable(format!("invalid pact uri {}: {}", uri, e)))?;

    let client = Client::builder().build::<_, Body>(HttpsConnector::new());
    let response = client
        .request(request)
        .await
        .map_err(|e| Error::SourceUnavailable(format!("could not fetch pact from {}: {}", uri, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::SourceUnavailable(format!(
            "pact fetch from {} returned {}",
            uri, status
        )));
    }

    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .map_err(|e| Error::SourceUnavailable(format!("could not read pact from {}: {}", uri, e)))?;
    Ok(bytes.to_vec())
}
