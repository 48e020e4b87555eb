use crate::error::Error;
use async_trait::async_trait;
use hyper::{
    body,
    client::HttpConnector,
    header::{HeaderName, HeaderValue},
    Body, Client, HeaderMap, Request,
};
use hyper_tls::HttpsConnector;
use std::{collections::HashMap, fmt::Debug};

/// An outgoing request to the provider under test, already resolved against
/// the provider base URL.
#[derive(Debug, Clone)]
pub struct RequestData {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

/// The provider's actual response, as captured off the wire.
#[derive(Debug, Clone)]
pub struct ResponseData {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// The HTTP seam between the verifier and the provider under test. Swap in
/// a custom implementation to control timeouts or transport behaviour.
#[async_trait]
pub trait HttpClient: Debug {
    async fn execute(&self, request_data: &RequestData) -> Result<ResponseData, Error>;
}

#[derive(Debug)]
pub struct HyperHttpClient {
    client: Client<HttpsConnector<HttpConnector>>,
}

impl HyperHttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder().build(HttpsConnector::new()),
        }
    }
}

impl Default for HyperHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for HyperHttpClient {
    async fn execute(&self, request_data: &RequestData) -> Result<ResponseData, Error> {
        let mut request_builder = Request::builder()
            .uri(request_data.url.as_str())
            .method(request_data.method.as_str());

        if let Some(headers_mut) = request_builder.headers_mut() {
            put_headers(headers_mut, &request_data.headers)?;
        }

        let body = match &request_data.body {
            Some(content) => Body::from(content.clone()),
            None => Body::empty(),
        };
        let request: Request<Body> = request_builder.body(body)?;

        let response = self.client.request(request).await?;

        let status_code = response.status().as_u16();
        let headers = extract_headers(response.headers());
        let body = body::to_bytes(response.into_body()).await?;

        Ok(ResponseData {
            status_code,
            headers,
            body: String::from_utf8_lossy(&body).into(),
        })
    }
}

pub(crate) fn extract_headers(header_map: &HeaderMap) -> HashMap<String, String> {
    // header values with opaque bytes are skipped
    header_map
        .iter()
        .map(|(k, v)| (String::from(k.as_str()), v.to_str()))
        .filter_map(|(key, value)| value.ok().map(|v| (key, String::from(v))))
        .collect::<HashMap<_, _>>()
}

pub(crate) fn put_headers(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: &HashMap<String, String>,
) -> Result<(), Error> {
    for (key, value) in headers {
        let header_name = HeaderName::from_lowercase(key.to_lowercase().as_bytes())?;
        let header_value = HeaderValue::from_str(value)?;
        header_map.append(header_name, header_value);
    }

    Ok(())
}
