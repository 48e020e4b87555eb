use crate::{
    document::InteractionRequest,
    error::Error,
    http_client::{HttpClient, RequestData, ResponseData},
};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Replays expected requests against the provider under test. Holds the
/// client and base URL for the whole run; a provider failure on a single
/// attempt is a verification failure, so there are no retries here.
#[derive(Debug)]
pub struct ProviderInvoker {
    client: Arc<dyn HttpClient + Send + Sync>,
    base_url: Url,
}

impl ProviderInvoker {
    pub fn new(client: Arc<dyn HttpClient + Send + Sync>, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub async fn invoke(&self, expected: &InteractionRequest) -> Result<ResponseData, Error> {
        let request_data = self.build_request(expected)?;
        self.client.execute(&request_data).await
    }

    fn build_request(&self, expected: &InteractionRequest) -> Result<RequestData, Error> {
        let mut url = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            expected.path.trim_start_matches('/')
        );
        if let Some(query) = &expected.query {
            let query_string = query.to_query_string();
            if !query_string.is_empty() {
                url.push('?');
                url.push_str(&query_string);
            }
        }
        // round-trip through Url so a bad path in the pact fails here rather
        // than inside the client
        let url = Url::parse(&url)?;

        let mut headers = expected.headers.clone().unwrap_or_default();
        let body = match &expected.body {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(structured) => {
                if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                    headers.insert("Content-Type".to_string(), "application/json".to_string());
                }
                Some(structured.to_string())
            }
        };

        Ok(RequestData {
            method: expected.method.to_uppercase(),
            url: url.into(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Query;
    use serde_json::json;

    #[derive(Debug)]
    struct NoopClient;

    #[async_trait::async_trait]
    impl HttpClient for NoopClient {
        async fn execute(&self, _: &RequestData) -> Result<ResponseData, Error> {
            unimplemented!("request building tests never hit the wire")
        }
    }

    fn invoker() -> ProviderInvoker {
        ProviderInvoker::new(
            Arc::new(NoopClient),
            Url::parse("http://provider.internal:9292").unwrap(),
        )
    }

    fn request(path: &str, query: Option<Query>, body: Option<Value>) -> InteractionRequest {
        InteractionRequest {
            method: "get".to_string(),
            path: path.to_string(),
            query,
            headers: None,
            body,
        }
    }

    #[test]
    fn resolves_path_and_query_against_the_base_url() {
        let expected = request(
            "/invoices/17",
            Some(Query::Raw("full=true".to_string())),
            None,
        );

        let request_data = invoker().build_request(&expected).unwrap();
        assert_eq!(
            request_data.url,
            "http://provider.internal:9292/invoices/17?full=true"
        );
        assert_eq!(request_data.method, "GET");
        assert!(request_data.body.is_none());
    }

    #[test]
    fn structured_bodies_are_sent_as_json() {
        let expected = request("/invoices", None, Some(json!({ "total": "12.50" })));

        let request_data = invoker().build_request(&expected).unwrap();
        assert_eq!(request_data.body.as_deref(), Some(r#"{"total":"12.50"}"#));
        assert_eq!(
            request_data.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn text_bodies_are_sent_verbatim_without_a_default_content_type() {
        let expected = request("/notes", None, Some(json!("plain text payload")));

        let request_data = invoker().build_request(&expected).unwrap();
        assert_eq!(request_data.body.as_deref(), Some("plain text payload"));
        assert!(request_data.headers.is_empty());
    }
}
