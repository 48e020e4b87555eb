use hyper::http;
use std::fmt::Display;

#[derive(Debug)]
pub enum Error {
    EmptyConsumer,
    EmptyProvider,
    NotConfigured,
    NoMatchingInteractions,
    VerificationFailed,
    SourceUnavailable(String),
    MalformedDocument(serde_json::Error),
    InvalidDocument(String),
    InvalidHeaderName,
    InvalidHeaderValue,
    ParseUriError(url::ParseError),
    HyperError(hyper::Error),
    HttpError(http::Error),
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::EmptyConsumer => write!(
                f,
                "Consumer name cannot be empty, provide a value using honours_pact_with"
            ),
            Error::EmptyProvider => write!(
                f,
                "Provider name cannot be empty, provide a value using service_provider"
            ),
            Error::NotConfigured => write!(f, "The provider service hasn't been configured"),
            Error::NoMatchingInteractions => write!(
                f,
                "The description and/or provider state filter yielded no interactions"
            ),
            Error::VerificationFailed => write!(
                f,
                "Failed to verify the pact, see the log for more details"
            ),
            Error::SourceUnavailable(details) => write!(f, "Pact source unavailable: {}", details),
            Error::MalformedDocument(e) => write!(f, "The pact document is not valid JSON: {}", e),
            Error::InvalidDocument(details) => write!(f, "Invalid pact document: {}", details),
            Error::InvalidHeaderName => write!(f, "Invalid header name"),
            Error::InvalidHeaderValue => write!(f, "Invalid header value"),
            Error::ParseUriError(e) => write!(f, "Parse URI Error: {}", e),
            Error::HyperError(e) => write!(f, "Hyper error: {}", e),
            Error::HttpError(e) => write!(f, "Http Error: {}", e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedDocument(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::ParseUriError(e)
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Error::HyperError(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::HttpError(e)
    }
}
