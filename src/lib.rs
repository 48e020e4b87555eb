//! Provider-side verification of consumer-driven contract ("pact") files:
//! fetch a recorded pact, replay each interaction against a live provider
//! and structurally match the actual responses against the recorded ones.

mod document;
mod error;
mod http_client;
mod invoker;
mod matching;
mod source;
mod state;
mod verifier;

pub use document::{
    Interaction, InteractionRequest, InteractionResponse, MatchingRule, PactDocument, Participant,
    Query,
};
pub use error::Error;
pub use http_client::{HttpClient, HyperHttpClient, RequestData, ResponseData};
pub use invoker::ProviderInvoker;
pub use matching::Mismatch;
pub use source::{BasicAuth, PactSource};
pub use state::{Action, ActionError, StateCoordinator};
pub use verifier::{InteractionError, VerificationVerdict, Verifier};
