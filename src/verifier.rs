use crate::{
    document::{Interaction, PactDocument},
    error::Error,
    http_client::HttpClient,
    invoker::ProviderInvoker,
    matching::{self, Mismatch},
    source::{BasicAuth, PactSource},
    state::{ActionError, StateCoordinator},
};
use std::{fmt, sync::Arc};
use tracing::{debug, info, warn};
use url::Url;

/// Why a single interaction failed, when the failure was not a content
/// mismatch. These never abort the run; they are collected per interaction.
#[derive(Debug, Clone)]
pub enum InteractionError {
    SetupFailed(String),
    TransportError(String),
    TeardownFailed(String),
}

impl fmt::Display for InteractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionError::SetupFailed(details) => write!(f, "state setup failed: {}", details),
            InteractionError::TransportError(details) => {
                write!(f, "provider call failed: {}", details)
            }
            InteractionError::TeardownFailed(details) => {
                write!(f, "state teardown failed: {}", details)
            }
        }
    }
}

/// The outcome of replaying one interaction against the provider.
#[derive(Debug)]
pub struct VerificationVerdict {
    pub description: String,
    pub provider_state: Option<String>,
    pub mismatches: Vec<Mismatch>,
    pub error: Option<InteractionError>,
}

impl VerificationVerdict {
    fn new(interaction: &Interaction) -> Self {
        Self {
            description: interaction.description.clone(),
            provider_state: interaction.provider_state.clone(),
            mismatches: Vec::new(),
            error: None,
        }
    }

    /// True when the interaction replayed cleanly and the response matched.
    pub fn matched(&self) -> bool {
        self.mismatches.is_empty() && self.error.is_none()
    }
}

/// Verifies recorded consumer interactions against a live provider.
///
/// Configuration is chained in any order and only validated once a
/// verification entry point runs, so a partially configured verifier can be
/// held on to and reused across runs with different filters.
///
/// ```no_run
/// use pactcheck::{HyperHttpClient, Verifier};
/// use std::sync::Arc;
/// use url::Url;
///
/// # async fn example() -> Result<(), pactcheck::Error> {
/// let mut verifier = Verifier::new()
///     .service_provider(
///         "billing-api",
///         Arc::new(HyperHttpClient::new()),
///         Url::parse("http://localhost:9292").unwrap(),
///     )
///     .honours_pact_with("billing-ui")
///     .pact_uri("./pacts/billing-ui-billing-api.json", None)
///     .provider_state(
///         "invoice 17 exists",
///         || Ok(()),
///         || Ok(()),
///     );
/// verifier.verify().await
/// # }
/// ```
#[derive(Debug)]
pub struct Verifier {
    provider: String,
    consumer: String,
    pact_uri: String,
    pact_auth: Option<BasicAuth>,
    invoker: Option<ProviderInvoker>,
    states: StateCoordinator,
    verdicts: Vec<VerificationVerdict>,
}

impl Verifier {
    pub fn new() -> Self {
        Self {
            provider: String::new(),
            consumer: String::new(),
            pact_uri: String::new(),
            pact_auth: None,
            invoker: None,
            states: StateCoordinator::new(),
            verdicts: Vec::new(),
        }
    }

    /// Names the provider under test and supplies the client and base URL
    /// used to reach it. Timeouts belong to the client, not the verifier.
    pub fn service_provider<S: Into<String>>(
        mut self,
        name: S,
        client: Arc<dyn HttpClient + Send + Sync>,
        base_url: Url,
    ) -> Self {
        self.provider = name.into();
        self.invoker = Some(ProviderInvoker::new(client, base_url));
        self
    }

    /// Names the consumer whose pact is being honoured.
    pub fn honours_pact_with<S: Into<String>>(mut self, consumer: S) -> Self {
        self.consumer = consumer.into();
        self
    }

    /// Points the verifier at the pact document: a local path, or an http(s)
    /// address with optional basic-auth credentials.
    pub fn pact_uri<S: Into<String>>(mut self, uri: S, auth: Option<BasicAuth>) -> Self {
        self.pact_uri = uri.into();
        self.pact_auth = auth;
        self
    }

    /// Registers the setup/teardown pair arranging the fixture for a
    /// provider-state label. Setup runs before the interaction's request is
    /// replayed, teardown after its response is matched.
    pub fn provider_state<S, F, G>(mut self, label: S, setup: F, teardown: G) -> Self
    where
        S: Into<String>,
        F: Fn() -> Result<(), ActionError> + Send + Sync + 'static,
        G: Fn() -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.states.register(label, Box::new(setup), Box::new(teardown));
        self
    }

    /// The per-interaction verdicts of the most recent run, in document
    /// order. This is where the detail behind `VerificationFailed` lives.
    pub fn verdicts(&self) -> &[VerificationVerdict] {
        &self.verdicts
    }

    /// Verifies every interaction in the pact.
    pub async fn verify(&mut self) -> Result<(), Error> {
        self.verify_state("", "").await
    }

    /// Verifies the interactions matching the given description and/or
    /// provider state; an empty string leaves that dimension unfiltered.
    pub async fn verify_state(&mut self, description: &str, state: &str) -> Result<(), Error> {
        self.verdicts.clear();
        self.check_preconditions()?;

        let invoker = self.invoker.as_ref().ok_or(Error::NotConfigured)?;

        let document = fetch_document(&self.pact_uri, self.pact_auth.clone()).await?;
        let selected = select_interactions(&document.interactions, description, state)?;

        info!(
            provider = %self.provider,
            consumer = %self.consumer,
            interactions = selected.len(),
            "starting verification run"
        );

        let mut verdicts = Vec::with_capacity(selected.len());
        for interaction in selected {
            info!(description = %interaction.description, "verifying interaction");
            let verdict = run_interaction(invoker, &self.states, interaction).await;

            for mismatch in &verdict.mismatches {
                warn!(description = %verdict.description, %mismatch, "response mismatch");
            }
            if let Some(error) = &verdict.error {
                warn!(description = %verdict.description, %error, "interaction failed");
            }

            verdicts.push(verdict);
        }

        let failed = verdicts.iter().filter(|verdict| !verdict.matched()).count();
        let total = verdicts.len();
        self.verdicts = verdicts;

        if failed == 0 {
            info!(total, "pact verified");
            Ok(())
        } else {
            warn!(failed, total, "pact verification failed");
            Err(Error::VerificationFailed)
        }
    }

    fn check_preconditions(&self) -> Result<(), Error> {
        if self.consumer.is_empty() {
            return Err(Error::EmptyConsumer);
        }
        if self.provider.is_empty() {
            return Err(Error::EmptyProvider);
        }
        self.can_validate()
    }

    // precondition hook, run once per run before any interaction: there has
    // to be a provider target to invoke
    fn can_validate(&self) -> Result<(), Error> {
        if self.invoker.is_none() {
            return Err(Error::NotConfigured);
        }
        Ok(())
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch_document(uri: &str, auth: Option<BasicAuth>) -> Result<PactDocument, Error> {
    let source = PactSource::from_uri(uri, auth);
    debug!(source = ?source, "fetching pact document");
    source.read().await
}

/// Conjunctive exact-match filtering; an empty filter string leaves that
/// dimension unfiltered. Document order is preserved.
fn select_interactions<'a>(
    interactions: &'a [Interaction],
    description: &str,
    state: &str,
) -> Result<Vec<&'a Interaction>, Error> {
    let selected: Vec<&Interaction> = interactions
        .iter()
        .filter(|interaction| description.is_empty() || interaction.description == description)
        .filter(|interaction| state.is_empty() || interaction.provider_state.as_deref() == Some(state))
        .collect();

    if (!description.is_empty() || !state.is_empty()) && selected.is_empty() {
        return Err(Error::NoMatchingInteractions);
    }

    Ok(selected)
}

async fn run_interaction(
    invoker: &ProviderInvoker,
    states: &StateCoordinator,
    interaction: &Interaction,
) -> VerificationVerdict {
    let mut verdict = VerificationVerdict::new(interaction);
    let label = interaction.provider_state.as_deref().unwrap_or("");

    if !label.is_empty() {
        if !states.has_action(label) {
            debug!(state = label, "no fixture registered for provider state");
        }
        if let Err(error) = states.setup(label) {
            // the request is never replayed and teardown is skipped
            verdict.error = Some(InteractionError::SetupFailed(error.to_string()));
            return verdict;
        }
    }

    match invoker.invoke(&interaction.request).await {
        Ok(actual) => verdict.mismatches = matching::match_response(&interaction.response, &actual),
        Err(error) => {
            verdict.error = Some(InteractionError::TransportError(error.to_string()))
        }
    }

    // teardown runs whenever setup succeeded, match or no match
    if !label.is_empty() {
        if let Err(error) = states.teardown(label) {
            warn!(state = label, error = %error, "teardown failed");
            if verdict.error.is_none() {
                verdict.error = Some(InteractionError::TeardownFailed(error.to_string()));
            }
        }
    }

    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{InteractionRequest, InteractionResponse};

    fn interaction(description: &str, state: Option<&str>) -> Interaction {
        Interaction {
            description: description.to_string(),
            provider_state: state.map(String::from),
            request: InteractionRequest {
                method: "GET".to_string(),
                path: "/".to_string(),
                query: None,
                headers: None,
                body: None,
            },
            response: InteractionResponse {
                status: 200,
                headers: None,
                body: None,
                matching_rules: None,
            },
        }
    }

    fn fixture() -> Vec<Interaction> {
        vec![
            interaction("a request for an invoice", Some("invoice 17 exists")),
            interaction("a request for an invoice", None),
            interaction("a request for a refund", Some("invoice 17 exists")),
        ]
    }

    #[test]
    fn no_filters_return_everything_in_order() {
        let interactions = fixture();
        let selected = select_interactions(&interactions, "", "").unwrap();

        let descriptions: Vec<_> = selected
            .iter()
            .map(|interaction| interaction.description.as_str())
            .collect();
        assert_eq!(
            descriptions,
            vec![
                "a request for an invoice",
                "a request for an invoice",
                "a request for a refund"
            ]
        );
    }

    #[test]
    fn no_filters_accept_an_empty_document() {
        assert!(select_interactions(&[], "", "").unwrap().is_empty());
    }

    #[test]
    fn filters_are_conjunctive() {
        let interactions = fixture();
        let selected =
            select_interactions(&interactions, "a request for an invoice", "invoice 17 exists")
                .unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(
            selected[0].provider_state.as_deref(),
            Some("invoice 17 exists")
        );
    }

    #[test]
    fn a_state_filter_alone_keeps_document_order() {
        let interactions = fixture();
        let selected = select_interactions(&interactions, "", "invoice 17 exists").unwrap();

        let descriptions: Vec<_> = selected
            .iter()
            .map(|interaction| interaction.description.as_str())
            .collect();
        assert_eq!(
            descriptions,
            vec!["a request for an invoice", "a request for a refund"]
        );
    }

    #[test]
    fn narrow_filters_fail_instead_of_silently_verifying_nothing() {
        let interactions = fixture();

        assert!(matches!(
            select_interactions(&interactions, "no such interaction", ""),
            Err(Error::NoMatchingInteractions)
        ));
        assert!(matches!(
            select_interactions(&interactions, "a request for a refund", "no such state"),
            Err(Error::NoMatchingInteractions)
        ));
    }

    #[tokio::test]
    async fn an_unnamed_consumer_fails_before_any_io() {
        let mut verifier = Verifier::new().pact_uri("/definitely/not/here.json", None);

        assert!(matches!(verifier.verify().await, Err(Error::EmptyConsumer)));
    }

    #[tokio::test]
    async fn an_unnamed_provider_fails_before_any_io() {
        let mut verifier = Verifier::new()
            .honours_pact_with("billing-ui")
            .pact_uri("/definitely/not/here.json", None);

        assert!(matches!(verifier.verify().await, Err(Error::EmptyProvider)));
    }

    #[tokio::test]
    async fn a_missing_provider_target_fails_the_precondition_check() {
        let mut verifier = Verifier::new()
            .honours_pact_with("billing-ui")
            .pact_uri("/definitely/not/here.json", None);
        verifier.provider = "billing-api".to_string();

        assert!(matches!(verifier.verify().await, Err(Error::NotConfigured)));
    }
}
