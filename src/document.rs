use crate::error::Error;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// A parsed pact file: the interactions one consumer recorded against one
/// provider. Loaded once per verification run and never mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct PactDocument {
    pub consumer: Participant,
    pub provider: Participant,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub name: String,
}

/// One recorded request/response pair, optionally tagged with the provider
/// state that must be arranged before the request is replayed.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub description: String,
    // pact v1.1 writes provider_state, v2 writes providerState
    #[serde(default, alias = "providerState")]
    pub provider_state: Option<String>,
    pub request: InteractionRequest,
    pub response: InteractionResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionRequest {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: Option<Query>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default, rename = "matchingRules")]
    pub matching_rules: Option<HashMap<String, MatchingRule>>,
}

// pact files may omit the response status, which means 200
fn default_status() -> u16 {
    200
}

/// Query strings appear as a raw string in pact v1/v2 files and as a
/// name -> values map in v3 files.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Query {
    Raw(String),
    Map(HashMap<String, Vec<String>>),
}

impl Query {
    pub fn to_query_string(&self) -> String {
        match self {
            Query::Raw(raw) => raw.trim_start_matches('?').to_string(),
            Query::Map(map) => {
                let mut names: Vec<_> = map.keys().collect();
                names.sort();

                let mut pairs = Vec::new();
                for name in names {
                    for value in &map[name] {
                        pairs.push(format!("{}={}", name, value));
                    }
                }
                pairs.join("&")
            }
        }
    }
}

/// A matching rule attached to a `$.body...` or `$.headers...` path. Rules
/// take precedence over literal equality at their node.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingRule {
    #[serde(default, rename = "match")]
    pub match_kind: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub min: Option<usize>,
}

impl PactDocument {
    /// Checks the document is structurally usable before any interaction is
    /// replayed. Reports the first violation found.
    pub fn validate(&self) -> Result<(), Error> {
        if self.consumer.name.trim().is_empty() {
            return Err(Error::InvalidDocument(
                "consumer name is missing".to_string(),
            ));
        }
        if self.provider.name.trim().is_empty() {
            return Err(Error::InvalidDocument(
                "provider name is missing".to_string(),
            ));
        }

        for (index, interaction) in self.interactions.iter().enumerate() {
            if interaction.description.trim().is_empty() {
                return Err(Error::InvalidDocument(format!(
                    "interaction {} has no description",
                    index
                )));
            }
            if interaction.request.method.trim().is_empty() {
                return Err(Error::InvalidDocument(format!(
                    "interaction {:?} has no request method",
                    interaction.description
                )));
            }
            if interaction.request.path.trim().is_empty() {
                return Err(Error::InvalidDocument(format!(
                    "interaction {:?} has no request path",
                    interaction.description
                )));
            }
            if !(100..=599).contains(&interaction.response.status) {
                return Err(Error::InvalidDocument(format!(
                    "interaction {:?} has an invalid response status {}",
                    interaction.description, interaction.response.status
                )));
            }
        }

        Ok(())
    }
}
