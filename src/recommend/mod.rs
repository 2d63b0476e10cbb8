//! Meal recommendations from an external language model.
//!
//! A meal save builds a [`RecommendationContext`] from the patient's clinical
//! profile, sends it through a [`RecommendationClient`] and turns the reply
//! into [`DerivedFields`]. [`assess`] never fails: anything that goes wrong
//! on the way degrades to [`DerivedFields::unavailable`].

pub mod client;
pub mod context;
pub mod parser;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub use client::HttpRecommender;
pub use context::RecommendationContext;
pub use parser::{parse_recommendation, parse_token_usage};

/// Insulin name stored when no recommendation could be obtained.
pub const UNAVAILABLE_INSULIN: &str = "unavailable";

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request to recommendation service failed: {0}")]
    Transport(String),

    #[error("recommendation service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected recommendation service response: {0}")]
    Response(String),
}

/// Raw reply of the model plus its token usage summary (`"<label> <count>"`).
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub usage: String,
}

#[async_trait]
pub trait RecommendationClient: Send + Sync {
    async fn generate(&self, ctx: &RecommendationContext) -> Result<Completion, LlmError>;
}

/// Values persisted on a meal record after the model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedFields {
    pub total_carbs: i32,
    pub total_calories: i32,
    pub insulin_units: i32,
    pub insulin_name: String,
}

impl DerivedFields {
    pub fn unavailable() -> Self {
        Self {
            total_carbs: 0,
            total_calories: 0,
            insulin_units: 0,
            insulin_name: UNAVAILABLE_INSULIN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub fields: DerivedFields,
    pub tokens_used: i32,
}

/// Call the model and turn its reply into derived meal fields.
pub async fn assess(client: &dyn RecommendationClient, ctx: &RecommendationContext) -> Assessment {
    let completion = match client.generate(ctx).await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "recommendation call failed; storing meal without estimate");
            return Assessment {
                fields: DerivedFields::unavailable(),
                tokens_used: 0,
            };
        }
    };

    let tokens_used = parse_token_usage(&completion.usage);

    let fields = match parse_recommendation(&completion.text) {
        Ok(rec) => {
            debug!(
                foods = rec.foods.len(),
                carbs = rec.fields.total_carbs,
                insulin_units = rec.fields.insulin_units,
                "recommendation parsed"
            );
            rec.fields
        }
        Err(e) => {
            warn!(error = %e, tokens_used, "unusable recommendation; storing meal without estimate");
            DerivedFields::unavailable()
        }
    };

    Assessment {
        fields,
        tokens_used,
    }
}

/// Client that replays a fixed outcome, for tests.
#[cfg(test)]
pub struct MockRecommender {
    outcome: Result<Completion, String>,
    seen: std::sync::Mutex<Vec<RecommendationContext>>,
}

#[cfg(test)]
impl MockRecommender {
    pub fn replying(text: &str, usage: &str) -> Self {
        Self {
            outcome: Ok(Completion {
                text: text.to_string(),
                usage: usage.to_string(),
            }),
            seen: Default::default(),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(reason.to_string()),
            seen: Default::default(),
        }
    }

    pub fn seen(&self) -> Vec<RecommendationContext> {
        self.seen.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl RecommendationClient for MockRecommender {
    async fn generate(&self, ctx: &RecommendationContext) -> Result<Completion, LlmError> {
        self.seen.lock().unwrap().push(ctx.clone());
        self.outcome.clone().map_err(LlmError::Transport)
    }
}
