// Fit oracle implementation using OpenAI
//
// This is the infrastructure implementation of podcache::FitOracle.
// The oracle is treated as fallible: its free-text response is parsed
// defensively by extracting the first JSON object, and anything
// unusable comes back as Ok(None) so the caller can mark the pair
// attempted without failing the invocation.

use async_trait::async_trait;
use regex::Regex;
use rig::completion::Prompt;
use rig::providers::openai;
use serde::Deserialize;
use std::sync::OnceLock;

use podcache::error::{CacheError, Result};
use podcache::traits::FitOracle;
use podcache::types::{ConsumerProfile, FitAnalysis, PitchAngle, PodcastSnapshot};

/// OpenAI implementation of the scoring oracle
#[derive(Clone)]
pub struct OpenAIClient {
    client: openai::Client,
}

/// The JSON shape the prompt asks for.
#[derive(Debug, Deserialize)]
struct FitPayload {
    clean_description: String,
    fit_reasons: Vec<String>,
    #[serde(default)]
    pitch_angles: Vec<PitchAngle>,
}

impl OpenAIClient {
    pub fn new(api_key: String) -> Self {
        let client = openai::Client::new(&api_key);
        Self { client }
    }

    fn build_prompt(podcast: &PodcastSnapshot, consumer: &ConsumerProfile) -> String {
        let categories = podcast
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "You are helping a podcast booking agency evaluate guest placements.\n\n\
             PODCAST\n\
             Name: {name}\n\
             Publisher: {publisher}\n\
             Categories: {categories}\n\
             Description: {description}\n\n\
             GUEST\n\
             Name: {consumer_name}\n\
             Bio: {consumer_bio}\n\n\
             Respond with ONLY a JSON object in this exact shape:\n\
             {{\n\
               \"clean_description\": \"one tight paragraph describing the podcast\",\n\
               \"fit_reasons\": [\"3 to 4 short reasons this guest fits this show\"],\n\
               \"pitch_angles\": [{{\"title\": \"...\", \"description\": \"...\"}}] // exactly 3\n\
             }}",
            name = podcast.name.as_deref().unwrap_or(&podcast.upstream_id),
            publisher = podcast.publisher.as_deref().unwrap_or("unknown"),
            categories = if categories.is_empty() { "unknown".to_string() } else { categories },
            description = podcast.description.as_deref().unwrap_or(""),
            consumer_name = consumer.name,
            consumer_bio = consumer.bio,
        )
    }
}

/// Extract the first JSON object embedded in free text.
///
/// LLMs wrap answers in prose or markdown fences despite instructions;
/// greedily matching brace-to-brace recovers the object either way.
fn extract_first_json_object(text: &str) -> Option<&str> {
    static JSON_OBJECT: OnceLock<Regex> = OnceLock::new();
    let re = JSON_OBJECT.get_or_init(|| {
        Regex::new(r"(?s)\{.*\}").expect("JSON object regex is valid")
    });
    re.find(text).map(|m| m.as_str())
}

fn parse_fit_response(response: &str) -> Option<FitAnalysis> {
    let raw = extract_first_json_object(response)?;
    let payload: FitPayload = match serde_json::from_str(raw) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Oracle returned JSON that does not match the fit contract");
            return None;
        }
    };

    if payload.fit_reasons.is_empty() {
        tracing::warn!("Oracle returned no fit reasons");
        return None;
    }

    Some(FitAnalysis {
        clean_description: payload.clean_description,
        fit_reasons: payload.fit_reasons,
        pitch_angles: payload.pitch_angles,
    })
}

#[async_trait]
impl FitOracle for OpenAIClient {
    async fn analyze_fit(
        &self,
        podcast: &PodcastSnapshot,
        consumer: &ConsumerProfile,
    ) -> Result<Option<FitAnalysis>> {
        let prompt = Self::build_prompt(podcast, consumer);

        tracing::debug!(
            upstream_id = %podcast.upstream_id,
            consumer_id = %consumer.id,
            prompt_length = prompt.len(),
            "Calling OpenAI for fit analysis"
        );

        let agent = self
            .client
            .agent(openai::GPT_4O)
            .preamble("You are a podcast booking analyst. Answer with JSON only.")
            .max_tokens(2048)
            .build();

        let response = agent
            .prompt(prompt.as_str())
            .await
            .map_err(|e| CacheError::oracle(e.to_string()))?;

        tracing::debug!(
            upstream_id = %podcast.upstream_id,
            response_length = response.len(),
            "OpenAI fit response received"
        );

        Ok(parse_fit_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_object_from_markdown_fence() {
        let response = "Here you go:\n```json\n{\"clean_description\": \"A show.\", \"fit_reasons\": [\"a\", \"b\", \"c\"], \"pitch_angles\": []}\n```\nHope that helps!";
        let analysis = parse_fit_response(response).unwrap();

        assert_eq!(analysis.clean_description, "A show.");
        assert_eq!(analysis.fit_reasons.len(), 3);
    }

    #[test]
    fn test_extracts_bare_object() {
        let response = r#"{"clean_description": "X", "fit_reasons": ["r1"], "pitch_angles": [{"title": "t", "description": "d"}]}"#;
        let analysis = parse_fit_response(response).unwrap();

        assert_eq!(analysis.pitch_angles[0].title, "t");
    }

    #[test]
    fn test_prose_without_json_is_unusable() {
        assert!(parse_fit_response("I cannot help with that request.").is_none());
    }

    #[test]
    fn test_wrong_shape_is_unusable() {
        assert!(parse_fit_response(r#"{"answer": 42}"#).is_none());
    }

    #[test]
    fn test_empty_fit_reasons_is_unusable() {
        let response = r#"{"clean_description": "X", "fit_reasons": [], "pitch_angles": []}"#;
        assert!(parse_fit_response(response).is_none());
    }

    #[test]
    fn test_prompt_includes_podcast_and_consumer() {
        let podcast = PodcastSnapshot::new("pd_1").with_name("The Startup Hour");
        let consumer = ConsumerProfile::new("c1", "Dana Smith", "Fractional CFO for SaaS");

        let prompt = OpenAIClient::build_prompt(&podcast, &consumer);
        assert!(prompt.contains("The Startup Hour"));
        assert!(prompt.contains("Dana Smith"));
        assert!(prompt.contains("Fractional CFO"));
    }
}
