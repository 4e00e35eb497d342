//! OpenRouter-backed collaborators.
//!
//! One HTTP client implements all three capability interfaces against an
//! OpenAI-compatible chat-completions endpoint. The base URL is
//! overridable so tests can point the agent at a mock server.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use listscout_corpus::Taxonomy;
use listscout_shared::{ListScoutError, ProjectIdea, ResearchPlan, Resource, Result};

use crate::extract;
use crate::traits::{IdeaWriter, Planner, Searcher};

/// Default OpenRouter API base.
const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";

/// User-Agent string for collaborator requests.
const USER_AGENT: &str = concat!("ListScout/", env!("CARGO_PKG_VERSION"));

/// How many existing items per category to include as planning context.
const SAMPLE_ITEMS: usize = 5;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

// ---------------------------------------------------------------------------
// OpenRouterAgent
// ---------------------------------------------------------------------------

/// LLM collaborator speaking the OpenAI-compatible chat protocol.
pub struct OpenRouterAgent {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterAgent {
    /// Create an agent for the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ListScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENROUTER_API_URL.to_string(),
        })
    }

    /// Override the API base URL (for tests against a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| ListScoutError::Agent(format!("invalid API key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Send one chat exchange and return the assistant text.
    #[instrument(skip_all, fields(model = %self.model))]
    async fn chat(&self, system: &str, user: String) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        debug!(%url, "chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| ListScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ListScoutError::Agent(format!(
                "chat API error ({status}): {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ListScoutError::Agent(format!("invalid chat response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ListScoutError::Agent("empty chat response".into()))
    }
}

// ---------------------------------------------------------------------------
// Prompt building
// ---------------------------------------------------------------------------

const PLANNER_SYSTEM: &str = "You are a research planner for a curated catalog of resources. \
Given the category structure and samples of existing entries, select a diverse set of priority \
categories and effective search terms for each. Respond with JSON only.";

const SEARCHER_SYSTEM: &str = "You are a resource searcher for a curated catalog. Find specific, \
high-quality resources with DIRECT URLs to content. Never return search result pages, listings, \
or vague collections. Respond with a JSON array only.";

const WRITER_SYSTEM: &str = "You generate practical project ideas grounded in a category's \
existing entries and newly found resources. Respond with a JSON array only.";

fn planner_prompt(taxonomy: &Taxonomy) -> String {
    let categories: Vec<serde_json::Value> = taxonomy
        .category_ids()
        .iter()
        .filter_map(|id| taxonomy.category(id))
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "title": c.title,
                "parent": c.parent,
                "children": c.children,
                "description": c.description,
                "existing_items": taxonomy.items_for(&c.id).len(),
            })
        })
        .collect();

    let samples: Vec<&Resource> = taxonomy
        .category_ids()
        .iter()
        .flat_map(|id| taxonomy.sample_items(id, 1))
        .take(SAMPLE_ITEMS)
        .collect();

    format!(
        "Category structure:\n{}\n\nSample of existing entries:\n{}\n\n\
         Create a research plan covering 8-12 diverse categories with 2-3 search terms each.\n\
         Return a JSON object: {{\"priority_categories\": [category ids], \
         \"search_terms\": {{category id: [terms]}}}}",
        serde_json::to_string_pretty(&categories).unwrap_or_default(),
        serde_json::to_string_pretty(&samples).unwrap_or_default(),
    )
}

fn searcher_prompt(term: &str, category: &str) -> String {
    format!(
        "Search for resources matching '{term}' for the catalog category '{category}'.\n\
         Find 3-5 specific resources with direct URLs (repositories, documentation, \
         technical articles, tool homepages). Do NOT include search result pages such as \
         google.com/search or youtube.com/results.\n\
         Return a JSON array of objects: \
         {{\"title\": ..., \"url\": ..., \"description\": ..., \
         \"category\": \"{category}\", \"tags\": [...]}}"
    )
}

fn writer_prompt(category: &str, existing: &[Resource], fresh: &[Resource]) -> String {
    let sample_existing = &existing[..existing.len().min(3)];
    let sample_fresh = &fresh[..fresh.len().min(3)];
    format!(
        "Generate 3 project ideas for the category '{category}'.\n\
         Existing entries: {}\n\
         Newly found resources: {}\n\
         Return a JSON array of objects: \
         {{\"title\": ..., \"description\": ..., \"category\": \"{category}\", \"tags\": [...]}}",
        serde_json::to_string(sample_existing).unwrap_or_default(),
        serde_json::to_string(sample_fresh).unwrap_or_default(),
    )
}

// ---------------------------------------------------------------------------
// Capability impls
// ---------------------------------------------------------------------------

#[async_trait]
impl Planner for OpenRouterAgent {
    async fn plan(&self, taxonomy: &Taxonomy) -> Result<ResearchPlan> {
        let text = self.chat(PLANNER_SYSTEM, planner_prompt(taxonomy)).await?;
        extract::json_object(&text)
    }
}

#[async_trait]
impl Searcher for OpenRouterAgent {
    async fn search(&self, term: &str, category: &str) -> Result<Vec<Resource>> {
        let text = self
            .chat(SEARCHER_SYSTEM, searcher_prompt(term, category))
            .await?;
        extract::json_array(&text)
    }
}

#[async_trait]
impl IdeaWriter for OpenRouterAgent {
    async fn generate_ideas(
        &self,
        category: &str,
        existing: &[Resource],
        fresh: &[Resource],
    ) -> Result<Vec<ProjectIdea>> {
        let text = self
            .chat(WRITER_SYSTEM, writer_prompt(category, existing, fresh))
            .await?;
        extract::json_array(&text)
    }
}
