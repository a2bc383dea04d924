//! Gemini REST client: sends the analysis context (plus any file
//! attachments) and returns the raw five-section report text.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MODEL: &str = "gemini-3.1-pro-preview";
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
// Thinking plus live search can hold a single call open for minutes.
const REQUEST_TIMEOUT_SECS: u64 = 300;

const SYSTEM_INSTRUCTION: &str = r#"
You are a Strategic Market Intelligence Assistant. Your goal is to provide deep, evidence-based analysis of job markets, industry trends, and business opportunities, with a specific focus on comparing International trends with the Bangladesh market.

**MANDATORY OUTPUT SCHEMA:**
You must strictly follow this format. Do not add other sections.

SECTION 1 — VERIFIED FACTS
- Fact ID: [F-001, F-002, ...]
- Statement: [State a verified trend or data point. Include Global trends and Bangladesh-specific data here. Label them as (Global) or (Bangladesh).]
- Source(s): [Source: Domain/Doc | Date]

SECTION 2 — DATA GAPS
- Missing Field: [What specific data is missing to make a complete decision?]
- Why Required:
- Impact if Absent:

SECTION 3 — DECISION RECOMMENDATIONS
- Recommendation ID: [R-001, R-002, ...]
- Priority: [HIGH / MEDIUM / LOW]
- Decision Statement: [Strategic recommendation based on Section 1. Address Global opportunities and Bangladesh context.]
- Supporting Facts (Fact IDs): [e.g., F-001, F-003]
- Source(s):
- Status: [APPROVED / BLOCKED – INSUFFICIENT DATA]

SECTION 4 — ASSUMPTIONS
- ONLY include if explicitly requested or if critical for a recommendation.
- Assumption Statement:
- Justification Source:
- Risk Level:

SECTION 5 — AUDIT DECLARATION
"I confirm that no content above was generated without direct source support."

**Analysis Rules:**
1.  **Global vs. Bangladesh:** In Section 1, ensure you cover both International trends and the Bangladesh local market context.
2.  **Search:** Use Google Search to find the latest 2024-2025 data.
3.  **Files:** Analyze any uploaded files.
"#;

/// A file attached to the analysis request, base64-encoded for inline upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<&'a Attachment>,
}

impl<'a> Part<'a> {
    fn text(text: String) -> Self {
        Part {
            text: Some(text),
            inline_data: None,
        }
    }

    fn inline(attachment: &'a Attachment) -> Self {
        Part {
            text: None,
            inline_data: Some(attachment),
        }
    }
}

#[derive(Debug, Serialize)]
struct Tool {
    #[serde(rename = "googleSearch")]
    google_search: GoogleSearch,
}

// Serializes as {}; presence of the key is what enables grounding.
#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_level: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate; empty when the model
    /// returned nothing usable.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Pull the human-readable message out of an error body, falling back to the
/// raw text when it is not the structured shape.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

fn build_request<'a>(context: &str, attachments: &'a [Attachment]) -> Result<GenerateRequest<'a>> {
    let mut parts = Vec::with_capacity(attachments.len() + 1);

    if !context.trim().is_empty() {
        parts.push(Part::text(format!(
            "Analyze the following context/request with a focus on International and Bangladesh market trends:\n\n{}",
            context
        )));
    }
    for attachment in attachments {
        parts.push(Part::inline(attachment));
    }

    if parts.is_empty() {
        bail!("No context or files provided for analysis");
    }

    Ok(GenerateRequest {
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
        system_instruction: Content {
            role: None,
            parts: vec![Part::text(SYSTEM_INSTRUCTION.to_string())],
        },
        tools: vec![Tool {
            google_search: GoogleSearch {},
        }],
        generation_config: GenerationConfig {
            thinking_config: ThinkingConfig {
                thinking_level: "HIGH",
            },
        },
    })
}

/// Run one analysis call and return the raw report text.
pub async fn generate_report(context: &str, attachments: &[Attachment]) -> Result<String> {
    let api_key = std::env::var("GEMINI_API_KEY")
        .map_err(|_| anyhow!("GEMINI_API_KEY environment variable must be set"))?;

    let request = build_request(context, attachments)?;
    let client = Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;

    let response = post_with_retry(&client, &api_key, &request).await?;

    if let Some(usage) = &response.usage_metadata {
        debug!(
            "Gemini call succeeded: prompt_tokens={}, output_tokens={}, total={}",
            usage.prompt_token_count.unwrap_or(0),
            usage.candidates_token_count.unwrap_or(0),
            usage.total_token_count.unwrap_or(0)
        );
    }

    let report = response.text();
    if report.trim().is_empty() {
        bail!("Gemini returned an empty report");
    }
    Ok(report)
}

/// POST the request, retrying transport failures, 429s and 5xx responses
/// with exponential backoff. Other error statuses fail immediately.
async fn post_with_retry(
    client: &Client,
    api_key: &str,
    request: &GenerateRequest<'_>,
) -> Result<GenerateResponse> {
    let url = format!("{}/{}:generateContent", API_BASE, MODEL);
    let mut last_error: Option<anyhow::Error> = None;

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt - 1));
            warn!(
                "Gemini call failed (attempt {}/{}), backing off {:.1}s",
                attempt,
                MAX_RETRIES,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
        }

        let response = match client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(e.into());
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            last_error = Some(anyhow!(
                "Gemini API returned {}: {}",
                status,
                api_error_message(&body)
            ));
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "Gemini API error (status {}): {}",
                status.as_u16(),
                api_error_message(&body)
            );
        }

        return Ok(response.json().await?);
    }

    Err(last_error.unwrap_or_else(|| anyhow!("Gemini call failed after {} retries", MAX_RETRIES)))
}

/// Read a file from disk into an inline attachment.
pub fn load_attachment(path: &Path) -> Result<Attachment> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read attachment {}", path.display()))?;
    Ok(Attachment {
        mime_type: mime_for(path).to_string(),
        data: STANDARD.encode(&bytes),
    })
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "text/plain",
    }
}
