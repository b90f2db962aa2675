//! Image analysis endpoint logic: input validation, SSRF-guarded image
//! fetching and prompt construction for the vision model.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use gemini_client::json::extract_json;
use gemini_client::Gemini;
use timelineforge_common::{is_valid_external_url, AnalysisType};

use crate::error::{ApiError, ApiResult};

const MAX_URL_LEN: usize = 2000;
const MAX_BASE64_LEN: usize = 10 * 1024 * 1024; // 10MB
const MAX_PROMPT_LEN: usize = 1000;
const MAX_CLAIM_LEN: usize = 500;

#[derive(Debug, Deserialize)]
pub struct VisionRequest {
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
    pub prompt: Option<String>,
    pub analysis_type: AnalysisType,
    pub claim: Option<String>,
}

pub fn validate(req: &VisionRequest) -> ApiResult<()> {
    if req.image_url.is_none() && req.image_base64.is_none() {
        return Err(ApiError::validation(
            "Either image_url or image_base64 is required",
        ));
    }
    if let Some(url) = &req.image_url {
        if url.len() > MAX_URL_LEN {
            return Err(ApiError::validation("image_url exceeds 2000 characters"));
        }
    }
    if let Some(b64) = &req.image_base64 {
        if b64.len() > MAX_BASE64_LEN {
            return Err(ApiError::validation("image_base64 exceeds 10MB"));
        }
    }
    if req.prompt.as_ref().is_some_and(|p| p.len() > MAX_PROMPT_LEN) {
        return Err(ApiError::validation("prompt exceeds 1000 characters"));
    }
    if req.claim.as_ref().is_some_and(|c| c.len() > MAX_CLAIM_LEN) {
        return Err(ApiError::validation("claim exceeds 500 characters"));
    }
    Ok(())
}

/// System prompt for the requested analysis type. `description` and `region`
/// share the comprehensive variant.
pub fn system_prompt(analysis_type: AnalysisType, claim: Option<&str>) -> String {
    match analysis_type {
        AnalysisType::Detection => "You are an expert image analyst. Analyze this image and detect all notable objects, people, text, and elements.

For each detected element, provide:
1. A descriptive label
2. Confidence score (0-1)
3. Bounding box in format [y_min, x_min, y_max, x_max] where values are normalized (0-1)
4. A brief description of the element

Return your response as JSON with this structure:
{
  \"objects_detected\": [
    {
      \"label\": \"string\",
      \"confidence\": number,
      \"bounding_box\": [y_min, x_min, y_max, x_max],
      \"description\": \"string\"
    }
  ]
}"
        .to_string(),
        AnalysisType::Credibility => {
            let claim_line = claim
                .map(|c| format!("This image is being used to support the following claim: \"{c}\""))
                .unwrap_or_default();
            format!(
                "You are an expert at analyzing image authenticity and credibility. Examine this image for:
1. Signs of manipulation or editing
2. Metadata inconsistencies
3. Lighting and shadow analysis
4. Context plausibility
5. Source reliability indicators

{claim_line}

Return your response as JSON with this structure:
{{
  \"credibility_assessment\": {{
    \"score\": number (0-100),
    \"factors\": [\"list of factors that increase credibility\"],
    \"warnings\": [\"list of concerns or red flags\"]
  }},
  \"cross_validation_flags\": [\"items that should be independently verified\"]
}}"
            )
        }
        AnalysisType::Description | AnalysisType::Region => {
            let claim_line = claim
                .map(|c| format!("Consider this claim when analyzing: \"{c}\""))
                .unwrap_or_default();
            format!(
                "You are an expert visual evidence analyst. Provide a comprehensive analysis of this image including:
1. Detailed description of what's shown
2. Key objects and their significance
3. Any text visible in the image
4. Context and setting
5. Potential narrative implications

{claim_line}

Return your response as JSON with this structure:
{{
  \"description\": \"detailed description\",
  \"objects_detected\": [{{\"label\": \"string\", \"confidence\": number, \"bounding_box\": [y_min, x_min, y_max, x_max], \"description\": \"string\"}}],
  \"credibility_assessment\": {{\"score\": number, \"factors\": [], \"warnings\": []}},
  \"narrative_relevance\": {{\"supports\": [], \"contradicts\": [], \"neutral\": []}},
  \"cross_validation_flags\": []
}}"
            )
        }
    }
}

/// Run the full vision flow: resolve the image to base64, call the model,
/// parse its reply. An unparseable reply degrades to a basic analysis object
/// carrying the raw text.
pub async fn analyze(gemini: &Gemini, http: &reqwest::Client, req: VisionRequest) -> ApiResult<Value> {
    validate(&req)?;

    info!(analysis_type = ?req.analysis_type, "Vision: analyzing image");

    let (mime_type, image_base64) = match (req.image_base64, &req.image_url) {
        (Some(b64), _) => ("image/jpeg".to_string(), b64),
        (None, Some(url)) => {
            // SSRF protection: validate before fetching.
            if !is_valid_external_url(url) {
                return Err(ApiError::validation("Invalid or disallowed URL"));
            }
            fetch_image(http, url).await?
        }
        (None, None) => unreachable!("validated above"),
    };

    let system = system_prompt(req.analysis_type, req.claim.as_deref());
    let reply = gemini
        .analyze_image(&system, &mime_type, &image_base64, req.prompt.as_deref())
        .await
        .map_err(|e| ApiError::upstream(e.to_string()))?;

    let analysis = extract_json::<Value>(&reply).unwrap_or_else(|| {
        warn!("Vision: reply was not valid JSON, returning basic analysis");
        fallback_analysis(&reply)
    });

    Ok(analysis)
}

async fn fetch_image(http: &reqwest::Client, url: &str) -> ApiResult<(String, String)> {
    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| ApiError::upstream(format!("image fetch failed: {e}")))?;

    let mime_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| ApiError::upstream(format!("image fetch failed: {e}")))?;

    Ok((mime_type, STANDARD.encode(&bytes)))
}

fn fallback_analysis(raw: &str) -> Value {
    json!({
        "description": raw,
        "objects_detected": [],
        "credibility_assessment": { "score": 50, "factors": [], "warnings": ["Analysis parsing failed"] },
        "narrative_relevance": { "supports": [], "contradicts": [], "neutral": [] },
        "cross_validation_flags": [],
    })
}
