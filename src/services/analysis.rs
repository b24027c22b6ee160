use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::analysis::{ImagePayload, WasteAnalysis};
use crate::models::submissions::{Quantity, WasteType, MAX_POINTS, MIN_POINTS};
use crate::repositories::analysis::{UpstreamError, VisionModel};

/// Point ranges the model is asked to follow, per category.
const POINT_RUBRIC: [(&str, u8, u8, &str); 8] = [
    ("Electronic waste", 8, 15, "high value, needs special handling"),
    ("Metal", 6, 12, "highly recyclable"),
    ("Glass", 5, 10, "recyclable but heavy"),
    ("Plastic", 3, 8, "varies by type"),
    ("Paper", 2, 6, "easily recyclable"),
    ("Organic", 1, 4, "compostable"),
    ("Textile", 2, 7, "depends on condition"),
    ("Other", 1, 5, "case by case"),
];

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Vision model is not configured: {0}")]
    Configuration(String),
    #[error("Vision model authentication failed: {0}")]
    UpstreamAuthentication(String),
    #[error("Vision model quota exceeded: {0}")]
    UpstreamQuota(String),
}

impl From<ClassifierError> for ServiceError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::Configuration(_) => {
                ServiceError::Configuration("AI service not configured".to_string())
            }
            ClassifierError::UpstreamAuthentication(detail) => {
                ServiceError::UpstreamAuthentication(detail)
            }
            ClassifierError::UpstreamQuota(detail) => ServiceError::UpstreamQuota(detail),
        }
    }
}

pub fn build_prompt() -> String {
    let categories = WasteType::ALL
        .iter()
        .map(WasteType::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let rubric = POINT_RUBRIC
        .iter()
        .map(|(label, low, high, note)| format!("- {}: {}-{} points ({})", label, low, high, note))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze this waste image and provide the following information in JSON format:
{{
  "wasteType": "category of waste ({categories})",
  "quantity": "estimated quantity (small, medium, large)",
  "confidence": "confidence level as a number between 0-100",
  "estimatedPoints": "points to award ({MIN_POINTS}-{MAX_POINTS} based on recyclability and environmental impact)",
  "description": "brief description of what you see"
}}

Consider these point values:
{rubric}

Quantity multipliers:
- Small: base points
- Medium: base points x 1.5
- Large: base points x 2

Please respond with ONLY the JSON object, no additional text."#
    )
}

/// Accepts JSON numbers and numeric strings.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    number.filter(|number| number.is_finite())
}

/// Pulls the first `{` .. last `}` span out of model text, optionally fenced
/// in markdown, and turns it into a clamped analysis.
pub fn parse_analysis(text: &str) -> Result<WasteAnalysis, String> {
    let mut clean = text.trim();
    clean = clean
        .strip_prefix("```json")
        .or_else(|| clean.strip_prefix("```"))
        .unwrap_or(clean)
        .trim();
    clean = clean.strip_suffix("```").unwrap_or(clean);

    let start = clean.find('{').ok_or("Response contains no JSON object")?;
    let end = clean
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or("Response contains no JSON object")?;

    let value: Value = serde_json::from_str(&clean[start..=end])
        .map_err(|e| format!("Could not parse AI response as JSON: {}", e))?;

    let field = |name: &str| value.get(name).filter(|v| !v.is_null());
    let (Some(waste_type), Some(quantity), Some(confidence), Some(points)) = (
        field("wasteType"),
        field("quantity"),
        field("confidence"),
        field("estimatedPoints"),
    ) else {
        return Err("Invalid AI response structure".to_string());
    };

    let waste_type = waste_type
        .as_str()
        .ok_or("wasteType is not a string")?
        .parse::<WasteType>()
        .unwrap_or(WasteType::Other);
    let quantity = quantity
        .as_str()
        .ok_or("quantity is not a string")?
        .parse::<Quantity>()
        .unwrap_or(Quantity::Medium);
    let confidence = coerce_number(confidence).ok_or("confidence is not a number")?;
    let points = coerce_number(points).ok_or("estimatedPoints is not a number")?;

    Ok(WasteAnalysis {
        waste_type,
        quantity,
        confidence: confidence.clamp(0.0, 100.0).round() as u8,
        estimated_points: points.clamp(MIN_POINTS as f64, MAX_POINTS as f64).round() as i32,
        description: field("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Classifies waste images through a vision model. Only configuration,
/// authentication and quota problems surface as errors; any other failure
/// yields [`WasteAnalysis::fallback`].
#[derive(Clone)]
pub struct WasteClassifier {
    model: Arc<dyn VisionModel>,
    prompt: Arc<str>,
}

impl WasteClassifier {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self {
            model,
            prompt: build_prompt().into(),
        }
    }

    pub async fn classify(&self, image: &ImagePayload) -> Result<WasteAnalysis, ClassifierError> {
        if !self.model.is_configured() {
            return Err(ClassifierError::Configuration(
                "GEMINI_API_KEY is not configured".to_string(),
            ));
        }

        log::info!("Analyzing {} waste image.", image.mime_type);
        let text = match self.model.generate(&self.prompt, image).await {
            Ok(text) => text,
            Err(UpstreamError::Authentication(detail)) => {
                return Err(ClassifierError::UpstreamAuthentication(detail))
            }
            Err(UpstreamError::Quota(detail)) => return Err(ClassifierError::UpstreamQuota(detail)),
            Err(UpstreamError::Other(detail)) => {
                log::warn!("Vision model failed, using fallback analysis: {}", detail);
                return Ok(WasteAnalysis::fallback());
            }
        };

        log::debug!("Raw vision model response: {}", text);
        match parse_analysis(&text) {
            Ok(analysis) => Ok(analysis),
            Err(e) => {
                log::warn!("Unusable vision model response, using fallback analysis: {}", e);
                Ok(WasteAnalysis::fallback())
            }
        }
    }
}

pub enum AnalysisRequest {
    Classify {
        image: ImagePayload,
        response: oneshot::Sender<Result<WasteAnalysis, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct AnalysisRequestHandler {
    classifier: WasteClassifier,
}

impl AnalysisRequestHandler {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        AnalysisRequestHandler {
            classifier: WasteClassifier::new(model),
        }
    }
}

#[async_trait]
impl RequestHandler<AnalysisRequest> for AnalysisRequestHandler {
    async fn handle_request(&self, request: AnalysisRequest) {
        match request {
            AnalysisRequest::Classify { image, response } => {
                let analysis = self.classifier.classify(&image).await.map_err(|e| {
                    log::error!("Error analyzing waste image: {}", e);
                    ServiceError::from(e)
                });
                let _ = response.send(analysis);
            }
        }
    }
}

pub struct AnalysisService;

impl AnalysisService {
    pub fn new() -> Self {
        AnalysisService {}
    }
}

#[async_trait]
impl Service<AnalysisRequest, AnalysisRequestHandler> for AnalysisService {}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Vision model double answering from a script.
    pub(crate) struct ScriptedModel {
        configured: bool,
        reply: Mutex<Option<Result<String, UpstreamError>>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedModel {
        pub(crate) fn replying(reply: Result<String, UpstreamError>) -> Self {
            Self {
                configured: true,
                reply: Mutex::new(Some(reply)),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn unconfigured() -> Self {
            Self {
                configured: false,
                reply: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VisionModel for ScriptedModel {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate(&self, _prompt: &str, _image: &ImagePayload) -> Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(UpstreamError::Other("no scripted reply".to_string())))
        }
    }

    fn image() -> ImagePayload {
        ImagePayload {
            mime_type: "image/jpeg".to_string(),
            data: "A".repeat(128),
        }
    }

    async fn classify_with(reply: Result<String, UpstreamError>) -> Result<WasteAnalysis, ClassifierError> {
        WasteClassifier::new(Arc::new(ScriptedModel::replying(reply)))
            .classify(&image())
            .await
    }

    #[test]
    fn fenced_json_is_parsed() {
        let analysis = parse_analysis(
            "```json\n{\"wasteType\":\"metal\",\"quantity\":\"small\",\"confidence\":90,\"estimatedPoints\":9,\"description\":\"Aluminium can\"}\n```",
        )
        .unwrap();

        assert_eq!(analysis.waste_type, WasteType::Metal);
        assert_eq!(analysis.quantity, Quantity::Small);
        assert_eq!(analysis.confidence, 90);
        assert_eq!(analysis.estimated_points, 9);
        assert_eq!(analysis.description, "Aluminium can");
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let analysis = parse_analysis(
            "Sure! Here it is: {\"wasteType\":\"paper\",\"quantity\":\"large\",\"confidence\":\"70\",\"estimatedPoints\":\"6\"} Hope that helps.",
        )
        .unwrap();

        assert_eq!(analysis.waste_type, WasteType::Paper);
        assert_eq!(analysis.confidence, 70);
        assert_eq!(analysis.estimated_points, 6);
        assert_eq!(analysis.description, "");
    }

    #[test]
    fn out_of_range_numbers_are_clamped() {
        let analysis = parse_analysis(
            r#"{"wasteType":"electronic","quantity":"large","confidence":140,"estimatedPoints":30}"#,
        )
        .unwrap();
        assert_eq!(analysis.confidence, 100);
        assert_eq!(analysis.estimated_points, 15);

        let analysis = parse_analysis(
            r#"{"wasteType":"organic","quantity":"small","confidence":-5,"estimatedPoints":0}"#,
        )
        .unwrap();
        assert_eq!(analysis.confidence, 0);
        assert_eq!(analysis.estimated_points, 1);
    }

    #[test]
    fn missing_required_field_fails_to_parse() {
        assert!(parse_analysis(r#"{"wasteType":"glass","quantity":"small","confidence":80}"#).is_err());
        assert!(parse_analysis("no json here").is_err());
        assert!(parse_analysis(
            r#"{"wasteType":"glass","quantity":"small","confidence":"high","estimatedPoints":5}"#
        )
        .is_err());
    }

    #[test]
    fn unknown_labels_are_normalized() {
        let analysis = parse_analysis(
            r#"{"wasteType":"Cardboard","quantity":"huge","confidence":60,"estimatedPoints":4}"#,
        )
        .unwrap();

        assert_eq!(analysis.waste_type, WasteType::Other);
        assert_eq!(analysis.quantity, Quantity::Medium);
    }

    #[test]
    fn prompt_carries_rubric_and_multipliers() {
        let prompt = build_prompt();

        assert!(prompt.contains("- Electronic waste: 8-15 points"));
        assert!(prompt.contains("- Organic: 1-4 points"));
        assert!(prompt.contains("Medium: base points x 1.5"));
        assert!(prompt.contains("plastic, paper, metal, glass, organic, electronic, textile, other"));
    }

    #[tokio::test]
    async fn missing_credential_fails_before_calling_the_model() {
        let model = Arc::new(ScriptedModel::unconfigured());
        let result = WasteClassifier::new(model.clone()).classify(&image()).await;

        assert!(matches!(result, Err(ClassifierError::Configuration(_))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generic_upstream_failure_falls_back() {
        let analysis = classify_with(Err(UpstreamError::Other("timeout".to_string())))
            .await
            .unwrap();

        assert_eq!(analysis, WasteAnalysis::fallback());
        assert_eq!(analysis.confidence, 50);
        assert_eq!(analysis.estimated_points, 3);
    }

    #[tokio::test]
    async fn unparseable_reply_falls_back() {
        let analysis = classify_with(Ok("I cannot see any waste".to_string()))
            .await
            .unwrap();

        assert_eq!(analysis, WasteAnalysis::fallback());
    }

    #[tokio::test]
    async fn auth_and_quota_failures_propagate() {
        let auth = classify_with(Err(UpstreamError::Authentication("bad key".to_string()))).await;
        assert!(matches!(auth, Err(ClassifierError::UpstreamAuthentication(_))));

        let quota = classify_with(Err(UpstreamError::Quota("slow down".to_string()))).await;
        assert!(matches!(quota, Err(ClassifierError::UpstreamQuota(_))));
    }
}
