use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::submissions::{Quantity, WasteType};

/// Classification of a single image. Never persisted.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasteAnalysis {
    pub waste_type: WasteType,
    pub quantity: Quantity,
    pub confidence: u8,
    pub estimated_points: i32,
    pub description: String,
}

impl WasteAnalysis {
    /// Low-confidence result returned whenever the vision model output is
    /// unusable.
    pub fn fallback() -> Self {
        WasteAnalysis {
            waste_type: WasteType::Other,
            quantity: Quantity::Medium,
            confidence: 50,
            estimated_points: 3,
            description: "Unable to analyze image with AI - manual review recommended".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnalyzeForm {
    pub image: Option<String>,
}

/// Shortest base64 body accepted as an image.
pub const MIN_IMAGE_DATA_LEN: usize = 100;

/// Image payload extracted from a `data:image/<type>;base64,` URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn from_data_uri(uri: &str) -> Result<Self, &'static str> {
        let rest = uri.trim().strip_prefix("data:image/").ok_or("Invalid image format")?;
        let (subtype, data) = rest.split_once(";base64,").ok_or("Invalid image format")?;

        let valid_subtype = !subtype.is_empty()
            && subtype
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_subtype {
            return Err("Invalid image format");
        }

        if data.len() < MIN_IMAGE_DATA_LEN || STANDARD.decode(data).is_err() {
            return Err("Invalid image data");
        }

        Ok(ImagePayload {
            mime_type: format!("image/{}", subtype.to_ascii_lowercase()),
            data: data.to_string(),
        })
    }
}
