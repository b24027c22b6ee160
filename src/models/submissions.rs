use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_POINTS: i32 = 1;
pub const MAX_POINTS: i32 = 15;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WasteType {
    Plastic,
    Paper,
    Metal,
    Glass,
    Organic,
    Electronic,
    Textile,
    Other,
}

impl WasteType {
    pub const ALL: [WasteType; 8] = [
        WasteType::Plastic,
        WasteType::Paper,
        WasteType::Metal,
        WasteType::Glass,
        WasteType::Organic,
        WasteType::Electronic,
        WasteType::Textile,
        WasteType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WasteType::Plastic => "plastic",
            WasteType::Paper => "paper",
            WasteType::Metal => "metal",
            WasteType::Glass => "glass",
            WasteType::Organic => "organic",
            WasteType::Electronic => "electronic",
            WasteType::Textile => "textile",
            WasteType::Other => "other",
        }
    }
}

impl FromStr for WasteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        WasteType::ALL
            .into_iter()
            .find(|waste_type| waste_type.as_str() == normalized)
            .ok_or_else(|| format!("Unknown waste type: {}", s))
    }
}

impl fmt::Display for WasteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    Small,
    Medium,
    Large,
}

impl Quantity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantity::Small => "small",
            Quantity::Medium => "medium",
            Quantity::Large => "large",
        }
    }
}

impl FromStr for Quantity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Quantity::Small),
            "medium" => Ok(Quantity::Medium),
            "large" => Ok(Quantity::Large),
            _ => Err(format!("Unknown quantity: {}", s)),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Pending` is the only non-terminal state.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Verified,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Verified => "verified",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "verified" => Ok(SubmissionStatus::Verified),
            "rejected" => Ok(SubmissionStatus::Rejected),
            _ => Err(format!("Unknown submission status: {}", s)),
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome a reviewer can apply to a pending submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Verified,
    Rejected,
}

impl Decision {
    pub fn status(&self) -> SubmissionStatus {
        match self {
            Decision::Verified => SubmissionStatus::Verified,
            Decision::Rejected => SubmissionStatus::Rejected,
        }
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verified" => Ok(Decision::Verified),
            "rejected" => Ok(Decision::Rejected),
            _ => Err(format!(
                "Invalid status '{}', expected 'verified' or 'rejected'",
                s
            )),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WasteSubmission {
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    pub waste_type: WasteType,
    pub quantity: Quantity,
    pub estimated_points: i32,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_image: Option<String>,
}

/// A validated submission waiting to be persisted for `user_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSubmission {
    pub user_id: String,
    pub image_url: String,
    pub waste_type: WasteType,
    pub quantity: Quantity,
    pub estimated_points: i32,
}

/// Raw `POST /api/submissions` body. Every field is optional so that a
/// missing field is reported as a validation failure instead of a decode
/// error.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionForm {
    pub image_url: Option<String>,
    pub waste_type: Option<String>,
    pub quantity: Option<String>,
    pub estimated_points: Option<serde_json::Value>,
}

impl SubmissionForm {
    pub fn validate(self, user_id: &str) -> Result<NewSubmission, String> {
        let (Some(image_url), Some(waste_type), Some(quantity), Some(estimated_points)) = (
            self.image_url.filter(|url| !url.trim().is_empty()),
            self.waste_type.filter(|t| !t.trim().is_empty()),
            self.quantity.filter(|q| !q.trim().is_empty()),
            self.estimated_points.filter(|p| !p.is_null()),
        ) else {
            return Err("Missing required fields".to_string());
        };

        let waste_type = waste_type.parse::<WasteType>()?;
        let quantity = quantity.parse::<Quantity>()?;
        let estimated_points = estimated_points
            .as_i64()
            .filter(|points| (MIN_POINTS as i64..=MAX_POINTS as i64).contains(points))
            .ok_or_else(|| {
                format!(
                    "estimatedPoints must be an integer between {} and {}",
                    MIN_POINTS, MAX_POINTS
                )
            })? as i32;

        Ok(NewSubmission {
            user_id: user_id.to_string(),
            image_url,
            waste_type,
            quantity,
            estimated_points,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyForm {
    pub submission_id: Option<String>,
    pub status: Option<String>,
    pub verifier_image: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub success: bool,
    pub submission: WasteSubmission,
    pub points_awarded: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(value: serde_json::Value) -> SubmissionForm {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn complete_form_validates() {
        let submission = form(json!({
            "imageUrl": "data:image/png;base64,AAAA",
            "wasteType": "metal",
            "quantity": "small",
            "estimatedPoints": 9
        }))
        .validate("user-1")
        .unwrap();

        assert_eq!(submission.user_id, "user-1");
        assert_eq!(submission.waste_type, WasteType::Metal);
        assert_eq!(submission.quantity, Quantity::Small);
        assert_eq!(submission.estimated_points, 9);
    }

    #[test]
    fn missing_field_is_reported_as_missing() {
        let err = form(json!({
            "imageUrl": "https://img.example/1.jpg",
            "wasteType": "metal",
            "quantity": "small"
        }))
        .validate("user-1")
        .unwrap_err();

        assert_eq!(err, "Missing required fields");
    }

    #[test]
    fn out_of_range_points_are_rejected() {
        let err = form(json!({
            "imageUrl": "https://img.example/1.jpg",
            "wasteType": "glass",
            "quantity": "large",
            "estimatedPoints": 40
        }))
        .validate("user-1")
        .unwrap_err();

        assert!(err.contains("estimatedPoints"));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = form(json!({
            "imageUrl": "https://img.example/1.jpg",
            "wasteType": "uranium",
            "quantity": "large",
            "estimatedPoints": 4
        }))
        .validate("user-1")
        .unwrap_err();

        assert!(err.contains("uranium"));
    }

    #[test]
    fn pending_is_the_only_open_status() {
        assert!(!SubmissionStatus::Pending.is_terminal());
        assert!(SubmissionStatus::Verified.is_terminal());
        assert!(SubmissionStatus::Rejected.is_terminal());
        assert!("pending".parse::<Decision>().is_err());
    }
}
