/// QR session token codec
///
/// The token is the only protocol artifact that crosses the system boundary:
/// it is rendered into a QR image by the teacher endpoint and comes back as
/// scanned text from a student's device. The scanned text is attacker
/// controlled, so decoding is a strict structured parse that rejects anything
/// but the exact expected shape.
use crate::{
    db::models::GeoPoint,
    error::{RollcallError, RollcallResult},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The payload embedded in a session QR code
///
/// Ephemeral: never persisted, reconstructed from the scanned text on every
/// mark-attendance call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionToken {
    pub course_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub generated_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(course_id: String, anchor: GeoPoint, generated_at: DateTime<Utc>) -> Self {
        Self {
            course_id,
            latitude: anchor.latitude,
            longitude: anchor.longitude,
            generated_at,
        }
    }

    /// Serialize to the compact JSON text embedded in the QR image
    pub fn encode(&self) -> RollcallResult<String> {
        serde_json::to_string(self)
            .map_err(|e| RollcallError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Parse scanned QR text back into a token
    ///
    /// Unknown fields, missing fields, and non-object input are all
    /// rejected; the input is never evaluated, only parsed.
    pub fn decode(raw: &str) -> RollcallResult<Self> {
        serde_json::from_str(raw).map_err(|e| RollcallError::InvalidQr(e.to_string()))
    }

    /// The session's anchor location
    pub fn anchor(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Whether the token has outlived its validity window
    ///
    /// A token is still valid at exactly `generated_at + ttl` and expired
    /// any instant after.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_minutes: i64) -> bool {
        now - self.generated_at > Duration::minutes(ttl_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token() -> SessionToken {
        SessionToken {
            course_id: "course-42".to_string(),
            latitude: 12.9716,
            longitude: 77.5946,
            generated_at: "2026-03-02T09:30:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_round_trip() {
        let token = sample_token();
        let encoded = token.encode().unwrap();
        let decoded = SessionToken::decode(&encoded).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_wire_field_names() {
        let encoded = sample_token().encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["courseId"], "course-42");
        assert!(value["latitude"].is_f64());
        assert!(value["longitude"].is_f64());
        assert!(value["generatedAt"].is_string());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(SessionToken::decode("not a token").is_err());
        assert!(SessionToken::decode("").is_err());
        assert!(SessionToken::decode("__import__('os')").is_err());
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(SessionToken::decode("[1, 2, 3]").is_err());
        assert!(SessionToken::decode("\"just a string\"").is_err());
        assert!(SessionToken::decode("42").is_err());
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        assert!(SessionToken::decode(r#"{"courseId": "c1"}"#).is_err());
        assert!(SessionToken::decode(r#"{"latitude": 1.0, "longitude": 2.0}"#).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_fields() {
        let mut value: serde_json::Value =
            serde_json::from_str(&sample_token().encode().unwrap()).unwrap();
        value["extra"] = serde_json::json!("payload");
        assert!(SessionToken::decode(&value.to_string()).is_err());
    }

    #[test]
    fn test_expiry_boundary() {
        let token = sample_token();
        let issued = token.generated_at;

        assert!(!token.is_expired(issued, 30));
        assert!(!token.is_expired(issued + Duration::minutes(29), 30));
        // Still valid at exactly the boundary
        assert!(!token.is_expired(issued + Duration::minutes(30), 30));
        assert!(token.is_expired(issued + Duration::minutes(30) + Duration::seconds(1), 30));
    }
}
