//! Reply payload sent back for each form submission

use crate::types::prediction::PredictionReport;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmissionResponse {
    /// Input accepted; report carries one outcome per indicator
    Ok { report: PredictionReport },
    /// Input decoded but failed validation; the user should be re-prompted
    Rejected { error: String },
    /// Payload could not be decoded as a form submission
    Malformed { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_shape() {
        let response = SubmissionResponse::Rejected {
            error: "age must be between 0 and 5 years, got 7".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "rejected");
        assert!(json["error"].as_str().unwrap().contains("age"));
    }
}
