//! API response envelope for OneBot v11.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Return code for an action the connector does not implement.
pub const RETCODE_UNSUPPORTED_ACTION: i32 = 1404;

/// A generic API response sent back on the session an action arrived on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// The status: "ok" or "failed".
    pub status: String,
    /// The return code (0 for success).
    pub retcode: i32,
    /// The response data (if successful).
    pub data: Option<Value>,
    /// Echo data copied from the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo: Option<Value>,
}

impl ApiResponse {
    /// A successful response carrying `data`.
    pub fn ok(data: Value, echo: Option<Value>) -> Self {
        Self {
            status: "ok".to_string(),
            retcode: 0,
            data: Some(data),
            echo,
        }
    }

    /// A failed response with the given return code.
    pub fn failed(retcode: i32, echo: Option<Value>) -> Self {
        Self {
            status: "failed".to_string(),
            retcode,
            data: None,
            echo,
        }
    }

    /// Checks whether the response reports success.
    pub fn is_ok(&self) -> bool {
        self.status == "ok" && self.retcode == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_response_shape() {
        let response = ApiResponse::failed(RETCODE_UNSUPPORTED_ACTION, Some(json!("e1")));
        assert!(!response.is_ok());

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["retcode"], 1404);
        assert_eq!(value["echo"], "e1");
    }

    #[test]
    fn ok_response_shape() {
        let response = ApiResponse::ok(json!({"message_id": 1}), None);
        assert!(response.is_ok());

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["retcode"], 0);
        assert_eq!(value["data"]["message_id"], 1);
        // absent echo is omitted entirely
        assert!(value.get("echo").is_none());
    }
}
