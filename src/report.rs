//! Error reports for an embedding host.
//!
//! The host bridge posts these as `{"type": "app_error", "error": {...}}`.
//! Payment-required (402) failures are never reported.

use crate::error::DynRestError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppErrorReport {
    #[serde(rename = "type")]
    pub kind: String,
    pub error: AppErrorDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppErrorDetails {
    pub title: String,
    pub details: String,
    pub component_name: Option<String>,
}

impl AppErrorReport {
    pub fn new(
        title: impl Into<String>,
        details: impl Into<String>,
        component_name: Option<String>,
    ) -> Self {
        Self {
            kind: "app_error".to_string(),
            error: AppErrorDetails {
                title: title.into(),
                details: details.into(),
                component_name,
            },
        }
    }

    /// Report for a client error, or `None` when it must be suppressed
    pub fn from_error(err: &DynRestError, component_name: Option<&str>) -> Option<Self> {
        if !should_report(err) {
            return None;
        }
        let details = err.to_string();
        let title = match component_name {
            Some(component) => format!("Error in {}: {}", component, details),
            None => details.clone(),
        };
        Some(Self::new(title, details, component_name.map(str::to_string)))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.kind,
            "error": {
                "title": self.error.title,
                "details": self.error.details,
                "componentName": self.error.component_name,
            }
        })
    }
}

pub fn should_report(err: &DynRestError) -> bool {
    err.status() != Some(402)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payment_required_is_suppressed() {
        let err = DynRestError::request_failed(402, "Payment Required");
        assert!(!should_report(&err));
        assert!(AppErrorReport::from_error(&err, None).is_none());
    }

    #[test]
    fn report_shape() {
        let err = DynRestError::request_failed(500, "boom");
        let report = AppErrorReport::from_error(&err, Some("Dashboard")).unwrap();
        assert_eq!(
            report.to_json(),
            json!({
                "type": "app_error",
                "error": {
                    "title": "Error in Dashboard: boom",
                    "details": "boom",
                    "componentName": "Dashboard"
                }
            })
        );
        assert_eq!(serde_json::to_value(&report).unwrap(), report.to_json());
    }
}
