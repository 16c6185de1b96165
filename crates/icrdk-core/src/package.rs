//! Installed-package records returned by a query task.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    /// Full package identifier, as accepted by an uninstall task
    pub package_name: String,
}

/// Task record fetched after a query task settles.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub query_response: Vec<PackageRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_response() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"id":"q1","status":"FINISHED","queryResponse":[{"name":"pkgA","version":"1.0","release":"0001","arch":"noarch","packageName":"pkgA-1.0"}]}"#,
        )
        .unwrap();

        assert_eq!(
            response.query_response,
            vec![PackageRecord {
                name: "pkgA".into(),
                version: "1.0".into(),
                package_name: "pkgA-1.0".into(),
            }]
        );
    }

    #[test]
    fn missing_list_is_empty() {
        let response: QueryResponse = serde_json::from_str(r#"{"id":"q1"}"#).unwrap();
        assert!(response.query_response.is_empty());
    }

    #[test]
    fn serializes_with_remote_field_names() {
        let record = PackageRecord {
            name: "pkgA".into(),
            version: "1.0".into(),
            package_name: "pkgA-1.0".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["packageName"], "pkgA-1.0");
    }
}
