//! API key configuration records and dynamic claim specs.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim name -> JSON value.
pub type ClaimMap = Map<String, Value>;

/// A reusable claims policy, addressed by lookup key (not by `id`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeyConfig {
    pub id: String,
    pub owner: String,
    pub provider_permissions: Vec<String>,
    pub endpoint_permissions: Vec<String>,
    pub claims: ClaimsConfig,
    /// Never copied into a token; only visible to claim providers.
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimsConfig {
    #[serde(rename = "static")]
    pub static_claims: ClaimMap,
    /// Kept untyped so a single malformed entry only drops that claim.
    #[serde(rename = "dynamic")]
    pub dynamic_claims: Map<String, Value>,
}

/// One entry of `claims.dynamic`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DynamicClaimSpec {
    Function {
        module: String,
        function: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    Api {
        url: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        response_field: Option<String>,
    },
}

fn default_method() -> String {
    "GET".to_string()
}

impl DynamicClaimSpec {
    pub fn parse(raw: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(raw)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Function { .. } => "function",
            Self::Api { .. } => "api",
        }
    }
}

/// The `type` label of a raw spec, for logging specs that failed to parse.
pub fn raw_kind(raw: &Value) -> &str {
    raw.get("type").and_then(Value::as_str).unwrap_or("<missing>")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const RECORD: &str = r#"
id: test-dynamic
owner: Test Team
provider_permissions: [openai]
endpoint_permissions: ["/v1/chat/completions"]
claims:
  static:
    tier: premium
    models: [gpt-4]
    rate_limit: 100
  dynamic:
    quota:
      type: function
      module: claims.quota
      function: get_remaining_quota
      args:
        user_id: "{user_id}"
    usage:
      type: api
      url: "http://usage-service/api/stats/{api_key_id}"
      headers:
        Authorization: "Bearer {internal_token}"
      response_field: data.used
metadata:
  description: internal only
"#;

    #[test]
    fn parses_yaml_record() {
        let cfg: ApiKeyConfig = serde_yaml::from_str(RECORD).unwrap();

        assert_eq!(cfg.id, "test-dynamic");
        assert_eq!(cfg.provider_permissions, vec!["openai"]);
        assert_eq!(cfg.claims.static_claims["tier"], "premium");
        assert_eq!(cfg.claims.static_claims["rate_limit"], 100);
        assert_eq!(cfg.claims.dynamic_claims.len(), 2);
        assert_eq!(cfg.metadata["description"], "internal only");

        let quota = DynamicClaimSpec::parse(&cfg.claims.dynamic_claims["quota"]).unwrap();
        assert_eq!(quota.kind(), "function");

        match DynamicClaimSpec::parse(&cfg.claims.dynamic_claims["usage"]).unwrap() {
            DynamicClaimSpec::Api {
                method,
                response_field,
                headers,
                ..
            } => {
                assert_eq!(method, "GET");
                assert_eq!(response_field.as_deref(), Some("data.used"));
                assert_eq!(headers["Authorization"], "Bearer {internal_token}");
            }
            other => panic!("unexpected spec: {other:?}"),
        }
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let cfg: ApiKeyConfig = serde_json::from_value(json!({ "id": "bare" })).unwrap();
        assert!(cfg.claims.static_claims.is_empty());
        assert!(cfg.claims.dynamic_claims.is_empty());
        assert!(cfg.metadata.is_empty());
    }

    #[test]
    fn unknown_or_incomplete_specs_fail_individually() {
        let unknown = json!({ "type": "sql", "query": "select 1" });
        assert!(DynamicClaimSpec::parse(&unknown).is_err());
        assert_eq!(raw_kind(&unknown), "sql");

        let no_function = json!({ "type": "function", "module": "claims.quota" });
        assert!(DynamicClaimSpec::parse(&no_function).is_err());

        assert_eq!(raw_kind(&json!({})), "<missing>");
    }
}
