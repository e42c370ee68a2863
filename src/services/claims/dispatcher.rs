//! Dynamic claim dispatch: registered functions and outbound HTTP calls.
//!
//! Every claim is resolved independently. A failure is a value
//! (`ClaimOutcome::Failed`), logged and dropped by `resolve_all`; it never
//! aborts the other claims.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::services::claims::ClaimError;
use crate::services::claims::model::{ClaimMap, DynamicClaimSpec, raw_kind};
use crate::services::claims::placeholder::{Placeholders, Unresolved};
use crate::services::claims::provider::ProviderRegistry;

/// Fixed timeout for `api` claims. No retries.
pub const API_CLAIM_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of resolving one dynamic claim.
#[derive(Debug)]
pub enum ClaimOutcome {
    Resolved(Value),
    Failed(ClaimError),
}

impl ClaimOutcome {
    fn from_result(result: Result<Value, ClaimError>) -> Self {
        // `null` means the source had nothing for this user; the claim is
        // omitted rather than embedded as `null`. Other falsy values are kept.
        match result {
            Ok(Value::Null) => Self::Failed(ClaimError::EmptyValue),
            Ok(v) => Self::Resolved(v),
            Err(e) => Self::Failed(e),
        }
    }
}

/// Values bound to the reserved placeholders for one record.
#[derive(Debug, Clone, Copy)]
pub struct DispatchScope<'a> {
    /// Lookup key (or marker) the record was reached through: `{api_key}`.
    pub caller_key: &'a str,
    /// The record's `id`: `{api_key_id}`.
    pub config_id: &'a str,
}

#[derive(Clone)]
pub struct DynamicClaimDispatcher {
    registry: Arc<ProviderRegistry>,
    http: Client,
    internal_token: String,
}

impl std::fmt::Debug for DynamicClaimDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the internal token
        f.debug_struct("DynamicClaimDispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

impl DynamicClaimDispatcher {
    pub fn new(registry: Arc<ProviderRegistry>, http: Client, internal_token: String) -> Self {
        Self {
            registry,
            http,
            internal_token,
        }
    }

    /// HTTP client with the short connect/request timeouts used for claim calls.
    pub fn build_http_client() -> Result<Client, reqwest::Error> {
        Client::builder()
            .connect_timeout(API_CLAIM_TIMEOUT)
            .timeout(API_CLAIM_TIMEOUT)
            .build()
    }

    /// Resolve every spec and keep only the successes.
    pub async fn resolve_all(
        &self,
        specs: &Map<String, Value>,
        user_context: &Map<String, Value>,
        caller_key: &str,
        config_id: &str,
    ) -> ClaimMap {
        let scope = DispatchScope {
            caller_key,
            config_id,
        };
        let mut out = ClaimMap::new();

        for (name, raw) in specs {
            match self.resolve_one(raw, user_context, scope).await {
                ClaimOutcome::Resolved(value) => {
                    debug!(claim = %name, kind = raw_kind(raw), "dynamic claim resolved");
                    out.insert(name.clone(), value);
                }
                ClaimOutcome::Failed(err) => {
                    warn!(
                        claim = %name,
                        kind = raw_kind(raw),
                        config_id,
                        error = %err,
                        "dynamic claim skipped"
                    );
                }
            }
        }

        out
    }

    pub async fn resolve_one(
        &self,
        raw: &Value,
        user_context: &Map<String, Value>,
        scope: DispatchScope<'_>,
    ) -> ClaimOutcome {
        let spec = match DynamicClaimSpec::parse(raw) {
            Ok(spec) => spec,
            Err(e) => {
                return ClaimOutcome::Failed(ClaimError::InvalidSpec {
                    kind: raw_kind(raw).to_string(),
                    reason: e.to_string(),
                });
            }
        };

        debug!(kind = spec.kind(), "dispatching dynamic claim");
        let result = match &spec {
            DynamicClaimSpec::Function {
                module,
                function,
                args,
            } => self.call_function(module, function, args, user_context, scope),
            DynamicClaimSpec::Api {
                url,
                method,
                headers,
                response_field,
            } => {
                self.call_api(
                    url,
                    method,
                    headers,
                    response_field.as_deref(),
                    user_context,
                    scope,
                )
                .await
            }
        };

        ClaimOutcome::from_result(result)
    }

    fn call_function(
        &self,
        module: &str,
        function: &str,
        args: &Map<String, Value>,
        user_context: &Map<String, Value>,
        scope: DispatchScope<'_>,
    ) -> Result<Value, ClaimError> {
        let provider =
            self.registry
                .get(module, function)
                .ok_or_else(|| ClaimError::UnknownProvider {
                    module: module.to_string(),
                    function: function.to_string(),
                })?;

        let placeholders = Placeholders::new(user_context)
            .reserve("api_key", scope.caller_key)
            .reserve("api_key_id", scope.config_id);

        let resolved_args: Map<String, Value> = args
            .iter()
            .map(|(k, v)| (k.clone(), placeholders.substitute_value(v, Unresolved::Empty)))
            .collect();

        provider.call(&resolved_args)
    }

    async fn call_api(
        &self,
        url: &str,
        method: &str,
        headers: &BTreeMap<String, String>,
        response_field: Option<&str>,
        user_context: &Map<String, Value>,
        scope: DispatchScope<'_>,
    ) -> Result<Value, ClaimError> {
        let url_placeholders = Placeholders::new(user_context)
            .reserve("api_key", scope.caller_key)
            .reserve("api_key_id", scope.config_id);
        let header_placeholders = url_placeholders
            .clone()
            .reserve("internal_token", self.internal_token.as_str());

        let target = url_placeholders.substitute_str(url, Unresolved::Keep);
        let target = Url::parse(&target).map_err(|e| ClaimError::InvalidUrl {
            url: target.clone(),
            reason: e.to_string(),
        })?;
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| ClaimError::InvalidMethod(method.to_string()))?;

        let mut request = self
            .http
            .request(method, target.clone())
            .timeout(API_CLAIM_TIMEOUT);
        for (name, value) in headers {
            request = request.header(
                name.as_str(),
                header_placeholders.substitute_str(value, Unresolved::Keep),
            );
        }

        debug!(url = %target, "calling claim endpoint");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClaimError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes).map_err(ClaimError::InvalidJson)?;
        match response_field {
            Some(path) if !path.is_empty() => extract_field(&body, path).cloned(),
            _ => Ok(body),
        }
    }
}

/// Walk a dot-delimited path through objects (and array indices).
pub fn extract_field<'a>(body: &'a Value, path: &str) -> Result<&'a Value, ClaimError> {
    path.split('.').try_fold(body, |current, segment| {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        next.ok_or_else(|| ClaimError::MissingField(path.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::services::claims::provider::ClaimArgs;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn dispatcher(registry: ProviderRegistry) -> DynamicClaimDispatcher {
        DynamicClaimDispatcher::new(
            Arc::new(registry),
            DynamicClaimDispatcher::build_http_client().unwrap(),
            "test-internal-token".to_string(),
        )
    }

    fn registry_with_test_providers() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry
            .register("claims.quota", "get_remaining_quota", |args: &ClaimArgs| {
                assert_eq!(args["user_id"], "u1");
                Ok::<_, ClaimError>(json!({ "remaining_tokens": 5000 }))
            })
            .register("claims.broken", "explode", |_: &ClaimArgs| {
                Err::<Value, _>(ClaimError::InvalidArgument("backend"))
            })
            .register("claims.echo", "args", |args: &ClaimArgs| {
                Ok::<_, ClaimError>(Value::Object(args.clone()))
            })
            .register("claims.nothing", "null", |_: &ClaimArgs| {
                Ok::<_, ClaimError>(Value::Null)
            })
            .register("claims.flags", "zero", |_: &ClaimArgs| {
                Ok::<_, ClaimError>(json!(0))
            });
        registry
    }

    #[tokio::test]
    async fn failing_function_is_omitted_without_cascading() {
        let d = dispatcher(registry_with_test_providers());
        let specs = obj(json!({
            "quota": {
                "type": "function",
                "module": "claims.quota",
                "function": "get_remaining_quota",
                "args": { "user_id": "{user_id}" }
            },
            "broken": { "type": "function", "module": "claims.broken", "function": "explode" },
            "unknown_fn": { "type": "function", "module": "claims.nope", "function": "x" },
            "weird": { "type": "graphql", "query": "{ me }" },
            "zero": { "type": "function", "module": "claims.flags", "function": "zero" },
            "nothing": { "type": "function", "module": "claims.nothing", "function": "null" }
        }));
        let ctx = obj(json!({ "user_id": "u1" }));

        let out = d.resolve_all(&specs, &ctx, "key", "cfg").await;

        assert_eq!(out["quota"], json!({ "remaining_tokens": 5000 }));
        assert_eq!(out["zero"], json!(0));
        assert!(!out.contains_key("broken"));
        assert!(!out.contains_key("unknown_fn"));
        assert!(!out.contains_key("weird"));
        assert!(!out.contains_key("nothing"));
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn function_args_use_reserved_then_context() {
        let d = dispatcher(registry_with_test_providers());
        let spec = json!({
            "type": "function",
            "module": "claims.echo",
            "function": "args",
            "args": {
                "key": "{api_key}",
                "id": "{api_key_id}",
                "groups": "{groups}",
                "missing": "{not_there}",
                "literal": 7,
                "label": "team-{team_id}"
            }
        });
        let ctx = obj(json!({
            "api_key_id": "context-id",
            "groups": ["a", "b"],
            "team_id": "ml-team"
        }));
        let scope = DispatchScope {
            caller_key: "lookup-key",
            config_id: "config-id",
        };

        match d.resolve_one(&spec, &ctx, scope).await {
            ClaimOutcome::Resolved(v) => assert_eq!(
                v,
                json!({
                    "key": "lookup-key",
                    "id": "config-id",
                    "groups": ["a", "b"],
                    "missing": "",
                    "literal": 7,
                    "label": "team-ml-team"
                })
            ),
            ClaimOutcome::Failed(e) => panic!("unexpected failure: {e}"),
        }
    }

    #[tokio::test]
    async fn api_claim_extracts_nested_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stats/cfg-42"))
            .and(header("Authorization", "Bearer test-internal-token"))
            .and(header("X-User", "u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "usage": { "tokens_used": 15000 } }
            })))
            .mount(&server)
            .await;

        let d = dispatcher(ProviderRegistry::new());
        let specs = obj(json!({
            "usage": {
                "type": "api",
                "url": format!("{}/api/stats/{{api_key_id}}", server.uri()),
                "headers": {
                    "Authorization": "Bearer {internal_token}",
                    "X-User": "{user_id}"
                },
                "response_field": "data.usage"
            }
        }));
        let ctx = obj(json!({ "user_id": "u1" }));

        let out = d.resolve_all(&specs, &ctx, "key", "cfg-42").await;
        assert_eq!(out["usage"], json!({ "tokens_used": 15000 }));
    }

    #[tokio::test]
    async fn api_claim_without_field_returns_body_and_honours_method() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/budget"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "remaining_budget": 500 })),
            )
            .mount(&server)
            .await;

        let d = dispatcher(ProviderRegistry::new());
        let spec = json!({
            "type": "api",
            "url": format!("{}/budget", server.uri()),
            "method": "post"
        });
        let scope = DispatchScope {
            caller_key: "k",
            config_id: "c",
        };

        let outcome = d.resolve_one(&spec, &Map::new(), scope).await;
        match outcome {
            ClaimOutcome::Resolved(v) => assert_eq!(v, json!({ "remaining_budget": 500 })),
            ClaimOutcome::Failed(e) => panic!("unexpected failure: {e}"),
        }
    }

    #[tokio::test]
    async fn api_claim_failures_are_omitted() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "remaining_budget": 0 })))
            .mount(&server)
            .await;
        Mock::given(path("/shape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .mount(&server)
            .await;
        Mock::given(path("/text"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let d = dispatcher(ProviderRegistry::new());
        let scope = DispatchScope {
            caller_key: "k",
            config_id: "c",
        };

        let not_found = json!({ "type": "api", "url": format!("{}/missing", server.uri()) });
        assert!(matches!(
            d.resolve_one(&not_found, &Map::new(), scope).await,
            ClaimOutcome::Failed(ClaimError::Status(404))
        ));

        let no_field = json!({
            "type": "api",
            "url": format!("{}/shape", server.uri()),
            "response_field": "data.quota"
        });
        assert!(matches!(
            d.resolve_one(&no_field, &Map::new(), scope).await,
            ClaimOutcome::Failed(ClaimError::MissingField(_))
        ));

        let text = json!({ "type": "api", "url": format!("{}/text", server.uri()) });
        assert!(matches!(
            d.resolve_one(&text, &Map::new(), scope).await,
            ClaimOutcome::Failed(ClaimError::InvalidJson(_))
        ));

        let bad_url = json!({ "type": "api", "url": "not a url/{user_id}" });
        assert!(matches!(
            d.resolve_one(&bad_url, &Map::new(), scope).await,
            ClaimOutcome::Failed(ClaimError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn slow_api_claim_times_out_and_is_omitted() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "late": true }))
                    .set_delay(API_CLAIM_TIMEOUT + Duration::from_secs(1)),
            )
            .mount(&server)
            .await;
        Mock::given(path("/fast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;

        let d = dispatcher(registry_with_test_providers());
        let scope = DispatchScope {
            caller_key: "k",
            config_id: "c",
        };

        let slow = json!({ "type": "api", "url": format!("{}/slow", server.uri()) });
        assert!(matches!(
            d.resolve_one(&slow, &Map::new(), scope).await,
            ClaimOutcome::Failed(ClaimError::Http(e)) if e.is_timeout()
        ));

        let specs = obj(json!({
            "slow": slow,
            "fast": { "type": "api", "url": format!("{}/fast", server.uri()) },
            "zero": { "type": "function", "module": "claims.flags", "function": "zero" }
        }));
        let out = d.resolve_all(&specs, &Map::new(), "k", "c").await;
        assert!(!out.contains_key("slow"));
        assert_eq!(out["fast"], json!({ "ok": true }));
        assert_eq!(out["zero"], json!(0));
    }

    #[test]
    fn extract_field_walks_objects_and_arrays() {
        let body = json!({ "data": { "items": [{ "q": 1 }, { "q": 2 }] } });
        assert_eq!(extract_field(&body, "data.items.1.q").unwrap(), &json!(2));
        assert!(extract_field(&body, "data.items.5").is_err());
        assert!(extract_field(&body, "data.q").is_err());
    }
}
