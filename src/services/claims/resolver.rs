//! Claims resolution engine.
//!
//! Picks one configuration record (inline > key > base), resolves its dynamic
//! claims and merges `auth < static < dynamic`. The `exp_hours` entry is
//! pulled out of the merged map and returned as a lifetime override.
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::repos::api_key_repo::{ApiKeyConfigStore, BASE_API_KEY};
use crate::services::claims::dispatcher::DynamicClaimDispatcher;
use crate::services::claims::model::{ApiKeyConfig, ClaimMap};

/// Claim key carrying a token lifetime override, in hours.
pub const EXP_HOURS_CLAIM: &str = "exp_hours";

/// Upper bound for `exp_hours` (one year).
pub const MAX_EXP_HOURS: f64 = 24.0 * 365.0;

const INLINE_CALLER_KEY: &str = "inline";

/// Where the configuration record comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Inline(ApiKeyConfig),
    Key(String),
    Base,
}

impl ConfigSource {
    /// Inline wins outright; a blank key counts as absent.
    pub fn select(inline: Option<ApiKeyConfig>, key: Option<&str>) -> Self {
        if let Some(config) = inline {
            return Self::Inline(config);
        }
        match key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(k) => Self::Key(k.to_string()),
            None => Self::Base,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedClaims {
    pub claims: ClaimMap,
    pub exp_hours: Option<f64>,
}

#[derive(Clone)]
pub struct ClaimsResolver {
    store: Arc<dyn ApiKeyConfigStore>,
    dispatcher: DynamicClaimDispatcher,
}

impl std::fmt::Debug for ClaimsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsResolver")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl ClaimsResolver {
    pub fn new(store: Arc<dyn ApiKeyConfigStore>, dispatcher: DynamicClaimDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Compute the claim set for one token. Record and claim failures degrade
    /// to fewer claims; this never fails.
    pub async fn resolve(
        &self,
        source: ConfigSource,
        auth_claims: ClaimMap,
        user_context: &Map<String, Value>,
    ) -> ResolvedClaims {
        let Some((config, caller_key)) = self.select_record(source).await else {
            return ResolvedClaims {
                claims: auth_claims,
                exp_hours: None,
            };
        };

        let mut context = user_context.clone();
        context.insert("api_key_id".to_string(), Value::String(config.id.clone()));
        context.insert(
            "metadata".to_string(),
            Value::Object(config.metadata.clone()),
        );

        let dynamic = self
            .dispatcher
            .resolve_all(
                &config.claims.dynamic_claims,
                &context,
                &caller_key,
                &config.id,
            )
            .await;

        let mut claims = auth_claims;
        claims.extend(config.claims.static_claims);
        claims.extend(dynamic);

        let exp_hours = take_exp_hours(&mut claims);
        info!(
            config_id = %config.id,
            claims = claims.len(),
            exp_hours = ?exp_hours,
            "claims resolved"
        );

        ResolvedClaims { claims, exp_hours }
    }

    async fn select_record(&self, source: ConfigSource) -> Option<(ApiKeyConfig, String)> {
        match source {
            ConfigSource::Inline(config) => {
                let caller_key = if config.id.is_empty() {
                    INLINE_CALLER_KEY.to_string()
                } else {
                    config.id.clone()
                };
                debug!(caller_key = %caller_key, "using inline api key config");
                Some((config, caller_key))
            }
            ConfigSource::Key(key) => match self.store.find(&key).await {
                Ok(Some(config)) => Some((config, key)),
                Ok(None) => {
                    warn!(api_key = %key, "api key config not found, using base config");
                    self.load_base().await.map(|config| (config, key))
                }
                Err(e) => {
                    warn!(api_key = %key, error = %e, "failed to load api key config");
                    None
                }
            },
            ConfigSource::Base => self
                .load_base()
                .await
                .map(|config| (config, BASE_API_KEY.to_string())),
        }
    }

    async fn load_base(&self) -> Option<ApiKeyConfig> {
        match self.store.find_base().await {
            Ok(Some(config)) => Some(config),
            Ok(None) => {
                info!("no base api key config, issuing authentication claims only");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to load base api key config");
                None
            }
        }
    }
}

fn take_exp_hours(claims: &mut ClaimMap) -> Option<f64> {
    let raw = claims.remove(EXP_HOURS_CLAIM)?;
    match raw.as_f64() {
        Some(hours) if hours > 0.0 && hours <= MAX_EXP_HOURS => Some(hours),
        _ => {
            warn!(value = %raw, "ignoring invalid exp_hours");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::repos::error::{RepoError, RepoResult};
    use crate::services::claims::ClaimError;
    use crate::services::claims::provider::{ClaimArgs, ProviderRegistry};

    #[derive(Default)]
    struct MemoryStore {
        records: HashMap<String, ApiKeyConfig>,
        broken: bool,
    }

    impl MemoryStore {
        fn with(mut self, key: &str, yaml: &str) -> Self {
            self.records
                .insert(key.to_string(), serde_yaml::from_str(yaml).unwrap());
            self
        }
    }

    #[async_trait]
    impl ApiKeyConfigStore for MemoryStore {
        async fn find(&self, key: &str) -> RepoResult<Option<ApiKeyConfig>> {
            if self.broken {
                return Err(RepoError::Io(std::io::Error::other("disk on fire")));
            }
            Ok(self.records.get(key).cloned())
        }

        async fn find_base(&self) -> RepoResult<Option<ApiKeyConfig>> {
            self.find(BASE_API_KEY).await
        }
    }

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::with_builtin();
        registry
            .register("claims.quota", "get_remaining_quota", |args: &ClaimArgs| {
                match args.get("user_id").and_then(Value::as_str) {
                    Some("u1") => Ok(json!({ "remaining_tokens": 5000 })),
                    _ => Err(ClaimError::InvalidArgument("user_id")),
                }
            })
            .register("claims.broken", "explode", |_: &ClaimArgs| {
                Err::<Value, _>(ClaimError::InvalidArgument("boom"))
            })
            .register("claims.echo", "args", |args: &ClaimArgs| {
                Ok::<_, ClaimError>(Value::Object(args.clone()))
            });
        registry
    }

    fn resolver(store: MemoryStore) -> ClaimsResolver {
        let dispatcher = DynamicClaimDispatcher::new(
            Arc::new(registry()),
            DynamicClaimDispatcher::build_http_client().unwrap(),
            "svc-token".to_string(),
        );
        ClaimsResolver::new(Arc::new(store), dispatcher)
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn auth() -> ClaimMap {
        obj(json!({ "sub": "alice", "name": "Alice", "tier": "auth" }))
    }

    fn ctx() -> Map<String, Value> {
        obj(json!({ "user_id": "u1", "groups": ["admins"], "team_id": "admin-team" }))
    }

    const BASE: &str = r#"
id: base
claims:
  static:
    tier: free
    exp_hours: 1
"#;

    const STATIC_ONLY: &str = r#"
id: static-key
claims:
  static:
    tier: gold
    models: [gpt-4]
"#;

    const WITH_DYNAMIC: &str = r#"
id: dyn-key
claims:
  static:
    tier: pro
    quota: static-placeholder
  dynamic:
    quota:
      type: function
      module: claims.quota
      function: get_remaining_quota
      args:
        user_id: "{user_id}"
    broken:
      type: function
      module: claims.broken
      function: explode
    ids:
      type: function
      module: claims.echo
      function: args
      args:
        key: "{api_key}"
        id: "{api_key_id}"
        cost: "{metadata}"
metadata:
  cost_center: 7
"#;

    #[tokio::test]
    async fn static_claims_override_auth_claims() {
        let r = resolver(MemoryStore::default().with("k", STATIC_ONLY));
        let out = r
            .resolve(ConfigSource::Key("k".into()), auth(), &ctx())
            .await;

        assert_eq!(
            out.claims,
            obj(json!({ "sub": "alice", "name": "Alice", "tier": "gold", "models": ["gpt-4"] }))
        );
        assert_eq!(out.exp_hours, None);
    }

    #[tokio::test]
    async fn dynamic_claims_override_static_and_failures_are_omitted() {
        let r = resolver(MemoryStore::default().with("k", WITH_DYNAMIC));
        let out = r
            .resolve(ConfigSource::Key("k".into()), auth(), &ctx())
            .await;

        assert_eq!(out.claims["tier"], "pro");
        assert_eq!(out.claims["quota"], json!({ "remaining_tokens": 5000 }));
        assert!(!out.claims.contains_key("broken"));
        assert_eq!(
            out.claims["ids"],
            json!({ "key": "k", "id": "dyn-key", "cost": { "cost_center": 7 } })
        );
        assert!(!out.claims.contains_key("metadata"));
    }

    #[tokio::test]
    async fn inline_config_beats_key() {
        let store = MemoryStore::default()
            .with("k", STATIC_ONLY)
            .with(BASE_API_KEY, BASE);
        let r = resolver(store);
        let inline: ApiKeyConfig = serde_yaml::from_str(WITH_DYNAMIC).unwrap();

        let a = r
            .resolve(
                ConfigSource::select(Some(inline.clone()), Some("k")),
                auth(),
                &ctx(),
            )
            .await;
        let b = r
            .resolve(
                ConfigSource::select(Some(inline), Some("other")),
                auth(),
                &ctx(),
            )
            .await;

        assert_eq!(a, b);
        assert_eq!(a.claims["tier"], "pro");
        // Caller key of an inline record is its id.
        assert_eq!(a.claims["ids"]["key"], "dyn-key");
    }

    #[tokio::test]
    async fn unknown_key_falls_back_to_base() {
        let r = resolver(MemoryStore::default().with(BASE_API_KEY, BASE));

        let missing = r
            .resolve(ConfigSource::Key("nope".into()), auth(), &ctx())
            .await;
        let none = r.resolve(ConfigSource::select(None, None), auth(), &ctx()).await;

        assert_eq!(missing, none);
        assert_eq!(none.claims["tier"], "free");
        assert_eq!(none.exp_hours, Some(1.0));
        assert!(!none.claims.contains_key(EXP_HOURS_CLAIM));
    }

    #[tokio::test]
    async fn no_base_and_broken_store_yield_auth_claims() {
        let r = resolver(MemoryStore::default());
        let out = r.resolve(ConfigSource::Base, auth(), &ctx()).await;
        assert_eq!(out.claims, auth());

        let r = resolver(MemoryStore {
            broken: true,
            ..Default::default()
        });
        let out = r
            .resolve(ConfigSource::Key("k".into()), auth(), &ctx())
            .await;
        assert_eq!(out.claims, auth());
        assert_eq!(out.exp_hours, None);
    }

    #[tokio::test]
    async fn invalid_exp_hours_is_dropped() {
        let yaml = "id: x\nclaims:\n  static:\n    exp_hours: soon\n";
        let r = resolver(MemoryStore::default().with("k", yaml));
        let out = r
            .resolve(ConfigSource::Key("k".into()), auth(), &ctx())
            .await;
        assert_eq!(out.exp_hours, None);
        assert!(!out.claims.contains_key(EXP_HOURS_CLAIM));

        let mut claims = obj(json!({ "exp_hours": -2 }));
        assert_eq!(take_exp_hours(&mut claims), None);
        let mut claims = obj(json!({ "exp_hours": 0.5 }));
        assert_eq!(take_exp_hours(&mut claims), Some(0.5));
    }

    #[tokio::test]
    async fn oversized_exp_hours_is_dropped() {
        let inline: ApiKeyConfig = serde_yaml::from_str(
            "id: x\nclaims:\n  static:\n    exp_hours: 1.0e+300\n    tier: pro\n",
        )
        .unwrap();
        let r = resolver(MemoryStore::default());
        let out = r.resolve(ConfigSource::Inline(inline), auth(), &ctx()).await;
        assert_eq!(out.exp_hours, None);
        assert_eq!(out.claims["tier"], "pro");
        assert!(!out.claims.contains_key(EXP_HOURS_CLAIM));

        let mut claims = obj(json!({ "exp_hours": MAX_EXP_HOURS }));
        assert_eq!(take_exp_hours(&mut claims), Some(MAX_EXP_HOURS));
        let mut claims = obj(json!({ "exp_hours": MAX_EXP_HOURS + 1.0 }));
        assert_eq!(take_exp_hours(&mut claims), None);
    }

    #[tokio::test]
    async fn api_claims_use_record_id_and_internal_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats/api-cfg"))
            .and(wiremock::matchers::header("X-Token", "svc-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "used": 3 } })),
            )
            .mount(&server)
            .await;

        let yaml = format!(
            r#"
id: api-cfg
claims:
  dynamic:
    usage:
      type: api
      url: "{}/stats/{{api_key_id}}"
      headers:
        X-Token: "{{internal_token}}"
      response_field: data.used
"#,
            server.uri()
        );
        let r = resolver(MemoryStore::default().with("k", &yaml));
        let mut context = ctx();
        context.insert("api_key_id".into(), json!("spoofed"));

        let out = r
            .resolve(ConfigSource::Key("k".into()), auth(), &context)
            .await;
        assert_eq!(out.claims["usage"], 3);
    }

    #[test]
    fn select_treats_blank_key_as_absent() {
        assert_eq!(ConfigSource::select(None, Some("  ")), ConfigSource::Base);
        assert_eq!(
            ConfigSource::select(None, Some(" k ")),
            ConfigSource::Key("k".into())
        );
    }
}
