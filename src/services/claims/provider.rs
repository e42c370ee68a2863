//! Named claim providers and the static `(module, function)` registry.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::services::claims::ClaimError;
use crate::services::claims::providers;

/// Keyword arguments handed to a provider after placeholder substitution.
pub type ClaimArgs = Map<String, Value>;

/// A synchronous capability computing one claim value.
///
/// Returning `Err` signals failure; the dispatcher then omits the claim.
pub trait ClaimProvider: Send + Sync {
    fn call(&self, args: &ClaimArgs) -> Result<Value, ClaimError>;
}

impl<F> ClaimProvider for F
where
    F: Fn(&ClaimArgs) -> Result<Value, ClaimError> + Send + Sync,
{
    fn call(&self, args: &ClaimArgs) -> Result<Value, ClaimError> {
        self(args)
    }
}

/// Explicit mapping from `(module, function)` to providers, populated at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<(String, String), Arc<dyn ClaimProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .providers
            .keys()
            .map(|(m, func)| format!("{m}.{func}"))
            .collect();
        names.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the builtin `claims.*` providers.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            "claims.quota",
            "get_remaining_quota",
            providers::quota::get_remaining_quota,
        );
        registry.register(
            "claims.permissions",
            "get_team_permissions",
            providers::permissions::get_team_permissions,
        );
        registry.register(
            "claims.access",
            "check_model_access",
            providers::access::check_model_access,
        );
        registry.register(
            "claims.group_category",
            "get_user_category",
            providers::group_category::get_user_category,
        );
        registry
    }

    pub fn register(
        &mut self,
        module: impl Into<String>,
        function: impl Into<String>,
        provider: impl ClaimProvider + 'static,
    ) -> &mut Self {
        self.providers
            .insert((module.into(), function.into()), Arc::new(provider));
        self
    }

    pub fn get(&self, module: &str, function: &str) -> Option<Arc<dyn ClaimProvider>> {
        self.providers
            .get(&(module.to_string(), function.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

/// Required string argument.
pub fn str_arg<'a>(args: &'a ClaimArgs, name: &'static str) -> Result<&'a str, ClaimError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or(ClaimError::InvalidArgument(name))
}

/// Optional string argument; empty strings count as absent.
pub fn opt_str_arg<'a>(args: &'a ClaimArgs, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builtin_registry_resolves_named_pairs() {
        let registry = ProviderRegistry::with_builtin();
        assert_eq!(registry.len(), 4);
        assert!(registry.get("claims.quota", "get_remaining_quota").is_some());
        assert!(registry.get("claims.quota", "missing").is_none());
        assert!(registry.get("os", "system").is_none());
    }

    #[test]
    fn closures_register_as_providers() {
        let mut registry = ProviderRegistry::new();
        registry.register("custom", "echo", |args: &ClaimArgs| {
            Ok::<_, ClaimError>(Value::Object(args.clone()))
        });

        let args = json!({ "a": 1 }).as_object().cloned().unwrap();
        let provider = registry.get("custom", "echo").unwrap();
        assert_eq!(provider.call(&args).unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn argument_helpers() {
        let args = json!({ "user_id": "u1", "empty": "", "n": 3 })
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(str_arg(&args, "user_id").unwrap(), "u1");
        assert!(matches!(
            str_arg(&args, "n"),
            Err(ClaimError::InvalidArgument("n"))
        ));
        assert_eq!(opt_str_arg(&args, "empty"), None);
    }
}
