use serde_json::{Value, json};
use tracing::{debug, info};

use crate::services::claims::ClaimError;
use crate::services::claims::provider::{ClaimArgs, opt_str_arg, str_arg};

/// `claims.permissions.get_team_permissions(team_id, api_key_id, metadata?)`
///
/// Looks in `metadata.team_permissions` first, then the builtin table, then
/// the default (least privileged) set.
pub fn get_team_permissions(args: &ClaimArgs) -> Result<Value, ClaimError> {
    let team_id = str_arg(args, "team_id")?;
    let api_key_id = opt_str_arg(args, "api_key_id").unwrap_or_default();
    info!(team_id, api_key_id, "resolving team permissions");

    let from_metadata = args
        .get("metadata")
        .and_then(|m| m.get("team_permissions"))
        .and_then(|t| t.get(team_id));
    if let Some(perms) = from_metadata {
        debug!(team_id, "team permissions taken from config metadata");
        return Ok(perms.clone());
    }

    Ok(builtin_permissions(team_id).unwrap_or_else(default_permissions))
}

fn builtin_permissions(team_id: &str) -> Option<Value> {
    let (manage_users, create_keys, view_billing, max_models) = match team_id {
        "admin-team" => (true, true, true, 5),
        "ai-team" => (false, false, false, 3),
        "ml-team" => (false, false, false, 2),
        _ => return None,
    };
    Some(json!({
        "can_manage_users": manage_users,
        "can_create_api_keys": create_keys,
        "can_view_billing": view_billing,
        "max_models_per_request": max_models,
    }))
}

fn default_permissions() -> Value {
    json!({
        "can_manage_users": false,
        "can_create_api_keys": false,
        "can_view_billing": false,
        "max_models_per_request": 1,
    })
}
