use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::services::claims::ClaimError;
use crate::services::claims::provider::{ClaimArgs, opt_str_arg};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupMode {
    FirstMatch,
    AllMatches,
    TieredMatch,
}

impl LookupMode {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "FIRST_MATCH" => Some(Self::FirstMatch),
            "ALL_MATCHES" => Some(Self::AllMatches),
            "TIERED_MATCH" => Some(Self::TieredMatch),
            _ => None,
        }
    }
}

/// `claims.group_category.get_user_category(user_groups, lookup_mode?, metadata)`
///
/// Categories come from `metadata.categories`: `name -> { groups: [...], tier?: n, ... }`.
/// A category matches when any of its groups is one of the user's groups.
pub fn get_user_category(args: &ClaimArgs) -> Result<Value, ClaimError> {
    let user_groups: Vec<&str> = match args.get("user_groups") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.as_str()],
        _ => Vec::new(),
    };
    let mode_name = opt_str_arg(args, "lookup_mode").unwrap_or("FIRST_MATCH");
    info!(groups = ?user_groups, mode = mode_name, "assigning user category");

    let categories = args
        .get("metadata")
        .and_then(|m| m.get("categories"))
        .and_then(Value::as_object)
        .filter(|c| !c.is_empty());
    let Some(categories) = categories else {
        warn!("no categories found in metadata");
        return Ok(json!({
            "categories": [],
            "match_mode": mode_name,
            "reason": "No categories in metadata",
        }));
    };

    let matches = matching_categories(categories, &user_groups);

    let result = match LookupMode::parse(mode_name) {
        Some(LookupMode::AllMatches) => json!({ "categories": matches, "match_mode": mode_name }),
        Some(mode @ (LookupMode::FirstMatch | LookupMode::TieredMatch)) => {
            let chosen = if mode == LookupMode::FirstMatch {
                matches.first().cloned()
            } else {
                best_tier(&matches)
            };
            match chosen {
                Some(category) => json!({ "category": category, "match_mode": mode_name }),
                None => json!({ "category": null, "match_mode": mode_name, "reason": "No match" }),
            }
        }
        None => {
            warn!(mode = mode_name, "unknown lookup_mode");
            json!({
                "categories": matches,
                "match_mode": mode_name,
                "reason": "Unknown lookup_mode",
            })
        }
    };
    Ok(result)
}

fn matching_categories(categories: &Map<String, Value>, user_groups: &[&str]) -> Vec<Value> {
    categories
        .iter()
        .filter(|(_, data)| {
            data.get("groups")
                .and_then(Value::as_array)
                .is_some_and(|groups| {
                    groups
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|g| user_groups.contains(&g))
                })
        })
        .map(|(name, data)| {
            let mut entry = Map::new();
            entry.insert("name".to_string(), Value::String(name.clone()));
            if let Some(fields) = data.as_object() {
                entry.extend(fields.clone());
            }
            Value::Object(entry)
        })
        .collect()
}

// Highest `tier` wins; on ties the first match is kept.
fn best_tier(matches: &[Value]) -> Option<Value> {
    let tier = |v: &Value| v.get("tier").and_then(Value::as_f64).unwrap_or(0.0);
    matches
        .iter()
        .fold(None::<&Value>, |best, candidate| match best {
            Some(b) if tier(b) >= tier(candidate) => Some(b),
            _ => Some(candidate),
        })
        .cloned()
}
