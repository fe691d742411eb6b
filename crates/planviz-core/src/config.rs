//! Translation configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Alias given to physical operators the engine inserted on its own.
pub const DEFAULT_PLACEHOLDER_ALIAS: &str = "{tez-inserted-op}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Fall back to source locations when a physical operator has no
    /// identity or storage match.
    pub location_fallback: bool,

    /// Run the graph-propagation pass over nodes still unassigned after
    /// direct assignment.
    pub resolve_unknown: bool,

    /// Treat a MapReduce combine plan as a task of its own in the physical view.
    pub include_combine_plan: bool,

    /// Alias for physical operators without one.
    pub placeholder_alias: String,

    pub job_name: String,
    pub user_name: Option<String>,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            location_fallback: true,
            resolve_unknown: true,
            include_combine_plan: false,
            placeholder_alias: DEFAULT_PLACEHOLDER_ALIAS.to_string(),
            job_name: "unknown".to_string(),
            user_name: None,
        }
    }
}

impl TranslateConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PLANVIZ_LOCATION_FALLBACK`: `true` / `false`
    /// - `PLANVIZ_RESOLVE_UNKNOWN`: `true` / `false`
    /// - `PLANVIZ_INCLUDE_COMBINE_PLAN`: `true` / `false`
    /// - `PLANVIZ_PLACEHOLDER_ALIAS`: alias for engine-inserted operators
    /// - `PLANVIZ_JOB_NAME`, `PLANVIZ_USER_NAME`
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as [`TranslateConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("PLANVIZ_LOCATION_FALLBACK").and_then(|s| parse_bool(&s)) {
            cfg.location_fallback = v;
        }

        if let Some(v) = lookup("PLANVIZ_RESOLVE_UNKNOWN").and_then(|s| parse_bool(&s)) {
            cfg.resolve_unknown = v;
        }

        if let Some(v) = lookup("PLANVIZ_INCLUDE_COMBINE_PLAN").and_then(|s| parse_bool(&s)) {
            cfg.include_combine_plan = v;
        }

        if let Some(s) = lookup("PLANVIZ_PLACEHOLDER_ALIAS") {
            cfg.placeholder_alias = s;
        }

        if let Some(s) = lookup("PLANVIZ_JOB_NAME") {
            cfg.job_name = s;
        }

        if let Some(s) = lookup("PLANVIZ_USER_NAME") {
            cfg.user_name = Some(s);
        }

        cfg
    }

    /// Reject settings that would produce unlabeled nodes or packages.
    pub fn validate(&self) -> Result<()> {
        if self.placeholder_alias.trim().is_empty() {
            return Err(Error::Config("placeholder_alias must not be empty".into()));
        }
        if self.job_name.trim().is_empty() {
            return Err(Error::Config("job_name must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let cfg = TranslateConfig::default();
        assert!(cfg.location_fallback);
        assert!(!cfg.include_combine_plan);
        assert_eq!(cfg.placeholder_alias, "{tez-inserted-op}");
        assert_eq!(cfg.job_name, "unknown");
    }

    #[test]
    fn lookup_overrides_and_ignores_garbage() {
        let env: HashMap<&str, &str> = [
            ("PLANVIZ_LOCATION_FALLBACK", "off"),
            ("PLANVIZ_RESOLVE_UNKNOWN", "maybe"),
            ("PLANVIZ_JOB_NAME", "nightly"),
        ]
        .into_iter()
        .collect();
        let cfg = TranslateConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(!cfg.location_fallback);
        assert!(cfg.resolve_unknown);
        assert_eq!(cfg.job_name, "nightly");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(TranslateConfig::default().validate().is_ok());
        let cfg = TranslateConfig {
            placeholder_alias: "  ".into(),
            ..TranslateConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
        let cfg = TranslateConfig {
            job_name: String::new(),
            ..TranslateConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_document_block_keeps_defaults() {
        let cfg: TranslateConfig =
            serde_json::from_str(r#"{"include_combine_plan": true}"#).unwrap();
        assert!(cfg.include_combine_plan);
        assert!(cfg.resolve_unknown);
    }
}
