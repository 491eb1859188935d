use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::services::column_roles::{
    AgeSource, ColumnRoles, SecondaryRoles, DEFAULT_AGE_COLUMN, DEFAULT_GROUP_COLUMN,
    DEFAULT_KEY_COLUMN, DEFAULT_STATUS_COLUMN,
};
use crate::services::risk_ranking::{RiskWeights, WeightPolicy};

const DEFAULT_SETUP_CONFIG_PATH: &str = "query-risk.json";
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub(crate) fn setup_config_path(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("QUERY_RISK_SETUP_CONFIG_PATH")
        .map(|path| PathBuf::from(path.trim()))
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETUP_CONFIG_PATH))
}

/// Optional JSON file carrying the settings that are awkward to pass as env
/// vars (weight sets, option column lists).
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SetupConfigOverrides {
    #[serde(default)]
    key_column: Option<String>,
    #[serde(default)]
    status_column: Option<String>,
    #[serde(default)]
    age_column: Option<String>,
    #[serde(default)]
    created_column: Option<String>,
    #[serde(default)]
    secondary_key_column: Option<String>,
    #[serde(default)]
    secondary_group_column: Option<String>,
    #[serde(default)]
    weights_with_secondary: Option<RiskWeights>,
    #[serde(default)]
    weights_primary_only: Option<RiskWeights>,
    #[serde(default)]
    option_columns: Option<Vec<String>>,
    #[serde(default)]
    max_body_bytes: Option<usize>,
}

fn load_setup_config_overrides(path: &Path) -> Option<SetupConfigOverrides> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to read setup config; using env defaults"
            );
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to parse setup config; using env defaults"
            );
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub roles: ColumnRoles,
    pub secondary_roles: SecondaryRoles,
    pub weights: WeightPolicy,
    pub option_columns: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            roles: ColumnRoles::default(),
            secondary_roles: SecondaryRoles::default(),
            weights: WeightPolicy::default(),
            option_columns: Vec::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl EngineConfig {
    /// Reads `.env`, the process environment and the setup file. Environment
    /// variables win over the setup file.
    pub fn from_env() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(err).context("failed to load .env");
            }
        }
        let lookup = |key: &str| std::env::var(key).ok();
        let overrides = load_setup_config_overrides(&setup_config_path(&lookup));
        Self::from_lookup(lookup, overrides.as_ref())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: Option<&SetupConfigOverrides>,
    ) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let pick = |key: &str, from_file: Option<&String>, default: &str| {
            var(key)
                .or_else(|| {
                    from_file
                        .map(|value| value.trim().to_string())
                        .filter(|value| !value.is_empty())
                })
                .unwrap_or_else(|| default.to_string())
        };
        let overrides = overrides.cloned().unwrap_or_default();

        let created_column = var("QUERY_RISK_CREATED_COLUMN").or_else(|| {
            overrides
                .created_column
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        });
        let age = match created_column {
            Some(column) => AgeSource::CreatedDate { column },
            None => AgeSource::Days {
                column: pick(
                    "QUERY_RISK_AGE_COLUMN",
                    overrides.age_column.as_ref(),
                    DEFAULT_AGE_COLUMN,
                ),
            },
        };
        let roles = ColumnRoles {
            key: pick(
                "QUERY_RISK_KEY_COLUMN",
                overrides.key_column.as_ref(),
                DEFAULT_KEY_COLUMN,
            ),
            status: pick(
                "QUERY_RISK_STATUS_COLUMN",
                overrides.status_column.as_ref(),
                DEFAULT_STATUS_COLUMN,
            ),
            age,
        };

        // An explicitly empty group column disables the per-folder breakdown.
        let group = match lookup("QUERY_RISK_SECONDARY_GROUP_COLUMN")
            .or_else(|| overrides.secondary_group_column.clone())
        {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(value.trim().to_string()),
            None => Some(DEFAULT_GROUP_COLUMN.to_string()),
        };
        let secondary_roles = SecondaryRoles {
            key: pick(
                "QUERY_RISK_SECONDARY_KEY_COLUMN",
                overrides.secondary_key_column.as_ref(),
                DEFAULT_KEY_COLUMN,
            ),
            group,
        };

        let defaults = WeightPolicy::default();
        let weights = WeightPolicy {
            with_secondary: overrides
                .weights_with_secondary
                .unwrap_or(defaults.with_secondary),
            primary_only: overrides
                .weights_primary_only
                .unwrap_or(defaults.primary_only),
        };
        validate_weights("weights_with_secondary", &weights.with_secondary)?;
        validate_weights("weights_primary_only", &weights.primary_only)?;

        let max_body_bytes = match var("QUERY_RISK_MAX_BODY_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("QUERY_RISK_MAX_BODY_BYTES must be a byte count, got {raw:?}"))?,
            None => overrides.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
        };
        if max_body_bytes == 0 {
            anyhow::bail!("QUERY_RISK_MAX_BODY_BYTES must be greater than zero");
        }

        Ok(Self {
            roles,
            secondary_roles,
            weights,
            option_columns: overrides.option_columns.unwrap_or_default(),
            max_body_bytes,
        })
    }
}

fn validate_weights(label: &str, weights: &RiskWeights) -> Result<()> {
    let values = [weights.open, weights.age, weights.secondary];
    if values.iter().any(|value| !value.is_finite()) {
        anyhow::bail!("{label} must only contain finite numbers");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_query_export_layout() -> Result<()> {
        let config = EngineConfig::from_lookup(lookup(&[]), None)?;
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.roles.key, "Subjects");
        assert_eq!(config.secondary_roles.group.as_deref(), Some("Folders"));
        Ok(())
    }

    #[test]
    fn created_column_switches_to_derived_ages() -> Result<()> {
        let config = EngineConfig::from_lookup(
            lookup(&[("QUERY_RISK_CREATED_COLUMN", " Query Open Date ")]),
            None,
        )?;
        assert_eq!(
            config.roles.age,
            AgeSource::CreatedDate {
                column: "Query Open Date".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn env_wins_over_setup_file() -> Result<()> {
        let overrides: SetupConfigOverrides = serde_json::from_str(
            r#"{
                "key_column": "Participant",
                "status_column": "State",
                "weights_with_secondary": {"open": 3.0, "age": 0.5, "secondary": 2.0},
                "option_columns": ["Visits"]
            }"#,
        )?;
        let config = EngineConfig::from_lookup(
            lookup(&[("QUERY_RISK_KEY_COLUMN", "Subject ID")]),
            Some(&overrides),
        )?;
        assert_eq!(config.roles.key, "Subject ID");
        assert_eq!(config.roles.status, "State");
        assert_eq!(config.weights.with_secondary.open, 3.0);
        assert_eq!(config.weights.primary_only, RiskWeights::PRIMARY_ONLY);
        assert_eq!(config.option_columns, vec!["Visits".to_string()]);
        Ok(())
    }

    #[test]
    fn empty_group_column_disables_folder_breakdown() -> Result<()> {
        let config = EngineConfig::from_lookup(
            lookup(&[("QUERY_RISK_SECONDARY_GROUP_COLUMN", " ")]),
            None,
        )?;
        assert_eq!(config.secondary_roles.group, None);
        Ok(())
    }

    #[test]
    fn rejects_unparseable_body_limit() {
        let err = EngineConfig::from_lookup(lookup(&[("QUERY_RISK_MAX_BODY_BYTES", "lots")]), None);
        assert!(err.is_err());
        let err = EngineConfig::from_lookup(lookup(&[("QUERY_RISK_MAX_BODY_BYTES", "0")]), None);
        assert!(err.is_err());
    }

    #[test]
    fn setup_path_defaults_to_working_directory() {
        assert_eq!(
            setup_config_path(&lookup(&[])),
            PathBuf::from("query-risk.json")
        );
        assert_eq!(
            setup_config_path(&lookup(&[("QUERY_RISK_SETUP_CONFIG_PATH", "/etc/qr.json")])),
            PathBuf::from("/etc/qr.json")
        );
    }

    #[test]
    fn unreadable_setup_file_falls_back_to_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("query-risk.json");
        std::fs::write(&path, "{ not json")?;
        assert!(load_setup_config_overrides(&path).is_none());
        assert!(load_setup_config_overrides(&temp.path().join("absent.json")).is_none());
        Ok(())
    }
}
