use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::services::table::Table;

pub const QUERIES_TABLE: &str = "queries";
pub const MISSING_PAGES_TABLE: &str = "missing_pages";

pub const DEFAULT_KEY_COLUMN: &str = "Subjects";
pub const DEFAULT_STATUS_COLUMN: &str = "QueryStatus";
pub const DEFAULT_AGE_COLUMN: &str = "DaysNotYetClosed";
pub const DEFAULT_GROUP_COLUMN: &str = "Folders";

/// Where a query's age comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgeSource {
    /// Column already holding the age in days.
    Days { column: String },
    /// Column holding the creation date; age is derived against the reference time.
    CreatedDate { column: String },
}

impl AgeSource {
    pub fn column(&self) -> &str {
        match self {
            Self::Days { column } | Self::CreatedDate { column } => column,
        }
    }

    fn role(&self) -> &'static str {
        match self {
            Self::Days { .. } => "age_days",
            Self::CreatedDate { .. } => "created_date",
        }
    }
}

/// Column-role mapping for the queries table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ColumnRoles {
    pub key: String,
    pub status: String,
    pub age: AgeSource,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY_COLUMN.to_string(),
            status: DEFAULT_STATUS_COLUMN.to_string(),
            age: AgeSource::Days {
                column: DEFAULT_AGE_COLUMN.to_string(),
            },
        }
    }
}

/// Column indices for a validated [`ColumnRoles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRoles {
    pub key: usize,
    pub status: usize,
    pub age: usize,
}

impl ColumnRoles {
    /// Checks every role against the table before any row is read.
    pub fn resolve(&self, table: &Table) -> Result<ResolvedRoles, DashboardError> {
        Ok(ResolvedRoles {
            key: require_column(table, QUERIES_TABLE, "key", &self.key)?,
            status: require_column(table, QUERIES_TABLE, "status", &self.status)?,
            age: require_column(table, QUERIES_TABLE, self.age.role(), self.age.column())?,
        })
    }
}

/// Column-role mapping for the missing-pages table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SecondaryRoles {
    pub key: String,
    /// Optional column to break missing pages down by (folder, form, visit).
    #[serde(default)]
    pub group: Option<String>,
}

impl Default for SecondaryRoles {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY_COLUMN.to_string(),
            group: Some(DEFAULT_GROUP_COLUMN.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSecondaryRoles {
    pub key: usize,
    pub group: Option<usize>,
}

impl SecondaryRoles {
    pub fn resolve(&self, table: &Table) -> Result<ResolvedSecondaryRoles, DashboardError> {
        let key = require_column(table, MISSING_PAGES_TABLE, "key", &self.key)?;
        let group = self
            .group
            .as_deref()
            .map(|column| require_column(table, MISSING_PAGES_TABLE, "group", column))
            .transpose()?;
        Ok(ResolvedSecondaryRoles { key, group })
    }
}

pub(crate) fn require_column(
    table: &Table,
    table_name: &str,
    role: &str,
    column: &str,
) -> Result<usize, DashboardError> {
    table
        .column_index(column)
        .ok_or_else(|| DashboardError::missing_column(table_name, role, column.trim()))
}
