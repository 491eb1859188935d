pub mod age_derivation;
pub mod aging;
pub mod column_roles;
pub mod dashboard;
pub mod filter;
pub mod kpis;
pub mod missing_pages;
pub mod records;
pub mod risk_ranking;
pub mod table;
