use crate::config::EngineConfig;
use crate::services::table::Table;
use crate::state::AppState;
use serde_json::json;

pub fn test_state() -> AppState {
    AppState::new(EngineConfig::default())
}

/// Three queries over two subjects, ages 5, 20 and 40 days.
pub fn sample_queries() -> Table {
    Table::new(
        vec![
            "Subjects".to_string(),
            "QueryStatus".to_string(),
            "DaysNotYetClosed".to_string(),
            "Visits".to_string(),
        ],
        vec![
            vec![json!("A"), json!("Open"), json!(5), json!("Baseline")],
            vec![json!("A"), json!("Closed"), json!(20), json!("Week 4")],
            vec![json!("B"), json!("Open"), json!(40), json!("Baseline")],
        ],
    )
}
