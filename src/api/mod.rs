pub mod espn_api;
pub mod llm_api;
pub mod odds_api;
