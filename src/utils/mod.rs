pub mod bet_tracker;
pub mod data;
pub mod features;
pub mod odds;
pub mod parlay;
pub mod sample;
pub mod sentiment;
pub mod teams;
pub mod value_bets;
