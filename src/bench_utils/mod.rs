pub mod participant_view;
pub mod results_table;
pub mod run_stats;
pub mod verification;
