pub mod app_state;
pub mod session_cleanup;
pub mod startup;
