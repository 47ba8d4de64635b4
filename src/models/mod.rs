pub mod account;
pub mod session;

// re-export types from parent modules
pub use account::{Account, Role};
pub use session::Session;
