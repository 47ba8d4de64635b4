pub mod response; // JSON error bodies
pub mod validator; // Email normalization and syntax checks
