//! Authentication service models

pub mod account;
pub mod program;
pub mod session;

// Re-export for convenience
pub use account::{Account, AccountResponse, NewAccount, Role, VerificationState};
pub use program::{Program, ProgramCatalog, ProgramVersionRow};
pub use session::Session;
