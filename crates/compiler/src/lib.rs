//! gateforge compiler facade.

#[cfg(feature = "cli")]
pub mod cli;
pub mod eval;
pub mod pipeline;
pub mod session;

#[cfg(feature = "cli")]
pub use cli::*;
pub use eval::*;
pub use pipeline::*;
pub use session::*;
