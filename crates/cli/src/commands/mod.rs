//! Command implementations.

mod info;
mod refresh;
mod run;
mod source;
mod validate;

pub use info::run_info;
pub use refresh::run_refresh;
pub use run::run_pipeline;
pub use validate::run_validate;
