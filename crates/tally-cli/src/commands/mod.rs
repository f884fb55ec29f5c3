//! Command implementations.

pub mod config;
pub mod load;
pub mod report;
pub mod run;
pub mod status;

pub use self::config::execute_config;
pub use self::load::execute_load;
pub use self::report::execute_report;
pub use self::run::execute_run;
pub use self::status::execute_status;
