pub mod commands;
pub mod context;
pub mod logging;
pub mod printer;
pub mod repl;
pub mod store_watcher;

pub use context::CliContext;
pub use repl::readline;
