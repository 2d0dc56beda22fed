//! Command handlers, one per subcommand

pub mod migrate;
pub mod poll;
pub mod seed;
pub mod serve;
pub mod token;
pub mod trigger;

pub use migrate::MigrateCommandHandler;
pub use poll::PollCommandHandler;
pub use seed::SeedCommandHandler;
pub use serve::ServeCommandHandler;
pub use token::TokenCommandHandler;
pub use trigger::TriggerCommandHandler;
