pub mod demo;
pub mod migrate;
pub mod show;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;
