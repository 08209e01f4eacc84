pub mod alias;
pub mod commands;
pub mod config;
pub mod ledger;
pub mod metadata;
pub mod remote;
pub mod resolver;
pub mod shared;
