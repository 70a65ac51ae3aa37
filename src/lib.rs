pub mod batch;
pub mod binding;
pub mod classify;
pub mod collect;
pub mod commands;
pub mod config;
pub mod edit;
pub mod error;
pub mod gradle;
pub mod kotlin;
pub mod layout;
pub mod migrate;
pub mod module;
pub mod notify;
pub mod resource;
pub mod status;
