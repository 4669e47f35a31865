//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! ssh command channel, bulk sync, the cloud API client, settings files and
//! terminal prompts.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod digitalocean;
pub mod prompt;
pub mod rsync;
pub mod ssh;
