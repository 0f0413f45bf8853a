//! Client core of the Amplia volunteering platform: identity and access
//! control, the platform API client, paged directory state and form checks.

pub mod api;
pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod validation;
