//! Secret resolution for oracle credentials.

pub mod secret_store;

pub use secret_store::{SecretError, SecretStore};
