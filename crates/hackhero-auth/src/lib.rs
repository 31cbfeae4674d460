//! HackHero accounts
//!
//! Password hashing sits behind `CredentialVerifier` so the store never sees
//! a plaintext password and tests can swap in a cheap verifier.
//! Role checks stop at reporting `is_admin`; gating routes on it is the
//! caller's job.

pub mod accounts;
pub mod credentials;

pub use accounts::{AccountError, Accounts};
pub use credentials::{Argon2Verifier, CredentialVerifier};
