//! SAML 2.0 security-token handler.
//!
//! Builds signed SAML 2.0 assertions from a caller-supplied claims identity,
//! and reads, verifies and validates incoming assertions, converting them
//! into a [`ClaimsIdentity`](claims::ClaimsIdentity).
//!
//! The crate does not speak HTTP, does not own a database connection, and
//! does not implement XML canonicalization to the letter of the exclusive
//! C14N algorithm; those are genuine collaborators ([`xml`], [`canonical`],
//! [`key`]) that a host wires in, with conservative default implementations
//! provided for convenience.
//!
//! Entry point: [`handler::Saml2TokenHandler`].

pub mod actor;
pub mod attributes;
pub mod audience;
pub mod builder;
pub mod canonical;
pub mod claims;
pub mod config;
pub mod conditions;
pub mod error;
pub mod handler;
pub mod issuer;
pub mod key;
pub mod key_resolver;
pub mod lifetime;
pub mod model;
pub mod reader;
pub mod serializer;
pub mod signature;
pub mod subject;
pub mod translator;
pub mod xml;

pub use claims::{Claim, ClaimsIdentity};
pub use config::{HandlerConfig, TokenDescriptor, ValidationParameters, ValidationParametersBuilder};
pub use error::SamlError;
pub use handler::{Saml2TokenHandler, ValidatedToken};
pub use model::Assertion;
