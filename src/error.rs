use thiserror::Error;

/// An alias table could not be built from the given pairs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected `{external}` to start with http:// or https://")]
pub struct InvalidConfiguration {
    pub external: String,
}
