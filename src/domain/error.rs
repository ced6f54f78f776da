use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("remote image source `{url}` matches no trusted host pattern")]
    UntrustedSource { url: String },
}

impl DomainError {
    pub fn untrusted_source(source: impl Into<String>) -> Self {
        Self::UntrustedSource {
            url: source.into(),
        }
    }
}
