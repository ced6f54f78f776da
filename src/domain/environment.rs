//! Deployment environment classification.

use std::fmt;

/// Deployment context the binary was launched in.
///
/// Only the local development context disables asset caching; custom named
/// contexts (`staging`, `preview`, ...) behave like production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEnvironment {
    Development,
    Production,
    Named(String),
}

impl DeployEnvironment {
    /// Parse a configured environment name. Never fails: unknown names are
    /// carried verbatim as [`DeployEnvironment::Named`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            "production" | "prod" => Self::Production,
            other => Self::Named(other.to_string()),
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Named(name) => name,
        }
    }
}

impl fmt::Display for DeployEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognises_development_spellings() {
        assert!(DeployEnvironment::parse("development").is_development());
        assert!(DeployEnvironment::parse("dev").is_development());
        assert!(DeployEnvironment::parse("  Development ").is_development());
    }

    #[test]
    fn parse_recognises_production_spellings() {
        assert_eq!(
            DeployEnvironment::parse("production"),
            DeployEnvironment::Production
        );
        assert_eq!(
            DeployEnvironment::parse("PROD"),
            DeployEnvironment::Production
        );
    }

    #[test]
    fn custom_names_are_not_development() {
        let staging = DeployEnvironment::parse("staging");
        assert_eq!(staging, DeployEnvironment::Named("staging".to_string()));
        assert!(!staging.is_development());
    }
}
