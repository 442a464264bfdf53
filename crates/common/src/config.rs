use std::env;

/// Deployment environment of a detector process, selected by the
/// `ENVIRONMENT` variable. Only log formatting depends on it: pretty
/// human-readable output in development, JSON lines in production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn from_env() -> Self {
        Self::parse(&env::var("ENVIRONMENT").unwrap_or_default())
    }

    /// Anything that isn't a production alias falls back to
    /// development, the pretty-logging default.
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}
