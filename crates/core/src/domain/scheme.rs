// Scheme - named strategy requested for a job

use serde::{Deserialize, Serialize};

/// Cryptographic or compression strategy requested for a job.
///
/// Parsing never fails: unknown identifiers are kept as `Other` so the factory
/// registry is the single place that accepts or rejects a scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Scheme {
    Pgp,
    Hybrid,
    Zstd,
    Gzip,
    Other(String),
}

impl Scheme {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "PGP" => Scheme::Pgp,
            "HYBRID" => Scheme::Hybrid,
            "ZSTD" => Scheme::Zstd,
            "GZIP" => Scheme::Gzip,
            _ => Scheme::Other(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Scheme::Pgp => "PGP",
            Scheme::Hybrid => "HYBRID",
            Scheme::Zstd => "ZSTD",
            Scheme::Gzip => "GZIP",
            Scheme::Other(s) => s,
        }
    }
}

impl From<String> for Scheme {
    fn from(s: String) -> Self {
        Scheme::parse(&s)
    }
}

impl From<&str> for Scheme {
    fn from(s: &str) -> Self {
        Scheme::parse(s)
    }
}

impl From<Scheme> for String {
    fn from(s: Scheme) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
