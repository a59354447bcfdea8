use std::str::FromStr;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use serde::Deserialize;
use tracing::{error, warn};

/// Argon2 work-factor profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashCost {
    /// Argon2's minimum parameters. Only for tests and local development.
    Min,
    /// The `argon2` crate's recommended parameters.
    Default,
}

impl FromStr for HashCost {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" | "minimum" | "test" => Ok(HashCost::Min),
            "default" | "production" => Ok(HashCost::Default),
            other => Err(format!("unknown hash cost {other:?}")),
        }
    }
}

/// Hashes passwords and confirmation tokens, and checks candidates against
/// stored digests.
#[derive(Debug, Clone, Copy)]
pub struct CredentialStore {
    cost: HashCost,
}

impl CredentialStore {
    pub fn new(cost: HashCost) -> Self {
        Self { cost }
    }

    fn hasher(&self) -> anyhow::Result<Argon2<'static>> {
        let params = match self.cost {
            HashCost::Default => Params::default(),
            HashCost::Min => Params::new(
                Params::MIN_M_COST,
                Params::MIN_T_COST,
                Params::MIN_P_COST,
                None,
            )
            .map_err(|e| anyhow::anyhow!(e.to_string()))?,
        };
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Returns a salted PHC digest; hashing the same input twice yields
    /// different digests.
    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()?
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `false` when there is no digest or the digest can't be parsed.
    pub fn verify(&self, candidate: &str, digest: Option<&str>) -> bool {
        let Some(digest) = digest else {
            return false;
        };
        let parsed = match PasswordHash::new(digest) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "argon2 parse hash error");
                return false;
            }
        };
        // Parameters come from the digest itself, so any profile verifies.
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }
}
