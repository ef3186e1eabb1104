use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use crate::BrokerError;

const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 32;

/// PKCE code verifier. Debug output is redacted and there is no Display impl,
/// so the value only leaves the process through the token request body.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodeVerifier(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct PkcePair {
    pub code_verifier: CodeVerifier,
    pub code_challenge: String,
}

impl PkcePair {
    pub fn generate() -> Result<Self, BrokerError> {
        Ok(Self::from_verifier(generate_verifier()?))
    }

    pub fn from_verifier(code_verifier: CodeVerifier) -> Self {
        let code_challenge = derive_challenge(code_verifier.secret());
        Self {
            code_verifier,
            code_challenge,
        }
    }
}

/// 32 random bytes, base64url-encoded: 43 characters of the unreserved set.
pub fn generate_verifier() -> Result<CodeVerifier, BrokerError> {
    let bytes = random_bytes::<VERIFIER_BYTES>()?;
    Ok(CodeVerifier(URL_SAFE_NO_PAD.encode(bytes)))
}

pub fn derive_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Anti-CSRF state token. Drawn separately from the verifier.
pub fn generate_state() -> Result<String, BrokerError> {
    let bytes = random_bytes::<STATE_BYTES>()?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Short, non-reversible tag for correlating a state in logs.
pub(crate) fn fingerprint(state: &str) -> String {
    let digest = Sha256::digest(state.as_bytes());
    digest[..4].iter().map(|byte| format!("{byte:02x}")).collect()
}

fn random_bytes<const N: usize>() -> Result<[u8; N], BrokerError> {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| BrokerError::OsRng {
            message: err.to_string(),
        })?;
    Ok(bytes)
}
