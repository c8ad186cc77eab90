//! Trait seams for external collaborators.
//!
//! The codec treats everything around it as narrow contracts: an
//! authenticator that issues an opaque session credential, and a
//! corrector that turns one reviewable text unit into candidate edits.
//! Transport, retry policy, and UI belong to the implementations, not
//! here.

use anyhow::Result;

use crate::analyze::TextUnit;
use crate::patch::Correction;

/// Opaque session credential. The codec never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Issues and validates session credentials.
pub trait Authenticator {
    fn issue(&self, password: &str) -> Result<SessionToken>;
    fn validate(&self, token: &SessionToken) -> bool;
}

/// Reviews one text unit and proposes corrections for it. The returned
/// corrections carry the unit's page index and shape id so they can be
/// routed back to the right slide at patch time.
pub trait Corrector {
    fn review(&self, unit: &TextUnit) -> Result<Vec<Correction>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct FixedPassword(&'static str);

    impl Authenticator for FixedPassword {
        fn issue(&self, password: &str) -> Result<SessionToken> {
            if password != self.0 {
                bail!("wrong password");
            }
            Ok(SessionToken::new(format!("session-for-{password}")))
        }

        fn validate(&self, token: &SessionToken) -> bool {
            token.as_str().starts_with("session-for-")
        }
    }

    #[test]
    fn token_stays_opaque_to_the_caller() {
        let auth = FixedPassword("letmein");
        assert!(auth.issue("nope").is_err());
        let token = auth.issue("letmein").unwrap();
        assert!(auth.validate(&token));
    }
}
