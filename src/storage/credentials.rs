use std::fmt;

/// How upload credentials are obtained. Selected once from configuration.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// Assume the role and upload with its temporary session credentials
    AssumeRole { role_arn: String },
    /// Explicit access key pair
    StaticKeys {
        access_key_id: String,
        secret_access_key: String,
    },
    /// Default credential chain of the environment (env vars, profile,
    /// instance or task role)
    Ambient,
}

impl CredentialStrategy {
    /// Pick a strategy by precedence: role, then a complete key pair, then
    /// the ambient chain. A key without its secret is ignored.
    pub fn select(
        iam_role: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    ) -> Self {
        match (iam_role, access_key_id, secret_access_key) {
            (Some(role_arn), _, _) => Self::AssumeRole { role_arn },
            (None, Some(access_key_id), Some(secret_access_key)) => Self::StaticKeys {
                access_key_id,
                secret_access_key,
            },
            _ => Self::Ambient,
        }
    }

    /// Human-readable description without secrets
    pub fn describe(&self) -> String {
        match self {
            Self::AssumeRole { role_arn } => format!("assume_role({role_arn})"),
            Self::StaticKeys { access_key_id, .. } => format!("static_keys({access_key_id})"),
            Self::Ambient => "ambient".to_string(),
        }
    }
}

impl fmt::Debug for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssumeRole { role_arn } => f
                .debug_struct("AssumeRole")
                .field("role_arn", role_arn)
                .finish(),
            Self::StaticKeys { access_key_id, .. } => f
                .debug_struct("StaticKeys")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"***")
                .finish(),
            Self::Ambient => f.write_str("Ambient"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn role_takes_precedence_over_keys() {
        let strategy = CredentialStrategy::select(
            some("arn:aws:iam::123456789012:role/backfill"),
            some("AKIA"),
            some("secret"),
        );
        assert!(matches!(strategy, CredentialStrategy::AssumeRole { .. }));
    }

    #[test]
    fn complete_key_pair_selects_static_keys() {
        let strategy = CredentialStrategy::select(None, some("AKIA"), some("secret"));
        assert_eq!(
            strategy,
            CredentialStrategy::StaticKeys {
                access_key_id: "AKIA".into(),
                secret_access_key: "secret".into(),
            }
        );
    }

    #[test]
    fn partial_key_pair_falls_back_to_ambient() {
        assert_eq!(
            CredentialStrategy::select(None, some("AKIA"), None),
            CredentialStrategy::Ambient
        );
        assert_eq!(CredentialStrategy::select(None, None, None), CredentialStrategy::Ambient);
    }

    #[test]
    fn debug_output_masks_secret() {
        let strategy = CredentialStrategy::select(None, some("AKIA"), some("hunter2"));
        let rendered = format!("{strategy:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("AKIA"));
    }
}
