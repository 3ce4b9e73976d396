//! # TLS Verification Settings
//!
//! Accepts either a boolean or a CA bundle path at the configuration
//! boundary and turns it into a tagged value.

use super::ConfigurationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

/// How server certificates are verified
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VerifySsl {
    /// Accept any certificate (XSOAR installs often use self-signed ones)
    #[default]
    Disabled,
    /// Verify against the bundled webpki roots
    Enabled,
    /// Verify against the PEM bundle at this path, kept verbatim
    CustomCaBundle(PathBuf),
}

impl VerifySsl {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, VerifySsl::Disabled)
    }

    /// Apply the setting to a reqwest client builder
    pub fn apply(
        &self,
        builder: reqwest::ClientBuilder,
    ) -> Result<reqwest::ClientBuilder, ConfigurationError> {
        match self {
            VerifySsl::Disabled => Ok(builder.danger_accept_invalid_certs(true)),
            VerifySsl::Enabled => Ok(builder),
            VerifySsl::CustomCaBundle(path) => {
                let pem = std::fs::read(path).map_err(|source| ConfigurationError::CaBundle {
                    path: path.clone(),
                    source,
                })?;
                let certificates = reqwest::Certificate::from_pem_bundle(&pem).map_err(|source| {
                    ConfigurationError::InvalidCaBundle {
                        path: path.clone(),
                        source,
                    }
                })?;
                Ok(certificates
                    .into_iter()
                    .fold(builder, reqwest::ClientBuilder::add_root_certificate))
            }
        }
    }
}

impl From<bool> for VerifySsl {
    fn from(value: bool) -> Self {
        if value {
            VerifySsl::Enabled
        } else {
            VerifySsl::Disabled
        }
    }
}

impl From<PathBuf> for VerifySsl {
    fn from(path: PathBuf) -> Self {
        VerifySsl::CustomCaBundle(path)
    }
}

impl std::str::FromStr for VerifySsl {
    type Err = std::convert::Infallible;

    /// `true`/`false` (any case) map to the flags, anything else is a CA bundle path
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "true" => VerifySsl::Enabled,
            "false" => VerifySsl::Disabled,
            _ => VerifySsl::CustomCaBundle(PathBuf::from(s)),
        })
    }
}

/// Wire shape: `true`, `false` or `"/path/to/ca.pem"`
#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum RawVerifySsl {
    Flag(bool),
    Path(PathBuf),
}

impl<'de> Deserialize<'de> for VerifySsl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawVerifySsl::deserialize(deserializer)? {
            RawVerifySsl::Flag(flag) => flag.into(),
            RawVerifySsl::Path(path) => path.into(),
        })
    }
}

impl Serialize for VerifySsl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            VerifySsl::Disabled => RawVerifySsl::Flag(false),
            VerifySsl::Enabled => RawVerifySsl::Flag(true),
            VerifySsl::CustomCaBundle(path) => RawVerifySsl::Path(path.clone()),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disabled() {
        assert_eq!(VerifySsl::default(), VerifySsl::Disabled);
        assert!(!VerifySsl::default().is_enabled());
    }

    #[test]
    fn test_deserialize_flag_and_path() {
        let parsed: VerifySsl = serde_json::from_str("true").unwrap();
        assert_eq!(parsed, VerifySsl::Enabled);

        let parsed: VerifySsl = serde_json::from_str("false").unwrap();
        assert_eq!(parsed, VerifySsl::Disabled);

        let parsed: VerifySsl = serde_json::from_str("\"/etc/ssl/corp-ca.pem\"").unwrap();
        assert_eq!(
            parsed,
            VerifySsl::CustomCaBundle(PathBuf::from("/etc/ssl/corp-ca.pem"))
        );
    }

    #[test]
    fn test_serialize_round_shape() {
        assert_eq!(serde_json::to_string(&VerifySsl::Enabled).unwrap(), "true");
        assert_eq!(
            serde_json::to_string(&VerifySsl::CustomCaBundle(PathBuf::from("ca.pem"))).unwrap(),
            "\"ca.pem\""
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!("TRUE".parse::<VerifySsl>().unwrap(), VerifySsl::Enabled);
        assert_eq!("false".parse::<VerifySsl>().unwrap(), VerifySsl::Disabled);
        assert_eq!(
            "./certs/ca.pem".parse::<VerifySsl>().unwrap(),
            VerifySsl::CustomCaBundle(PathBuf::from("./certs/ca.pem"))
        );
    }

    #[test]
    fn test_missing_ca_bundle_is_configuration_error() {
        let setting = VerifySsl::CustomCaBundle(PathBuf::from("/nonexistent/ca.pem"));
        let result = setting.apply(reqwest::Client::builder());
        assert!(matches!(result, Err(ConfigurationError::CaBundle { .. })));
    }
}
