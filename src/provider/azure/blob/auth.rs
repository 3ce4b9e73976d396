//! # Azure Blob Authentication
//!
//! Resolves the shared access signature used to sign every request.

use super::AzureBlobConfig;
use crate::config::Environment;
use crate::constants::ENV_AZURE_SAS_TOKEN;
use crate::error::{ArtifactError, ArtifactErrorKind, Operation};
use crate::provider::BackendKind;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// SAS token from the configuration, falling back to `AZURE_STORAGE_SAS_TOKEN`
///
/// A leading `?` (as copied from the portal) is dropped so the token can be
/// used directly as a query string.
pub fn resolve_sas_token(
    config: &AzureBlobConfig,
    env: &dyn Environment,
) -> Result<SecretString, ArtifactError> {
    let raw = match &config.sas_token {
        Some(token) if !token.expose_secret().is_empty() => token.expose_secret().to_string(),
        _ => env.var(ENV_AZURE_SAS_TOKEN).ok_or_else(|| {
            ArtifactError::new(
                ArtifactErrorKind::Authentication,
                BackendKind::AzureBlob,
                Operation::Connect,
                config.container.as_str(),
                format!("no SAS token configured: set {ENV_AZURE_SAS_TOKEN}"),
            )
        })?,
    };

    let token = raw.trim().trim_start_matches('?');
    if token.is_empty() {
        return Err(ArtifactError::new(
            ArtifactErrorKind::Authentication,
            BackendKind::AzureBlob,
            Operation::Connect,
            config.container.as_str(),
            "SAS token is empty",
        ));
    }

    debug!("Resolved SAS token for container {}", config.container);
    Ok(SecretString::from(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(sas_token: Option<&str>) -> AzureBlobConfig {
        AzureBlobConfig {
            account_url: "https://acct.blob.core.windows.net".to_string(),
            container: "packs".to_string(),
            sas_token: sas_token.map(|t| SecretString::from(t.to_string())),
        }
    }

    #[test]
    fn test_explicit_token_wins_and_question_mark_is_dropped() {
        let env = HashMap::from([(ENV_AZURE_SAS_TOKEN.to_string(), "sv=env".to_string())]);
        let token = resolve_sas_token(&config(Some("?sv=explicit&sig=abc")), &env).unwrap();
        assert_eq!(token.expose_secret(), "sv=explicit&sig=abc");
    }

    #[test]
    fn test_falls_back_to_environment() {
        let env = HashMap::from([(ENV_AZURE_SAS_TOKEN.to_string(), "sv=env&sig=xyz".to_string())]);
        let token = resolve_sas_token(&config(None), &env).unwrap();
        assert_eq!(token.expose_secret(), "sv=env&sig=xyz");
    }

    #[test]
    fn test_missing_token_is_authentication_error() {
        let err = resolve_sas_token(&config(None), &HashMap::new()).unwrap_err();
        assert_eq!(err.kind, ArtifactErrorKind::Authentication);
        assert!(err.message.contains(ENV_AZURE_SAS_TOKEN));

        let err = resolve_sas_token(&config(Some("?")), &HashMap::new()).unwrap_err();
        assert_eq!(err.kind, ArtifactErrorKind::Authentication);
    }
}
