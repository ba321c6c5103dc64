//! API keys and bot tokens are read from environment variables and kept as
//! [`SecretString`] so they never end up in logs or `Debug` output.

use anyhow::Result;
use secrecy::SecretString;

/// Read a secret from the environment variable `var`.
///
/// Returns `Ok(None)` if the variable is unset or blank.
/// Returns `Err` if the variable holds invalid unicode.
pub fn env_secret(var: &str) -> Result<Option<SecretString>> {
    match std::env::var(var) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(SecretString::new(value.trim().to_string().into()))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(anyhow::anyhow!("Environment variable {var} is not valid: {err}")),
    }
}

/// Read a secret that must be present.
pub fn require_env_secret(var: &str) -> Result<SecretString> {
    env_secret(var)?.ok_or_else(|| anyhow::anyhow!("{var} environment variable is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn missing_variable_is_none() -> Result<()> {
        assert!(env_secret("WORTHWATCH_TEST_SURELY_UNSET_VAR")?.is_none());
        Ok(())
    }

    #[test]
    fn require_reports_variable_name() {
        let err = require_env_secret("WORTHWATCH_TEST_SURELY_UNSET_VAR").unwrap_err();
        assert!(err.to_string().contains("WORTHWATCH_TEST_SURELY_UNSET_VAR"));
    }

    #[test]
    fn present_variable_is_trimmed() -> Result<()> {
        std::env::set_var("WORTHWATCH_TEST_SECRET_PRESENT", "  token-123 ");
        let secret = env_secret("WORTHWATCH_TEST_SECRET_PRESENT")?.expect("secret should be set");
        assert_eq!(secret.expose_secret(), "token-123");
        Ok(())
    }
}
