use anyhow::Context;
use serde_json::json;

use crate::auth::KeyDeriver;
use crate::cli::client::ApiClient;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::services::looks_like_email;
use crate::types::normalize_email;

/// GET /health; exits non-zero when the store is down
pub async fn health(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let (status, body) = client.get_with_status("/health").await?;
    let data = &body["data"];

    match output_format {
        OutputFormat::Json => output_json(&body)?,
        OutputFormat::Text => {
            println!("Server:    {}", client.base_url());
            println!("Status:    {}", field(data, "status"));
            println!("Store:     {}", field(data, "store"));
            println!("Timestamp: {}", field(data, "timestamp"));
        }
    }

    if !status.is_success() {
        anyhow::bail!("server reported {} ({})", status, field(&body, "error"));
    }
    Ok(())
}

/// POST /api/getModLink
pub async fn link(client: &ApiClient, email: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let data = client.post("/api/getModLink", &json!({ "email": email })).await?;

    match output_format {
        OutputFormat::Json => output_json(&data),
        OutputFormat::Text => {
            println!("{}", field(&data, "link"));
            Ok(())
        }
    }
}

/// Offline key derivation; must use the same secret as the server
pub fn key(email: &str, secret: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    if !looks_like_email(email) {
        anyhow::bail!("'{}' is not a valid email address", email);
    }
    let deriver = KeyDeriver::from_config(secret).context("set MOD_LINK_SECRET or pass --secret")?;
    let email = normalize_email(email);
    let key = deriver.derive(&email);

    match output_format {
        OutputFormat::Json => output_json(&json!({ "email": email, "key": key })),
        OutputFormat::Text => {
            println!("{}", key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_rejects_malformed_email() {
        let err = key("not-an-email", Some("test-secret"), OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("not a valid email"));
    }

    #[test]
    fn key_requires_secret() {
        let err = key("ann@nowak.pl", None, OutputFormat::Text).unwrap_err();
        assert!(err.to_string().contains("MOD_LINK_SECRET"));
    }

    #[test]
    fn key_accepts_padded_email() {
        assert!(key("  Ann@Nowak.PL ", Some("test-secret"), OutputFormat::Json).is_ok());
    }
}
