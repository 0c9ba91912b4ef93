use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

use crate::config::Config;

const SERVICE: &str = "mail_digest";
pub const PASSWORD_ENV: &str = "MAIL_DIGEST_PASSWORD";

/// Save the mailbox password into the OS keyring, keyed by address
pub fn save_password(address: &str, password: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, address);
    entry?
        .set_password(password)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load the mailbox password from the keyring by address
pub fn load_password(address: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, address);
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Password from config, then keyring, then `MAIL_DIGEST_PASSWORD`.
pub fn resolve_password(cfg: &Config) -> Result<String> {
    if let Some(p) = cfg.password.as_ref().filter(|p| !p.is_empty()) {
        return Ok(p.clone());
    }
    match load_password(&cfg.email_address) {
        Ok(Some(p)) => return Ok(p),
        Ok(None) => {}
        // a missing secret service is not fatal when the env var is set
        Err(e) => log::warn!("keyring lookup failed: {e}"),
    }
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            anyhow!(
                "no password for {}: set it in config, run `set-password`, or export {PASSWORD_ENV}",
                cfg.email_address
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_password_prefers_config() {
        let cfg = Config {
            email_address: "me@x.io".into(),
            imap_host: "imap.x.io".into(),
            imap_port: None,
            smtp_host: "smtp.x.io".into(),
            smtp_port: None,
            password: Some("from-config".into()),
            wrap_width: None,
        };
        assert_eq!(resolve_password(&cfg).unwrap(), "from-config");
    }
}
