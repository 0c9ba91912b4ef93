use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_WRAP_WIDTH: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub email_address: String,
    pub imap_host: String,
    pub imap_port: Option<u16>,
    pub smtp_host: String,
    pub smtp_port: Option<u16>,
    /// Plain-text password. Prefer the keyring (`set-password`).
    pub password: Option<String>,
    /// Column width used when rendering HTML bodies to text.
    pub wrap_width: Option<usize>,
}

impl Config {
    pub fn imap_port(&self) -> u16 {
        self.imap_port.unwrap_or(DEFAULT_IMAP_PORT)
    }

    pub fn smtp_port(&self) -> u16 {
        self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT)
    }

    pub fn wrap_width(&self) -> usize {
        self.wrap_width.unwrap_or(DEFAULT_WRAP_WIDTH)
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("mail_digest"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(s)?;
    if cfg.email_address.trim().is_empty() {
        return Err(anyhow::anyhow!("email_address must not be empty"));
    }
    Ok(cfg)
}

pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        // create a template config for users to edit
        let sample = Config {
            email_address: "you@example.com".to_string(),
            imap_host: "imap.example.com".to_string(),
            imap_port: Some(DEFAULT_IMAP_PORT),
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: Some(DEFAULT_SMTP_PORT),
            password: None,
            wrap_width: Some(DEFAULT_WRAP_WIDTH),
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(&path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {}. Edit it and run again",
            path.display()
        ));
    }
    log::debug!("loading config from {}", path.display());
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}
