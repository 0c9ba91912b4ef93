use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

use mail_digest::auth::credentials;
use mail_digest::config::{Config, load_config};
use mail_digest::domain::email::OutgoingEmail;
use mail_digest::mail::clean::clean;
use mail_digest::mail::decoders::decode_header_value;
use mail_digest::mail::extract::parse_message;
use mail_digest::mail::imap_client::{DEFAULT_UNREAD_LIMIT, ImapClient};
use mail_digest::mail::search::parse_date;
use mail_digest::mail::smtp_client::SmtpClient;
use mail_digest::prompt::{needs_action_prompt, summarize_inbox_prompt, task_from_email_prompt};

#[derive(Parser)]
#[command(name = "mail_digest")]
#[command(about = "Fetch, clean and send mail for LLM prompting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clean a text body (file or stdin) and print the result
    Clean { file: Option<PathBuf> },

    /// Decode an RFC 2047 header value
    DecodeHeader { value: String },

    /// Parse a stored .eml message and print it as JSON
    Parse {
        file: PathBuf,
        #[arg(long, default_value_t = mail_digest::config::DEFAULT_WRAP_WIDTH)]
        wrap_width: usize,
    },

    /// List the newest messages in INBOX
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// List the newest unread messages
    Unread {
        #[arg(long, default_value_t = DEFAULT_UNREAD_LIMIT)]
        limit: usize,
    },

    /// Find messages whose From header contains ADDR
    SearchSender {
        addr: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Find messages by date (YYYY-MM-DD)
    SearchDate {
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        before: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Fetch one message by UID with a cleaned body
    Get { uid: u32 },

    /// Send a plain-text message
    Send {
        #[arg(long, required = true)]
        to: Vec<String>,
        #[arg(long)]
        cc: Vec<String>,
        #[arg(long)]
        bcc: Vec<String>,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },

    /// Print an inbox-summary prompt built from unread mail
    Digest {
        #[arg(long, default_value_t = DEFAULT_UNREAD_LIMIT)]
        limit: usize,
    },

    /// Print a prompt turning message UID into a to-do (or a yes/no action check)
    TaskPrompt {
        uid: u32,
        /// Ask only whether the message needs action
        #[arg(long)]
        yes_no: bool,
    },

    /// Store the mailbox password in keyring
    SetPassword,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Clean { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut s = String::new();
                    std::io::stdin().read_to_string(&mut s)?;
                    s
                }
            };
            println!("{}", clean(&raw));
            Ok(())
        }

        Command::DecodeHeader { value } => {
            println!("{}", decode_header_value(Some(&value)));
            Ok(())
        }

        Command::Parse { file, wrap_width } => {
            let raw = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            print_json(&parse_message(&raw, 0, wrap_width)?)
        }

        Command::List { limit } => print_json(&imap()?.list_emails(limit)?),

        Command::Unread { limit } => print_json(&imap()?.unread(limit)?),

        Command::SearchSender { addr, limit } => {
            print_json(&imap()?.search_by_sender(&addr, limit)?)
        }

        Command::SearchDate {
            since,
            before,
            limit,
        } => {
            let since = since.as_deref().map(parse_date).transpose()?;
            let before = before.as_deref().map(parse_date).transpose()?;
            print_json(&imap()?.search_by_date(since, before, limit)?)
        }

        Command::Get { uid } => print_json(&imap()?.get_email(uid)?),

        Command::Send {
            to,
            cc,
            bcc,
            subject,
            body,
        } => {
            let (cfg, password) = account()?;
            let smtp = SmtpClient::from_config(&cfg, password);
            let mail = OutgoingEmail {
                to,
                cc,
                bcc,
                subject,
                body,
            };
            print_json(&smtp.send_email(&mail)?)
        }

        Command::Digest { limit } => {
            let unread = imap()?.unread(limit)?;
            println!("{}", summarize_inbox_prompt(&unread));
            Ok(())
        }

        Command::TaskPrompt { uid, yes_no } => {
            let email = imap()?.get_email(uid)?;
            let prompt = if yes_no {
                needs_action_prompt(&email)
            } else {
                task_from_email_prompt(&email)
            };
            println!("{prompt}");
            Ok(())
        }

        Command::SetPassword => {
            let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
            eprintln!("Paste password for {} (end with Ctrl-D):", cfg.email_address);
            let mut secret = String::new();
            std::io::stdin().read_to_string(&mut secret)?;
            let secret = secret.trim();
            credentials::save_password(&cfg.email_address, secret)?;
            println!("Saved password for {}", cfg.email_address);
            Ok(())
        }
    }
}

fn account() -> Result<(Config, String)> {
    let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
    let password = credentials::resolve_password(&cfg)?;
    Ok((cfg, password))
}

fn imap() -> Result<ImapClient> {
    let (cfg, password) = account()?;
    Ok(ImapClient::from_config(&cfg, password))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
