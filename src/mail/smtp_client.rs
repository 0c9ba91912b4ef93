use anyhow::{Context, Result, bail};
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::info;

use crate::config::Config;
use crate::domain::email::{OutgoingEmail, SendReceipt};

/// Sends plain-text mail through an implicit-TLS SMTP relay.
pub struct SmtpClient {
    pub server: String,
    pub port: u16,
    pub user: String,
    password: String,
}

impl SmtpClient {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn from_config(cfg: &Config, password: impl Into<String>) -> Self {
        Self::new(
            cfg.smtp_host.clone(),
            cfg.smtp_port(),
            cfg.email_address.clone(),
            password,
        )
    }

    pub fn build_message(&self, mail: &OutgoingEmail) -> Result<Message> {
        if mail.to.is_empty() {
            bail!("At least one recipient is required");
        }

        let mut builder = Message::builder()
            .from(mailbox(&self.user)?)
            .subject(mail.subject.clone());
        for to in &mail.to {
            builder = builder.to(mailbox(to)?);
        }
        for cc in &mail.cc {
            builder = builder.cc(mailbox(cc)?);
        }
        for bcc in &mail.bcc {
            builder = builder.bcc(mailbox(bcc)?);
        }

        builder
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .context("building message")
    }

    pub fn send_email(&self, mail: &OutgoingEmail) -> Result<SendReceipt> {
        let message = self.build_message(mail)?;
        let transport = SmtpTransport::relay(&self.server)
            .with_context(|| format!("SMTP relay {}", self.server))?
            .port(self.port)
            .credentials(Credentials::new(self.user.clone(), self.password.clone()))
            .build();

        info!(
            "sending {:?} to {} recipients",
            mail.subject,
            mail.recipients().count()
        );
        transport.send(&message).context("SMTP send failed")?;

        Ok(SendReceipt {
            status: "sent",
            to: mail.to.clone(),
            subject: mail.subject.clone(),
        })
    }
}

fn mailbox(addr: &str) -> Result<Mailbox> {
    addr.trim()
        .parse::<Mailbox>()
        .with_context(|| format!("invalid address {addr:?}"))
}
