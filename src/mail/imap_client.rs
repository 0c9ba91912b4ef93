use crate::config::Config;
use crate::domain::email::{EmailId, EmailMessage, EmailSummary};
use crate::mail::extract::{parse_message, parse_summary};
use crate::mail::search::{SearchCriteria, newest};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use log::{debug, warn};
use native_tls::TlsConnector;

type TlsSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

/// Unread messages shown when no limit is given.
pub const DEFAULT_UNREAD_LIMIT: usize = 5;

/// Blocking IMAP access to one account's INBOX.
///
/// Every operation opens its own TLS connection, logs in, selects INBOX and
/// logs out again; nothing is kept between calls.
pub struct ImapClient {
    pub server: String,
    pub port: u16,
    pub user: String,
    password: String,
    wrap_width: usize,
}

impl ImapClient {
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
            wrap_width: crate::config::DEFAULT_WRAP_WIDTH,
        }
    }

    pub fn from_config(cfg: &Config, password: impl Into<String>) -> Self {
        Self::new(
            cfg.imap_host.clone(),
            cfg.imap_port(),
            cfg.email_address.clone(),
            password,
        )
        .with_wrap_width(cfg.wrap_width())
    }

    pub fn with_wrap_width(mut self, wrap_width: usize) -> Self {
        self.wrap_width = wrap_width;
        self
    }

    fn connect(&self) -> Result<TlsSession> {
        let tls = TlsConnector::builder().build()?;
        let client = imap::connect((self.server.as_str(), self.port), self.server.as_str(), &tls)?;
        let mut session = client
            .login(&self.user, &self.password)
            .map_err(|(e, _)| anyhow!("IMAP login as {} failed: {e}", self.user))?;
        session.select("INBOX")?;
        Ok(session)
    }

    fn with_session<T>(&self, op: impl FnOnce(&mut TlsSession) -> Result<T>) -> Result<T> {
        debug!("connecting to {}:{}", self.server, self.port);
        let mut session = self.connect()?;
        let out = op(&mut session);
        if let Err(e) = session.logout() {
            debug!("IMAP logout failed: {e}");
        }
        out
    }

    /// Summaries of the `limit` newest messages matching `criteria`, oldest first.
    pub fn fetch_summaries(
        &self,
        criteria: &SearchCriteria,
        limit: usize,
    ) -> Result<Vec<EmailSummary>> {
        self.with_session(|session| {
            let query = criteria.to_imap_query();
            debug!("UID SEARCH {query}");
            let uids = newest(session.uid_search(&query)?, limit);

            let mut out = Vec::with_capacity(uids.len());
            for uid in uids {
                let fetches = session.uid_fetch(uid.to_string(), "(UID BODY.PEEK[HEADER])")?;
                let Some(header) = fetches.iter().next().and_then(|f| f.header()) else {
                    warn!("UID {uid}: no header returned; skipping");
                    continue;
                };
                out.push(parse_summary(header, uid)?);
            }
            Ok(out)
        })
    }

    pub fn list_emails(&self, limit: usize) -> Result<Vec<EmailSummary>> {
        self.fetch_summaries(&SearchCriteria::All, limit)
    }

    pub fn search_by_sender(&self, from: &str, limit: usize) -> Result<Vec<EmailSummary>> {
        self.fetch_summaries(&SearchCriteria::FromSender(from.to_string()), limit)
    }

    pub fn search_by_date(
        &self,
        since: Option<NaiveDate>,
        before: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<EmailSummary>> {
        self.fetch_summaries(&SearchCriteria::DateRange { since, before }, limit)
    }

    pub fn unread(&self, limit: usize) -> Result<Vec<EmailSummary>> {
        self.fetch_summaries(&SearchCriteria::Unseen, limit)
    }

    /// Fetch one message by UID; the body comes back cleaned.
    pub fn get_email(&self, uid: EmailId) -> Result<EmailMessage> {
        self.with_session(|session| {
            let fetches = session.uid_fetch(uid.to_string(), "(UID BODY.PEEK[])")?;
            let f = fetches
                .iter()
                .next()
                .ok_or_else(|| anyhow!("email UID {uid} not found"))?;

            if let Some(raw) = f.body() {
                return parse_message(raw, uid, self.wrap_width);
            }

            // Retry once
            warn!("UID {uid} missing body on first fetch; retrying once");
            let retry = session.uid_fetch(uid.to_string(), "(UID BODY.PEEK[])")?;
            let raw = retry
                .iter()
                .next()
                .and_then(|f| f.body())
                .ok_or_else(|| anyhow!("UID {uid}: missing body even after retry"))?;
            parse_message(raw, uid, self.wrap_width)
        })
    }
}
