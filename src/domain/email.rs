use serde::Serialize;

pub type EmailId = u32;

/// One line of a mailbox listing.
#[derive(Debug, Clone, Serialize)]
pub struct EmailSummary {
    pub uid: EmailId,
    pub from: String,
    pub subject: String,
    /// `Date` header as sent, not normalised.
    pub date: String,
}

/// A fetched message with its body already cleaned for prompting.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub uid: EmailId,
    pub from: String,
    pub subject: String,
    pub date: String,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    /// Envelope recipients: to, then cc, then bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub status: &'static str,
    pub to: Vec<String>,
    pub subject: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipients_order() {
        let mail = OutgoingEmail {
            to: vec!["a@x.io".into()],
            cc: vec!["b@x.io".into()],
            bcc: vec!["c@x.io".into(), "d@x.io".into()],
            ..Default::default()
        };
        let all: Vec<_> = mail.recipients().collect();
        assert_eq!(all, ["a@x.io", "b@x.io", "c@x.io", "d@x.io"]);
    }

    #[test]
    fn test_summary_serializes_with_field_names() {
        let s = EmailSummary {
            uid: 7,
            from: "Ann".into(),
            subject: "Hi".into(),
            date: "Tue, 1 Jul 2025 10:00:00 +0000".into(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["uid"], 7);
        assert_eq!(v["from"], "Ann");
        assert_eq!(v["subject"], "Hi");
    }
}
