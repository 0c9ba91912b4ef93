use anyhow::{Context, Result};
use mailparse::{MailHeader, MailHeaderMap, ParsedMail};

use crate::domain::email::{EmailId, EmailMessage, EmailSummary};
use crate::mail::clean::clean;
use crate::mail::decoders::{decode_charset, decode_header_bytes};

/// Parse a full RFC 822 message into a record with a cleaned body.
pub fn parse_message(raw_rfc822: &[u8], uid: EmailId, wrap_width: usize) -> Result<EmailMessage> {
    let parsed = mailparse::parse_mail(raw_rfc822)
        .with_context(|| format!("UID {uid}: malformed message"))?;
    let body = extract_body(&parsed, wrap_width);

    Ok(EmailMessage {
        uid,
        from: header_value(&parsed.headers, "From").unwrap_or_default(),
        subject: header_value(&parsed.headers, "Subject").unwrap_or_default(),
        date: parsed.headers.get_first_value("Date").unwrap_or_default(),
        body: clean(body.trim()),
    })
}

/// Build a listing entry from a header block (`BODY[HEADER]`).
pub fn parse_summary(raw_headers: &[u8], uid: EmailId) -> Result<EmailSummary> {
    let (headers, _) = mailparse::parse_headers(raw_headers)
        .with_context(|| format!("UID {uid}: malformed header block"))?;

    Ok(EmailSummary {
        uid,
        from: header_value(&headers, "From").unwrap_or_default(),
        subject: header_value(&headers, "Subject").unwrap_or_else(|| "(no subject)".to_string()),
        date: headers.get_first_value("Date").unwrap_or_default(),
    })
}

/// Pick the readable body of a message.
///
/// The first inline `text/plain` part wins; failing that, the first inline
/// `text/html` part is rendered to text. Parts marked as attachments are
/// never used. Returns an empty string when nothing usable is found.
pub fn extract_body(parsed: &ParsedMail, wrap_width: usize) -> String {
    if parsed.subparts.is_empty() {
        let Some(text) = part_text(parsed) else {
            return String::new();
        };
        return if mimetype(parsed) == "text/html" {
            html_to_text(&text, wrap_width)
        } else {
            text
        };
    }

    let mut parts = Vec::new();
    walk(parsed, &mut parts);
    let inline = || parts.iter().filter(|p| !is_attachment(p));

    if let Some(text) = inline()
        .filter(|p| mimetype(p) == "text/plain")
        .find_map(|p| part_text(p))
    {
        return text;
    }

    inline()
        .filter(|p| mimetype(p) == "text/html")
        .find_map(|p| part_text(p))
        .map(|html| html_to_text(&html, wrap_width))
        .unwrap_or_default()
}

fn walk<'a, 'b>(part: &'b ParsedMail<'a>, out: &mut Vec<&'b ParsedMail<'a>>) {
    out.push(part);
    for sp in &part.subparts {
        walk(sp, out);
    }
}

fn mimetype(p: &ParsedMail) -> String {
    p.ctype.mimetype.to_ascii_lowercase()
}

fn is_attachment(p: &ParsedMail) -> bool {
    p.headers
        .get_first_value("Content-Disposition")
        .is_some_and(|d| d.to_ascii_lowercase().contains("attachment"))
}

/// Transfer-decoded payload in the part's charset; `None` when empty.
fn part_text(p: &ParsedMail) -> Option<String> {
    let raw = p.get_body_raw().ok().filter(|b| !b.is_empty())?;
    Some(decode_charset(&p.ctype.charset, &raw))
}

fn html_to_text(html: &str, wrap_width: usize) -> String {
    match html2text::from_read(html.as_bytes(), wrap_width) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("html2text failed ({e}); using raw HTML");
            html.to_string()
        }
    }
}

fn header_value(headers: &[MailHeader], key: &str) -> Option<String> {
    headers
        .iter()
        .find(|h| h.get_key_ref().eq_ignore_ascii_case(key))
        .map(|h| decode_header_bytes(h.get_value_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALTERNATIVE: &[u8] = b"From: Ann <ann@x.io>\r\n\
Subject: Lunch\r\n\
Date: Tue, 1 Jul 2025 10:00:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Plain version\r\n\
--b1\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Html version</p>\r\n\
--b1--\r\n";

    const ATTACHED_PLAIN: &[u8] = b"From: Ann <ann@x.io>\r\n\
Subject: Report\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"b2\"\r\n\
\r\n\
--b2\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
\r\n\
attached notes\r\n\
--b2\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<html><body><p>Hello world</p></body></html>\r\n\
--b2--\r\n";

    fn parse(raw: &[u8]) -> ParsedMail<'_> {
        mailparse::parse_mail(raw).unwrap()
    }

    #[test]
    fn test_extract_prefers_plain_part() {
        let mail = parse(ALTERNATIVE);
        assert_eq!(extract_body(&mail, 80).trim(), "Plain version");
    }

    #[test]
    fn test_extract_skips_attachments_and_renders_html() {
        let mail = parse(ATTACHED_PLAIN);
        let body = extract_body(&mail, 80);
        assert!(body.contains("Hello world"), "got {body:?}");
        assert!(!body.contains("attached notes"));
        assert!(!body.contains("<p>"));
    }

    #[test]
    fn test_extract_single_part_quoted_printable_cp1251() {
        let raw = b"Subject: x\r\n\
Content-Type: text/plain; charset=windows-1251\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
=CF=F0=E8=E2=E5=F2\r\n";
        let mail = parse(raw);
        assert_eq!(extract_body(&mail, 80).trim(), "Привет");
    }

    #[test]
    fn test_extract_unknown_charset_falls_back_to_utf8() {
        let raw = "Subject: x\r\nContent-Type: text/plain; charset=x-unknown\r\n\r\ncafé\r\n";
        let mail = parse(raw.as_bytes());
        assert_eq!(extract_body(&mail, 80).trim(), "café");
    }

    #[test]
    fn test_extract_single_part_html_is_rendered() {
        let raw = b"Subject: x\r\nContent-Type: text/html\r\n\r\n<div>Hi there</div>\r\n";
        let mail = parse(raw);
        let body = extract_body(&mail, 80);
        assert!(body.contains("Hi there"));
        assert!(!body.contains("<div>"));
    }

    #[test]
    fn test_extract_empty_message_body() {
        let mail = parse(b"Subject: x\r\n\r\n");
        assert_eq!(extract_body(&mail, 80), "");
    }

    #[test]
    fn test_parse_message_decodes_headers_and_cleans_body() {
        let raw = "From: =?UTF-8?B?0J/RgNC40LLQtdGC?= <p@x.io>\r\n\
Subject: =?UTF-8?Q?caf=C3=A9?=\r\n\
Date: Tue, 1 Jul 2025 10:00:00 +0000\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
See you at noon.\r\n\
\r\n\
> earlier message\r\n";
        let msg = parse_message(raw.as_bytes(), 42, 80).unwrap();
        assert_eq!(msg.uid, 42);
        assert_eq!(msg.from, "Привет <p@x.io>");
        assert_eq!(msg.subject, "café");
        assert_eq!(msg.date, "Tue, 1 Jul 2025 10:00:00 +0000");
        assert_eq!(msg.body, "See you at noon.");
    }

    #[test]
    fn test_parse_summary_defaults_missing_subject() {
        let s = parse_summary(b"From: ann@x.io\r\nDate: Mon, 30 Jun 2025 08:00:00 +0000\r\n\r\n", 3)
            .unwrap();
        assert_eq!(s.uid, 3);
        assert_eq!(s.from, "ann@x.io");
        assert_eq!(s.subject, "(no subject)");
        assert_eq!(s.date, "Mon, 30 Jun 2025 08:00:00 +0000");
    }
}
