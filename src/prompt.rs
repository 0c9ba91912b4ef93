use crate::domain::email::{EmailMessage, EmailSummary};

/// How many senders the inbox prompt lists at most.
pub const INBOX_PROMPT_MAX_ITEMS: usize = 5;
/// Body characters quoted in [`task_from_email_prompt`].
pub const TASK_PROMPT_BODY_CHARS: usize = 1000;
/// Body characters quoted in [`needs_action_prompt`].
pub const ACTION_PROMPT_BODY_CHARS: usize = 800;

/// Reply marker for [`task_from_email_prompt`] when nothing needs doing.
pub const NO_EVENT: &str = "NO_EVENT";

/// Prompt asking a model for a one- or two-sentence overview of `unread`.
pub fn summarize_inbox_prompt(unread: &[EmailSummary]) -> String {
    let mut lines: Vec<String> = unread
        .iter()
        .take(INBOX_PROMPT_MAX_ITEMS)
        .map(|e| format!("- {}: {}", e.from, e.subject))
        .collect();
    if lines.is_empty() {
        lines.push("No unread emails".to_string());
    }
    format!(
        "Write a short (1-2 sentence) summary of the incoming emails:\n{}",
        lines.join("\n")
    )
}

/// Prompt asking for a one-line to-do derived from `email`, or [`NO_EVENT`].
pub fn task_from_email_prompt(email: &EmailMessage) -> String {
    format!(
        "Based on the email below, write a short task (to-do) if the recipient \
         needs to reply or act. Otherwise return '{NO_EVENT}'.\n\n\
         Sender: {}\n\
         Subject: {}\n\
         Text:\n{}\n\n\
         Answer format: one line with a short task description (for example, \
         'Reply to the MCP request'), or '{NO_EVENT}' if no action is needed.",
        email.from,
        email.subject,
        truncate_chars(&email.body, TASK_PROMPT_BODY_CHARS)
    )
}

/// Yes/no prompt: does `email` require any action from the recipient?
pub fn needs_action_prompt(email: &EmailMessage) -> String {
    format!(
        "Does this email require any action from you (a reply, a task, a confirmation)?\n\
         Sender: {}\n\
         Subject: {}\n\
         Text:\n{}\n\n\
         Answer only 'YES' or 'NO'.",
        email.from,
        email.subject,
        truncate_chars(&email.body, ACTION_PROMPT_BODY_CHARS)
    )
}

/// First `max` characters of `s`, never splitting a code point.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(uid: u32, from: &str, subject: &str) -> EmailSummary {
        EmailSummary {
            uid,
            from: from.into(),
            subject: subject.into(),
            date: String::new(),
        }
    }

    fn message(body: &str) -> EmailMessage {
        EmailMessage {
            uid: 1,
            from: "Ann <ann@x.io>".into(),
            subject: "Contract".into(),
            date: String::new(),
            body: body.into(),
        }
    }

    #[test]
    fn test_prompt_without_mail() {
        assert_eq!(
            summarize_inbox_prompt(&[]),
            "Write a short (1-2 sentence) summary of the incoming emails:\nNo unread emails"
        );
    }

    #[test]
    fn test_prompt_caps_listed_items() {
        let mail: Vec<_> = (1..=7)
            .map(|i| summary(i, &format!("s{i}"), &format!("t{i}")))
            .collect();
        let prompt = summarize_inbox_prompt(&mail);
        assert!(prompt.contains("- s1: t1"));
        assert!(prompt.contains("- s5: t5"));
        assert!(!prompt.contains("s6"));
        assert_eq!(prompt.lines().count(), 1 + INBOX_PROMPT_MAX_ITEMS);
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("Привет", 3), "При");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_task_prompt_quotes_first_1000_chars() {
        let body = "ж".repeat(1200);
        let prompt = task_from_email_prompt(&message(&body));
        assert!(prompt.contains("Sender: Ann <ann@x.io>\nSubject: Contract\nText:\n"));
        assert!(prompt.contains(&"ж".repeat(TASK_PROMPT_BODY_CHARS)));
        assert!(!prompt.contains(&"ж".repeat(TASK_PROMPT_BODY_CHARS + 1)));
        assert!(prompt.contains(NO_EVENT));
    }

    #[test]
    fn test_action_prompt_quotes_first_800_chars() {
        let body = "я".repeat(900);
        let prompt = needs_action_prompt(&message(&body));
        assert!(prompt.contains(&"я".repeat(ACTION_PROMPT_BODY_CHARS)));
        assert!(!prompt.contains(&"я".repeat(ACTION_PROMPT_BODY_CHARS + 1)));
        assert!(prompt.ends_with("Answer only 'YES' or 'NO'."));
    }

    #[test]
    fn test_action_prompt_keeps_short_body_whole() {
        let prompt = needs_action_prompt(&message("Please sign by Friday."));
        assert!(prompt.contains("Text:\nPlease sign by Friday.\n\n"));
    }
}
