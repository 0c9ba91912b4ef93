use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::sync::LazyLock;

// Some mailers drop the trailing `=` padding inside encoded-words.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static RE_ENCODED_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"=\?([^?\s]+)\?([bBqQ])\?([^?\s]*)\?=").expect("valid encoded-word regex")
});

/// Decode a header value that may contain RFC 2047 encoded-words.
///
/// Words in different charsets can be mixed in one value. A charset we do not
/// know is read as UTF-8, with undecodable bytes replaced. A word that cannot
/// be decoded at all is kept verbatim. `None` and `""` give `""`.
pub fn decode_header_value(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return String::new();
    };

    let mut out = String::with_capacity(raw.len());
    let mut last_end = 0;
    let mut prev_encoded = false;

    for caps in RE_ENCODED_WORD.captures_iter(raw) {
        let Some(word) = caps.get(0) else {
            continue;
        };
        let gap = &raw[last_end..word.start()];
        // whitespace between two adjacent encoded-words is not part of the text
        if !(prev_encoded && gap.chars().all(char::is_whitespace)) {
            out.push_str(gap);
        }

        match decode_word(&caps[1], &caps[2], &caps[3]) {
            Some(text) => {
                out.push_str(&text);
                prev_encoded = true;
            }
            None => {
                out.push_str(word.as_str());
                prev_encoded = false;
            }
        }
        last_end = word.end();
    }

    out.push_str(&raw[last_end..]);
    out
}

/// Decode a raw header value as stored on the wire (possibly folded).
pub fn decode_header_bytes(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let unfolded = text.replace("\r\n", "").replace('\n', "");
    decode_header_value(Some(unfolded.trim()))
}

/// Decode `bytes` in the charset named by `label`.
///
/// Unknown labels and malformed input degrade to lossy UTF-8. `us-ascii`,
/// which mailparse reports when no charset is declared, is read as UTF-8.
pub fn decode_charset(label: &str, bytes: &[u8]) -> String {
    // RFC 2231 allows a language suffix: `utf-8*en`
    let label = label.split('*').next().unwrap_or_default().trim();
    let encoding = if label.eq_ignore_ascii_case("us-ascii") || label.is_empty() {
        UTF_8
    } else {
        Encoding::for_label_no_replacement(label.as_bytes()).unwrap_or(UTF_8)
    };
    let (text, _had_errors) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

fn decode_word(charset: &str, encoding: &str, text: &str) -> Option<String> {
    let bytes = if encoding.eq_ignore_ascii_case("b") {
        LENIENT_BASE64.decode(text).ok()?
    } else {
        decode_q(text)
    };
    Some(decode_charset(charset, &bytes))
}

/// RFC 2047 "Q" encoding: `_` is a space, `=XX` a hex byte.
fn decode_q(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' if i + 2 < bytes.len() => match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    out.push((hi << 4) | lo);
                    i += 2;
                }
                _ => out.push(b'='),
            },
            b => out.push(b),
        }
        i += 1;
    }
    out
}

fn hex_val(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
