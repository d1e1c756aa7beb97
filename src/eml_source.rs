use chrono::{DateTime, Utc};
use mailparse::{dateparse, parse_mail, MailHeaderMap, ParsedMail};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::error::LedgerError;

/// Subject, plain-text body and sent time of one archived mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub file_name: String,
    pub subject: String,
    pub body: String,
    pub sent_at: Option<DateTime<Utc>>,
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

fn trim_text(s: &str) -> String {
    ws_re().replace_all(s.trim(), " ").trim().to_string()
}

fn is_eml(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("eml"))
        .unwrap_or(false)
}

/// Collects `.eml` files from a single file path or a directory tree, sorted by path.
pub fn collect_eml_files(input_path: &Path) -> Result<Vec<PathBuf>, LedgerError> {
    if !input_path.exists() {
        return Err(LedgerError::InvalidInput(format!(
            "path not found: {}",
            input_path.to_string_lossy()
        )));
    }
    if input_path.is_file() {
        if !is_eml(input_path) {
            return Err(LedgerError::InvalidInput(
                "only .eml files or directories containing .eml files are supported".to_string(),
            ));
        }
        return Ok(vec![input_path.to_path_buf()]);
    }
    if !input_path.is_dir() {
        return Err(LedgerError::InvalidInput(format!(
            "unsupported path type: {}",
            input_path.to_string_lossy()
        )));
    }

    let mut files = WalkDir::new(input_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_eml(p))
        .collect::<Vec<_>>();
    files.sort();
    if files.is_empty() {
        return Err(LedgerError::InvalidInput(format!(
            "no .eml files found in {}",
            input_path.to_string_lossy()
        )));
    }
    Ok(files)
}

fn find_part_body(mail: &ParsedMail, mimetype: &str) -> Option<String> {
    if mail.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
        if let Ok(body) = mail.get_body() {
            return Some(body);
        }
    }
    mail.subparts
        .iter()
        .find_map(|part| find_part_body(part, mimetype))
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "tbody",
    "tfoot", "thead", "tr", "ul",
];
const CELL_TAGS: &[&str] = &["td", "th"];
const SKIPPED_TAGS: &[&str] = &["head", "script", "style"];

fn is_one_of(name: &str, tags: &[&str]) -> bool {
    tags.iter().any(|t| name.eq_ignore_ascii_case(t))
}

fn flush_line(lines: &mut Vec<String>, current: &mut String) {
    let line = trim_text(current);
    if !line.is_empty() {
        lines.push(line);
    }
    current.clear();
}

fn collect_text(element: ElementRef<'_>, lines: &mut Vec<String>, current: &mut String) {
    let name = element.value().name();
    if is_one_of(name, SKIPPED_TAGS) {
        return;
    }
    let block = is_one_of(name, BLOCK_TAGS);
    if block {
        flush_line(lines, current);
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            current.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, lines, current);
        }
    }
    if block {
        flush_line(lines, current);
    } else if is_one_of(name, CELL_TAGS) {
        current.push(' ');
    }
}

/// Flattens HTML to text: inline markup is joined, block elements start a
/// new line, whitespace is collapsed and blank lines are dropped.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut lines = Vec::new();
    let mut current = String::new();
    collect_text(doc.root_element(), &mut lines, &mut current);
    flush_line(&mut lines, &mut current);
    lines.join("\n")
}

/// Plain text wins over HTML; HTML is flattened to text.
fn extract_best_body(mail: &ParsedMail) -> Option<String> {
    find_part_body(mail, "text/plain")
        .map(|body| body.trim().to_string())
        .or_else(|| find_part_body(mail, "text/html").map(|html| html_to_text(&html)))
}

pub fn decode_message(file_name: &str, raw: &[u8]) -> Result<DecodedMessage, String> {
    let mail = parse_mail(raw).map_err(|e| format!("failed to parse MIME message: {e}"))?;
    let subject = mail
        .headers
        .get_first_value("Subject")
        .map(|s| trim_text(&s))
        .unwrap_or_default();
    let body =
        extract_best_body(&mail).ok_or_else(|| "message has no text/plain or text/html body".to_string())?;
    let sent_at = mail
        .headers
        .get_first_value("Date")
        .and_then(|raw_date| match dateparse(&raw_date) {
            Ok(ts) => DateTime::<Utc>::from_timestamp(ts, 0),
            Err(err) => {
                tracing::warn!("{file_name}: unreadable Date header {raw_date:?}: {err}");
                None
            }
        });

    Ok(DecodedMessage {
        file_name: file_name.to_string(),
        subject,
        body,
        sent_at,
    })
}

pub fn read_message(path: &Path) -> Result<DecodedMessage, String> {
    let bytes = fs::read(path).map_err(|e| format!("failed to read eml: {e}"))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    decode_message(&file_name, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, MessageKind};
    use crate::extract::{extract_deposit, extract_wallet_withdrawal};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn create_temp_dir(tag: &str) -> PathBuf {
        let unique = format!(
            "robinhood_ledger_{tag}_{}_{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("system time before epoch")
                .as_nanos()
        );
        let dir = std::env::temp_dir().join(unique);
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn decodes_plain_text_mail_with_sent_date() {
        let raw = b"Subject: Your BTC order was filled\r\n\
Date: Mon, 1 Jan 2024 01:00:00 +0100\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Amount purchased: 0.1 BTC\r\n";
        let msg = decode_message("a.eml", raw).expect("decode");
        assert_eq!(msg.subject, "Your BTC order was filled");
        assert!(msg.body.contains("Amount purchased: 0.1 BTC"));
        assert_eq!(
            msg.sent_at.map(|d| d.format("%d.%m.%Y %H:%M").to_string()),
            Some("01.01.2024 00:00".to_string())
        );
    }

    #[test]
    fn decodes_quoted_printable_html_part() {
        let raw = "Subject: Deposit\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"XX\"\r\n\
\r\n\
--XX\r\n\
Content-Type: text/html; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
<html><body><p>Your deposit has completed</p><p>Amount: 100=E2=82=AC</p><p>From: =\r\n\
Jane Doe</p></body></html>\r\n\
--XX--\r\n";
        let msg = decode_message("b.eml", raw.as_bytes()).expect("decode");
        assert_eq!(
            msg.body,
            "Your deposit has completed\nAmount: 100€\nFrom: Jane Doe"
        );
        assert_eq!(msg.sent_at, None);
    }

    #[test]
    fn html_blocks_become_lines_and_inline_text_is_joined() {
        let text = html_to_text("<div>  Amount:\n <b>50 €</b></div><p></p><p>To:  DE12 </p>");
        assert_eq!(text, "Amount: 50 €\nTo: DE12");

        let text = html_to_text(
            "<html><head><title>Mail</title><style>p { color: red }</style></head>\
             <body>Line one<br>Line two<table><tr><td>Fee</td><td>0,1 BTC</td></tr></table></body></html>",
        );
        assert_eq!(text, "Line one\nLine two\nFee 0,1 BTC");
    }

    #[test]
    fn inline_markup_keeps_template_phrases_intact() {
        let gift = html_to_text("<p>You <b>received</b> €10 in BTC for signing up</p>");
        assert_eq!(gift, "You received €10 in BTC for signing up");
        assert_eq!(classify("Hi", &gift), MessageKind::Gift);

        let deposit = html_to_text(
            "<p>Your <span>deposit</span> has completed</p><p><b>Amount</b>: 100€</p><p><b>From</b>: Jane Doe</p>",
        );
        assert_eq!(classify("Deposit", &deposit), MessageKind::Deposit);
        let fields = extract_deposit(&deposit).expect("deposit fields");
        assert_eq!(fields.money.amount, "100");
        assert_eq!(fields.money.asset, "EUR");
        assert_eq!(fields.source, "Jane Doe");

        let wallet = html_to_text(
            "<p>Your <span>transaction ID is</span> <a href=\"#\">abc123</a>.</p>",
        );
        assert_eq!(
            extract_wallet_withdrawal(&wallet).transaction_id.as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn collects_eml_files_recursively_and_sorted() {
        let dir = create_temp_dir("collect");
        fs::create_dir_all(dir.join("nested")).expect("nested dir");
        fs::write(dir.join("b.eml"), "x").expect("write b");
        fs::write(dir.join("nested/a.EML"), "x").expect("write a");
        fs::write(dir.join("notes.txt"), "x").expect("write txt");

        let files = collect_eml_files(&dir).expect("collect");
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| is_eml(p)));
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_missing_or_empty_inputs() {
        let dir = create_temp_dir("empty");
        assert!(matches!(
            collect_eml_files(&dir),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            collect_eml_files(&dir.join("missing")),
            Err(LedgerError::InvalidInput(_))
        ));
        let txt = dir.join("notes.txt");
        fs::write(&txt, "x").expect("write txt");
        assert!(matches!(
            collect_eml_files(&txt),
            Err(LedgerError::InvalidInput(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}
