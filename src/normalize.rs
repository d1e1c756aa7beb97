use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

pub const UNKNOWN: &str = "Unknown";
pub const LEDGER_DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

const EUR: &str = "EUR";
const USD: &str = "USD";

const CURRENCY_SYMBOLS: [(char, &str); 2] = [('€', EUR), ('$', USD)];

const MONTH_NAMES: [(&str, &str); 12] = [
    ("Jan", "January"),
    ("Feb", "February"),
    ("Mar", "March"),
    ("Apr", "April"),
    ("May", "May"),
    ("Jun", "June"),
    ("Jul", "July"),
    ("Aug", "August"),
    ("Sep", "September"),
    ("Oct", "October"),
    ("Nov", "November"),
    ("Dec", "December"),
];

// Summer time is the only zone told apart; everything else is read as CET.
const CEST_OFFSET_HOURS: i64 = 2;
const CET_OFFSET_HOURS: i64 = 1;

fn date_components_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{1,2})\s([A-Za-z]{3,9}),?\s(\d{4})\sat\s(\d{2}:\d{2})\s([A-Z]+)")
            .expect("invalid date components regex")
    })
}

fn local_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(\d{1,2})\s+([A-Za-z]{3,9}),?\s+(\d{4})\s+(?:at\s+)?(\d{1,2}:\d{2})(?:\s+([A-Za-z]+))?\s*$",
        )
        .expect("invalid local date regex")
    })
}

/// An amount split into its numeric string and asset code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Money {
    pub amount: String,
    pub asset: String,
}

/// Pieces of a "15 Mar 2024 at 14:30 CEST" phrase, month already spelled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateComponents {
    pub day: String,
    pub month: String,
    pub year: String,
    pub time: String,
    pub timezone: String,
}

impl fmt::Display for DateComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.day, self.month, self.year, self.time, self.timezone
        )
    }
}

/// Turns every `,` into `.` and keeps only the last `.` as decimal point.
///
/// "1.234,56" -> "1234.56", "12,50" -> "12.50". Inputs such as "1.234.567"
/// collapse to "1234.567"; the last separator always wins.
pub fn normalize_decimal(raw: &str) -> String {
    let text = raw.replace(',', ".");
    match text.rfind('.') {
        Some(last) => format!("{}{}", text[..last].replace('.', ""), &text[last..]),
        None => text,
    }
}

fn currency_for_symbol(symbol: char) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, code)| *code)
}

/// Splits a raw amount token such as "€150", "150 €" or "0.5BTC".
pub fn resolve_amount_token(raw: &str) -> Money {
    let token = raw.chars().filter(|c| !c.is_whitespace()).collect::<String>();

    let fiat = token
        .chars()
        .next()
        .and_then(|first| currency_for_symbol(first).map(|code| (code, &token[first.len_utf8()..])))
        .or_else(|| {
            token.chars().last().and_then(|last| {
                currency_for_symbol(last)
                    .map(|code| (code, &token[..token.len() - last.len_utf8()]))
            })
        });

    let (asset, amount) = match fiat {
        Some((code, rest)) => (code.to_string(), rest.to_string()),
        None => (
            token.chars().filter(|c| c.is_ascii_alphabetic()).collect(),
            token.chars().filter(|c| !c.is_ascii_alphabetic()).collect(),
        ),
    };

    Money {
        amount: normalize_decimal(&amount),
        asset,
    }
}

/// Spells out a three-letter month; anything else is returned unchanged.
pub fn normalize_month(month: &str) -> String {
    MONTH_NAMES
        .iter()
        .find(|(short, _)| *short == month)
        .map(|(_, long)| long.to_string())
        .unwrap_or_else(|| month.to_string())
}

pub fn parse_date_components(raw: &str) -> Option<DateComponents> {
    let caps = date_components_re().captures(raw)?;
    let part = |idx: usize| caps.get(idx).map(|m| m.as_str().trim().to_string());
    Some(DateComponents {
        day: part(1)?,
        month: normalize_month(&part(2)?),
        year: part(3)?,
        time: part(4)?,
        timezone: part(5)?,
    })
}

fn timezone_offset_hours(timezone: &str) -> i64 {
    if timezone.contains("CEST") {
        CEST_OFFSET_HOURS
    } else {
        CET_OFFSET_HOURS
    }
}

/// Parses "<day> <month> <year> [at] <HH:MM> <TZ>" and shifts it to UTC.
pub fn parse_local_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let caps = local_date_re()
        .captures(raw)
        .ok_or_else(|| format!("date phrase not recognized: {raw}"))?;
    let day = &caps[1];
    let month = normalize_month(&caps[2]);
    let year = &caps[3];
    let time = &caps[4];
    let timezone = caps.get(5).map(|m| m.as_str()).unwrap_or_default();

    let pattern = if month.len() == 3 {
        "%d %b %Y %H:%M"
    } else {
        "%d %B %Y %H:%M"
    };
    let local = NaiveDateTime::parse_from_str(&format!("{day} {month} {year} {time}"), pattern)
        .map_err(|e| format!("invalid date {raw}: {e}"))?;

    local
        .checked_sub_signed(Duration::hours(timezone_offset_hours(timezone)))
        .ok_or_else(|| format!("date out of range: {raw}"))
}

/// Converts a body date phrase to the ledger format, `Unknown` on failure.
pub fn convert_to_utc(raw: &str) -> String {
    match parse_local_datetime(raw) {
        Ok(utc) => utc.format(LEDGER_DATE_FORMAT).to_string(),
        Err(err) => {
            tracing::warn!("Error parsing or converting date: {err}");
            UNKNOWN.to_string()
        }
    }
}

pub fn format_sent_date(sent_at: Option<DateTime<Utc>>) -> String {
    sent_at
        .map(|d| d.format(LEDGER_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

pub fn parse_ledger_date(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw.trim(), LEDGER_DATE_FORMAT)
        .map_err(|e| format!("invalid ledger date {raw:?}: {e}"))
}
