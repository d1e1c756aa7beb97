use regex::Regex;
use std::sync::OnceLock;

use crate::normalize::{normalize_decimal, parse_date_components, resolve_amount_token, Money};

// Fiat amount with the symbol on either side: "€10", "10,50 €", "$3", "3$".
const FIAT_AMOUNT: &str = r"€\s?[\d.,]+|[\d.,]+\s?€|\$\s?[\d.,]+|[\d.,]+\s?\$";
const DATE_PHRASE: &str = r"\d{1,2}\s[A-Za-z]{3,9},?\s\d{4}\sat\s\d{2}:\d{2}\s[A-Z]+";

fn received_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?s)You (?:just )?received\s*({FIAT_AMOUNT})\s*in\s*([A-Za-z0-9]+)"
        ))
        .expect("invalid received regex")
    })
}

fn staking_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?s)You (?:just )?received\s*({FIAT_AMOUNT})\s*in\s*([A-Za-z0-9]+)\s*for holding\s*([A-Za-z0-9]+)\s*in\s*(\w+)"
        ))
        .expect("invalid staking regex")
    })
}

fn deposit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?s)Amount:\s*({FIAT_AMOUNT}|[\d.,]+\s?[A-Za-z]+|[A-Za-z]+\s?[\d.,]+)\s*From:\s*(\w[\w \t]*)"
        ))
        .expect("invalid deposit regex")
    })
}

fn bank_withdrawal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Amount:\s*([\d.,]+\s?[€$a-zA-Z]+|[€$a-zA-Z]+\s?[\d.,]+)\s*To:\s*(.+)")
            .expect("invalid bank withdrawal regex")
    })
}

fn wallet_withdrawal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?s)on\s*({DATE_PHRASE}),\s*and paid a network fee of\s*([\d.,]+)\s*([A-Za-z0-9]+)\.\s*The wallet address\s*([A-Za-z0-9]+)\s*will receive\s*([\d.,]+)\s*([A-Za-z0-9]+)"
        ))
        .expect("invalid wallet withdrawal regex")
    })
}

fn transaction_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"transaction ID is\s*([A-Za-z0-9]+)").expect("invalid transaction id regex")
    })
}

fn amount_purchased_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Amount purchased:\s*([\d.,]+)\s*([A-Za-z0-9]+)")
            .expect("invalid amount purchased regex")
    })
}

fn final_cost_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"Final cost:\s*({FIAT_AMOUNT})")).expect("invalid final cost regex")
    })
}

fn date_completed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"Date completed:\s*({DATE_PHRASE})"))
            .expect("invalid date completed regex")
    })
}

fn group(caps: &regex::Captures<'_>, idx: usize) -> Option<String> {
    caps.get(idx).map(|m| m.as_str().trim().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFields {
    /// Fiat reference amount exactly as written, symbol included.
    pub amount: String,
    pub asset: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingFields {
    pub amount: String,
    pub asset: String,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositFields {
    pub raw_amount: String,
    pub money: Money,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankWithdrawalFields {
    /// Decimal-normalized token, currency marker still attached.
    pub normalized_token: String,
    pub money: Money,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletTransfer {
    /// "<day> <Month> <year> <HH:MM> <TZ>", ready for UTC conversion.
    pub completed_at: String,
    pub fee_amount: String,
    pub fee_asset: String,
    pub wallet_address: String,
    pub received_amount: String,
    pub received_asset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WalletWithdrawalFields {
    pub transfer: Option<WalletTransfer>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TradeFields {
    pub purchased: Option<Money>,
    pub final_cost: Option<Money>,
    pub completed_at: Option<String>,
}

/// Per-category extraction result; every field that could not be found is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Gift(Option<ReceivedFields>),
    Staking(Option<StakingFields>),
    Deposit(Option<DepositFields>),
    WithdrawalToBank(Option<BankWithdrawalFields>),
    WithdrawalToWallet(WalletWithdrawalFields),
    Trade(TradeFields),
}

pub fn extract_received(body: &str) -> Option<ReceivedFields> {
    let Some(caps) = received_re().captures(body) else {
        tracing::warn!("no received amount found in gift mail");
        return None;
    };
    Some(ReceivedFields {
        amount: group(&caps, 1)?,
        asset: group(&caps, 2)?,
    })
}

pub fn extract_staking(body: &str) -> Option<StakingFields> {
    let found = staking_re().captures_iter(body).find_map(|caps| {
        let asset = group(&caps, 2)?;
        // The held asset has to repeat the rewarded one.
        if group(&caps, 3)? != asset {
            return None;
        }
        Some(StakingFields {
            amount: group(&caps, 1)?,
            asset,
            period: group(&caps, 4)?,
        })
    });
    if found.is_none() {
        tracing::warn!("no staking reward found in staking mail");
    }
    found
}

pub fn extract_deposit(body: &str) -> Option<DepositFields> {
    let Some(caps) = deposit_re().captures(body) else {
        tracing::warn!("no deposit amount found in deposit mail");
        return None;
    };
    let raw_amount = group(&caps, 1)?;
    Some(DepositFields {
        money: resolve_amount_token(&raw_amount),
        raw_amount,
        source: group(&caps, 2)?,
    })
}

pub fn extract_bank_withdrawal(body: &str) -> Option<BankWithdrawalFields> {
    let Some(caps) = bank_withdrawal_re().captures(body) else {
        tracing::warn!("no withdrawal amount found in bank withdrawal mail");
        return None;
    };
    let normalized_token = normalize_decimal(&group(&caps, 1)?);
    let amount = normalized_token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect::<String>();
    let asset = if normalized_token.contains('€') {
        "EUR".to_string()
    } else if normalized_token.contains('$') {
        "USD".to_string()
    } else {
        normalized_token
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect()
    };
    Some(BankWithdrawalFields {
        money: Money { amount, asset },
        normalized_token,
        destination: group(&caps, 2)?,
    })
}

pub fn extract_wallet_withdrawal(body: &str) -> WalletWithdrawalFields {
    let transaction_id = transaction_id_re()
        .captures(body)
        .and_then(|caps| group(&caps, 1));
    if transaction_id.is_none() {
        tracing::warn!("no transaction id found in wallet transfer mail");
    }

    let transfer = wallet_withdrawal_re().captures(body).and_then(|caps| {
        let raw_date = group(&caps, 1)?;
        let Some(components) = parse_date_components(&raw_date) else {
            tracing::warn!("failed to parse date components for: {raw_date}");
            return None;
        };
        Some(WalletTransfer {
            completed_at: components.to_string(),
            fee_amount: group(&caps, 2)?,
            fee_asset: group(&caps, 3)?,
            wallet_address: group(&caps, 4)?,
            received_amount: group(&caps, 5)?,
            received_asset: group(&caps, 6)?,
        })
    });
    if transfer.is_none() {
        tracing::warn!("no wallet transfer details found in wallet transfer mail");
    }

    WalletWithdrawalFields {
        transfer,
        transaction_id,
    }
}

pub fn extract_trade(body: &str) -> TradeFields {
    let purchased = amount_purchased_re().captures(body).and_then(|caps| {
        Some(Money {
            amount: group(&caps, 1)?,
            asset: group(&caps, 2)?,
        })
    });
    if purchased.is_none() {
        tracing::warn!("no amount purchased found in trade mail");
    }

    let final_cost = final_cost_re()
        .captures(body)
        .and_then(|caps| group(&caps, 1))
        .map(|raw| resolve_amount_token(&raw));
    if final_cost.is_none() {
        tracing::warn!("no final cost found in trade mail");
    }

    let completed_at = date_completed_re()
        .captures(body)
        .and_then(|caps| group(&caps, 1))
        .and_then(|raw| match parse_date_components(&raw) {
            Some(components) => Some(components.to_string()),
            None => {
                tracing::warn!("failed to parse date components for: {raw}");
                None
            }
        });
    if completed_at.is_none() {
        tracing::warn!("no completion date found in trade mail");
    }

    TradeFields {
        purchased,
        final_cost,
        completed_at,
    }
}
