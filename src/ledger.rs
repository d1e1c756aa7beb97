use serde::Serialize;
use std::cmp::Ordering;

use crate::classify::MessageKind;
use crate::extract::{
    extract_bank_withdrawal, extract_deposit, extract_received, extract_staking, extract_trade,
    extract_wallet_withdrawal, Extraction,
};
use crate::normalize::{convert_to_utc, normalize_decimal, parse_ledger_date, UNKNOWN};

pub const DEFAULT_INTEGRATION_NAME: &str = "Robinhood";

const UNRESOLVED_AMOUNT: &str = "???";
const ZERO_AMOUNT: &str = "0";
// Staking mails only ever describe USDC rewards.
const STAKING_REWARD_ASSET: &str = "USDC";

pub const LEDGER_HEADERS: [&str; 11] = [
    "Date (UTC)",
    "Integration Name",
    "Label",
    "Outgoing Asset",
    "Outgoing Amount",
    "Incoming Asset",
    "Incoming Amount",
    "Fee Asset (optional)",
    "Fee Amount (optional)",
    "Comment (optional)",
    "Trx. ID (optional)",
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TransactionRecord {
    pub date: String,
    pub integration_name: String,
    pub label: String,
    pub outgoing_asset: String,
    pub outgoing_amount: String,
    pub incoming_asset: String,
    pub incoming_amount: String,
    pub fee_asset: String,
    pub fee_amount: String,
    pub comment: String,
    pub transaction_id: String,
}

impl TransactionRecord {
    /// Cells in export column order.
    pub fn to_row(&self) -> [&str; 11] {
        [
            &self.date,
            &self.integration_name,
            &self.label,
            &self.outgoing_asset,
            &self.outgoing_amount,
            &self.incoming_asset,
            &self.incoming_amount,
            &self.fee_asset,
            &self.fee_amount,
            &self.comment,
            &self.transaction_id,
        ]
    }
}

pub fn label_for(kind: MessageKind) -> Option<&'static str> {
    match kind {
        MessageKind::Gift => Some("Gift-Received"),
        MessageKind::Staking => Some("Staking"),
        MessageKind::Deposit => Some("Deposit"),
        MessageKind::WithdrawalToBank | MessageKind::WithdrawalToWallet => Some("Withdrawal"),
        MessageKind::Trade => Some("Trade"),
        MessageKind::Skip | MessageKind::Unknown => None,
    }
}

pub fn extract_for(kind: MessageKind, body: &str) -> Option<Extraction> {
    let extraction = match kind {
        MessageKind::Gift => Extraction::Gift(extract_received(body)),
        MessageKind::Staking => Extraction::Staking(extract_staking(body)),
        MessageKind::Deposit => Extraction::Deposit(extract_deposit(body)),
        MessageKind::WithdrawalToBank => {
            Extraction::WithdrawalToBank(extract_bank_withdrawal(body))
        }
        MessageKind::WithdrawalToWallet => {
            Extraction::WithdrawalToWallet(extract_wallet_withdrawal(body))
        }
        MessageKind::Trade => Extraction::Trade(extract_trade(body)),
        MessageKind::Skip | MessageKind::Unknown => return None,
    };
    Some(extraction)
}

fn or_unknown(value: Option<&str>) -> String {
    value.unwrap_or(UNKNOWN).to_string()
}

fn or_zero(value: Option<&str>) -> String {
    value.unwrap_or(ZERO_AMOUNT).to_string()
}

/// Builds the ledger row for one classified mail; `None` for Skip/Unknown.
///
/// `sent_date` is already in ledger format and is used by the categories
/// whose body carries no timestamp of its own.
pub fn build_record(
    kind: MessageKind,
    body: &str,
    sent_date: &str,
    integration_name: &str,
) -> Option<TransactionRecord> {
    let label = label_for(kind)?;
    let extraction = extract_for(kind, body)?;
    let mut rec = TransactionRecord {
        integration_name: integration_name.to_string(),
        label: label.to_string(),
        ..TransactionRecord::default()
    };

    match extraction {
        Extraction::Gift(fields) => {
            let amount = or_unknown(fields.as_ref().map(|f| f.amount.as_str()));
            let asset = or_unknown(fields.as_ref().map(|f| f.asset.as_str()));
            rec.date = sent_date.to_string();
            rec.comment = format!("You received {amount} in {asset} for signing up");
            rec.incoming_asset = asset;
            rec.incoming_amount = UNRESOLVED_AMOUNT.to_string();
        }
        Extraction::Staking(fields) => {
            let amount = or_unknown(fields.as_ref().map(|f| f.amount.as_str()));
            let asset = or_unknown(fields.as_ref().map(|f| f.asset.as_str()));
            let period = or_unknown(fields.as_ref().map(|f| f.period.as_str()));
            rec.date = sent_date.to_string();
            rec.comment =
                format!("You received {amount} in {asset} for holding {asset} in {period}");
            rec.incoming_asset = STAKING_REWARD_ASSET.to_string();
            rec.incoming_amount = UNRESOLVED_AMOUNT.to_string();
        }
        Extraction::Deposit(fields) => {
            let raw_amount = or_unknown(fields.as_ref().map(|f| f.raw_amount.as_str()));
            let source = or_unknown(fields.as_ref().map(|f| f.source.as_str()));
            rec.date = sent_date.to_string();
            rec.comment = format!("Transfer of {raw_amount} from {source}");
            rec.incoming_asset = or_unknown(fields.as_ref().map(|f| f.money.asset.as_str()));
            rec.incoming_amount = or_zero(fields.as_ref().map(|f| f.money.amount.as_str()));
        }
        Extraction::WithdrawalToBank(fields) => {
            let token = or_unknown(fields.as_ref().map(|f| f.normalized_token.as_str()));
            let destination = or_unknown(fields.as_ref().map(|f| f.destination.as_str()));
            rec.date = sent_date.to_string();
            rec.comment = format!("Transfer {token} to {destination}");
            rec.outgoing_asset = or_unknown(fields.as_ref().map(|f| f.money.asset.as_str()));
            rec.outgoing_amount = or_zero(fields.as_ref().map(|f| f.money.amount.as_str()));
        }
        Extraction::WithdrawalToWallet(fields) => {
            let transfer = fields.transfer.as_ref();
            let wallet = or_unknown(transfer.map(|t| t.wallet_address.as_str()));
            let received_amount = or_zero(transfer.map(|t| t.received_amount.as_str()));
            let received_asset = or_unknown(transfer.map(|t| t.received_asset.as_str()));
            let tx_id = or_unknown(fields.transaction_id.as_deref());
            rec.date = convert_to_utc(&or_unknown(transfer.map(|t| t.completed_at.as_str())));
            rec.comment = format!(
                "{wallet} will receive {received_amount} {received_asset}, see transaction details of {tx_id}"
            );
            rec.incoming_asset = received_asset;
            rec.incoming_amount = normalize_decimal(&received_amount);
            rec.fee_asset = or_unknown(transfer.map(|t| t.fee_asset.as_str()));
            rec.fee_amount = normalize_decimal(&or_zero(transfer.map(|t| t.fee_amount.as_str())));
            rec.transaction_id = fields.transaction_id.unwrap_or_default();
        }
        Extraction::Trade(fields) => {
            let amount = normalize_decimal(&or_zero(
                fields.purchased.as_ref().map(|m| m.amount.as_str()),
            ));
            let asset = or_unknown(fields.purchased.as_ref().map(|m| m.asset.as_str()));
            let cost = or_zero(fields.final_cost.as_ref().map(|m| m.amount.as_str()));
            let currency = or_unknown(fields.final_cost.as_ref().map(|m| m.asset.as_str()));
            rec.date = convert_to_utc(&or_unknown(fields.completed_at.as_deref()));
            rec.comment = format!("Trade executed: Purchased {amount} {asset} for {cost} {currency}");
            rec.outgoing_asset = currency;
            rec.outgoing_amount = cost;
            rec.incoming_asset = asset;
            rec.incoming_amount = amount;
        }
    }

    Some(rec)
}

/// Orders two records by ledger date; unparseable dates compare as equal.
pub fn compare_record_dates(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    match (parse_ledger_date(&a.date), parse_ledger_date(&b.date)) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        (Err(err), _) | (_, Err(err)) => {
            tracing::warn!("Error parsing date: {err}");
            Ordering::Equal
        }
    }
}

fn has_ledger_date(rec: &TransactionRecord) -> bool {
    parse_ledger_date(&rec.date).is_ok()
}

/// Sorts ascending by date. Records with unparseable dates keep their
/// relative order after all dated records; none are dropped.
pub fn sort_records(records: &mut [TransactionRecord]) {
    for rec in records.iter().filter(|rec| !has_ledger_date(rec)) {
        tracing::warn!("Error parsing date: {:?} ({})", rec.date, rec.label);
    }
    records.sort_by(|a, b| match (has_ledger_date(a), has_ledger_date(b)) {
        (true, true) => compare_record_dates(a, b),
        (left, right) => right.cmp(&left),
    });
}
