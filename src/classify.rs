use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Gift,
    Staking,
    Skip,
    Trade,
    Deposit,
    WithdrawalToBank,
    WithdrawalToWallet,
    Unknown,
}

impl MessageKind {
    /// Skip and Unknown never produce a ledger row.
    pub fn produces_record(self) -> bool {
        !matches!(self, MessageKind::Skip | MessageKind::Unknown)
    }
}

struct ClassifyRule {
    kind: MessageKind,
    matches: fn(&str, &str) -> bool,
}

fn order_placed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Your .* order was placed$").expect("invalid placed regex"))
}

fn order_filled_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Your .* order was filled$").expect("invalid filled regex"))
}

fn transfer_on_its_way_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Your [A-Za-z]* transfer is on its way$").expect("invalid transfer regex")
    })
}

// Order matters: the staking and gift mails share "You received", and a
// placed-order confirmation must be dropped before any body rule sees it.
const RULES: &[ClassifyRule] = &[
    ClassifyRule {
        kind: MessageKind::Gift,
        matches: |_, body| body.contains("You received") && body.contains("signing up"),
    },
    ClassifyRule {
        kind: MessageKind::Staking,
        matches: |_, body| body.contains("You received") && body.contains("for holding"),
    },
    ClassifyRule {
        kind: MessageKind::Skip,
        matches: |subject, _| order_placed_re().is_match(subject),
    },
    ClassifyRule {
        kind: MessageKind::Trade,
        matches: |subject, _| order_filled_re().is_match(subject),
    },
    ClassifyRule {
        kind: MessageKind::Deposit,
        matches: |_, body| body.contains("Your deposit has completed"),
    },
    ClassifyRule {
        kind: MessageKind::WithdrawalToBank,
        matches: |_, body| body.contains("Your withdrawal is in progress"),
    },
    ClassifyRule {
        kind: MessageKind::WithdrawalToWallet,
        matches: |subject, _| transfer_on_its_way_re().is_match(subject),
    },
];

pub fn classify(subject: &str, body: &str) -> MessageKind {
    RULES
        .iter()
        .find(|rule| (rule.matches)(subject, body))
        .map(|rule| rule.kind)
        .unwrap_or(MessageKind::Unknown)
}
