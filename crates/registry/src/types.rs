use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Moderation state of a wallet report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Investigating,
    Verified,
    Rejected,
    Disputed,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Investigating => write!(f, "investigating"),
            Self::Verified => write!(f, "verified"),
            Self::Rejected => write!(f, "rejected"),
            Self::Disputed => write!(f, "disputed"),
        }
    }
}

impl ReportStatus {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "investigating" => Some(Self::Investigating),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            "disputed" => Some(Self::Disputed),
            _ => None,
        }
    }
}

/// Fraud technique observed during verification.
///
/// Open vocabulary: the two tags the risk evaluator scores are typed
/// variants, everything else round-trips through `Other` untouched so
/// moderators can record new patterns without a schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatternTag {
    LiquidityRemoval,
    TeamDump,
    Honeypot,
    Other(String),
}

impl PatternTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::LiquidityRemoval => "liquidity_removal",
            Self::TeamDump => "team_dump",
            Self::Honeypot => "honeypot",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for PatternTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for PatternTag {
    fn from(s: String) -> Self {
        match s.as_str() {
            "liquidity_removal" => Self::LiquidityRemoval,
            "team_dump" => Self::TeamDump,
            "honeypot" => Self::Honeypot,
            _ => Self::Other(s),
        }
    }
}

impl From<PatternTag> for String {
    fn from(tag: PatternTag) -> Self {
        tag.as_str().to_string()
    }
}

/// The original submitter's evidence. Immutable once recorded;
/// `submitted_at` is filled in by the store at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Evidence {
    pub tx_hash: Option<String>,
    pub solscan_link: Option<String>,
    pub description: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Moderator-supplied verification metadata.
///
/// `liquidity_locked` is tri-state on purpose: `None` means never assessed
/// (contributes nothing to the risk score), `Some(false)` means assessed and
/// unlocked, which is the strongest fraud signal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Verification {
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub solscan_checked: bool,
    pub liquidity_locked: Option<bool>,
    pub liquidity_amount: Option<f64>,
    pub victims_loss: Option<f64>,
    pub pattern_found: Vec<PatternTag>,
}

/// One registry row per distinct wallet address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletReport {
    pub id: i64,
    pub wallet_address: String,
    pub case_number: i64,
    pub status: ReportStatus,
    pub risk_score: u8,
    pub project_name: Option<String>,
    pub token_address: Option<String>,
    pub evidence: Evidence,
    pub verification: Verification,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub report_count: i64,
    pub is_active: bool,
}

/// Public submission payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub wallet_address: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub evidence: Option<Evidence>,
}

/// Partial moderation update. Every field is optional; `None` means "leave
/// the stored value alone", so an explicit `false` or `0` in the payload is
/// an overwrite while an omitted key is not.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyUpdate {
    pub status: Option<ReportStatus>,
    pub notes: Option<String>,
    pub liquidity_locked: Option<bool>,
    pub liquidity_amount: Option<f64>,
    pub victims_loss: Option<f64>,
    pub pattern_found: Option<Vec<PatternTag>>,
    pub verified_by: Option<String>,
}

/// Validate a Solana wallet address: Base58 alphabet (no `0`, `O`, `I`,
/// `l`), 32-44 characters, full-string match.
pub fn is_valid_wallet_address(addr: &str) -> bool {
    (32..=44).contains(&addr.len()) && addr.bytes().all(is_base58_byte)
}

fn is_base58_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() && !matches!(b, b'0' | b'O' | b'I' | b'l')
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_ADDR: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    #[test]
    fn test_report_status_roundtrip() {
        for status in [
            ReportStatus::Pending,
            ReportStatus::Investigating,
            ReportStatus::Verified,
            ReportStatus::Rejected,
            ReportStatus::Disputed,
        ] {
            let s = status.to_string();
            assert_eq!(ReportStatus::from_str_loose(&s), Some(status));
        }
        assert_eq!(ReportStatus::from_str_loose("unknown"), None);
    }

    #[test]
    fn test_report_status_serde() {
        let json = serde_json::to_string(&ReportStatus::Investigating).unwrap();
        assert_eq!(json, "\"investigating\"");
        let parsed: ReportStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ReportStatus::Investigating);
    }

    #[test]
    fn test_pattern_tag_known_and_other() {
        assert_eq!(
            PatternTag::from("liquidity_removal".to_string()),
            PatternTag::LiquidityRemoval
        );
        assert_eq!(
            PatternTag::from("team_dump".to_string()),
            PatternTag::TeamDump
        );
        let other = PatternTag::from("wash_trading".to_string());
        assert_eq!(other, PatternTag::Other("wash_trading".to_string()));
        assert_eq!(other.as_str(), "wash_trading");
    }

    #[test]
    fn test_pattern_tag_serde_as_plain_strings() {
        let tags = vec![PatternTag::Honeypot, PatternTag::Other("mint_abuse".into())];
        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(json, "[\"honeypot\",\"mint_abuse\"]");
        let parsed: Vec<PatternTag> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tags);
    }

    #[test]
    fn test_valid_address_accepted() {
        assert!(is_valid_wallet_address(GOOD_ADDR));
        // Shortest and longest allowed lengths
        assert!(is_valid_wallet_address(&"a".repeat(32)));
        assert!(is_valid_wallet_address(&"a".repeat(44)));
    }

    #[test]
    fn test_address_length_bounds() {
        assert!(!is_valid_wallet_address(&"a".repeat(31)));
        assert!(!is_valid_wallet_address(&"a".repeat(45)));
        assert!(!is_valid_wallet_address(""));
    }

    #[test]
    fn test_address_rejects_non_base58_chars() {
        // 0, O, I and l are excluded from the Base58 alphabet
        for bad in ['0', 'O', 'I', 'l', '-', ' ', '!'] {
            let addr = format!("{}{}", bad, "a".repeat(35));
            assert!(!is_valid_wallet_address(&addr), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_verify_update_distinguishes_false_from_absent() {
        let with_false: VerifyUpdate =
            serde_json::from_str(r#"{"liquidityLocked": false}"#).unwrap();
        assert_eq!(with_false.liquidity_locked, Some(false));

        let absent: VerifyUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.liquidity_locked, None);
    }

    #[test]
    fn test_verification_serde_camel_case() {
        let v = Verification {
            liquidity_locked: Some(false),
            victims_loss: Some(150_000.0),
            pattern_found: vec![PatternTag::TeamDump],
            ..Verification::default()
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["liquidityLocked"], false);
        assert_eq!(json["victimsLoss"], 150_000.0);
        assert_eq!(json["patternFound"][0], "team_dump");
        assert_eq!(json["solscanChecked"], false);
    }

    #[test]
    fn test_new_report_minimal_payload() {
        let report: NewReport =
            serde_json::from_str(&format!(r#"{{"walletAddress": "{GOOD_ADDR}"}}"#)).unwrap();
        assert_eq!(report.wallet_address, GOOD_ADDR);
        assert!(report.evidence.is_none());
        assert!(report.project_name.is_none());
    }
}
