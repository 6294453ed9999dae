use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// 著者ID
    AuthorId
);

entity_id!(
    /// 書籍ID
    BookId
);

entity_id!(
    /// 会員ID
    MemberId
);

entity_id!(
    /// 貸出ID
    LoanId
);

/// 貸出ステータス
///
/// 状態遷移は BORROWED → RETURNED の一方向のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// 貸出中
    Borrowed,
    /// 返却済み
    Returned,
}

impl LoanStatus {
    /// 文字列表現を取得する（DBカラムの値と一致）
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "BORROWED",
            LoanStatus::Returned => "RETURNED",
        }
    }

    pub fn is_returned(&self) -> bool {
        matches!(self, LoanStatus::Returned)
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BORROWED" => Ok(LoanStatus::Borrowed),
            "RETURNED" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_id_value_roundtrip() {
        let id = BookId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_id_serializes_as_plain_number() {
        let json = serde_json::to_value(MemberId::new(7)).unwrap();
        assert_eq!(json, serde_json::json!(7));
    }

    #[test]
    fn test_loan_status_from_str() {
        assert_eq!(LoanStatus::from_str("BORROWED"), Ok(LoanStatus::Borrowed));
        assert_eq!(LoanStatus::from_str("RETURNED"), Ok(LoanStatus::Returned));
        assert!(LoanStatus::from_str("returned").is_err());
    }

    #[test]
    fn test_loan_status_serializes_upper_case() {
        let json = serde_json::to_value(LoanStatus::Borrowed).unwrap();
        assert_eq!(json, serde_json::json!("BORROWED"));
        assert_eq!(LoanStatus::Returned.as_str(), "RETURNED");
    }

    #[test]
    fn test_only_returned_is_terminal() {
        assert!(!LoanStatus::Borrowed.is_returned());
        assert!(LoanStatus::Returned.is_returned());
    }
}
