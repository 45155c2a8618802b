use serde::{Deserialize, Serialize};
use std::fmt;

/// Investment/holding account kinds known to the built-in pattern catalog.
///
/// The catalog itself is keyed by plain strings so that configured catalogs
/// may add types this enum does not name; these are the ones that ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Savings,
    StudyFund,
    Provident,
    Pension,
    Brokerage,
    Crypto,
    MutualFund,
}

impl AccountType {
    pub const ALL: [AccountType; 7] = [
        AccountType::Savings,
        AccountType::StudyFund,
        AccountType::Provident,
        AccountType::Pension,
        AccountType::Brokerage,
        AccountType::Crypto,
        AccountType::MutualFund,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Savings => "savings",
            AccountType::StudyFund => "study_fund",
            AccountType::Provident => "provident",
            AccountType::Pension => "pension",
            AccountType::Brokerage => "brokerage",
            AccountType::Crypto => "crypto",
            AccountType::MutualFund => "mutual_fund",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "savings" => Ok(AccountType::Savings),
            "study_fund" => Ok(AccountType::StudyFund),
            "provident" => Ok(AccountType::Provident),
            "pension" => Ok(AccountType::Pension),
            "brokerage" => Ok(AccountType::Brokerage),
            "crypto" => Ok(AccountType::Crypto),
            "mutual_fund" => Ok(AccountType::MutualFund),
            other => Err(format!("Unknown account type: '{other}'")),
        }
    }
}
