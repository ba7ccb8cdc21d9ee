//! Accounts and journal notes.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub cash: f64,
    pub created_at: DateTime<Utc>,
}

/// Free-text annotation on an account/symbol pair.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub id: i64,
    pub account_id: i64,
    pub symbol: String,
    pub kind: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewJournalEntry {
    pub account_id: i64,
    pub symbol: String,
    pub kind: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl NewJournalEntry {
    /// Symbol and kind are stored upper-cased.
    pub fn new(
        account_id: i64,
        symbol: &str,
        kind: &str,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        NewJournalEntry {
            account_id,
            symbol: symbol.trim().to_uppercase(),
            kind: kind.trim().to_uppercase(),
            text: text.to_string(),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_journal_entry_normalises_symbol_and_kind() {
        let entry = NewJournalEntry::new(1, " aapl ", "thesis", "earnings beat", Utc::now());
        assert_eq!(entry.symbol, "AAPL");
        assert_eq!(entry.kind, "THESIS");
        assert_eq!(entry.text, "earnings beat");
    }
}
