use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum AuditAction {
        Create => "CREATE",
        Update => "UPDATE",
        Delete => "DELETE",
        StatusChange => "STATUS_CHANGE",
        Login => "LOGIN",
        LoginFailed => "LOGIN_FAILED",
        AccountLocked => "ACCOUNT_LOCKED",
        AlertResolved => "ALERT_RESOLVED",
        Import => "IMPORT",
    }
}

/// Append-only record of a change. Each entry's hash covers its content and
/// the previous entry's hash, so any edit breaks the chain from that point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub user_email: Option<String>,
    pub details: serde_json::Value,
    pub hash: String,
    pub previous_hash: Option<String>,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: Option<i64>,
        user_email: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: 0,
            // stored as TIMESTAMPTZ, which keeps microseconds
            timestamp: Utc::now().trunc_subsecs(6),
            action,
            entity_type: entity_type.into(),
            entity_id,
            user_email,
            details,
            hash: String::new(),
            previous_hash: None,
        }
    }

    /// Links the entry to its predecessor and seals it.
    pub fn chain(mut self, previous_hash: Option<String>) -> Self {
        self.previous_hash = previous_hash;
        self.hash = self.calculate_hash();
        self
    }

    pub fn calculate_hash(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        hasher.update(self.action.as_str().as_bytes());
        hasher.update(self.entity_type.as_bytes());
        hasher.update(self.entity_id.map(|id| id.to_string()).unwrap_or_default().as_bytes());
        hasher.update(self.user_email.as_deref().unwrap_or_default().as_bytes());
        hasher.update(self.details.to_string().as_bytes());
        if let Some(prev) = &self.previous_hash {
            hasher.update(prev.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    pub fn verify_integrity(&self) -> bool {
        self.calculate_hash() == self.hash
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainVerification {
    pub is_valid: bool,
    pub entries_verified: usize,
    pub broken_links: Vec<i64>,
}

/// Walks entries in insertion order and reports every entry whose hash does
/// not match its content or whose predecessor link is wrong.
pub fn verify_chain(entries: &[AuditEntry]) -> ChainVerification {
    let mut broken_links = Vec::new();
    let mut previous_hash: Option<&str> = None;

    for entry in entries {
        let linked = match previous_hash {
            Some(prev) => entry.previous_hash.as_deref() == Some(prev),
            None => true,
        };
        if !linked || !entry.verify_integrity() {
            broken_links.push(entry.id);
        }
        previous_hash = Some(&entry.hash);
    }

    ChainVerification {
        is_valid: broken_links.is_empty(),
        entries_verified: entries.len(),
        broken_links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain_of(n: i64) -> Vec<AuditEntry> {
        let mut entries: Vec<AuditEntry> = Vec::new();
        for i in 1..=n {
            let previous = entries.last().map(|e| e.hash.clone());
            let mut entry = AuditEntry::new(
                AuditAction::Update,
                "raw_material",
                Some(i),
                Some("admin@supplychainx.io".to_string()),
                json!({ "stock": i * 10 }),
            )
            .chain(previous);
            entry.id = i;
            entries.push(entry);
        }
        entries
    }

    #[test]
    fn test_sealed_entry_verifies() {
        let entry = AuditEntry::new(AuditAction::Create, "supplier", Some(1), None, json!({})).chain(None);
        assert!(!entry.hash.is_empty());
        assert!(entry.verify_integrity());
    }

    #[test]
    fn test_intact_chain_is_valid() {
        let verification = verify_chain(&chain_of(4));
        assert!(verification.is_valid);
        assert_eq!(verification.entries_verified, 4);
    }

    #[test]
    fn test_tampered_entry_is_reported() {
        let mut entries = chain_of(4);
        entries[2].details = json!({ "stock": 9999 });

        let verification = verify_chain(&entries);
        assert!(!verification.is_valid);
        assert_eq!(verification.broken_links, vec![3]);
    }

    #[test]
    fn test_removed_entry_breaks_link() {
        let mut entries = chain_of(4);
        entries.remove(1);

        let verification = verify_chain(&entries);
        assert_eq!(verification.broken_links, vec![3]);
    }
}
