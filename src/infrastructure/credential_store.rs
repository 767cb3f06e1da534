use crate::infrastructure::config::read_users;
use crate::infrastructure::error::InfraError;
use std::collections::HashMap;
use std::path::Path;

/// Fixed demo login table. Not a security boundary.
#[derive(Debug, Clone, Default)]
pub struct CredentialTable {
    users: HashMap<String, String>,
}

impl CredentialTable {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    pub fn from_config(config_dir: &Path) -> Result<Self, InfraError> {
        Ok(Self::new(read_users(config_dir)?))
    }

    /// Returns the normalized username when the pair matches.
    pub fn verify(&self, username: &str, password: &str) -> Option<String> {
        let username = username.trim();
        if username.is_empty() {
            return None;
        }
        self.users
            .get(username)
            .filter(|expected| expected.as_str() == password)
            .map(|_| username.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CredentialTable {
        CredentialTable::new(HashMap::from([
            ("student1".to_string(), "password123".to_string()),
            ("student2".to_string(), "pass456".to_string()),
        ]))
    }

    #[test]
    fn verify_accepts_known_pair_and_trims_username() {
        assert_eq!(
            table().verify("  student1 ", "password123"),
            Some("student1".to_string())
        );
    }

    #[test]
    fn verify_rejects_wrong_password_and_unknown_user() {
        let table = table();
        assert_eq!(table.verify("student1", "pass456"), None);
        assert_eq!(table.verify("student3", "password123"), None);
        assert_eq!(table.verify("   ", ""), None);
    }
}
