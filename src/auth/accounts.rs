use crate::auth::OwnerId;
use crate::config::AccountEntry;
use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use std::collections::HashMap;

/// A provisioned account
#[derive(Debug, Clone)]
pub struct Account {
    pub owner: OwnerId,
    pub email: String,
    password_hash: String,
    token: String,
}

impl Account {
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Accounts known to this process, looked up by email or bearer token
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    by_email: HashMap<String, Account>,
    by_token: HashMap<String, OwnerId>,
}

impl AccountDirectory {
    /// Builds the directory from `[[account]]` config entries
    ///
    /// Emails are stored lowercased; the owner identity is the lowercased email.
    pub fn from_config(entries: &[AccountEntry]) -> Self {
        let mut directory = Self::default();
        for entry in entries {
            let email = entry.email.trim().to_lowercase();
            let account = Account {
                owner: OwnerId::new(email.clone()),
                email: email.clone(),
                password_hash: entry.password_hash.clone(),
                token: entry.token.clone(),
            };
            directory
                .by_token
                .insert(account.token.clone(), account.owner.clone());
            directory.by_email.insert(email, account);
        }
        directory
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }

    /// Looks up an account by email, ignoring case
    pub fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.by_email.get(&email.trim().to_lowercase())
    }

    /// Resolves a bearer token to its owner
    pub fn owner_for_token(&self, token: &str) -> Option<OwnerId> {
        self.by_token.get(token).cloned()
    }

    /// Checks a password against the stored Argon2 hash
    ///
    /// # Returns
    ///
    /// * `Some(&Account)` - The email is known and the password matches
    /// * `None` - Unknown email, wrong password or an unreadable stored hash
    pub fn verify_password(&self, email: &str, password: &str) -> Option<&Account> {
        let account = self.find_by_email(email)?;

        let parsed_hash = match PasswordHash::new(&account.password_hash) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!("Stored password hash for {} is invalid: {}", account.email, e);
                return None;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .ok()
            .map(|_| account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // argon2id of "password"
    const PASSWORD_HASH: &str =
        "$argon2id$v=19$m=256,t=1,p=1$c2hhZG93Z3JhcGhzYWx0IQ$3ch6yXG5XznZYFip4Wtju5FgIdCB6+vlJoof15yJUfo";

    fn entry(email: &str, password_hash: &str, token: &str) -> AccountEntry {
        AccountEntry {
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            token: token.to_string(),
        }
    }

    fn directory() -> AccountDirectory {
        AccountDirectory::from_config(&[entry("Analyst@Example.com", PASSWORD_HASH, "token-1")])
    }

    #[test]
    fn test_verify_password() {
        let directory = directory();
        let account = directory
            .verify_password("analyst@example.com", "password")
            .unwrap();
        assert_eq!(account.owner.as_str(), "analyst@example.com");
        assert_eq!(account.token(), "token-1");

        assert!(directory
            .verify_password("ANALYST@example.com", "password")
            .is_some());
        assert!(directory
            .verify_password("analyst@example.com", "wrong")
            .is_none());
        assert!(directory
            .verify_password("nobody@example.com", "password")
            .is_none());
    }

    #[test]
    fn test_owner_for_token() {
        let directory = directory();
        assert_eq!(
            directory.owner_for_token("token-1"),
            Some(OwnerId::new("analyst@example.com"))
        );
        assert_eq!(directory.owner_for_token("token-2"), None);
    }

    #[test]
    fn test_verify_password_with_freshly_salted_hash() {
        use argon2::password_hash::{PasswordHasher, SaltString};

        let salt = SaltString::from_b64("bm90LWEtcmVhbC1zYWx0").unwrap();
        let hash = Argon2::default()
            .hash_password(b"correct horse", &salt)
            .unwrap()
            .to_string();
        let directory =
            AccountDirectory::from_config(&[entry("b@example.com", &hash, "token-b")]);

        assert!(directory.verify_password("b@example.com", "correct horse").is_some());
        assert!(directory.verify_password("b@example.com", "password").is_none());
    }

    #[test]
    fn test_unreadable_hash_never_verifies() {
        // A bare SHA-256 hex digest of "password"
        let directory = AccountDirectory::from_config(&[entry(
            "c@example.com",
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8",
            "token-c",
        )]);
        assert!(directory.verify_password("c@example.com", "password").is_none());
    }
}
