use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{password, repo::UserStore, repo_types::User};
use crate::error::{AppError, AppResult};

const PASSWORD_SYMBOLS: &str = "!@#$%^&*()-_=+[]{}|;:'\",.<>?/`~";

/// Why a username or password was refused. Display is the user-facing text.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Username cannot be blank!")]
    BlankUsername,
    #[error("Username must be between 3 and 20 characters long.")]
    UsernameLength,
    #[error("Username can only contain letters, numbers, and underscores.")]
    UsernameCharset,
    #[error("Password must be at least 8 characters long.")]
    PasswordLength,
    #[error("Password must include at least one uppercase letter.")]
    PasswordUppercase,
    #[error("Password must include at least one lowercase letter.")]
    PasswordLowercase,
    #[error("Password must include at least one digit.")]
    PasswordDigit,
    #[error("Password must include at least one special character.")]
    PasswordSymbol,
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        AppError::Validation(e.to_string())
    }
}

pub fn validate_username(name: &str) -> Result<(), CredentialError> {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
    }
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::BlankUsername);
    }
    let len = trimmed.chars().count();
    if !(3..=20).contains(&len) {
        return Err(CredentialError::UsernameLength);
    }
    // The charset check runs on the raw input, so padding spaces are refused here.
    if !USERNAME_RE.is_match(name) {
        return Err(CredentialError::UsernameCharset);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), CredentialError> {
    if password.chars().count() < 8 {
        return Err(CredentialError::PasswordLength);
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(CredentialError::PasswordUppercase);
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(CredentialError::PasswordLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(CredentialError::PasswordDigit);
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err(CredentialError::PasswordSymbol);
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Sign-up: validate, check the name is free, hash, store.
pub async fn register(
    users: &UserStore,
    username: &str,
    password: &str,
    confirm_password: &str,
) -> AppResult<User> {
    validate_username(username)?;
    validate_password(password)?;
    if password != confirm_password {
        return Err(AppError::validation("Passwords do not match! Please try again"));
    }
    if users.find_by_username(username).await.is_some() {
        warn!(username, "username already registered");
        return Err(AppError::Conflict(
            "Username already taken, please choose another username".into(),
        ));
    }

    let hash = password::hash(password.to_string()).await?;
    let user = users.create(username, &hash).await?;
    info!(user_id = %user.id, username, "user registered");
    Ok(user)
}

/// Login: exact username match, then password verification.
pub async fn authenticate(users: &UserStore, username: &str, password: &str) -> AppResult<User> {
    if username.trim().is_empty() || password.trim().is_empty() {
        return Err(AppError::validation("Please enter both username and password."));
    }
    let invalid = || AppError::Unauthorized("Invalid username or password. Please try again.".into());

    let Some(user) = users.find_by_username(username).await else {
        warn!(username, "login unknown username");
        return Err(invalid());
    };
    let ok = password::verify(password.to_string(), user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }
    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn username_rules() {
        assert_eq!(validate_username("alice_1"), Ok(()));
        assert_eq!(validate_username("   "), Err(CredentialError::BlankUsername));
        assert_eq!(validate_username("ab"), Err(CredentialError::UsernameLength));
        assert_eq!(
            validate_username("a_very_long_username_x"),
            Err(CredentialError::UsernameLength)
        );
        assert_eq!(validate_username("bad-name"), Err(CredentialError::UsernameCharset));
        assert_eq!(validate_username(" alice "), Err(CredentialError::UsernameCharset));
        assert_eq!(validate_username("abc"), Ok(()));
        assert_eq!(validate_username("a2345678901234567890"), Ok(()));
    }

    #[test]
    fn password_checks_run_in_order() {
        assert_eq!(validate_password("Str0ng!Pw"), Ok(()));
        assert_eq!(validate_password("S0!a"), Err(CredentialError::PasswordLength));
        assert_eq!(validate_password("str0ng!pw"), Err(CredentialError::PasswordUppercase));
        assert_eq!(validate_password("STR0NG!PW"), Err(CredentialError::PasswordLowercase));
        assert_eq!(validate_password("Strong!Pw"), Err(CredentialError::PasswordDigit));
        assert_eq!(validate_password("Str0ngPwd"), Err(CredentialError::PasswordSymbol));
        // Several failures: the earliest check wins.
        assert_eq!(validate_password("abcdefgh"), Err(CredentialError::PasswordUppercase));
    }

    #[test]
    fn accepts_every_listed_symbol() {
        for sym in PASSWORD_SYMBOLS.chars() {
            let pw = format!("Abcdefg1{sym}");
            assert_eq!(validate_password(&pw), Ok(()), "symbol {sym:?}");
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("me@example.com"));
        assert!(is_valid_email("first.last@mail.co.uk"));
        assert!(!is_valid_email("me@example"));
        assert!(!is_valid_email("me.example.com"));
        assert!(!is_valid_email("me@@example.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn register_then_authenticate_returns_same_id() {
        let users = UserStore::new(Arc::new(MemoryStorage::default()));
        let created = register(&users, "alice_1", "Str0ng!Pw", "Str0ng!Pw").await.unwrap();
        let logged_in = authenticate(&users, "alice_1", "Str0ng!Pw").await.unwrap();
        assert_eq!(created.id, logged_in.id);

        let err = authenticate(&users, "alice_1", "Str0ng!Px").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = authenticate(&users, "nobody", "Str0ng!Pw").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let users = UserStore::new(Arc::new(MemoryStorage::default()));
        let err = register(&users, "alice_1", "Str0ng!Pw", "Str0ng!Pq").await.unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match! Please try again");
        let err = register(&users, "al", "Str0ng!Pw", "Str0ng!Pw").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        register(&users, "alice_1", "Str0ng!Pw", "Str0ng!Pw").await.unwrap();
        let err = register(&users, "alice_1", "Str0ng!Pw", "Str0ng!Pw").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn authenticate_requires_both_fields() {
        let users = UserStore::new(Arc::new(MemoryStorage::default()));
        let err = authenticate(&users, " ", "x").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
