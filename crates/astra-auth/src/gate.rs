// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The auth gate: validates credentials against stored account records and
//! establishes/destroys the active session record.

use std::sync::Arc;

use tracing::{debug, info};

use astra_core::{keys, AstraError, KeyValueStore, StoredAccount, User, UserId};

use crate::obfuscate;

/// Fields a profile edit may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
}

/// Mediates sign-up, sign-in, and the active session record.
///
/// Accounts live under `account-<email>`; the signed-in user lives under
/// `session-user`. Chats survive sign-out so the user finds them again on
/// the next sign-in.
pub struct AuthGate {
    store: Arc<dyn KeyValueStore>,
}

impl AuthGate {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Create an account and sign it in.
    ///
    /// Fails when an account already exists for `email`.
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AstraError> {
        let key = keys::account(email);
        if self.store.get(&key).await?.is_some() {
            return Err(AstraError::InvalidCredentials(format!(
                "an account already exists for {email}"
            )));
        }

        let user = User {
            id: UserId::generate(),
            name: name.to_string(),
            email: email.to_string(),
            profile_picture: None,
            bio: None,
        };
        let account = StoredAccount {
            user: user.clone(),
            obfuscated_pass: obfuscate::obfuscate(password),
        };

        self.store.put(&key, &to_json(&account)?).await?;
        self.store
            .put(keys::SESSION_USER, &to_json(&user)?)
            .await?;

        info!(user_id = %user.id, "account created");
        Ok(user)
    }

    /// Validate credentials and establish the active session record.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AstraError> {
        let account: StoredAccount = match self.store.get(&keys::account(email)).await? {
            Some(json) => from_json(&json)?,
            None => {
                return Err(AstraError::InvalidCredentials(
                    "no account exists for this email".into(),
                ))
            }
        };

        if !obfuscate::matches(password, &account.obfuscated_pass) {
            return Err(AstraError::InvalidCredentials("wrong password".into()));
        }

        self.store
            .put(keys::SESSION_USER, &to_json(&account.user)?)
            .await?;
        debug!(user_id = %account.user.id, "signed in");
        Ok(account.user)
    }

    /// The currently signed-in user, if any.
    pub async fn current_user(&self) -> Result<Option<User>, AstraError> {
        match self.store.get(keys::SESSION_USER).await? {
            Some(json) => Ok(Some(from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// Destroy the active session record. Accounts and chats are kept.
    pub async fn sign_out(&self) -> Result<(), AstraError> {
        self.store.remove(keys::SESSION_USER).await?;
        debug!("signed out");
        Ok(())
    }

    /// Merge profile edits into both the session record and the account
    /// record, returning the updated user.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, AstraError> {
        let mut user = self.current_user().await?.ok_or_else(|| {
            AstraError::InvalidCredentials("no user is signed in".into())
        })?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(picture) = update.profile_picture {
            user.profile_picture = Some(picture);
        }
        if let Some(bio) = update.bio {
            user.bio = Some(bio);
        }

        self.store
            .put(keys::SESSION_USER, &to_json(&user)?)
            .await?;

        // Keep the account record in sync so the edit survives sign-out.
        let account_key = keys::account(&user.email);
        if let Some(json) = self.store.get(&account_key).await? {
            let mut account: StoredAccount = from_json(&json)?;
            account.user = user.clone();
            self.store.put(&account_key, &to_json(&account)?).await?;
        }

        Ok(user)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AstraError> {
    serde_json::to_string(value).map_err(|e| AstraError::Storage {
        source: Box::new(e),
    })
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, AstraError> {
    serde_json::from_str(json).map_err(|e| AstraError::Storage {
        source: Box::new(e),
    })
}
