use std::collections::HashMap;
use std::sync::Mutex;

use hmac::{Hmac, Mac};
use log::warn;
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::AppConfig;

pub const SESSION_COOKIE: &str = "portal_session";

#[cfg(not(test))]
const PBKDF2_ROUNDS: u32 = 100_000;
// Unoptimized test builds would spend seconds per derivation otherwise.
#[cfg(test)]
const PBKDF2_ROUNDS: u32 = 1_000;

/// Salted PBKDF2-HMAC-SHA256 digest of one account password.
pub struct PasswordHash {
    salt: [u8; 16],
    digest: [u8; 32],
}

pub fn hash_password(password: &str) -> PasswordHash {
    let salt: [u8; 16] = rand::thread_rng().gen();
    let mut digest = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ROUNDS, &mut digest);
    PasswordHash { salt, digest }
}

/// Re-derives the candidate under the stored salt and compares digests in
/// constant time.
pub fn verify_password(hash: &PasswordHash, candidate: &str) -> bool {
    let mut digest = [0u8; 32];
    pbkdf2_hmac::<Sha256>(candidate.as_bytes(), &hash.salt, PBKDF2_ROUNDS, &mut digest);
    bool::from(digest.ct_eq(&hash.digest))
}

/// One entry of the fixed credential table.
pub struct Account {
    pub username: String,
    password: PasswordHash,
}

/// Builds the closed account set. Plaintext passwords come from the startup
/// configuration and are hashed immediately; only digests are retained.
pub fn account_table(config: &AppConfig) -> Vec<Account> {
    vec![
        Account {
            username: "admin".to_string(),
            password: hash_password(&config.admin_password),
        },
        Account {
            username: "technicien".to_string(),
            password: hash_password(&config.tech_password),
        },
    ]
}

pub fn lookup_account<'a>(accounts: &'a [Account], username: &str) -> Option<&'a Account> {
    accounts.iter().find(|account| account.username == username)
}

/// Checks a credential pair against the table. Unknown user and wrong
/// password are indistinguishable to the caller.
pub fn authenticate<'a>(
    accounts: &'a [Account],
    username: &str,
    password: &str,
) -> Option<&'a Account> {
    lookup_account(accounts, username).filter(|account| verify_password(&account.password, password))
}

/// Server-side session registry. The cookie value is an opaque random token
/// signed with the configured secret; the principal binding never leaves the
/// process.
pub struct SessionStore {
    secret: Vec<u8>,
    sessions: Mutex<HashMap<String, String>>,
}

impl SessionStore {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Opens a session bound to `principal` and returns the cookie value.
    pub fn open(&self, principal: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .unwrap()
            .insert(token.clone(), principal.to_string());
        format!("{}.{}", token, self.sign(&token))
    }

    /// Resolves a cookie value to the bound principal. The signature is
    /// checked before the registry lookup, so forged tokens never hit it.
    pub fn principal(&self, cookie_value: &str) -> Option<String> {
        let (token, signature) = cookie_value.split_once('.')?;
        let expected = self.sign(token);
        if !bool::from(signature.as_bytes().ct_eq(expected.as_bytes())) {
            warn!("Session cookie carries an invalid signature");
            return None;
        }
        self.sessions.lock().unwrap().get(token).cloned()
    }

    pub fn close(&self, cookie_value: &str) {
        if let Some((token, _)) = cookie_value.split_once('.') {
            self.sessions.lock().unwrap().remove(token);
        }
    }

    fn sign(&self, token: &str) -> String {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
