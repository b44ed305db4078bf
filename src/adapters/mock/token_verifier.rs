use crate::domain::value_objects::UserId;
use crate::ports::token_verifier::{Result, TokenVerification, TokenVerifier as TokenVerifierTrait};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// TokenVerifierのモック実装
///
/// 登録されたトークンのみを有効とみなす。
pub struct TokenVerifier {
    tokens: Mutex<HashMap<String, UserId>>,
}

impl TokenVerifier {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// テスト用に有効なトークンを登録
    pub fn add_token(&self, token: &str, user_id: UserId) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(token.to_string(), user_id);
        }
    }
}

impl Default for TokenVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenVerifierTrait for TokenVerifier {
    async fn verify_token(&self, token: &str) -> Result<TokenVerification> {
        let tokens = self.tokens.lock().map_err(|_| "token table lock poisoned")?;
        Ok(match tokens.get(token) {
            Some(user_id) => TokenVerification::Valid(*user_id),
            None => TokenVerification::Invalid,
        })
    }
}
