use crate::error::AppError;

pub const ADMIN_TOKEN_ENV: &str = "HUNTBOARD_ADMIN_TOKEN";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdminAction {
    BackfillHistory,
}

impl AdminAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackfillHistory => "backfill-history",
        }
    }
}

/// Checked before the body of every privileged operation.
pub trait Authorizer {
    fn authorize(&self, action: AdminAction, credential: Option<&str>) -> Result<(), AppError>;
}

/// Compares the presented credential with a shared secret. Without a
/// configured secret every caller is rejected.
#[derive(Clone, Debug, Default)]
pub struct TokenAuthorizer {
    secret: Option<String>,
}

impl TokenAuthorizer {
    pub fn new(secret: Option<String>) -> Self {
        let secret = secret
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self { secret }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var(ADMIN_TOKEN_ENV).ok())
    }
}

impl Authorizer for TokenAuthorizer {
    fn authorize(&self, action: AdminAction, credential: Option<&str>) -> Result<(), AppError> {
        let Some(secret) = self.secret.as_deref() else {
            return Err(AppError::Unauthorized(format!(
                "{} requires {ADMIN_TOKEN_ENV} to be configured",
                action.as_str()
            )));
        };
        match credential.map(str::trim) {
            Some(token) if token == secret => Ok(()),
            Some(_) => Err(AppError::Unauthorized(format!(
                "invalid admin token for {}",
                action.as_str()
            ))),
            None => Err(AppError::Unauthorized(format!(
                "{} requires an admin token",
                action.as_str()
            ))),
        }
    }
}
