use crate::features::auth::client::AuthError;
use crate::features::auth::store::StoreError;
use crate::features::map::controls::MapError;
use thiserror::Error;

/// Top-level error for anything that crosses the dispatch boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("core_not_initialized")]
    NotInitialized,
    #[error("invalid_json:{0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unknown_action:{0}")]
    UnknownAction(String),
    #[error("missing_{0}")]
    Missing(&'static str),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Stable snake_case code shown in `last_error`.
    pub fn code(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_snake_case_with_detail() {
        assert_eq!(CoreError::NotInitialized.code(), "core_not_initialized");
        assert_eq!(
            CoreError::UnknownAction("fly".into()).code(),
            "unknown_action:fly"
        );
        assert_eq!(CoreError::Missing("snapshot").code(), "missing_snapshot");
        assert_eq!(
            CoreError::from(MapError::NoPick).code(),
            "mark_without_pick"
        );
    }
}
