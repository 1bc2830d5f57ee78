//! In-memory active-context store fed by `setActiveContext` requests.

use async_trait::async_trait;
use murmur_types::ActiveContext;
use murmur_voice::{ActiveContextReader, VoiceError};
use std::sync::RwLock;

/// Holds the context the client last reported as active.
#[derive(Debug, Default)]
pub struct ActiveContextStore {
    current: RwLock<Option<ActiveContext>>,
}

impl ActiveContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the active context. The path must be non-blank.
    pub fn set(&self, context: ActiveContext) -> Result<ActiveContext, VoiceError> {
        if context.path().trim().is_empty() {
            return Err(VoiceError::validation(
                "context.active.data.path",
                "path must be a non-empty string",
            ));
        }
        tracing::debug!(modality = %context.modality, path = context.path(), "active context set");
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(context.clone());
        Ok(context)
    }

    pub fn clear(&self) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    pub fn get(&self) -> Option<ActiveContext> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ActiveContextReader for ActiveContextStore {
    async fn active_context(&self) -> Option<ActiveContext> {
        self.get()
    }
}
