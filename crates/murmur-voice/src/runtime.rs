//! Collaborators the orchestrator consumes but does not own.

use async_trait::async_trait;
use murmur_types::ActiveContext;
use std::time::Duration;

/// Environment variable naming the system default playback device.
pub const SYSTEM_DEFAULT_DEVICE_ENV: &str = "VOICE_SYSTEM_DEFAULT_DEVICE";

/// Reads the artifact currently in focus elsewhere in the workspace.
#[async_trait]
pub trait ActiveContextReader: Send + Sync {
    async fn active_context(&self) -> Option<ActiveContext>;
}

/// Waits between active-context retries.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Resolves the system default playback device.
pub trait PlaybackDeviceResolver: Send + Sync {
    fn system_default_device(&self) -> Option<String>;
}

/// Reads [`SYSTEM_DEFAULT_DEVICE_ENV`] on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvDeviceResolver;

impl PlaybackDeviceResolver for EnvDeviceResolver {
    fn system_default_device(&self) -> Option<String> {
        std::env::var(SYSTEM_DEFAULT_DEVICE_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

impl<F> PlaybackDeviceResolver for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn system_default_device(&self) -> Option<String> {
        self()
    }
}

/// Device used when neither the policy nor the system names one.
pub const FALLBACK_DEVICE: &str = "server";

/// Policy device, else system default, else [`FALLBACK_DEVICE`].
pub fn resolve_device_preference(
    policy_device: Option<&str>,
    system_default: Option<String>,
) -> String {
    if let Some(device) = policy_device.map(str::trim).filter(|d| !d.is_empty()) {
        return device.to_string();
    }
    system_default
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| FALLBACK_DEVICE.to_string())
}

/// Requested language, else the session language, else `en-US`.
pub fn resolve_language(requested: Option<&str>, session_language: &str) -> String {
    [requested.unwrap_or(""), session_language]
        .into_iter()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("en-US")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_fallback_chain() {
        assert_eq!(
            resolve_device_preference(Some(" desk "), Some("hdmi".into())),
            "desk"
        );
        assert_eq!(resolve_device_preference(None, Some("hdmi".into())), "hdmi");
        assert_eq!(resolve_device_preference(Some(""), Some("  ".into())), "server");
    }

    #[test]
    fn language_fallback_chain() {
        assert_eq!(resolve_language(Some(" fr-FR "), "de-DE"), "fr-FR");
        assert_eq!(resolve_language(Some("  "), "de-DE"), "de-DE");
        assert_eq!(resolve_language(None, ""), "en-US");
    }

    #[test]
    fn closures_resolve_devices() {
        let resolver = || Some("usb-headset".to_string());
        assert_eq!(
            resolver.system_default_device().as_deref(),
            Some("usb-headset")
        );
    }
}
