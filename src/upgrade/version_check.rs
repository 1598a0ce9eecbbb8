use super::verification::ChecksumVerifier;
use crate::constants::{DEFAULT_REQUEST_TIMEOUT, USER_AGENT};
use crate::core::{Result, UpdateError};
use crate::transport::Transport;
use reqwest::Url;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Version descriptor published alongside an updater build.
///
/// ```json
/// {
///   "version": "1.4.0",
///   "url": "https://example.com/mudsync-1.4.0.exe",
///   "sha256": "9f2c...",
///   "notes": "Faster bulk installs"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub version: String,
    /// Download URL of the build.
    pub url: String,
    /// Hex SHA-256 digest of the build.
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A newer build than the running one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAvailable {
    pub current: Version,
    pub latest: Version,
    pub descriptor: VersionDescriptor,
}

/// Checks a version descriptor against the running build.
pub struct SelfUpdateChecker {
    descriptor_url: Option<String>,
    current: Version,
    timeout: Duration,
}

impl SelfUpdateChecker {
    /// Checker for the running binary's version.
    ///
    /// `None` disables the check; [`check`](Self::check) then always yields `None`.
    pub fn new(descriptor_url: Option<String>) -> Self {
        Self {
            descriptor_url,
            current: Version::new(0, 0, 0),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
        .with_current_version(env!("CARGO_PKG_VERSION"))
    }

    /// Overrides the version treated as "installed". Unparsable input keeps the previous value.
    #[must_use]
    pub fn with_current_version(mut self, version: &str) -> Self {
        match Version::parse(version.trim_start_matches('v')) {
            Ok(parsed) => self.current = parsed,
            Err(e) => warn!("Ignoring invalid current version '{}': {}", version, e),
        }
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn current_version(&self) -> &Version {
        &self.current
    }

    /// Looks for a newer build.
    ///
    /// Returns `None` when no descriptor is configured, when it cannot be
    /// fetched or parsed, or when its version is not newer than the current one.
    pub async fn check(&self) -> Option<UpdateAvailable> {
        let Some(url) = self.descriptor_url.as_deref() else {
            debug!("No version descriptor configured, skipping self-update check");
            return None;
        };

        let descriptor = match self.fetch_descriptor(url).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                debug!("Self-update check failed: {}", e);
                return None;
            }
        };

        let latest = match Version::parse(descriptor.version.trim_start_matches('v')) {
            Ok(latest) => latest,
            Err(e) => {
                debug!("Descriptor version '{}' is not semver: {}", descriptor.version, e);
                return None;
            }
        };

        if latest <= self.current {
            debug!("Running {} is up to date (descriptor has {})", self.current, latest);
            return None;
        }

        info!("Updater {} is available (running {})", latest, self.current);
        Some(UpdateAvailable {
            current: self.current.clone(),
            latest,
            descriptor,
        })
    }

    /// Downloads the build described by `update` to `dest` and verifies its digest.
    ///
    /// # Errors
    ///
    /// Transfer failures from `transport`, or [`UpdateError::ChecksumMismatch`]
    /// in which case `dest` has already been removed.
    pub async fn download_verified<T: Transport>(
        &self,
        update: &UpdateAvailable,
        transport: &T,
        dest: &Path,
    ) -> Result<()> {
        info!("Downloading updater {} to {}", update.latest, dest.display());
        transport.fetch(&update.descriptor.url, dest).await?;

        if let Err(e) = ChecksumVerifier::verify(dest, &update.descriptor.sha256).await {
            if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                warn!("Could not remove unverified download {}: {}", dest.display(), remove_err);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn fetch_descriptor(&self, url: &str) -> Result<VersionDescriptor> {
        let failure = |reason: String| UpdateError::TransferFailure {
            url: url.to_string(),
            reason,
        };

        let parsed = Url::parse(url).map_err(|e| failure(format!("invalid URL: {e}")))?;
        let body = if parsed.scheme() == "file" {
            let path = parsed.to_file_path().map_err(|()| failure("invalid file URL".to_string()))?;
            tokio::fs::read_to_string(&path).await.map_err(|e| failure(e.to_string()))?
        } else {
            let client = reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(self.timeout)
                .build()
                .map_err(|e| failure(e.to_string()))?;
            let response = client.get(parsed).send().await.map_err(|e| failure(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(failure(format!("HTTP {status}")));
            }
            response.text().await.map_err(|e| failure(e.to_string()))?
        };

        serde_json::from_str(&body).map_err(|e| failure(format!("invalid version descriptor: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedTransport;
    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    fn write_descriptor(dir: &Path, version: &str, sha256: &str) -> String {
        let descriptor = VersionDescriptor {
            version: version.to_string(),
            url: "mock://builds/mudsync".to_string(),
            sha256: sha256.to_string(),
            notes: Some("notes".to_string()),
        };
        let path = dir.join("version.json");
        std::fs::write(&path, serde_json::to_string_pretty(&descriptor).unwrap()).unwrap();
        Url::from_file_path(&path).unwrap().to_string()
    }

    #[tokio::test]
    async fn test_newer_version_is_reported() {
        let temp = TempDir::new().unwrap();
        let url = write_descriptor(temp.path(), "2.0.0", "00");

        let update =
            SelfUpdateChecker::new(Some(url)).with_current_version("1.2.3").check().await.unwrap();
        assert_eq!(update.latest, Version::new(2, 0, 0));
        assert_eq!(update.current, Version::new(1, 2, 3));
        assert_eq!(update.descriptor.notes.as_deref(), Some("notes"));
    }

    #[tokio::test]
    async fn test_same_or_older_version_is_none() {
        let temp = TempDir::new().unwrap();
        let url = write_descriptor(temp.path(), "v1.2.3", "00");

        let checker = SelfUpdateChecker::new(Some(url.clone())).with_current_version("1.2.3");
        assert!(checker.check().await.is_none());
        let checker = SelfUpdateChecker::new(Some(url)).with_current_version("1.3.0");
        assert!(checker.check().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_descriptor_is_none() {
        let checker = SelfUpdateChecker::new(Some("http://127.0.0.1:9/version.json".to_string()))
            .with_timeout(Duration::from_millis(500));
        assert!(checker.check().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_descriptor_is_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("version.json");
        std::fs::write(&path, "{ not json").unwrap();
        let url = Url::from_file_path(&path).unwrap().to_string();

        assert!(SelfUpdateChecker::new(Some(url)).check().await.is_none());
        assert!(SelfUpdateChecker::new(None).check().await.is_none());
    }

    #[tokio::test]
    async fn test_download_verified() {
        let temp = TempDir::new().unwrap();
        let body = b"new build".to_vec();
        let digest = hex::encode(Sha256::digest(&body));
        let url = write_descriptor(temp.path(), "9.9.9", &digest);

        let checker = SelfUpdateChecker::new(Some(url)).with_current_version("1.0.0");
        let update = checker.check().await.unwrap();

        let transport = ScriptedTransport::new();
        transport.serve("mock://builds/mudsync", body.clone());
        let dest = temp.path().join("mudsync.new");
        checker.download_verified(&update, &transport, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    #[tokio::test]
    async fn test_download_mismatch_removes_file() {
        let temp = TempDir::new().unwrap();
        let url = write_descriptor(temp.path(), "9.9.9", &"a".repeat(64));

        let checker = SelfUpdateChecker::new(Some(url)).with_current_version("1.0.0");
        let update = checker.check().await.unwrap();

        let transport = ScriptedTransport::new();
        transport.serve("mock://builds/mudsync", "tampered");
        let dest = temp.path().join("mudsync.new");
        let err = checker.download_verified(&update, &transport, &dest).await.unwrap_err();
        assert!(matches!(err, UpdateError::ChecksumMismatch { .. }));
        assert!(!dest.exists());
    }
}
