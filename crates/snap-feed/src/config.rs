//! Engine configuration: storage layout, fan-out, likes, and profile writes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use snap_blob::ObjectPath;
use snap_docs::MAX_BATCH_WRITES;

use crate::error::{FeedError, FeedResult};

/// Engine configuration, usually loaded from a TOML file.
///
/// Every key is optional; missing keys take the defaults below.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub storage: StorageConfig,
    pub fanout: FanoutConfig,
    pub likes: LikesConfig,
    pub profile: ProfileConfig,
}

/// Object store layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for uploaded avatars.
    pub avatar_prefix: String,
    /// Object served when a user has no avatar.
    pub default_avatar: String,
    /// Directory for post photos.
    pub post_photo_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            avatar_prefix: "userAvatars".into(),
            default_avatar: "userAvatars/default.jpg".into(),
            post_photo_prefix: "postImages".into(),
        }
    }
}

/// How avatar changes are written to comment copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutMode {
    /// Atomic batches of up to `batch_size` writes.
    Batched,
    /// One independent update per comment, issued concurrently.
    Independent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
    pub mode: FanoutMode,
    pub batch_size: usize,
    /// Extra attempts for writes that failed. Zero disables retry.
    pub max_retries: u32,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            mode: FanoutMode::Batched,
            batch_size: MAX_BATCH_WRITES,
            max_retries: 0,
        }
    }
}

impl FanoutConfig {
    /// Batch size clamped to what a store accepts in one commit.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_WRITES)
    }
}

/// How a like is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeMode {
    /// Server-side increment; concurrent likes are never lost.
    Atomic,
    /// Overwrite with the caller's `likes + 1`; concurrent likes can be lost.
    Overwrite,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikesConfig {
    pub mode: LikeMode,
}

impl Default for LikesConfig {
    fn default() -> Self {
        Self {
            mode: LikeMode::Atomic,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Also write the new avatar to the `users/{id}` profile document.
    pub persist_user_profile: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            persist_user_profile: true,
        }
    }
}

impl FeedConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> FeedResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| FeedError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: &Path) -> FeedResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FeedError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> FeedResult<String> {
        toml::to_string_pretty(self).map_err(|e| FeedError::Config(e.to_string()))
    }

    pub fn validate(&self) -> FeedResult<()> {
        for (key, value) in [
            ("storage.avatar_prefix", &self.storage.avatar_prefix),
            ("storage.default_avatar", &self.storage.default_avatar),
            ("storage.post_photo_prefix", &self.storage.post_photo_prefix),
        ] {
            ObjectPath::parse(value.as_str())
                .map_err(|e| FeedError::Config(format!("{key}: {e}")))?;
        }
        if self.fanout.batch_size == 0 {
            return Err(FeedError::Config("fanout.batch_size must be positive".into()));
        }
        Ok(())
    }

    /// The default avatar as an object path.
    pub fn default_avatar_path(&self) -> FeedResult<ObjectPath> {
        Ok(ObjectPath::parse(self.storage.default_avatar.as_str())?)
    }
}
