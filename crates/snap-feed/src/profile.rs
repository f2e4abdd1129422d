//! The avatar change workflow behind the profile screen.
//!
//! Steps run strictly in order because all of them use the same resolved
//! URL:
//!
//! 1. upload the picked image, or resolve the default image on removal
//! 2. rewrite every comment copy of the avatar ([`AvatarFanout`])
//! 3. write `users/{id}.avatar`, when enabled
//! 4. replace the avatar in the caller's [`Session`]
//! 5. rewrite the comment copies once more, for comments the session
//!    created while step 2 was running
//!
//! The sequence is not transactional. If a step before 4 fails, the writes
//! that already landed stay, the session keeps the previous avatar, and the
//! caller decides whether to run the whole workflow again. A failure in
//! step 5 is reported after the session has already switched.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use snap_blob::ObjectStore;
use snap_docs::{DocumentStore, Fields};
use snap_types::fields;

use crate::config::FeedConfig;
use crate::error::{FeedError, FeedResult};
use crate::fanout::AvatarFanout;
use crate::media::{ImageSource, MediaUploader};
use crate::paths;
use crate::session::Session;

/// Runs avatar changes for a signed-in user.
#[derive(Clone)]
pub struct AvatarWorkflow {
    uploader: MediaUploader,
    fanout: AvatarFanout,
    docs: Arc<dyn DocumentStore>,
    persist_user_profile: bool,
}

impl AvatarWorkflow {
    pub fn new(objects: Arc<dyn ObjectStore>, docs: Arc<dyn DocumentStore>, config: &FeedConfig) -> Self {
        Self {
            uploader: MediaUploader::new(objects, config.storage.clone()),
            fanout: AvatarFanout::new(Arc::clone(&docs), config.fanout.clone()),
            docs,
            persist_user_profile: config.profile.persist_user_profile,
        }
    }

    /// Change the session user's avatar; `None` removes it in favor of the
    /// default image. Returns the URL now in effect.
    pub async fn set_avatar(
        &self,
        session: &Session,
        image: Option<&dyn ImageSource>,
    ) -> FeedResult<String> {
        let user = session.user_id();
        let url = self.uploader.upload(image).await?;

        let report = self.fanout.propagate_avatar(&user, &url).await?;
        if !report.is_complete() {
            return Err(FeedError::FanoutIncomplete(report));
        }

        if self.persist_user_profile {
            let path = paths::user(&user)?;
            let mut update = Fields::new();
            update.insert(fields::user::AVATAR.into(), Value::from(url.as_str()));
            // Merge into the profile so login and email survive; create the
            // document from the session when it does not exist yet.
            if self.docs.get(&path).await?.is_some() {
                self.docs.update(&path, update).await?;
            } else {
                let mut profile = session.user();
                profile.avatar = Some(url.clone());
                self.docs.set(&path, profile.to_fields()?).await?;
            }
        }

        session.replace_avatar(url.clone());

        // Comments written from the session while the first pass ran still
        // carry the old URL. Anything written after the switch has the new one.
        let sweep = self.fanout.propagate_avatar(&user, &url).await?;
        if !sweep.is_complete() {
            return Err(FeedError::FanoutIncomplete(sweep));
        }
        info!(%user, %url, comments = sweep.updated, "avatar changed");
        Ok(url)
    }

    /// Replace the avatar with the default image.
    pub async fn remove_avatar(&self, session: &Session) -> FeedResult<String> {
        self.set_avatar(session, None).await
    }
}

impl std::fmt::Debug for AvatarWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarWorkflow")
            .field("fanout", &self.fanout)
            .field("persist_user_profile", &self.persist_user_profile)
            .finish_non_exhaustive()
    }
}
