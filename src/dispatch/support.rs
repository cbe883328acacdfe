//! Housekeeping for threads under the support forum channel.

use tracing::info;

use super::{DispatchError, Dispatcher};
use crate::event::{Message, Thread};
use crate::platform::OutboundMessage;

pub const SHORT_ARCHIVE_MINUTES: u32 = 60;
pub const EXTENDED_ARCHIVE_MINUTES: u32 = 24 * 60;
pub const ARCHIVE_NOTICE: &str = "Setting archive duration to **24** hours due to activity";

impl Dispatcher<'_> {
    /// Live triggers, then support-thread housekeeping. Housekeeping runs
    /// even when a trigger failed.
    pub async fn message(&self, message: &Message, thread: Option<&Thread>) -> Result<(), DispatchError> {
        let triggered = self.triggers(message).await;
        if let Some(thread) = thread {
            self.support_activity(message, thread).await?;
        }
        triggered
    }

    /// Extends the auto-archive window of a support thread once a human
    /// posts in it.
    async fn support_activity(&self, message: &Message, thread: &Thread) -> Result<(), DispatchError> {
        if message.author.bot
            || thread.auto_archive_minutes != SHORT_ARCHIVE_MINUTES
            || !self.is_support_thread(thread)
        {
            return Ok(());
        }

        self.platform
            .send_message(thread.id, &OutboundMessage::text(ARCHIVE_NOTICE))
            .await?;
        self.platform
            .set_auto_archive_duration(thread.id, EXTENDED_ARCHIVE_MINUTES)
            .await?;
        info!(thread = %thread.id, "extended support thread archive duration");
        Ok(())
    }

    /// Deletes the starter message of a support thread that just got
    /// archived.
    pub async fn thread_update(&self, old: &Thread, new: &Thread) -> Result<(), DispatchError> {
        if old.archived || !new.archived || !self.is_support_thread(new) {
            return Ok(());
        }
        let Some(parent) = new.parent_id else {
            return Ok(());
        };
        // a forum thread's starter message shares the thread's id
        self.platform.delete_message(parent, new.id).await?;
        info!(thread = %new.id, "deleted starter message of archived support thread");
        Ok(())
    }

    fn is_support_thread(&self, thread: &Thread) -> bool {
        self.support_channel.is_some() && thread.parent_id == self.support_channel
    }
}
