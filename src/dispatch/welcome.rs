use tracing::{debug, info, warn};

use super::{DispatchError, Dispatcher};
use crate::constants::ContextConstants;
use crate::event::Member;
use crate::live::{ActionRow, Button, Component, VerificationModule};
use crate::platform::OutboundMessage;

/// Custom id of the button appended to the welcome message.
pub const VERIFICATION_CUSTOM_ID: &str = "verificationInteraction";

const DEFAULT_BUTTON_LABEL: &str = "Verify";

impl Dispatcher<'_> {
    /// Posts the verification welcome message for a member who just joined.
    pub async fn member_join(&self, member: &Member) -> Result<(), DispatchError> {
        let Some(module) = self.snapshot.config.verification() else {
            return Ok(());
        };
        let Some(channel) = module.welcome_channel else {
            return Ok(());
        };
        if !module.enabled {
            debug!("verification module disabled");
            return Ok(());
        }

        let Some(id) = module.initial_interaction() else {
            warn!("verification module has no initial interaction");
            let notice = OutboundMessage::text("**ERROR:** `interactions.initial_message` not set");
            self.platform.send_message(channel, &notice).await?;
            return Ok(());
        };

        let rendered = match self.snapshot.interactions.get(id) {
            Some(definition) => definition.render(&ContextConstants::build(member)).ok(),
            None => None,
        };
        let Some(rendered) = rendered else {
            warn!(%id, "welcome interaction missing or unrenderable");
            let notice = OutboundMessage::text(format!(
                "**ERROR:** Unable to parse live interaction for id {id}"
            ));
            self.platform.send_message(channel, &notice).await?;
            return Ok(());
        };

        let mut message = OutboundMessage::from(rendered);
        message.components.push(verification_row(module));
        self.platform.send_message(channel, &message).await?;
        info!(user = %member.user.id, %channel, "sent welcome message");
        Ok(())
    }
}

fn verification_row(module: &VerificationModule) -> ActionRow {
    let button = module.button.as_ref();
    ActionRow {
        components: vec![Component::Button(Button {
            label: Some(
                button
                    .and_then(|b| b.title.clone())
                    .unwrap_or_else(|| DEFAULT_BUTTON_LABEL.to_owned()),
            ),
            style: button.and_then(|b| b.style).unwrap_or_default(),
            custom_id: Some(VERIFICATION_CUSTOM_ID.to_owned()),
            ..Button::default()
        })],
    }
}
