use std::error::Error;

use teloxide::prelude::*;

use crate::dialog::{DialogEngine, Event};
use crate::handlers::utils::deliver;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    engine: DialogEngine,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Some(text) = msg.text() {
        // Commands are routed to command_handler already.
        if text.starts_with('/') {
            return Ok(());
        }

        let replies = engine.handle(msg.chat.id, Event::Text(text.to_string())).await;
        deliver(&bot, msg.chat.id, replies).await?;
    }
    Ok(())
}
