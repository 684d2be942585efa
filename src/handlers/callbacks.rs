use std::error::Error;

use teloxide::prelude::*;

use crate::dialog::{DialogEngine, Event};
use crate::handlers::utils::deliver;
use crate::models::Choice;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    engine: DialogEngine,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Some(data) = q.data.as_deref() {
        if let Some(ref message) = q.message {
            let chat_id = message.chat().id;

            // The string payload is parsed into a tagged value here and
            // never crosses into the engine as a raw string.
            match Choice::from_callback_data(data) {
                Some(choice) => {
                    let replies = engine.handle(chat_id, Event::Choice(choice)).await;
                    deliver(&bot, chat_id, replies).await?;
                }
                None => {
                    log::warn!("Unrecognized callback payload from user {}: {}", chat_id, data);
                }
            }
        }
    }
    Ok(())
}
