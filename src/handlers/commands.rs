use std::error::Error;

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::dialog::{DialogEngine, Event};
use crate::handlers::utils::deliver;
use crate::Command;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    engine: DialogEngine,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match cmd {
        Command::Start => {
            let replies = engine.handle(msg.chat.id, Event::Begin).await;
            deliver(&bot, msg.chat.id, replies).await?;
        }
        Command::Reset => {
            let replies = engine.handle(msg.chat.id, Event::Reset).await;
            deliver(&bot, msg.chat.id, replies).await?;
        }
        Command::Help => handle_help(bot, msg).await?,
    }
    Ok(())
}

async fn handle_help(bot: Bot, msg: Message) -> Result<(), Box<dyn Error + Send + Sync>> {
    bot.send_message(
        msg.chat.id,
        "🥗 *FitPlanner Bot Help*\n\n\
        /start \\- begin the questionnaire or show your saved plan\n\
        /reset \\- delete your saved plan and start over\n\
        /help \\- show this message\n\n\
        *How it works:*\n\
        1\\. Answer a few questions about yourself\n\
        2\\. Pick your diet, activity level and goal\n\
        3\\. Get your BMI, calorie target and meal plan\n\n\
        💬 Your plan is saved and shown again on /start\\.",
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;

    Ok(())
}
