use std::error::Error;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

use crate::dialog::Reply;
use crate::models::Choice;

/// Escapes MarkdownV2 special characters in dynamic text.
pub fn escape_markdown_v2(text: &str) -> String {
    let specials = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut out = String::with_capacity(text.len() * 2);

    for ch in text.chars() {
        if specials.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Escapes the two characters MarkdownV2 recognizes inside code entities.
/// Values interpolated into a ``` block go through this instead of
/// `escape_markdown_v2`, which would leave stray backslashes in the output.
pub fn escape_code_entity(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for ch in text.chars() {
        if ch == '`' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// One button per row; the questionnaire keyboards are short.
pub fn make_choice_keyboard(options: &[Choice]) -> InlineKeyboardMarkup {
    let keyboard: Vec<Vec<InlineKeyboardButton>> = options
        .iter()
        .map(|choice| {
            vec![InlineKeyboardButton::callback(
                choice.label(),
                choice.callback_data(),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(keyboard)
}

/// Sends the engine's replies back over Telegram.
pub async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    replies: Vec<Reply>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    for reply in replies {
        match reply {
            Reply::Text(text) => {
                bot.send_message(chat_id, text)
                    .parse_mode(ParseMode::MarkdownV2)
                    .await?;
            }
            Reply::Choices { text, options } => {
                bot.send_message(chat_id, text)
                    .parse_mode(ParseMode::MarkdownV2)
                    .reply_markup(make_choice_keyboard(&options))
                    .await?;
            }
        }
    }
    Ok(())
}
