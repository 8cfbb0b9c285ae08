//! Plain-text rendering of the conversation for the terminal.

use std::fmt::Write as _;

use assist_core::{Action, ActionKind, MediaKind, Message};

/// Shown while a reply is pending.
pub const TYPING_INDICATOR: &str = "… ассистент печатает";

/// One message, with each attachment on its own line.
pub fn message(msg: &Message, media_base: &str) -> String {
    let author = if msg.is_user() { "вы" } else { "ассистент" };
    let mut out = format!("{author}: {}", msg.message);

    if let Some(embedding) = &msg.embedding {
        for item in &embedding.data {
            let Some(url) = item.resolve_url(media_base) else {
                continue;
            };
            let tag = match item.kind() {
                MediaKind::Image => "изображение",
                MediaKind::Video => "видео",
                MediaKind::File => "файл",
            };
            let _ = write!(out, "\n  [{tag}] {url}");
        }
    }
    out
}

/// Numbered action menu, or `None` when nothing is offered.
pub fn actions(actions: &[Action]) -> Option<String> {
    if actions.is_empty() {
        return None;
    }
    let lines: Vec<String> = actions
        .iter()
        .enumerate()
        .map(|(i, action)| {
            let marker = match action.kind() {
                ActionKind::Role => "роль",
                ActionKind::Mode => "режим",
                ActionKind::Button => "кнопка",
            };
            format!("  {}. {} ({marker})", i + 1, action.label())
        })
        .collect();
    Some(lines.join("\n"))
}
