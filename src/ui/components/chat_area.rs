use chrono::{DateTime, Local};
use eframe::egui;

use crate::common::ChatMessage;

const EXCERPT_CHARS: usize = 60;

/// Draws the message list. Returns the index of a message whose Reply
/// button was clicked.
///
/// The list only moves on its own when `scroll_to_bottom` is set; other
/// people's messages never pull the view down.
pub fn render(ui: &mut egui::Ui, messages: &[ChatMessage], scroll_to_bottom: bool) -> Option<usize> {
    let mut reply = None;

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            if messages.is_empty() {
                ui.label(egui::RichText::new("No messages yet").weak());
            }

            for (index, message) in messages.iter().enumerate() {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(&message.sender_name).strong());
                    ui.label(egui::RichText::new(display_time(&message.timestamp)).weak().small());
                    if ui.small_button("Reply").clicked() {
                        reply = Some(index);
                    }
                });
                if let Some(quoted) = &message.reply_to {
                    ui.label(
                        egui::RichText::new(format!(
                            "↪ {}: {}",
                            quoted.sender_name,
                            excerpt(&quoted.content)
                        ))
                        .italics()
                        .weak(),
                    );
                }
                ui.label(&message.content);
                ui.add_space(4.0);
            }

            if scroll_to_bottom {
                ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
            }
        });

    reply
}

/// `HH:MM` in local time for ISO-8601 stamps, the raw text otherwise.
pub fn display_time(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(parsed) => parsed.with_timezone(&Local).format("%H:%M").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

pub fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_timestamps_are_shown_verbatim() {
        assert_eq!(display_time("yesterday"), "yesterday");
        assert_eq!(display_time("2024-05-01T09:30:00.000Z").len(), 5);
    }

    #[test]
    fn long_quotes_are_cut_on_char_boundaries() {
        assert_eq!(excerpt("short"), "short");
        let long = "é".repeat(EXCERPT_CHARS + 1);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 1);
        assert!(cut.ends_with('…'));
    }
}
