use eframe::egui;

pub const PALETTE: &[&str] = &[
    "smile", "joy", "thumbsup", "heart", "tada", "fire", "eyes", "pray", "wave", "coffee",
];

/// Returns the shortcode of the emoji that was clicked.
pub fn render(ui: &mut egui::Ui) -> Option<&'static str> {
    let mut picked = None;
    ui.horizontal_wrapped(|ui| {
        for shortcode in PALETTE {
            let Some(emoji) = emojis::get_by_shortcode(shortcode) else {
                continue;
            };
            if ui
                .small_button(emoji.as_str())
                .on_hover_text(format!(":{shortcode}:"))
                .clicked()
            {
                picked = Some(*shortcode);
            }
        }
    });
    picked
}
