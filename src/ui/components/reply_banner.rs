use eframe::egui;

use crate::common::ReplyRef;

/// Shows the pending reply target. Returns true when it was cancelled.
pub fn render(ui: &mut egui::Ui, target: &ReplyRef) -> bool {
    let mut cancel = false;
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(format!("Replying to {}", target.sender_name)).strong());
            ui.label(egui::RichText::new(super::chat_area::excerpt(&target.content)).weak());
            if ui.small_button("✕").on_hover_text("Cancel reply").clicked() {
                cancel = true;
            }
        });
    });
    cancel
}
