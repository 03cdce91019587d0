use eframe::egui;

use crate::ui::status::{ConnectionLog, StatusKind};

pub fn render(ui: &mut egui::Ui, status: &ConnectionLog) {
    ui.heading("Connection");
    ui.separator();

    if status.entries().is_empty() {
        ui.label("(connecting...)");
        return;
    }

    egui::ScrollArea::vertical()
        .max_height(300.0)
        .show(ui, |ui| {
            for entry in status.entries().iter().rev().take(20) {
                let color = match entry.kind {
                    StatusKind::Connected => egui::Color32::GREEN,
                    StatusKind::Disconnected => egui::Color32::RED,
                };
                ui.horizontal(|ui| {
                    ui.colored_label(color, format!("[{}]", entry.timestamp.format("%H:%M:%S")));
                    ui.label(&entry.message);
                });
            }
        });
}
