use eframe::egui;

use crate::common::UserIdentity;
use crate::ui::status::ConnectionLog;

pub struct SidebarView<'a> {
    pub user: Option<&'a UserIdentity>,
    pub room_id: Option<&'a str>,
    pub status: &'a ConnectionLog,
}

pub fn render(ui: &mut egui::Ui, view: SidebarView<'_>, show_chat: &mut bool) {
    ui.heading("Team");
    ui.separator();

    match view.user {
        Some(user) => ui.label(format!("Signed in as {}", user.name)),
        None => ui.label(egui::RichText::new("No signed-in user").weak()),
    };
    match view.room_id {
        Some(room_id) => ui.label(format!("Company room: {room_id}")),
        None => ui.label(egui::RichText::new("No company room").weak()),
    };

    ui.separator();
    ui.horizontal(|ui| {
        if view.status.is_online() {
            ui.colored_label(egui::Color32::GREEN, "●");
            ui.label("Online");
        } else {
            ui.colored_label(egui::Color32::RED, "●");
            ui.label("Offline");
        }
        if let Some(since) = view.status.since() {
            let elapsed = chrono::Utc::now().signed_duration_since(since);
            ui.label(egui::RichText::new(format!("({}s)", elapsed.num_seconds())).weak());
        }
    });

    ui.separator();
    ui.checkbox(show_chat, "Show team chat");
}
