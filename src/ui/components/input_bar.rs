use eframe::egui;

/// Returns true when the user asked to send. The caller decides whether
/// there is anything to send; the button is disabled when there is not.
pub fn render(ui: &mut egui::Ui, input_text: &mut String, can_send: bool) -> bool {
    let mut send = false;
    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(input_text)
                .hint_text("Type a message...")
                .desired_width((ui.available_width() - 60.0).max(80.0)),
        );
        if ui.add_enabled(can_send, egui::Button::new("Send")).clicked() {
            send = true;
        }

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            send = true;
            response.request_focus();
        }
    });

    send && !input_text.trim().is_empty()
}
