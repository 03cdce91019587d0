use std::time::Instant;

use chrono::Utc;
use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::common::{NetworkEvent, UserIdentity};
use crate::network::{Connection, HttpHistory};

use super::components::{
    chat_area, debug_panel, emoji_bar, input_bar, reply_banner,
    sidebar::{self, SidebarView},
};
use super::room_chat::RoomChat;
use super::state::ChatPhase;
use super::status::ConnectionLog;

pub struct ChatApp {
    connection: Connection,
    history: HttpHistory,
    user: Option<UserIdentity>,
    room_id: Option<String>,
    runtime: Handle,
    status: ConnectionLog,
    status_receiver: broadcast::Receiver<NetworkEvent>,
    show_chat: bool,
    chat: Option<RoomChat>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        connection: Connection,
        history: HttpHistory,
        user: Option<UserIdentity>,
        room_id: Option<String>,
        runtime: Handle,
    ) -> Self {
        let status_receiver = connection.subscribe();
        Self {
            connection,
            history,
            user,
            room_id,
            runtime,
            status: ConnectionLog::default(),
            status_receiver,
            show_chat: true,
            chat: None,
        }
    }

    fn handle_network_events(&mut self) {
        loop {
            match self.status_receiver.try_recv() {
                Ok(event) => {
                    self.status.record(&event, Utc::now());
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    /// Mounts or unmounts the chat to follow the sidebar toggle.
    fn sync_chat_mount(&mut self) {
        match (self.show_chat, self.chat.is_some()) {
            (true, false) => {
                self.chat = Some(RoomChat::mount(
                    self.connection.clone(),
                    self.history.clone(),
                    self.user.clone(),
                    self.room_id.clone(),
                    &self.runtime,
                ));
                log::debug!(
                    "Team chat opened ({} connection subscribers)",
                    self.connection.subscriber_count()
                );
            }
            (false, true) => {
                log::info!("Team chat closed");
                self.chat = None;
            }
            _ => {}
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_network_events();
        self.sync_chat_mount();

        let now = Instant::now();
        let mut scroll_to_bottom = false;
        if let Some(chat) = self.chat.as_mut() {
            chat.poll(now);
            scroll_to_bottom = chat.state_mut().take_due_scroll(now);
            if let Some(due) = chat.state().scroll_deadline() {
                ctx.request_repaint_after(due.saturating_duration_since(now));
            }
        }

        egui::SidePanel::left("team_sidebar")
            .resizable(true)
            .default_width(200.0)
            .show(ctx, |ui| {
                let view = SidebarView {
                    user: self.user.as_ref(),
                    room_id: self.room_id.as_deref(),
                    status: &self.status,
                };
                sidebar::render(ui, view, &mut self.show_chat);
            });

        egui::SidePanel::right("debug_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                debug_panel::render(ui, &self.status);
            });

        let Some(chat) = self.chat.as_mut() else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.label(egui::RichText::new("Team chat is hidden").weak());
            });
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
            return;
        };

        egui::TopBottomPanel::bottom("composer").show(ctx, |ui| {
            ui.add_space(4.0);
            if let Some(target) = chat.state().reply_target().cloned() {
                if reply_banner::render(ui, &target) {
                    chat.state_mut().cancel_reply();
                }
            }
            if let Some(shortcode) = emoji_bar::render(ui) {
                chat.state_mut().insert_emoji(shortcode);
            }
            let can_send = chat.state().can_send();
            if input_bar::render(ui, &mut chat.state_mut().input_text, can_send) {
                chat.send();
            }
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Team Chat");
            ui.separator();
            match chat.state().phase() {
                ChatPhase::Inert => {
                    ui.label(egui::RichText::new("Chat is unavailable without a company").weak());
                }
                ChatPhase::Loading => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading messages...");
                    });
                }
                ChatPhase::Live => {
                    if let Some(index) =
                        chat_area::render(ui, chat.state().messages(), scroll_to_bottom)
                    {
                        chat.select_reply(index);
                    }
                }
            }
        });

        // Keep draining the subscription while idle.
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
