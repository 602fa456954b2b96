use desktop::generate::StoryBackend;
use desktop::session::{SessionState, StorySession};
use egui::CollapsingHeader;
use parking_lot::Mutex;
use sidecar::Supervisor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use story::Platform;

pub struct App {
    pub(crate) topic: String,
    pub(crate) platform: Platform,
    pub(crate) session: StorySession,
    pub(crate) backend: Arc<dyn StoryBackend>,
    // Shared with the termination handler, which may take the supervisor out
    // from under the UI.
    pub(crate) supervisor: Arc<Mutex<Option<Supervisor>>>,
}

impl App {
    pub fn new(
        backend: Arc<dyn StoryBackend>,
        session: StorySession,
        supervisor: Arc<Mutex<Option<Supervisor>>>,
    ) -> Self {
        Self {
            topic: String::new(),
            platform: Platform::default(),
            session,
            backend,
            supervisor,
        }
    }

    fn config_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Viral Story Studio");
        ui.weak("Create engaging viral content with AI-powered storytelling");
        ui.separator();

        ui.strong("Story Configuration");
        ui.add_space(4.0);
        ui.label("Topic");
        ui.add(
            egui::TextEdit::multiline(&mut self.topic)
                .desired_rows(6)
                .desired_width(f32::INFINITY)
                .hint_text("Enter your story topic or idea..."),
        );
        ui.add_space(4.0);
        ui.label("Platform");
        egui::ComboBox::from_id_salt("platform_select")
            .selected_text(self.platform.label())
            .show_ui(ui, |ui| {
                for platform in Platform::ALL {
                    ui.selectable_value(&mut self.platform, platform, platform.label());
                }
            });

        ui.add_space(8.0);
        let loading = self.session.is_loading();
        let can_submit = !loading && !self.topic.trim().is_empty();
        let label = if loading { "Generating..." } else { "Generate Story" };
        if ui
            .add_enabled(can_submit, egui::Button::new(label))
            .clicked()
        {
            self.session.submit(
                &self.topic,
                self.platform,
                self.backend.clone(),
                Instant::now(),
            );
        }
        if loading {
            ui.spinner();
        }

        if let Some(message) = self.session.validation_message() {
            ui.colored_label(egui::Color32::LIGHT_RED, message);
        }
        match self.session.state() {
            SessionState::Error(message) => {
                ui.colored_label(egui::Color32::LIGHT_RED, message);
            }
            SessionState::Success(story) => {
                ui.colored_label(egui::Color32::LIGHT_GREEN, &story.title);
                ui.weak(format!("Clickbait Score: {}/100", story.clickbait_score));
            }
            _ => {}
        }

        let logs = self.supervisor.lock().as_ref().map(|s| s.logs(80));
        if let Some(lines) = logs {
            ui.separator();
            CollapsingHeader::new("Backend Log").show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("backend_log")
                    .max_height(180.0)
                    .show(ui, |ui| {
                        for line in lines {
                            ui.monospace(line);
                        }
                    });
            });
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.session.poll(Instant::now()) {
            ctx.request_repaint();
        }
        if self.session.is_loading() {
            // Keep narration ticking even when no input events arrive.
            ctx.request_repaint_after(Duration::from_millis(200));
        }

        egui::SidePanel::left("story_config")
            .resizable(true)
            .min_width(360.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("config_scroll")
                    .show(ui, |ui| self.config_panel(ui));
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            crate::app_storyboard::storyboard_panel(self, ui);
        });
    }

    fn on_exit(&mut self) {
        if let Some(mut supervisor) = self.supervisor.lock().take() {
            supervisor.stop();
        }
    }
}
