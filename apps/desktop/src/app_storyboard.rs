use crate::app::App;
use desktop::session::SessionState;
use egui::CollapsingHeader;
use story::Scene;

pub(crate) fn storyboard_panel(app: &mut App, ui: &mut egui::Ui) {
    ui.heading("Storyboard");
    ui.add_space(4.0);

    if app.session.is_loading() {
        thinking_panel(app, ui);
        return;
    }

    let mut edits: Vec<(u32, String)> = Vec::new();
    match app.session.state() {
        SessionState::Idle | SessionState::Loading => {
            ui.weak("Generate a story to see the storyboard");
        }
        SessionState::Error(message) => {
            ui.colored_label(egui::Color32::LIGHT_RED, message);
            ui.weak("Adjust the topic and try again.");
        }
        SessionState::Success(story) => {
            egui::ScrollArea::vertical()
                .id_salt("storyboard_scroll")
                .show(ui, |ui| {
                    if !story.thinking_trace.is_empty() {
                        CollapsingHeader::new("Reveal AI Logic")
                            .default_open(false)
                            .show(ui, |ui| {
                                ui.label(&story.thinking_trace);
                            });
                        ui.add_space(8.0);
                    }
                    for scene in &story.scenes {
                        if let Some(edit) = scene_card(ui, scene) {
                            edits.push(edit);
                        }
                        ui.add_space(8.0);
                    }
                });
        }
    }
    for (scene_id, text) in edits {
        app.session.edit_scene_text(scene_id, &text);
    }
}

fn thinking_panel(app: &App, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.spinner();
        ui.strong("AI Thinking Process");
    });
    ui.add_space(4.0);
    let lines = app.session.narrated_lines();
    if lines.is_empty() {
        ui.weak("Initializing thinking process...");
    }
    for line in lines {
        ui.horizontal(|ui| {
            ui.label("•");
            ui.label(line);
        });
    }
    if app.session.narration_pending() {
        ui.weak(egui::RichText::new("Thinking...").italics());
    }
}

/// One editable scene card. Returns the pending text edit, if any; the caller
/// applies it through the session so the update stays keyed by scene id.
fn scene_card(ui: &mut egui::Ui, scene: &Scene) -> Option<(u32, String)> {
    let mut edit = None;
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.strong(format!("Scene {}", scene.id));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.weak(format!("{}s", scene.estimated_duration));
            });
        });
        ui.add_space(4.0);

        ui.label("Voiceover Text");
        let mut buffer = scene.text_content.clone();
        let response = ui.add(
            egui::TextEdit::multiline(&mut buffer)
                .desired_rows(4)
                .desired_width(f32::INFINITY),
        );
        if response.changed() {
            edit = Some((scene.id, buffer));
        }
        ui.add_space(4.0);

        ui.label("Visual Prompt");
        ui.label(&scene.visual_prompts.description);
        ui.horizontal(|ui| {
            ui.weak(format!("Angle: {}", scene.visual_prompts.camera_angle));
            ui.weak(format!("Mood: {}", scene.visual_prompts.mood));
        });
    });
    edit
}
