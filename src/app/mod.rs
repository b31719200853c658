pub mod canvas;
pub mod exporter;
pub mod loader;
pub mod restyler;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use eframe::{
    egui::{self, Color32},
    App, Frame,
};
use tracing::info;

use crate::{
    compose::{compose, BackgroundOption},
    config::Config,
    export::{export_file_name, share_file_name, ShareAction, SharePlatform},
    geometry::Size,
    image_utils::{to_color_image, ImageHandle},
    restyle::RestyleClient,
    session::{Role, SessionController, Stage},
    ui::{ImageMetrics, KeyboardState},
};

use self::{
    exporter::{ExportRequest, Exporter, ShareTarget},
    loader::{LoadOutcome, Loader, UploadSource},
    restyler::{Restyler, NOT_CONFIGURED},
};

const PREVIEW_EDGE: f32 = 360.0;

/// Texture cached for whichever image handle it was built from.
struct CachedTexture {
    key: ImageHandle,
    texture: egui::TextureHandle,
}

pub struct DpMakerApp {
    pub session: SessionController,
    pub config: Config,
    pub pixel_density: Option<f32>,
    loader: Loader,
    restyler: Restyler,
    exporter: Exporter,
    source_texture: Option<egui::TextureHandle>,
    working_texture: Option<CachedTexture>,
    result_texture: Option<(BackgroundOption, ImageHandle, Option<egui::TextureHandle>)>,
    displayed: Option<Size>,
    path_input: String,
    name_input: String,
    prompt: String,
    ai_enabled: bool,
    background: BackgroundOption,
    status: String,
    alert: Option<String>,
    instructions: Option<String>,
}

impl DpMakerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: Config,
        pixel_density: Option<f32>,
        initial: Option<PathBuf>,
    ) -> Result<Self> {
        let client = match config.restyle_endpoint.as_deref() {
            Some(endpoint) => Some(RestyleClient::new(endpoint, config.restyle_timeout())?),
            None => None,
        };
        let mut app = Self {
            session: SessionController::new(),
            background: config.default_background,
            config,
            pixel_density,
            loader: Loader::new(),
            restyler: Restyler::new(client),
            exporter: Exporter::new(),
            source_texture: None,
            working_texture: None,
            result_texture: None,
            displayed: None,
            path_input: String::new(),
            name_input: String::new(),
            prompt: String::new(),
            ai_enabled: false,
            status: String::from("Upload a photo to get started"),
            alert: None,
            instructions: None,
        };
        if let Some(path) = initial {
            app.load_path(path);
        }
        Ok(app)
    }

    fn poll_workers(&mut self, ctx: &egui::Context) {
        match self.loader.poll() {
            Some(LoadOutcome::Loaded(photo)) => {
                if self.session.stage() != Stage::Upload {
                    info!(label = %photo.label, "ignoring upload outside the upload step");
                } else if let Err(err) = self.session.accept_upload(photo.upload) {
                    self.status = err.user_message();
                } else {
                    self.source_texture = Some(ctx.load_texture(
                        "dpmaker-source",
                        photo.preview,
                        egui::TextureOptions::LINEAR,
                    ));
                    self.status = format!("Loaded {}", photo.label);
                }
            }
            Some(LoadOutcome::Failed { label, error }) => {
                self.alert = Some(format!("{label}: {}", error.user_message()));
            }
            None => {}
        }

        for (ticket, result) in self.restyler.check_completions() {
            match self.session.finish_restyle(ticket, result) {
                Ok(()) => {
                    self.prompt.clear();
                    self.status = "Photo restyled".into();
                }
                Err(err) => self.status = err.user_message(),
            }
        }

        for done in self.exporter.check_completions() {
            match done.result {
                Ok(done) => {
                    self.status = format!("Saved {}", done.path.display());
                    if let Some(ShareAction::SaveThenOpen { instructions, .. }) = done.share {
                        self.instructions = Some(instructions);
                    }
                }
                Err(err) => self.status = format!("{err:#}"),
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        if self.session.stage() != Stage::Upload {
            return;
        }
        let dropped = ctx.input(|i| i.raw.dropped_files.first().cloned());
        let Some(file) = dropped else { return };
        if let Some(path) = file.path {
            self.load_path(path);
        } else if let Some(bytes) = file.bytes {
            self.loader.load(UploadSource::Bytes {
                name: file.name,
                bytes: bytes.to_vec(),
            });
        }
    }

    fn load_path(&mut self, path: PathBuf) {
        self.loader.load(UploadSource::Path(path));
    }

    fn reset_views(&mut self) {
        self.source_texture = None;
        self.working_texture = None;
        self.result_texture = None;
        self.displayed = None;
        self.prompt.clear();
        self.instructions = None;
    }

    fn working_texture(&mut self, ctx: &egui::Context) -> Option<egui::TextureHandle> {
        let current = self.session.working_image()?.clone();
        if let Some(cached) = &self.working_texture {
            if Arc::ptr_eq(&cached.key, &current) {
                return Some(cached.texture.clone());
            }
        }
        let decoded = current.decode().ok()?;
        let texture = ctx.load_texture(
            "dpmaker-working",
            to_color_image(&decoded),
            egui::TextureOptions::LINEAR,
        );
        self.working_texture = Some(CachedTexture {
            key: current,
            texture: texture.clone(),
        });
        Some(texture)
    }

    fn show_upload(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading("Create your DevFest DP");
            ui.add_space(10.0);
            ui.label("Drop a PNG or JPEG photo onto this window, or enter its path or link.");
            ui.add_space(20.0);
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.path_input)
                        .hint_text("/path/to/photo.jpg or https://...")
                        .desired_width(320.0),
                );
                let ready = !self.path_input.trim().is_empty() && self.loader.loading.is_none();
                if ui.add_enabled(ready, egui::Button::new("Upload")).clicked() {
                    self.loader.load(UploadSource::from_input(&self.path_input));
                }
            });
            if let Some(label) = &self.loader.loading {
                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(format!("Loading {label}..."));
                });
            }
        });
    }

    fn show_crop(&mut self, ui: &mut egui::Ui, keys: &KeyboardState) {
        ui.horizontal(|ui| {
            if ui.button("Replace photo").clicked() {
                self.session.replace_photo();
                self.reset_views();
                self.status = "Choose another photo".into();
            }
            if ui.button("Crop & continue").clicked() || keys.confirm {
                self.confirm_crop(ui.ctx());
            }
            ui.label("Drag the square to move it, drag a corner to resize. Arrow keys nudge.");
        });

        let Some(texture) = self.source_texture.clone() else { return };
        let Some(source) = self.session.source() else { return };
        let natural = source.natural_size();

        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::hover());
        painter.rect_filled(response.rect, 0.0, Color32::from_gray(24));
        let metrics = ImageMetrics::new(
            response.rect,
            egui::vec2(natural.width, natural.height),
        );
        painter.image(
            texture.id(),
            metrics.image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            Color32::WHITE,
        );
        self.displayed = Some(metrics.displayed_size());

        if let Some((dx, dy)) = keys.nudge() {
            self.session.drag_mut().nudge(dx, dy);
        }
        canvas::show(ui, &metrics, self.session.drag_mut());
    }

    fn confirm_crop(&mut self, ctx: &egui::Context) {
        let Some(displayed) = self.displayed else {
            self.status = "The photo is still loading".into();
            return;
        };
        let density = self.pixel_density.unwrap_or_else(|| ctx.pixels_per_point());
        match self.session.confirm_crop(displayed, density) {
            Ok(()) => self.status = "Add your name and optionally restyle your photo".into(),
            Err(err) => self.status = err.user_message(),
        }
    }

    fn show_customize(&mut self, ui: &mut egui::Ui) {
        let texture = self.working_texture(ui.ctx());
        ui.horizontal_top(|ui| {
            ui.vertical(|ui| {
                match &texture {
                    Some(texture) => {
                        ui.add(egui::Image::new((texture.id(), egui::Vec2::splat(PREVIEW_EDGE))));
                    }
                    None => {
                        ui.label("Preview unavailable");
                    }
                }
                if self.session.is_restyling() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Restyling...");
                    });
                }
            });

            ui.add_space(20.0);
            ui.vertical(|ui| {
                ui.label("Your name");
                if ui
                    .add(egui::TextEdit::singleline(&mut self.name_input).hint_text("Ada Lovelace"))
                    .changed()
                {
                    self.session.set_user_name(self.name_input.clone());
                }
                ui.add_space(10.0);
                ui.checkbox(&mut self.ai_enabled, "Style my photo with AI");
                if self.ai_enabled {
                    self.show_chat(ui);
                }
                ui.add_space(20.0);
                ui.horizontal(|ui| {
                    if ui.button("Replace photo").clicked() {
                        self.session.replace_photo();
                        self.reset_views();
                    }
                    let ready = !self.session.is_restyling();
                    if ui.add_enabled(ready, egui::Button::new("Generate DP")).clicked() {
                        match self.session.generate() {
                            Ok(()) => self.status = "Your DP is ready".into(),
                            Err(err) => self.status = err.user_message(),
                        }
                    }
                });
            });
        });
    }

    fn show_chat(&mut self, ui: &mut egui::Ui) {
        if !self.restyler.is_enabled() {
            ui.colored_label(Color32::YELLOW, NOT_CONFIGURED);
            return;
        }
        egui::ScrollArea::vertical()
            .max_height(180.0)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for message in self.session.chat() {
                    let (who, color) = match message.role {
                        Role::User => ("You", Color32::LIGHT_BLUE),
                        Role::Assistant => ("AI", Color32::LIGHT_GREEN),
                    };
                    ui.horizontal_wrapped(|ui| {
                        ui.colored_label(color, format!("{who}:"));
                        ui.label(&message.text);
                    });
                }
            });
        ui.add(
            egui::TextEdit::multiline(&mut self.prompt)
                .hint_text("e.g. make it a watercolour portrait")
                .desired_rows(2),
        );
        ui.horizontal(|ui| {
            let busy = self.session.is_restyling();
            let ready = !busy && !self.prompt.trim().is_empty();
            if ui.add_enabled(ready, egui::Button::new("Apply style")).clicked() {
                match self.session.begin_restyle(&self.prompt) {
                    Ok(job) => {
                        if let Err(err) = self.restyler.submit(job) {
                            self.status = format!("{err:#}");
                        }
                    }
                    Err(err) => self.status = err.user_message(),
                }
            }
            if ui.add_enabled(!busy, egui::Button::new("Reset to original")).clicked() {
                self.session.reset_working_image();
            }
        });
    }

    fn show_results(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Background:");
            for option in BackgroundOption::ALL {
                ui.selectable_value(&mut self.background, option, option.name());
            }
        });
        ui.add_space(10.0);

        match self.result_texture(ui.ctx()) {
            Some(texture) => {
                ui.add(egui::Image::new((texture.id(), egui::Vec2::splat(PREVIEW_EDGE * 1.4))));
            }
            None => {
                ui.colored_label(Color32::YELLOW, exporter::MANUAL_SAVE_HINT);
            }
        }
        ui.add_space(10.0);

        let idle = !self.exporter.is_busy();
        ui.horizontal(|ui| {
            if ui.add_enabled(idle, egui::Button::new("Download")).clicked() {
                let event = &self.config.event;
                let name = export_file_name(
                    &self.session.state().user_name,
                    &event.tag,
                    event.dp_suffix,
                );
                self.queue_export(name, None);
            }
            for platform in SharePlatform::ALL {
                let label = format!("Share on {}", platform.label());
                if ui.add_enabled(idle, egui::Button::new(label)).clicked() {
                    let event = &self.config.event;
                    let name = share_file_name(&self.session.state().user_name, &event.tag);
                    let target = ShareTarget {
                        platform,
                        message: event.share_message.clone(),
                        link: event.share_link.clone(),
                    };
                    self.queue_export(name, Some(target));
                }
            }
            if self.exporter.is_busy() {
                ui.spinner();
            }
        });
        ui.add_space(10.0);
        if ui.button("Create another").clicked() {
            self.session.create_another();
            self.name_input.clear();
            self.ai_enabled = false;
            self.reset_views();
            self.status = "Upload a photo to get started".into();
        }
    }

    fn result_texture(&mut self, ctx: &egui::Context) -> Option<egui::TextureHandle> {
        let subject = self.session.working_image()?.clone();
        if let Some((background, key, texture)) = &self.result_texture {
            if *background == self.background && Arc::ptr_eq(key, &subject) {
                return texture.clone();
            }
        }
        let frame = self.config.event.frame_assets();
        let texture = compose(
            self.background,
            &subject,
            &self.session.state().user_name,
            &frame,
        )
        .and_then(|image| image.decode().ok())
        .map(|image| {
            ctx.load_texture(
                "dpmaker-result",
                to_color_image(&image),
                egui::TextureOptions::LINEAR,
            )
        });
        self.result_texture = Some((self.background, subject, texture.clone()));
        texture
    }

    fn queue_export(&mut self, file_name: String, share: Option<ShareTarget>) {
        let Some(subject) = self.session.working_image().cloned() else {
            self.status = "Please upload and crop an image first".into();
            return;
        };
        let request = ExportRequest {
            subject,
            background: self.background,
            user_name: self.session.state().user_name.clone(),
            frame: self.config.event.frame_assets(),
            dir: self.config.output_dir(),
            file_name,
            share,
        };
        if let Err(err) = self.exporter.queue(request) {
            self.status = format!("Failed to queue export: {err:#}");
        }
    }

    fn show_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(alert) = self.alert.clone() {
            egui::Window::new("Unsupported photo")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                .show(ctx, |ui| {
                    ui.label(alert);
                    if ui.button("OK").clicked() {
                        self.alert = None;
                    }
                });
        }
        if let Some(steps) = self.instructions.clone() {
            egui::Window::new("Share on Instagram")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label("Your DP has been saved. To post it:");
                    ui.label(steps);
                    if ui.button("Done").clicked() {
                        self.instructions = None;
                    }
                });
        }
    }
}

impl App for DpMakerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_workers(ctx);
        self.handle_dropped_files(ctx);
        let keys = KeyboardState::read(ctx);

        if keys.escape && self.session.stage() == Stage::Crop {
            self.session.replace_photo();
            self.reset_views();
        }

        egui::TopBottomPanel::top("dpmaker-steps").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("DevFest DP maker");
                ui.separator();
                for (stage, label) in [
                    (Stage::Upload, "1. Upload"),
                    (Stage::Crop, "2. Crop"),
                    (Stage::Customize, "3. Customize"),
                    (Stage::Results, "4. Download"),
                ] {
                    let color = if stage == self.session.stage() {
                        Color32::WHITE
                    } else {
                        Color32::GRAY
                    };
                    ui.colored_label(color, label);
                }
            });
        });

        egui::TopBottomPanel::bottom("dpmaker-status").show(ctx, |ui| {
            ui.monospace(&self.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.session.stage() {
            Stage::Upload => self.show_upload(ui),
            Stage::Crop => self.show_crop(ui, &keys),
            Stage::Customize => self.show_customize(ui),
            Stage::Results => self.show_results(ui),
        });

        self.show_dialogs(ctx);

        if self.loader.loading.is_some() || self.session.is_restyling() || self.exporter.is_busy() {
            ctx.request_repaint();
        }
    }
}
