use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use eframe::{egui, App, CreationContext, Frame};
use egui::{Align, Color32, Layout, RichText, ScrollArea, Ui};
use tracing::{error, info, warn};

use crate::api::DocumentBackend;
use crate::form::{FormField, Validation, WorkoutForm, DATE_FORMAT};
use crate::models::{BackendVariant, DocumentFormat};
use crate::notices::{NoticeLevel, Notices};
use crate::prefs::{PrefStore, SidebarController, Theme, ThemeController, UiEvent};
use crate::preview::{preview_policy, run_preview, ArtifactStore, PreviewArtifact, PreviewModal, PreviewState};
use crate::routines::{RoutineDefaults, LETTERS};
use crate::submit::{check_ready, DownloadSink, FormatSelector, Submitter};
use crate::tasks::{TaskResult, TaskRunner};
use crate::viewer;

/// Template every V2 request names.
pub const V2_TEMPLATE: &str = "gym_log_template.html";

const NAV_LINKS: [(&str, &str, &str); 3] = [
    ("builder", "🏋", "Workout Builder"),
    ("preview", "👁", "Preview"),
    ("reset", "↺", "Reset Form"),
];

const SIDEBAR_WIDTH: f32 = 200.0;
const RAIL_WIDTH: f32 = 48.0;

/// Collaborators the window is built from.
pub struct Services {
    pub backend: Arc<dyn DocumentBackend>,
    pub sink: Arc<dyn DownloadSink>,
    pub variant: BackendVariant,
    pub defaults: RoutineDefaults,
    pub sidebar_store: Box<dyn PrefStore>,
    pub theme_store: Box<dyn PrefStore>,
    pub artifacts: ArtifactStore,
}

pub struct GymLogApp {
    variant: BackendVariant,
    backend: Arc<dyn DocumentBackend>,
    submitter: Submitter,
    defaults: RoutineDefaults,
    form: WorkoutForm,
    /// Set after the first generate attempt; field errors are only shown from then on.
    validation: Option<Validation>,
    templates: Vec<String>,
    templates_loaded: bool,
    v2_available: bool,
    formats: FormatSelector,
    generating: bool,
    preview: PreviewModal,
    notices: Notices,
    sidebar: SidebarController,
    sidebar_toggle_rect: Option<egui::Rect>,
    theme: ThemeController,
    ui_events: Receiver<UiEvent>,
    tasks: TaskRunner,
}

impl GymLogApp {
    pub fn new(cc: &CreationContext, services: Services) -> Self {
        let ctx = cc.egui_ctx.clone();
        let (events_tx, events_rx) = mpsc::channel();
        let sidebar = SidebarController::new(
            services.sidebar_store,
            events_tx.clone(),
            ctx.screen_rect().width(),
        );
        let theme = ThemeController::new(services.theme_store, events_tx);
        theme.apply(&ctx);

        let submitter = Submitter::new(services.backend.clone(), services.sink, services.variant);
        let mut app = GymLogApp {
            variant: services.variant,
            backend: services.backend,
            submitter,
            form: WorkoutForm::new(&services.defaults),
            defaults: services.defaults,
            validation: None,
            templates: Vec::new(),
            templates_loaded: false,
            v2_available: false,
            formats: FormatSelector::default(),
            generating: false,
            preview: PreviewModal::new(services.artifacts),
            notices: Notices::default(),
            sidebar,
            sidebar_toggle_rect: None,
            theme,
            ui_events: events_rx,
            tasks: TaskRunner::new(Some(ctx)),
        };

        app.refresh_backend();
        app.notices.push(
            NoticeLevel::Success,
            "Application loaded successfully!",
            Instant::now(),
        );
        app
    }

    /// Ask the backend what it offers: templates on V1, capabilities on V2.
    fn refresh_backend(&self) {
        let backend = self.backend.clone();
        match self.variant {
            BackendVariant::V1 => self.tasks.spawn("templates", move |reporter| {
                reporter.send(TaskResult::Templates(backend.list_templates()));
            }),
            BackendVariant::V2 => self.tasks.spawn("status", move |reporter| {
                reporter.send(TaskResult::Status(backend.status()));
            }),
        }
    }

    fn template_name(&self) -> String {
        match self.variant {
            BackendVariant::V1 => self.form.template.clone(),
            BackendVariant::V2 => V2_TEMPLATE.to_string(),
        }
    }

    fn handle_task(&mut self, result: TaskResult, now: Instant) {
        match result {
            TaskResult::Templates(Ok(templates)) => {
                info!(count = templates.len(), "templates loaded");
                if !templates.contains(&self.form.template) {
                    self.form.template = templates.first().cloned().unwrap_or_default();
                }
                self.templates = templates;
                self.templates_loaded = true;
            }
            TaskResult::Templates(Err(e)) => {
                error!(error = %e, "error loading templates");
                self.templates_loaded = true;
                self.notices.push(
                    NoticeLevel::Danger,
                    "Failed to load templates. Please check if the server is running.",
                    now,
                );
            }
            TaskResult::Status(Ok(status)) => {
                self.v2_available = status.v2_available();
                self.formats.apply_status(Some(&status));
                info!(
                    v2 = self.v2_available,
                    pdf = self.formats.pdf_available(),
                    "backend status checked"
                );
            }
            TaskResult::Status(Err(e)) => {
                warn!(error = %e, status = ?e.status_code(), "error checking V2 status");
                self.v2_available = false;
                self.formats.apply_status(None);
                self.notices.push(
                    NoticeLevel::Warning,
                    "V2 backend is not available. Some features may be limited.",
                    now,
                );
            }
            TaskResult::Submitted(outcome) => {
                self.generating = false;
                match outcome {
                    Ok(outcome) => self.notices.push(NoticeLevel::Success, outcome.message(), now),
                    Err(e) => self.notices.push(e.level(), e.to_string(), now),
                };
            }
            TaskResult::Preview { ticket, event } => {
                if !self.preview.apply(ticket, event, now) {
                    info!(ticket, "discarding stale preview result");
                }
            }
        }
    }

    fn handle_ui_event(&mut self, ctx: &egui::Context, event: UiEvent) {
        match event {
            UiEvent::SidebarToggled { collapsed } => {
                info!(collapsed, "sidebar toggled");
            }
            UiEvent::ThemeChanged { theme } => {
                info!(theme = theme.as_str(), "theme changed");
                ctx.set_visuals(theme.visuals());
            }
        }
    }

    fn generate(&mut self, now: Instant) {
        let validation = self.form.validate();
        let payload = self.form.collect(&self.template_name());
        let ready = check_ready(self.variant, &validation, &payload, self.v2_available);
        self.validation = Some(validation);
        if let Err(e) = ready {
            self.notices.push(e.level(), e.to_string(), now);
            return;
        }

        self.generating = true;
        let submitter = self.submitter.clone();
        let format = self.formats.selected();
        info!(variant = ?submitter.variant(), format = format.label(), "generating document");
        self.tasks.spawn("generate", move |reporter| {
            reporter.send(TaskResult::Submitted(submitter.submit(&payload, format)));
        });
    }

    fn open_preview(&mut self, now: Instant) {
        let payload = self.form.collect(&self.template_name());
        let policy = match preview_policy(
            self.variant,
            &payload.template_name,
            self.v2_available,
            &self.formats,
        ) {
            Ok(policy) => policy,
            Err(message) => {
                self.notices.push(NoticeLevel::Warning, message, now);
                return;
            }
        };

        let ticket = self.preview.open();
        let backend = self.backend.clone();
        info!(ticket, ?policy, "requesting preview");
        self.tasks.spawn("preview", move |reporter| {
            run_preview(policy, backend.as_ref(), &payload, |event| {
                reporter.send(TaskResult::Preview { ticket, event });
            });
        });
    }

    fn reset_form(&mut self, now: Instant) {
        self.form.reset(&self.defaults);
        if self.variant == BackendVariant::V1 {
            self.form.template = self.templates.first().cloned().unwrap_or_default();
        }
        self.validation = None;
        self.formats.reset();
        self.notices.clear();
        self.notices.push(NoticeLevel::Info, "Form reset to defaults.", now);
    }

    fn select_format(&mut self, format: DocumentFormat, now: Instant) {
        if let Err(message) = self.formats.select(format) {
            self.notices.push(NoticeLevel::Warning, message, now);
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context, now: Instant) {
        let (generate, preview, sidebar, theme, escape) = ctx.input_mut(|i| {
            (
                i.consume_key(egui::Modifiers::COMMAND, egui::Key::Enter),
                i.consume_key(egui::Modifiers::COMMAND, egui::Key::P),
                i.consume_key(egui::Modifiers::COMMAND, egui::Key::B),
                i.consume_key(egui::Modifiers::COMMAND, egui::Key::T),
                i.consume_key(egui::Modifiers::NONE, egui::Key::Escape),
            )
        });
        if generate && !self.generating {
            self.generate(now);
        }
        if preview {
            self.open_preview(now);
        }
        if sidebar {
            self.sidebar.toggle();
        }
        if theme {
            self.theme.toggle();
        }
        if escape && self.preview.is_open() {
            self.preview.close();
        }
    }

    fn flagged(&self, field: FormField) -> bool {
        self.validation.as_ref().is_some_and(|v| v.flags(field))
    }
}

impl App for GymLogApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        let now = Instant::now();
        for result in self.tasks.poll() {
            self.handle_task(result, now);
        }
        while let Ok(event) = self.ui_events.try_recv() {
            self.handle_ui_event(ctx, event);
        }

        self.notices.sweep(now);
        self.preview.sweep(now);
        self.sidebar.handle_resize(ctx.screen_rect().width());
        self.sidebar.tick(now);
        self.handle_shortcuts(ctx, now);

        self.show_header(ctx);
        self.show_sidebar(ctx, now);
        egui::CentralPanel::default().show(ctx, |ui| self.show_form(ui, now));
        self.show_preview_window(ctx, now);
        self.show_notices(ctx);

        if !self.notices.is_empty() || self.preview.has_live_files() || self.sidebar.is_overlay_open() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}

impl GymLogApp {
    fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let toggle = ui.button("☰").on_hover_text("Toggle sidebar (Ctrl+B)");
                if toggle.clicked() {
                    self.sidebar.toggle();
                }
                self.sidebar_toggle_rect = Some(toggle.rect);

                ui.heading("Gym Log Editor");

                if self.variant == BackendVariant::V2 {
                    ui.add_space(20.0);
                    status_badge(ui, "V2", self.v2_available);
                    status_badge(ui, "PDF", self.formats.pdf_available());
                }

                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    let (icon, hint) = match self.theme.current() {
                        Theme::Light => ("🌙", "Switch to Dark Mode (Ctrl+T)"),
                        Theme::Dark => ("☀", "Switch to Light Mode (Ctrl+T)"),
                    };
                    if ui.button(icon).on_hover_text(hint).clicked() {
                        self.theme.toggle();
                    }
                });
            });
        });
    }

    fn show_sidebar(&mut self, ctx: &egui::Context, now: Instant) {
        if !self.sidebar.is_mobile() {
            let collapsed = self.sidebar.is_collapsed();
            egui::SidePanel::left("sidebar")
                .resizable(false)
                .exact_width(if collapsed { RAIL_WIDTH } else { SIDEBAR_WIDTH })
                .show(ctx, |ui| {
                    ui.add_space(8.0);
                    self.nav_links(ui, now, collapsed);
                    ui.with_layout(Layout::bottom_up(Align::Min), |ui| {
                        if collapsed {
                            if ui.small_button("»").on_hover_text("Expand").clicked() {
                                self.sidebar.expand();
                            }
                        } else if ui.small_button("« Collapse").clicked() {
                            self.sidebar.collapse();
                        }
                    });
                });
            return;
        }

        if !self.sidebar.is_overlay_open() {
            return;
        }
        let overlay = egui::Area::new(egui::Id::new("sidebar_overlay"))
            .order(egui::Order::Foreground)
            .fixed_pos(egui::pos2(0.0, 36.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_min_width(SIDEBAR_WIDTH);
                    self.nav_links(ui, now, false);
                });
            });

        let clicked_at = ctx.input(|i| {
            if i.pointer.any_click() {
                i.pointer.interact_pos()
            } else {
                None
            }
        });
        if let Some(pos) = clicked_at {
            let on_toggle = self.sidebar_toggle_rect.is_some_and(|r| r.contains(pos));
            self.sidebar
                .pointer_clicked(on_toggle || overlay.response.rect.contains(pos));
        }
    }

    fn nav_links(&mut self, ui: &mut Ui, now: Instant, compact: bool) {
        for (id, icon, label) in NAV_LINKS {
            let active = self.sidebar.active_link() == Some(id);
            let text = if compact {
                icon.to_string()
            } else {
                format!("{icon}  {label}")
            };
            let response = ui.selectable_label(active, text).on_hover_text(label);
            if response.clicked() {
                self.sidebar.link_clicked(id, now);
                match id {
                    "preview" => self.open_preview(now),
                    "reset" => self.reset_form(now),
                    _ => {}
                }
            }
        }
    }

    fn show_form(&mut self, ui: &mut Ui, now: Instant) {
        if self.validation.is_some() {
            self.validation = Some(self.form.validate());
        }

        ScrollArea::vertical().show(ui, |ui| {
            ui.add_enabled_ui(!self.generating, |ui| {
                self.show_basic_info(ui, now);
                ui.add_space(12.0);
                ui.heading("Exercises");
                for idx in 0..self.form.groups.len() {
                    self.show_group(ui, idx);
                }
                self.show_bonus(ui);
                ui.add_space(12.0);
                self.show_actions(ui, now);
            });
            if self.generating {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Generating document...");
                });
            }
        });
    }

    fn show_basic_info(&mut self, ui: &mut Ui, now: Instant) {
        ui.heading("Workout Details");
        let name_invalid = self.flagged(FormField::WorkoutName);
        let date_invalid = self.flagged(FormField::WorkoutDate);
        egui::Grid::new("basic_info")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label(required_label("Workout Name", name_invalid));
                ui.add(
                    egui::TextEdit::singleline(&mut self.form.workout_name)
                        .hint_text("e.g., Push Day"),
                );
                ui.end_row();

                ui.label(required_label("Date", date_invalid));
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut self.form.workout_date)
                            .desired_width(110.0)
                            .hint_text("YYYY-MM-DD"),
                    );
                    let mut picked = self
                        .form
                        .parsed_date()
                        .unwrap_or_else(|| Local::now().date_naive());
                    let before = picked;
                    ui.add(egui_extras::DatePickerButton::new(&mut picked));
                    if picked != before {
                        self.form.workout_date = picked.format(DATE_FORMAT).to_string();
                    }
                });
                ui.end_row();

                match self.variant {
                    BackendVariant::V1 => {
                        ui.label(required_label("Template", false));
                        self.show_template_select(ui);
                    }
                    BackendVariant::V2 => {
                        ui.label("Format");
                        self.show_format_select(ui, now);
                    }
                }
                ui.end_row();
            });
    }

    fn show_template_select(&mut self, ui: &mut Ui) {
        if self.templates.is_empty() {
            ui.label(if self.templates_loaded {
                "No templates found"
            } else {
                "Loading templates..."
            });
            return;
        }
        let selected = if self.form.template.is_empty() {
            "Select a template...".to_string()
        } else {
            self.form.template.clone()
        };
        egui::ComboBox::from_id_salt("template_select")
            .selected_text(selected)
            .show_ui(ui, |ui| {
                for template in &self.templates {
                    ui.selectable_value(&mut self.form.template, template.clone(), template.as_str());
                }
            });
    }

    fn show_format_select(&mut self, ui: &mut Ui, now: Instant) {
        ui.horizontal(|ui| {
            for format in [DocumentFormat::Html, DocumentFormat::Pdf] {
                let available = format != DocumentFormat::Pdf || self.formats.pdf_available();
                let text = if available {
                    RichText::new(format!("{} Document", format.label()))
                } else {
                    RichText::new("PDF Document (requires Gotenberg service)").weak()
                };
                if ui
                    .selectable_label(self.formats.selected() == format, text)
                    .clicked()
                {
                    self.select_format(format, now);
                }
            }
        });
    }

    fn show_group(&mut self, ui: &mut Ui, idx: usize) {
        let number = self.form.groups[idx].number;
        let header = format!("{number}   {}", self.form.group_header(number));
        let tooltip = self.form.group_header_tooltip(number);
        let hints = LETTERS.map(|letter| {
            let name = self.defaults.exercise(number, letter);
            if name.is_empty() {
                "Exercise name".to_string()
            } else {
                name.to_string()
            }
        });

        let response = egui::CollapsingHeader::new(header)
            .id_salt(("exercise_group", number))
            .default_open(number == 1)
            .show(ui, |ui| {
                let group = &mut self.form.groups[idx];
                egui::Grid::new(("exercise_grid", number))
                    .num_columns(3)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        for letter in LETTERS {
                            ui.label(format!("Exercise {number}{letter}"));
                        }
                        ui.end_row();
                        for (value, hint) in group.exercises.iter_mut().zip(hints.iter()) {
                            ui.add(egui::TextEdit::singleline(value).hint_text(hint.as_str()));
                        }
                        ui.end_row();

                        ui.label("Sets");
                        ui.label("Reps");
                        ui.label("Rest");
                        ui.end_row();
                        ui.add(egui::TextEdit::singleline(&mut group.sets).hint_text("e.g., 3"));
                        ui.add(egui::TextEdit::singleline(&mut group.reps).hint_text("e.g., 8-12"));
                        ui.add(egui::TextEdit::singleline(&mut group.rest).hint_text("e.g., 60s"));
                        ui.end_row();
                    });
            });
        if let Some(full) = tooltip {
            response.header_response.on_hover_text(full);
        }
    }

    fn show_bonus(&mut self, ui: &mut Ui) {
        egui::CollapsingHeader::new("Bonus Exercises")
            .id_salt("bonus_exercises")
            .show(ui, |ui| {
                egui::Grid::new("bonus_grid")
                    .num_columns(5)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("");
                        ui.label("Exercise");
                        ui.label("Sets");
                        ui.label("Reps");
                        ui.label("Rest");
                        ui.end_row();
                        for slot in self.form.bonus.iter_mut() {
                            ui.label(format!("Bonus {}", slot.number));
                            ui.add(egui::TextEdit::singleline(&mut slot.exercise).hint_text("Optional"));
                            ui.add(egui::TextEdit::singleline(&mut slot.sets).desired_width(60.0));
                            ui.add(egui::TextEdit::singleline(&mut slot.reps).desired_width(60.0));
                            ui.add(egui::TextEdit::singleline(&mut slot.rest).desired_width(60.0));
                            ui.end_row();
                        }
                    });
            });
    }

    fn show_actions(&mut self, ui: &mut Ui, now: Instant) {
        ui.horizontal(|ui| {
            let generate_label = match self.variant {
                BackendVariant::V1 => "Generate Document".to_string(),
                BackendVariant::V2 => format!("Generate {}", self.formats.selected().label()),
            };
            if ui
                .button(RichText::new(generate_label).strong())
                .on_hover_text("Ctrl+Enter")
                .clicked()
            {
                self.generate(now);
            }
            if ui.button("Preview").on_hover_text("Ctrl+P").clicked() {
                self.open_preview(now);
            }
            if ui.button("Reset").clicked() {
                self.reset_form(now);
            }
        });
    }

    fn show_preview_window(&mut self, ctx: &egui::Context, now: Instant) {
        if !self.preview.is_open() {
            return;
        }
        let mut open = true;
        let mut open_file: Option<PathBuf> = None;
        egui::Window::new("Workout Preview")
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .default_size([760.0, 560.0])
            .show(ctx, |ui| match self.preview.state() {
                PreviewState::Closed => {}
                PreviewState::Loading => {
                    ui.vertical_centered(|ui| {
                        ui.spinner();
                        ui.label("Generating preview...");
                    });
                }
                PreviewState::Failed(message) => {
                    ui.colored_label(
                        level_color(NoticeLevel::Danger),
                        format!("Preview failed: {message}"),
                    );
                }
                PreviewState::Showing { artifact, file } => {
                    match file {
                        Some(path) => {
                            if ui.button("Open in viewer").clicked() {
                                open_file = Some(path.clone());
                            }
                        }
                        None if !matches!(artifact, PreviewArtifact::Text(_)) => {
                            ui.weak("Preview file expired. Run the preview again to open it.");
                        }
                        None => {}
                    }
                    ui.separator();
                    match artifact {
                        PreviewArtifact::Pdf(bytes) => {
                            ui.label(format!("PDF preview ready ({} KB).", bytes.len().div_ceil(1024)));
                        }
                        PreviewArtifact::Html(html) => {
                            ScrollArea::vertical().show(ui, |ui| {
                                ui.add(
                                    egui::TextEdit::multiline(&mut html.as_str())
                                        .code_editor()
                                        .desired_width(f32::INFINITY),
                                );
                            });
                        }
                        PreviewArtifact::Text(text) => {
                            ScrollArea::vertical().show(ui, |ui| {
                                ui.add(
                                    egui::TextEdit::multiline(&mut text.as_str())
                                        .font(egui::TextStyle::Monospace)
                                        .desired_width(f32::INFINITY),
                                );
                            });
                        }
                    }
                }
            });

        if let Some(path) = open_file {
            if let Err(e) = viewer::open_preview_file(&path) {
                warn!(path = %path.display(), error = %e, "could not launch preview viewer");
                self.notices
                    .push(NoticeLevel::Warning, "Could not open the preview viewer.", now);
            }
        }
        if !open {
            self.preview.close();
        }
    }

    fn show_notices(&mut self, ctx: &egui::Context) {
        if self.notices.is_empty() {
            return;
        }
        let mut dismissed = Vec::new();
        egui::Area::new(egui::Id::new("notices"))
            .order(egui::Order::Foreground)
            .anchor(egui::Align2::RIGHT_TOP, [-12.0, 48.0])
            .show(ctx, |ui| {
                ui.set_max_width(380.0);
                for notice in self.notices.iter() {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.colored_label(level_color(notice.level), level_icon(notice.level));
                            ui.label(notice.message.as_str());
                            if ui.small_button("✕").clicked() {
                                dismissed.push(notice.id);
                            }
                        });
                    });
                    ui.add_space(4.0);
                }
            });
        for id in dismissed {
            self.notices.dismiss(id);
        }
    }
}

fn required_label(text: &str, invalid: bool) -> RichText {
    let label = RichText::new(format!("{text} *"));
    if invalid {
        label.color(level_color(NoticeLevel::Danger))
    } else {
        label
    }
}

fn status_badge(ui: &mut Ui, name: &str, available: bool) {
    let (text, color) = if available {
        ("Available", level_color(NoticeLevel::Success))
    } else {
        ("Unavailable", level_color(NoticeLevel::Danger))
    };
    ui.label(format!("{name}:"));
    ui.label(RichText::new(text).color(color).strong());
}

fn level_color(level: NoticeLevel) -> Color32 {
    match level {
        NoticeLevel::Success => Color32::from_rgb(25, 135, 84),
        NoticeLevel::Info => Color32::from_rgb(13, 110, 253),
        NoticeLevel::Warning => Color32::from_rgb(255, 193, 7),
        NoticeLevel::Danger => Color32::from_rgb(220, 53, 69),
    }
}

fn level_icon(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Success => "✔",
        NoticeLevel::Info => "ℹ",
        NoticeLevel::Warning | NoticeLevel::Danger => "⚠",
    }
}
