use chrono::{DateTime, Local};
use clap::Parser;
use eframe::App;
use egui::{Color32, RichText};
use prefed_core::config::StoreLocation;
use prefed_core::{
    Backend, CommitOutcome, EditTarget, EditedValue, EditorSession, FileStore, ParseError,
    Selection, StoredValue, Variant, VariantKind, edit_text, parse_for,
};
use std::cell::Cell;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "prefed-gui",
    about = "Browse and edit a JSON preference store",
    version
)]
struct Args {
    /// Store file (defaults to $PREFED_STORE or the platform config dir)
    #[arg(long)]
    store: Option<PathBuf>,
    /// Edit entries in a modal window instead of a side panel
    #[arg(long, default_value_t = false)]
    modal: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
enum PresentationStyle {
    #[default]
    Push,
    Modal,
}

/// Widget state for the entry being edited.
enum EditBuffer {
    Text { text: String, multiline: bool },
    Integer(i64),
    Float32(f32),
    Float64(f64),
    Boolean(bool),
}

impl EditBuffer {
    fn for_selection(sel: &Selection) -> Self {
        match &sel.target {
            EditTarget::Value(Variant::Integer(n)) => EditBuffer::Integer(*n),
            EditTarget::Value(Variant::Float32(x)) => EditBuffer::Float32(*x),
            EditTarget::Value(Variant::Float64(x)) => EditBuffer::Float64(*x),
            EditTarget::Value(Variant::Boolean(b)) => EditBuffer::Boolean(*b),
            target => EditBuffer::Text {
                text: edit_text(target),
                multiline: !matches!(
                    target.kind(),
                    VariantKind::String | VariantKind::Url | VariantKind::Timestamp
                ),
            },
        }
    }

    fn to_edited(&self, target: &EditTarget) -> Result<EditedValue, ParseError> {
        match self {
            EditBuffer::Integer(n) => Ok(StoredValue::from(*n).into()),
            EditBuffer::Float32(x) => Ok(StoredValue::from(*x).into()),
            EditBuffer::Float64(x) => Ok(StoredValue::from(*x).into()),
            EditBuffer::Boolean(b) => Ok(StoredValue::from(*b).into()),
            EditBuffer::Text { text, .. } => parse_for(target, text),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EditAction {
    None,
    Save,
    Cancel,
}

#[derive(Default)]
struct State {
    store_path: Option<PathBuf>,
    status: String,
    style: PresentationStyle,
    backup_on_save: bool,
    filter: String,
    marked: BTreeSet<String>,
    // Confirmation flags
    confirm_delete: bool,
    confirm_reload: bool,
    editing: Option<(Selection, EditBuffer)>,
    edit_error: Option<String>,
    last_backup_time: Option<DateTime<Local>>,
    seen_generation: u64,
}

struct AppGui {
    state: State,
    session: Option<EditorSession<FileStore>>,
    generation: Rc<Cell<u64>>,
}

impl AppGui {
    fn new(_cc: &eframe::CreationContext<'_>, args: Args) -> Self {
        let mut app = Self {
            state: State {
                backup_on_save: true,
                style: if args.modal {
                    PresentationStyle::Modal
                } else {
                    PresentationStyle::Push
                },
                ..Default::default()
            },
            session: None,
            generation: Rc::new(Cell::new(0)),
        };
        let location = StoreLocation::resolve(args.store);
        app.open_store(location.path);
        app
    }

    fn open_store(&mut self, path: PathBuf) {
        match FileStore::open(&path) {
            Ok(store) => {
                info!(path = %path.display(), "store opened");
                let mut session = EditorSession::new(store);
                let generation = self.generation.clone();
                session.subscribe(move |_| generation.set(generation.get() + 1));
                self.state.status = format!(
                    "Opened {} ({} entries)",
                    path.display(),
                    session.entries().len()
                );
                self.session = Some(session);
                self.state.store_path = Some(path);
                self.state.marked.clear();
                self.state.editing = None;
            }
            Err(e) => {
                warn!(error = %e, "failed to open store");
                self.state.status = format!("Open error: {}", e);
            }
        }
    }

    fn pick_store(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_directory(".")
            .pick_file()
        {
            self.open_store(path);
        }
    }

    fn refresh(&mut self) {
        if let Some(session) = &mut self.session {
            session.refresh();
            self.state.status = format!("{} entries", session.entries().len());
        }
    }

    fn reload_from_disk(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };
        match session.backend_mut().reload() {
            Ok(()) => {
                session.refresh();
                self.state.status = "Reloaded from disk".into();
            }
            Err(e) => self.state.status = format!("Reload error: {}", e),
        }
    }

    fn save(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };
        let store = session.backend_mut();
        if self.state.backup_on_save && store.path().is_file() {
            match prefed_core::zip_backup(store.path()) {
                Ok(_) => self.state.last_backup_time = Some(Local::now()),
                Err(e) => {
                    self.state.status = format!("Backup error: {}", e);
                    return;
                }
            }
        }
        match store.synchronize() {
            Ok(()) => self.state.status = "Saved".into(),
            Err(e) => {
                warn!(error = %e, "failed to save store");
                self.state.status = format!("Save error: {}", e);
            }
        }
    }

    fn load_demo(&mut self) {
        if let Some(session) = &mut self.session {
            for (key, value) in prefed_core::sample::demo_store() {
                session.backend_mut().write(&key, value);
            }
            session.refresh();
            self.state.status = "Demo entries added (unsaved)".into();
        }
    }

    fn begin_edit(&mut self, key: &str) {
        let Some(session) = &mut self.session else {
            return;
        };
        // The entry may have vanished since the list was drawn.
        if let Some(sel) = session.select(key) {
            let buffer = EditBuffer::for_selection(&sel);
            self.state.editing = Some((sel, buffer));
            self.state.edit_error = None;
        }
    }

    fn apply_edit(&mut self) {
        let (Some(session), Some((sel, buffer))) = (&mut self.session, &self.state.editing) else {
            return;
        };
        let edited = match buffer.to_edited(&sel.target) {
            Ok(v) => v,
            Err(e) => {
                self.state.edit_error = Some(e.to_string());
                return;
            }
        };
        let key = sel.key.clone();
        self.state.status = match session.commit(&key, edited) {
            CommitOutcome::Written => format!("Updated {}", key),
            CommitOutcome::WrittenWithoutRefresh => {
                format!("Updated {} (press Refresh to see it)", key)
            }
            CommitOutcome::Discarded => format!("Edit of {} discarded", key),
        };
        self.state.editing = None;
        self.state.edit_error = None;
    }

    fn cancel_edit(&mut self) {
        if let Some(session) = &mut self.session {
            session.cancel();
        }
        self.state.editing = None;
        self.state.edit_error = None;
    }

    fn delete_marked(&mut self) {
        if let Some(session) = &mut self.session {
            let keys = std::mem::take(&mut self.state.marked);
            session.delete(&keys);
            self.state.status = format!("Deleted {} entries", keys.len());
        }
    }

    // Drop view state that refers to entries no longer in the snapshot.
    fn sync_with_snapshot(&mut self) {
        let generation = self.generation.get();
        if generation == self.state.seen_generation {
            return;
        }
        self.state.seen_generation = generation;
        if let Some(session) = &self.session {
            let snapshot = session.entries();
            self.state.marked.retain(|k| snapshot.get(k).is_some());
            if session.selection().is_none() {
                self.state.editing = None;
            }
        }
    }
}

impl App for AppGui {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        self.sync_with_snapshot();

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open Store").clicked() {
                    self.pick_store();
                }
                if ui.button("Refresh").clicked() {
                    self.refresh();
                }
                if ui.button("Reload From Disk").clicked() {
                    self.state.confirm_reload = true;
                }
                if ui.button("Save").clicked() {
                    self.save();
                }
                if ui.button("Load Demo").clicked() {
                    self.load_demo();
                }
                ui.separator();
                ui.checkbox(&mut self.state.backup_on_save, "Zip backup on save");
                if let Some(time) = self.state.last_backup_time {
                    ui.label(format!("Last backup: {}", time.format("%Y-%m-%d %H:%M:%S")));
                }
                ui.separator();
                ui.radio_value(&mut self.state.style, PresentationStyle::Push, "Side panel");
                ui.radio_value(&mut self.state.style, PresentationStyle::Modal, "Window");
            });
            if self.state.confirm_reload {
                ui.horizontal(|ui| {
                    ui.label("Discard unsaved changes and reload?");
                    if ui.button("Confirm").clicked() {
                        self.reload_from_disk();
                        self.state.confirm_reload = false;
                    }
                    if ui.button("Cancel").clicked() {
                        self.state.confirm_reload = false;
                    }
                });
            }
        });

        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(path) = &self.state.store_path {
                    ui.label(path.display().to_string());
                }
                if self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.backend().has_unsaved_changes())
                {
                    ui.colored_label(Color32::YELLOW, "unsaved changes");
                }
                ui.separator();
                ui.label(&self.state.status);
            });
        });

        let mut action = EditAction::None;
        if let Some((sel, buffer)) = &mut self.state.editing {
            match self.state.style {
                PresentationStyle::Push => {
                    egui::SidePanel::right("editor")
                        .resizable(true)
                        .default_width(380.0)
                        .show(ctx, |ui| {
                            action = editor_ui(ui, sel, buffer, self.state.edit_error.as_deref());
                        });
                }
                PresentationStyle::Modal => {
                    egui::Window::new(format!("Edit {}", sel.key))
                        .collapsible(false)
                        .resizable(true)
                        .default_width(420.0)
                        .show(ctx, |ui| {
                            action = editor_ui(ui, sel, buffer, self.state.edit_error.as_deref());
                        });
                }
            }
        }
        match action {
            EditAction::Save => self.apply_edit(),
            EditAction::Cancel => self.cancel_edit(),
            EditAction::None => {}
        }

        let mut clicked: Option<String> = None;
        let mut delete_confirmed = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = &self.session else {
                ui.label("No store open");
                return;
            };
            ui.horizontal(|ui| {
                ui.label("Filter:");
                ui.text_edit_singleline(&mut self.state.filter);
                if ui.button("Clear").clicked() {
                    self.state.filter.clear();
                }
                ui.separator();
                if !self.state.marked.is_empty()
                    && ui
                        .button(format!("Delete {} marked", self.state.marked.len()))
                        .clicked()
                {
                    self.state.confirm_delete = true;
                }
            });
            if self.state.confirm_delete {
                ui.horizontal(|ui| {
                    ui.label(format!("Delete {} entries?", self.state.marked.len()));
                    if ui.button("Confirm").clicked() {
                        delete_confirmed = true;
                        self.state.confirm_delete = false;
                    }
                    if ui.button("Cancel").clicked() {
                        self.state.confirm_delete = false;
                    }
                });
            }
            ui.separator();

            let filter = self.state.filter.to_lowercase();
            let selected_key = session.selection().map(|s| s.key.clone());
            egui::ScrollArea::vertical()
                .id_source("entries_scroll")
                .show(ui, |ui| {
                    egui::Grid::new("entries")
                        .striped(true)
                        .num_columns(4)
                        .show(ui, |ui| {
                            for entry in session.entries().entries() {
                                if !filter.is_empty()
                                    && !entry.key.to_lowercase().contains(&filter)
                                {
                                    continue;
                                }
                                let mut marked = self.state.marked.contains(&entry.key);
                                if ui.checkbox(&mut marked, "").changed() {
                                    if marked {
                                        self.state.marked.insert(entry.key.clone());
                                    } else {
                                        self.state.marked.remove(&entry.key);
                                    }
                                }
                                let is_selected = selected_key.as_deref() == Some(&entry.key);
                                if ui.selectable_label(is_selected, &entry.key).clicked() {
                                    clicked = Some(entry.key.clone());
                                }
                                ui.label(RichText::new(entry.variant.kind().name()).monospace());
                                let preview = entry.preview();
                                let first = preview.lines().next().unwrap_or_default();
                                ui.colored_label(Color32::LIGHT_BLUE, first)
                                    .on_hover_text(&preview);
                                ui.end_row();
                            }
                        });
                });
        });

        if let Some(key) = clicked {
            self.begin_edit(&key);
        }
        if delete_confirmed {
            self.delete_marked();
        }
    }
}

fn editor_ui(
    ui: &mut egui::Ui,
    sel: &Selection,
    buffer: &mut EditBuffer,
    error: Option<&str>,
) -> EditAction {
    let mut action = EditAction::None;
    ui.heading(&sel.key);
    let kind = match &sel.target {
        EditTarget::JsonObject(_) => "JSON object (stored as data)".to_string(),
        EditTarget::Value(v) => v.kind().name().to_string(),
    };
    ui.label(RichText::new(kind).weak());
    ui.separator();
    match buffer {
        EditBuffer::Integer(n) => {
            ui.add(egui::DragValue::new(n).speed(1));
        }
        EditBuffer::Float32(x) => {
            ui.add(egui::DragValue::new(x).speed(0.1));
        }
        EditBuffer::Float64(x) => {
            ui.add(egui::DragValue::new(x).speed(0.1));
        }
        EditBuffer::Boolean(b) => {
            ui.checkbox(b, "value");
        }
        EditBuffer::Text { text, multiline } => {
            if *multiline {
                egui::ScrollArea::vertical()
                    .id_source("edit_text_scroll")
                    .max_height(400.0)
                    .show(ui, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(text)
                                .code_editor()
                                .desired_rows(12)
                                .desired_width(f32::INFINITY),
                        );
                    });
            } else {
                ui.text_edit_singleline(text);
            }
        }
    }
    if let Some(err) = error {
        ui.colored_label(Color32::RED, err);
    }
    ui.separator();
    ui.horizontal(|ui| {
        if ui.button("Save").clicked() {
            action = EditAction::Save;
        }
        if ui.button("Cancel").clicked() {
            action = EditAction::Cancel;
        }
    });
    action
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> eframe::Result<()> {
    init_logging();
    let args = Args::parse();
    let native_options = eframe::NativeOptions {
        viewport: egui::viewport::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Preference Editor",
        native_options,
        Box::new(move |cc| Ok(Box::new(AppGui::new(cc, args)))),
    )
}
