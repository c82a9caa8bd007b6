use std::sync::mpsc::Receiver;
use std::sync::Arc;

use eframe::egui::{self, Color32};
use tokio::runtime::Handle;

use crate::bridge::selection::{SelectionBridge, SelectionMessage};
use crate::bridge::surface::{self, SurfaceEvent, SurfaceState};
use crate::gql::query_interface::{self, GraphStore, QueryOutcome, QueryRequest};
use crate::gui::graph_view::{self, GraphLayout};
use crate::gui::property_view::{ChannelDisplay, DisplayUpdate, PropertyPanel};
use crate::persistence::settings::AppSettings;

const EDITOR_ID: &str = "cypher_editor";

/// F5 or Ctrl+E runs the editor contents.
pub fn execute_requested(i: &egui::InputState) -> bool {
    i.key_pressed(egui::Key::F5) || (i.modifiers.ctrl && i.key_pressed(egui::Key::E))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    Graph,
    Text,
}

pub struct ExplorerApp {
    settings: AppSettings,
    store: Arc<dyn GraphStore>,
    runtime: Handle,
    bridge: SelectionBridge,
    display_rx: Receiver<DisplayUpdate>,
    properties: PropertyPanel,
    // Query console state
    query_text: String,
    caret_status: String,
    pending_query: Option<Receiver<anyhow::Result<QueryOutcome>>>,
    outcome: QueryOutcome,
    result_mode: ResultMode,
    last_query_error: Option<String>,
    last_query_info: Option<String>,
    // Result surface
    surface: SurfaceState,
    layout: GraphLayout,
    highlighted: Option<SelectionMessage>,
    // Style document editor window
    show_config_window: bool,
    config_edit: String,
    config_status: Option<String>,
}

impl ExplorerApp {
    pub fn new(ctx: &egui::Context, settings: AppSettings, store: Arc<dyn GraphStore>, runtime: Handle) -> Self {
        let (display, display_rx) = ChannelDisplay::new(Some(ctx.clone()));
        let bridge = SelectionBridge::new(Arc::clone(&store), Arc::new(display), runtime.clone())
            .with_query_log(settings.query_log_dir());
        Self {
            settings,
            store,
            runtime,
            bridge,
            display_rx,
            properties: PropertyPanel::default(),
            query_text: String::new(),
            caret_status: surface::caret_position_string("", 0),
            pending_query: None,
            outcome: QueryOutcome::default(),
            result_mode: ResultMode::Graph,
            last_query_error: None,
            last_query_info: None,
            surface: SurfaceState::default(),
            layout: GraphLayout::default(),
            highlighted: None,
            show_config_window: false,
            config_edit: String::new(),
            config_status: None,
        }
    }

    fn run_query(&mut self, ctx: &egui::Context) {
        let request = QueryRequest::cypher(self.query_text.trim());
        let store = Arc::clone(&self.store);
        let log_dir = self.settings.query_log_dir();
        let (tx, rx) = std::sync::mpsc::channel();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let res = query_interface::execute_and_log(store.as_ref(), &request, Some(log_dir.as_path())).await;
            let _ = tx.send(res);
            ctx.request_repaint();
        });
        self.pending_query = Some(rx);
        self.last_query_info = Some("Running...".to_string());
    }

    fn poll_query(&mut self) {
        let Some(rx) = &self.pending_query else { return };
        let Ok(res) = rx.try_recv() else { return };
        self.pending_query = None;
        match res {
            Ok(outcome) => {
                self.last_query_error = None;
                self.last_query_info = Some(format!(
                    "{} rows, {} nodes, {} relationships",
                    outcome.rows.len(),
                    outcome.node_count,
                    outcome.relationship_count
                ));
                // Nothing to draw for scalar-only results
                if outcome.records.is_empty() && !outcome.is_empty() {
                    self.result_mode = ResultMode::Text;
                }
                self.outcome = outcome;
                self.highlighted = None;
            }
            Err(e) => {
                self.last_query_error = Some(format!("{:#}", e));
                self.last_query_info = None;
            }
        }
    }

    fn select(&mut self, message: SelectionMessage) {
        self.highlighted = Some(message);
        // Canvas clicks go through the same JSON shape a surface posts
        self.bridge.on_message(&message.to_json());
    }

    fn editor_ui(&mut self, ui: &mut egui::Ui) {
        ui.label("Cypher (F5 or Ctrl+E to run):");
        let id = egui::Id::new(EDITOR_ID);
        let edit = egui::TextEdit::multiline(&mut self.query_text)
            .id(id)
            .code_editor()
            .desired_rows(8)
            .lock_focus(true)
            .desired_width(f32::INFINITY);
        ui.add(edit);
        if let Some(state) = egui::text_edit::TextEditState::load(ui.ctx(), id) {
            if let Some(range) = state.cursor.char_range() {
                self.caret_status = surface::caret_position_string(&self.query_text, range.primary.index);
            }
        }
    }

    fn results_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.result_mode, ResultMode::Graph, "Graph");
            ui.selectable_value(&mut self.result_mode, ResultMode::Text, "Text");
        });
        ui.separator();
        match self.result_mode {
            ResultMode::Graph => self.graph_ui(ui),
            ResultMode::Text => self.table_ui(ui),
        }
    }

    fn graph_ui(&mut self, ui: &mut egui::Ui) {
        let available = ui.available_size();
        let event = if self.surface.loaded {
            SurfaceEvent::SizeChanged { width: available.x, height: available.y }
        } else {
            SurfaceEvent::NavigationCompleted { width: available.x, height: available.y }
        };
        if let Some(size) = surface::on_surface_event(&mut self.surface, event) {
            log::trace!("graph canvas resized to {}x{}", size.width, size.height);
        }
        let Some(size) = self.surface.graph_size else { return };

        let (rect, resp) = ui.allocate_exact_size(egui::vec2(size.width, size.height), egui::Sense::click());
        // Layout follows the canvas, so recompute each frame
        self.layout = graph_view::layout(&self.outcome.records, rect);
        let painter = ui.painter_at(rect);
        if self.outcome.records.is_empty() {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Run a query to see nodes and relationships.",
                egui::FontId::proportional(14.0),
                Color32::GRAY,
            );
        }
        graph_view::paint(&painter, &self.layout, self.highlighted);

        if resp.clicked() {
            if let Some(pos) = resp.interact_pointer_pos() {
                let message = graph_view::hit_test(&self.layout, pos);
                self.select(message);
            }
        }
    }

    fn table_ui(&mut self, ui: &mut egui::Ui) {
        let (headers, body) = self.outcome.table();
        egui::ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
            if self.outcome.is_empty() {
                ui.colored_label(Color32::GRAY, "No rows.");
                return;
            }
            egui::Grid::new("result_table").striped(true).num_columns(headers.len()).show(ui, |ui| {
                for h in &headers {
                    ui.strong(h);
                }
                ui.end_row();
                for row in &body {
                    for cell in row {
                        ui.label(cell);
                    }
                    ui.end_row();
                }
            });
        });
    }

    fn config_window(&mut self, ctx: &egui::Context) {
        if !self.show_config_window { return; }
        let mut open = true;
        let mut close = false;
        egui::Window::new("Style Document")
            .open(&mut open)
            .default_size([520.0, 420.0])
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().max_height(360.0).show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut self.config_edit)
                            .code_editor()
                            .desired_width(f32::INFINITY),
                    );
                });
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        self.settings.configuration = self.config_edit.clone();
                        match self.settings.save() {
                            Ok(()) => close = true,
                            Err(e) => self.config_status = Some(format!("Save failed: {:#}", e)),
                        }
                    }
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                });
                if let Some(status) = &self.config_status {
                    ui.colored_label(Color32::RED, status);
                }
            });
        if !open || close {
            self.show_config_window = false;
            self.config_status = None;
        }
    }
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.properties.drain(&self.display_rx);
        self.poll_query();

        let run_now = ctx.input(execute_requested);

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Run").clicked() && self.pending_query.is_none() {
                    self.run_query(ctx);
                }
                if ui.button("Style document...").clicked() {
                    // Editor starts from the stored document every time it opens
                    self.config_edit = self.settings.configuration.clone();
                    self.show_config_window = true;
                }
                ui.separator();
                let target = if self.settings.debug_mode { "debug graph".to_string() } else { self.settings.uri.clone() };
                ui.label(format!("Connected to {}", target));
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.caret_status);
                ui.separator();
                if let Some(err) = &self.last_query_error {
                    ui.colored_label(Color32::RED, format!("Error: {}", err));
                } else if let Some(info) = &self.last_query_info {
                    ui.label(info);
                }
            });
        });

        egui::SidePanel::right("properties").default_width(300.0).show(ctx, |ui| {
            ui.heading("Properties");
            ui.separator();
            self.properties.ui(ui);
        });

        egui::TopBottomPanel::top("editor").resizable(true).show(ctx, |ui| {
            self.editor_ui(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.results_ui(ui);
        });

        self.config_window(ctx);

        if run_now && self.pending_query.is_none() {
            self.run_query(ctx);
        }
    }
}
