use std::sync::mpsc::{Receiver, Sender};

use egui::Color32;

use crate::bridge::selection::PropertyDisplay;
use crate::gql::query_interface::Record;

#[derive(Debug)]
pub enum DisplayUpdate {
    Show(Option<Record>),
    Fail(String),
}

/// `PropertyDisplay` that posts lookup results to the GUI thread.
pub struct ChannelDisplay {
    tx: Sender<DisplayUpdate>,
    // Wakes the GUI when a lookup lands; absent in tests
    ctx: Option<egui::Context>,
}

impl ChannelDisplay {
    pub fn new(ctx: Option<egui::Context>) -> (Self, Receiver<DisplayUpdate>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (Self { tx, ctx }, rx)
    }

    fn post(&self, update: DisplayUpdate) {
        // The receiver only goes away when the window closes
        let _ = self.tx.send(update);
        if let Some(ctx) = &self.ctx {
            ctx.request_repaint();
        }
    }
}

impl PropertyDisplay for ChannelDisplay {
    fn show(&self, record: Option<Record>) {
        self.post(DisplayUpdate::Show(record));
    }

    fn fail(&self, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.post(DisplayUpdate::Fail(format!("{:#}", error)));
    }
}

/// Contents of the property panel.
#[derive(Debug, Default)]
pub struct PropertyPanel {
    record: Option<Record>,
    pub last_error: Option<String>,
}

impl PropertyPanel {
    /// Apply one update. A failure leaves the shown record in place.
    pub fn apply(&mut self, update: DisplayUpdate) {
        match update {
            DisplayUpdate::Show(record) => {
                self.record = record;
                self.last_error = None;
            }
            DisplayUpdate::Fail(msg) => self.last_error = Some(msg),
        }
    }

    /// Drain everything that arrived since the last frame, in arrival order.
    pub fn drain(&mut self, rx: &Receiver<DisplayUpdate>) {
        while let Ok(update) = rx.try_recv() {
            self.apply(update);
        }
    }

    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    pub fn ui(&self, ui: &mut egui::Ui) {
        match &self.record {
            None => {
                ui.centered_and_justified(|ui| {
                    ui.colored_label(Color32::LIGHT_GRAY, "No information");
                });
            }
            Some(record) => {
                egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                    egui::Grid::new("property_grid").striped(true).num_columns(2).show(ui, |ui| {
                        for (k, v) in record.display_rows() {
                            ui.strong(k);
                            ui.label(v);
                            ui.end_row();
                        }
                    });
                });
            }
        }
        if let Some(err) = &self.last_error {
            ui.separator();
            ui.colored_label(Color32::RED, format!("Error: {}", err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gql::query_interface::EntityKind;
    use std::collections::BTreeMap;

    fn record(id: i64) -> Record {
        Record { kind: EntityKind::Node, id, labels: vec!["Person".into()], properties: BTreeMap::new(), endpoints: None }
    }

    #[test]
    fn failure_keeps_previous_record() {
        let mut panel = PropertyPanel::default();
        panel.apply(DisplayUpdate::Show(Some(record(1))));
        panel.apply(DisplayUpdate::Fail("store unreachable".into()));
        assert_eq!(panel.record().map(|r| r.id), Some(1));
        assert!(panel.last_error.is_some());
    }

    #[test]
    fn empty_result_clears_to_no_information() {
        let mut panel = PropertyPanel::default();
        panel.apply(DisplayUpdate::Show(Some(record(1))));
        panel.apply(DisplayUpdate::Show(None));
        assert!(panel.record().is_none());
    }

    #[test]
    fn channel_display_delivers_in_order() {
        let (display, rx) = ChannelDisplay::new(None);
        display.show(Some(record(2)));
        display.show(Some(record(1)));
        let mut panel = PropertyPanel::default();
        panel.drain(&rx);
        assert_eq!(panel.record().map(|r| r.id), Some(1));
    }
}
