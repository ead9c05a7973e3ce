use std::time::Duration;

use chrono::Utc;
use eframe::{egui, App, CreationContext, Frame};
use egui::{Align, Layout, ScrollArea, TextEdit, Ui};

use workout_blocks::models::{Id, NumField};
use workout_blocks::storage::{self, Storage};
use workout_blocks::store::BlockStore;
use workout_blocks::timers::TimerBank;

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([540.0, 860.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Workout Blocks",
        options,
        Box::new(|cc| Ok(Box::new(WorkoutApp::new(cc)))),
    )
}

/// Whether the structural controls (add/delete buttons) are shown. The
/// store never sees this, it only shapes rendering.
#[derive(PartialEq, Clone, Copy)]
enum ViewMode {
    Viewing,
    Editing,
}

/// One edit gathered during the draw pass and applied afterwards, so the
/// draw pass only ever reads the store.
enum Action {
    AddBlock,
    DeleteBlock(Id),
    RenameBlock(Id, String),
    AddCategory(Id),
    DeleteCategory(Id, Id),
    RenameCategory(Id, Id, String),
    SetCategoryValue(Id, Id, NumField),
    SetCategoryExtra(Id, Id, NumField),
    SetTimerText(Id, Id, String),
    ToggleCollapse(Id, Id),
    ToggleTimer(Id, Id),
    AddSub(Id, Id),
    DeleteSub(Id, Id, Id),
    SetSubValue(Id, Id, Id, NumField),
    SetSubExtra(Id, Id, Id, NumField),
}

struct WorkoutApp {
    store: BlockStore,
    timers: TimerBank,
    storage: Storage,
    mode: ViewMode,
}

impl WorkoutApp {
    fn new(_cc: &CreationContext) -> Self {
        let storage = Storage::new(Storage::default_dir());
        let store = BlockStore::from_blocks(storage.load());
        WorkoutApp {
            store,
            timers: TimerBank::new(),
            storage,
            mode: ViewMode::Viewing,
        }
    }

    fn persist(&self) {
        if let Err(err) = self.storage.save(&self.store.snapshot()) {
            log::error!("failed to persist workout tree: {err}");
        }
    }

    fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::AddBlock => {
                self.store.add_block();
                true
            }
            Action::DeleteBlock(block) => self.store.delete_block(block),
            Action::RenameBlock(block, name) => self.store.rename_block(block, &name),
            Action::AddCategory(block) => self.store.add_category(block).is_some(),
            Action::DeleteCategory(block, cat) => self.store.delete_category(block, cat),
            Action::RenameCategory(block, cat, name) => {
                self.store.rename_category(block, cat, &name)
            }
            Action::SetCategoryValue(block, cat, value) => {
                self.store.set_category_value(block, cat, value)
            }
            Action::SetCategoryExtra(block, cat, value) => {
                self.store.set_category_extra(block, cat, value)
            }
            Action::SetTimerText(block, cat, text) => self.store.set_timer_text(block, cat, &text),
            Action::ToggleCollapse(block, cat) => self.store.toggle_collapse(block, cat),
            Action::ToggleTimer(block, cat) => {
                self.timers.toggle(&mut self.store, block, cat, Utc::now())
            }
            Action::AddSub(block, cat) => self.store.add_sub(block, cat).is_some(),
            Action::DeleteSub(block, cat, sub) => self.store.delete_sub(block, cat, sub),
            Action::SetSubValue(block, cat, sub, value) => {
                self.store.set_sub_value(block, cat, sub, value)
            }
            Action::SetSubExtra(block, cat, sub, value) => {
                self.store.set_sub_extra(block, cat, sub, value)
            }
        }
    }

    fn export_dialog(&self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name("settings.json")
            .save_file()
        else {
            return;
        };
        if let Err(err) = storage::export_blocks(&path, &self.store.snapshot()) {
            log::error!("export to {} failed: {err}", path.display());
            alert("Export failed", &err.to_string());
        }
    }

    fn import_dialog(&mut self) {
        let Some(path) = rfd::FileDialog::new().add_filter("JSON", &["json"]).pick_file() else {
            return;
        };
        match storage::import_blocks(&path) {
            Ok(blocks) => {
                // wholesale replacement: every running countdown is cancelled
                self.timers.reset();
                self.store = BlockStore::from_blocks(blocks);
                self.persist();
            }
            Err(err) => {
                log::warn!("import from {} failed: {err}", path.display());
                alert(
                    "Import failed",
                    "Could not read the selected file. Check that it is a valid settings.json.",
                );
            }
        }
    }
}

fn alert(title: &str, text: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(text)
        .show();
}

impl App for WorkoutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        let mut changed = self.timers.tick_due(&mut self.store, Utc::now());

        let mode = self.mode;
        let mut actions: Vec<Action> = Vec::new();
        let mut toggle_mode = false;
        let mut do_export = false;
        let mut do_import = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_toolbar(
                ui,
                mode,
                &mut actions,
                &mut toggle_mode,
                &mut do_export,
                &mut do_import,
            );
            ui.separator();
            ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
                if self.store.is_empty() {
                    ui.add_space(20.0);
                    ui.label("No blocks yet. Switch to Edit and add one.");
                }
                for &block_id in self.store.block_ids() {
                    self.show_block(ui, mode, block_id, &mut actions);
                    ui.add_space(8.0);
                }
            });
        });

        if toggle_mode {
            self.mode = match self.mode {
                ViewMode::Viewing => ViewMode::Editing,
                ViewMode::Editing => ViewMode::Viewing,
            };
        }
        for action in actions {
            changed |= self.apply(action);
        }
        if changed {
            self.persist();
        }
        if do_export {
            self.export_dialog();
        }
        if do_import {
            self.import_dialog();
        }

        if self.timers.has_active() {
            ctx.request_repaint_after(Duration::from_millis(200));
        }
    }
}

impl WorkoutApp {
    fn show_toolbar(
        &self,
        ui: &mut Ui,
        mode: ViewMode,
        actions: &mut Vec<Action>,
        toggle_mode: &mut bool,
        do_export: &mut bool,
        do_import: &mut bool,
    ) {
        ui.horizontal(|ui| {
            let label = match mode {
                ViewMode::Viewing => "Edit",
                ViewMode::Editing => "Done",
            };
            if ui.button(label).clicked() {
                *toggle_mode = true;
            }
            if mode == ViewMode::Editing && ui.button("Add block").clicked() {
                actions.push(Action::AddBlock);
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if ui.button("Import…").clicked() {
                    *do_import = true;
                }
                if ui.button("Export…").clicked() {
                    *do_export = true;
                }
            });
        });
    }

    fn show_block(&self, ui: &mut Ui, mode: ViewMode, block_id: Id, actions: &mut Vec<Action>) {
        let Some(block) = self.store.block(block_id) else {
            return;
        };
        ui.group(|ui| {
            ui.horizontal(|ui| {
                let mut name = block.name.clone();
                if ui
                    .add(TextEdit::singleline(&mut name).desired_width(160.0))
                    .changed()
                {
                    actions.push(Action::RenameBlock(block_id, name));
                }
                if mode == ViewMode::Editing {
                    if ui.button("+ Exercise").clicked() {
                        actions.push(Action::AddCategory(block_id));
                    }
                    if ui.button("Delete block").clicked() {
                        actions.push(Action::DeleteBlock(block_id));
                    }
                }
            });
            for (index, &cat_id) in block.categories.iter().enumerate() {
                self.show_category(ui, mode, block_id, cat_id, index, actions);
            }
        });
    }

    fn show_category(
        &self,
        ui: &mut Ui,
        mode: ViewMode,
        block_id: Id,
        cat_id: Id,
        index: usize,
        actions: &mut Vec<Action>,
    ) {
        let Some(cat) = self.store.category(cat_id) else {
            return;
        };
        let running = self.timers.is_running(cat_id);

        ui.horizontal(|ui| {
            let collapse_label = if cat.is_collapsed { "+" } else { "-" };
            if ui.small_button(collapse_label).clicked() {
                actions.push(Action::ToggleCollapse(block_id, cat_id));
            }
            ui.label(format!("{}.", index + 1));

            let mut name = cat.name.clone();
            if ui
                .add(
                    TextEdit::singleline(&mut name)
                        .hint_text("Exercise")
                        .desired_width(120.0),
                )
                .changed()
            {
                actions.push(Action::RenameCategory(block_id, cat_id, name));
            }

            let mut value = cat.value.to_string();
            if ui
                .add(TextEdit::singleline(&mut value).desired_width(44.0))
                .changed()
            {
                actions.push(Action::SetCategoryValue(
                    block_id,
                    cat_id,
                    NumField::parse(&value),
                ));
            }
            let mut extra = cat.extra_value.to_string();
            if ui
                .add(TextEdit::singleline(&mut extra).desired_width(44.0))
                .changed()
            {
                actions.push(Action::SetCategoryExtra(
                    block_id,
                    cat_id,
                    NumField::parse(&extra),
                ));
            }

            // minute entry is locked while the countdown repaints it
            let mut timer = cat.timer_text.clone();
            let response = ui.add_enabled(
                !running,
                TextEdit::singleline(&mut timer)
                    .hint_text("Min.")
                    .desired_width(44.0),
            );
            if response.changed() {
                actions.push(Action::SetTimerText(block_id, cat_id, timer));
            }
            if ui.button(if running { "Reset" } else { "Start" }).clicked() {
                actions.push(Action::ToggleTimer(block_id, cat_id));
            }

            if mode == ViewMode::Editing && ui.button("-").clicked() {
                actions.push(Action::DeleteCategory(block_id, cat_id));
            }
        });

        if cat.is_collapsed {
            return;
        }
        ui.indent(("sets", cat_id), |ui| {
            for (sub_index, &sub_id) in cat.sub_categories.iter().enumerate() {
                let Some(sub) = self.store.sub(sub_id) else {
                    continue;
                };
                ui.horizontal(|ui| {
                    ui.label(format!("{}", sub_index + 1));
                    let mut value = sub.value.to_string();
                    if ui
                        .add(TextEdit::singleline(&mut value).desired_width(44.0))
                        .changed()
                    {
                        actions.push(Action::SetSubValue(
                            block_id,
                            cat_id,
                            sub_id,
                            NumField::parse(&value),
                        ));
                    }
                    let mut extra = sub.extra_value.to_string();
                    if ui
                        .add(TextEdit::singleline(&mut extra).desired_width(44.0))
                        .changed()
                    {
                        actions.push(Action::SetSubExtra(
                            block_id,
                            cat_id,
                            sub_id,
                            NumField::parse(&extra),
                        ));
                    }
                    if mode == ViewMode::Editing && ui.button("-").clicked() {
                        actions.push(Action::DeleteSub(block_id, cat_id, sub_id));
                    }
                });
            }
            if mode == ViewMode::Editing && ui.button("+ Set").clicked() {
                actions.push(Action::AddSub(block_id, cat_id));
            }
        });
    }
}
