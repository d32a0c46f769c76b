// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crmdesk_app::{
    AppCommand, AppData, AppEvent, AppMode, AppState, Badge, ChatVisibility, DashboardCounts,
    DataSnapshot, EntityKind, EntryHook, FieldInput, FilterId, FormKind, FormState,
    FormSubmission, FormTarget, OptionSource, TagCategory, TagCategoryDetail, TagColorMap,
    TagDraft, TagField, TagId, TagValue, ViewKind, apply_filters, entity_type_label,
    group_by_entity_type, parse_hex_color, sorted_tags,
};
use crmdesk_chat::{
    ChartBackend, ChartConfig, ChartHandle, ChartRegistry, ChartSlotId, ChatReply, ChatRequest,
    ChatSession, GREETING, GREETING_HINT, LineKind, NEW_CHAT_PROMPT, Segment, SpanStyle,
    TranscriptEntry,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap,
};
use serde::Serialize;
use serde_json::Value;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::{Date, OffsetDateTime};

const BAR_WIDTH: f64 = 24.0;
const CHAT_PAGE_LINES: u16 = 10;

/// Backend operations the console needs. Loads and mutations run on the UI
/// thread; only chat requests are handed to a worker.
pub trait AppRuntime {
    fn load_snapshot(&mut self) -> Result<DataSnapshot>;
    fn load_dashboard(&mut self) -> Result<DashboardCounts>;
    fn load_tag_categories(&mut self) -> Result<Vec<TagCategory>>;
    fn load_tag_category(&mut self, name: &str) -> Result<TagCategoryDetail>;
    fn submit_form(&mut self, submission: &FormSubmission) -> Result<()>;
    fn delete_record(&mut self, entity: EntityKind, id: i64) -> Result<()>;
    fn create_tag(&mut self, category: &str, payload: &Value) -> Result<()>;
    fn update_tag(&mut self, tag_id: TagId, payload: &Value) -> Result<()>;
    fn delete_tag(&mut self, tag_id: TagId) -> Result<()>;
    fn send_chat(&mut self, request: &ChatRequest) -> Result<ChatReply>;
    fn chat_enabled(&self) -> bool {
        true
    }
    fn spawn_chat(
        &mut self,
        ticket: u64,
        request: ChatRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = match self.send_chat(&request) {
            Ok(reply) => ChatOutcome::Reply(reply),
            Err(error) => ChatOutcome::Transport(error.to_string()),
        };
        tx.send(InternalEvent::Chat { ticket, outcome })
            .map_err(|_| anyhow::anyhow!("chat event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Reply(ChatReply),
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Chat { ticket: u64, outcome: ChatOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingConfirm {
    DeleteRecord { entity: EntityKind, id: i64 },
    DeleteTag { tag_id: TagId },
    NewChat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagTarget {
    Create,
    Edit(TagId),
}

impl TagTarget {
    const fn is_edit(self) -> bool {
        matches!(self, Self::Edit(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TagEditorUiState {
    category: String,
    target: TagTarget,
    draft: TagDraft,
    sort_order: String,
    focus: usize,
}

impl TagEditorUiState {
    const LABEL: usize = 0;
    const VALUE: usize = 1;
    const COLOR: usize = 2;
    const SORT_ORDER: usize = 3;
    const ACTIVE: usize = 4;

    fn new(category: String, target: TagTarget, draft: TagDraft) -> Self {
        let sort_order = draft.sort_order.to_string();
        Self {
            category,
            target,
            draft,
            sort_order,
            focus: Self::LABEL,
        }
    }

    fn field_count(&self) -> usize {
        if self.target.is_edit() { 5 } else { 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct TagsUiState {
    category_cursor: usize,
    detail: Option<TagCategoryDetail>,
    tag_cursor: usize,
    editor: Option<TagEditorUiState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ChartRow {
    text: String,
    color: Option<Color>,
}

/// Text rendition of one chart block, owned by the chart registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct TextChart {
    rows: Vec<ChartRow>,
    disposed: bool,
}

impl ChartHandle for TextChart {
    fn dispose(&mut self) {
        self.rows.clear();
        self.disposed = true;
    }
}

struct TextChartBackend;

impl ChartBackend for TextChartBackend {
    type Handle = TextChart;

    fn render(&mut self, _slot: ChartSlotId, config: &ChartConfig) -> Result<TextChart> {
        Ok(TextChart {
            rows: render_text_chart(config),
            disposed: false,
        })
    }
}

#[derive(Debug, Default)]
struct ChatUiState {
    session: ChatSession,
    charts: ChartRegistry<TextChart>,
    input: String,
    scroll_back: u16,
}

#[derive(Debug, Default)]
struct ViewData {
    data: AppData,
    cursor: usize,
    filter_focus: usize,
    form: Option<FormState>,
    confirm: Option<PendingConfirm>,
    tags: TagsUiState,
    chat: ChatUiState,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    reload_all(runtime, &mut view_data, true);
    run_entry_hooks(state.active_view, runtime, &mut view_data);

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Chat { ticket, outcome } => {
                handle_chat_outcome(state, view_data, tx, ticket, outcome);
            }
        }
    }
}

fn handle_chat_outcome(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    ticket: u64,
    outcome: ChatOutcome,
) {
    let chat = &mut view_data.chat;
    match outcome {
        ChatOutcome::Reply(ChatReply::Answer(text)) => {
            if let Some(entry) = chat.session.complete(ticket, &text) {
                mount_charts(chat, entry);
            }
        }
        ChatOutcome::Reply(ChatReply::Error(error)) => {
            chat.session.fail(ticket, &error);
        }
        ChatOutcome::Transport(error) => {
            tracing::warn!(ticket, %error, "chat request failed");
            if chat.session.fail_transport(ticket) {
                emit_status(state, view_data, tx, "chat request failed");
            }
        }
    }
}

fn mount_charts(chat: &mut ChatUiState, entry: usize) {
    let mut backend = TextChartBackend;
    for (slot, spec) in chat.session.charts_for(entry) {
        if let Err(error) = chat.charts.render_into(&mut backend, slot, spec) {
            tracing::warn!(entry = slot.message, index = slot.index, %error, "chart render failed");
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.confirm.is_some() {
        handle_confirm_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if view_data.tags.editor.is_some() {
        handle_tag_editor_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if matches!(state.mode, AppMode::Form(_)) {
        handle_form_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if state.chat == ChatVisibility::Visible {
        handle_chat_overlay_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if state.mode == AppMode::Filter {
        handle_filter_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('f'), KeyModifiers::NONE) => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::NextView, internal_tx);
        }
        (KeyCode::Char('b'), KeyModifiers::NONE) => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::PrevView, internal_tx);
        }
        (KeyCode::Char(digit @ '1'..='8'), KeyModifiers::NONE) => {
            let index = digit as usize - '1' as usize;
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::SelectView(ViewKind::ALL[index]),
                internal_tx,
            );
        }
        (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => {
            move_cursor(state.active_view, view_data, 1);
        }
        (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => {
            move_cursor(state.active_view, view_data, -1);
        }
        (KeyCode::Enter, _) if state.active_view == ViewKind::Tags => {
            open_tag_category(runtime, view_data);
        }
        (KeyCode::Esc, _) if state.active_view == ViewKind::Tags => {
            view_data.tags.detail = None;
            view_data.tags.tag_cursor = 0;
        }
        (KeyCode::Char('a'), KeyModifiers::NONE) => {
            open_create(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('e'), KeyModifiers::NONE) => {
            open_edit(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            request_delete(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('/'), KeyModifiers::NONE) => {
            view_data.filter_focus = 0;
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::EditFilters,
                internal_tx,
            );
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            if state.active_view.filter_controls().is_empty() {
                emit_status(state, view_data, internal_tx, "no filters on this view");
            } else {
                reset_filters(state, view_data, internal_tx);
            }
        }
        (KeyCode::Char('R'), _) => {
            reload_all(runtime, view_data, true);
            run_entry_hooks(state.active_view, runtime, view_data);
            emit_status(state, view_data, internal_tx, "reloaded");
        }
        (KeyCode::Char('@'), _) => {
            if runtime.chat_enabled() {
                dispatch_and_refresh(state, runtime, view_data, AppCommand::OpenChat, internal_tx);
            } else {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    "chat disabled -- set [chat].enabled = true in the config",
                );
            }
        }
        _ => {}
    }
    false
}

fn dispatch_and_refresh<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
    internal_tx: &Sender<InternalEvent>,
) {
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::ViewChanged(_)))
    {
        view_data.cursor = 0;
        view_data.filter_focus = 0;
        view_data.tags = TagsUiState::default();
        run_entry_hooks(state.active_view, runtime, view_data);
    }
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

fn run_entry_hooks<R: AppRuntime>(view: ViewKind, runtime: &mut R, view_data: &mut ViewData) {
    for hook in view.entry_hooks() {
        match hook {
            EntryHook::ReloadDashboard => reload_dashboard(runtime, view_data),
            EntryHook::LoadTagCategories => match runtime.load_tag_categories() {
                Ok(categories) => {
                    view_data.data.replace_tag_categories(categories);
                    clamp_tags_cursor(view_data);
                }
                Err(error) => {
                    tracing::warn!(%error, "tag category load failed; keeping previous categories");
                }
            },
            EntryHook::RebuildFilterOptions => view_data.data.rebuild_filter_options(),
            EntryHook::RenderTable => clamp_cursor(view, view_data),
        }
    }
}

/// Full reload. A failure is logged and the previous snapshot stays.
fn reload_all<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData, include_dashboard: bool) {
    match runtime.load_snapshot() {
        Ok(snapshot) => {
            view_data.data.replace(snapshot);
            clamp_tags_cursor(view_data);
        }
        Err(error) => {
            tracing::warn!(%error, "data load failed; keeping previous snapshot");
        }
    }
    if include_dashboard {
        reload_dashboard(runtime, view_data);
    }
}

fn reload_dashboard<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) {
    match runtime.load_dashboard() {
        Ok(counts) => view_data.data.dashboard = counts,
        Err(error) => {
            tracing::warn!(%error, "dashboard load failed; keeping previous counts");
        }
    }
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Ids of the rows `view` currently shows, in display order.
fn visible_ids(data: &AppData, view: ViewKind) -> Vec<i64> {
    let snapshot = data.snapshot();
    let filters = &data.filters;
    match view {
        ViewKind::Departments => apply_filters(&snapshot.departments, view, filters)
            .into_iter()
            .map(|row| row.department_id.get())
            .collect(),
        ViewKind::Applications => apply_filters(&snapshot.applications, view, filters)
            .into_iter()
            .map(|row| row.app_id.get())
            .collect(),
        ViewKind::Integrations => apply_filters(&snapshot.integrations, view, filters)
            .into_iter()
            .map(|row| row.integration_id.get())
            .collect(),
        ViewKind::Contacts => apply_filters(&snapshot.contacts, view, filters)
            .into_iter()
            .map(|row| row.contact_id.get())
            .collect(),
        ViewKind::Activities => apply_filters(&snapshot.activities, view, filters)
            .into_iter()
            .map(|row| row.activity_id.get())
            .collect(),
        ViewKind::Incidents => apply_filters(&snapshot.incidents, view, filters)
            .into_iter()
            .map(|row| row.incident_id.get())
            .collect(),
        ViewKind::Dashboard | ViewKind::Tags => Vec::new(),
    }
}

fn selected_id(view: ViewKind, view_data: &ViewData) -> Option<i64> {
    visible_ids(&view_data.data, view)
        .get(view_data.cursor)
        .copied()
}

fn clamp_cursor(view: ViewKind, view_data: &mut ViewData) {
    let rows = visible_ids(&view_data.data, view).len();
    view_data.cursor = view_data.cursor.min(rows.saturating_sub(1));
}

fn ordered_categories(categories: &[TagCategory]) -> Vec<&TagCategory> {
    group_by_entity_type(categories)
        .into_iter()
        .flat_map(|(_, members)| members)
        .collect()
}

fn selected_category(view_data: &ViewData) -> Option<&TagCategory> {
    ordered_categories(&view_data.data.snapshot().tag_categories)
        .into_iter()
        .nth(view_data.tags.category_cursor)
}

fn selected_tag(tags: &TagsUiState) -> Option<&TagValue> {
    let detail = tags.detail.as_ref()?;
    sorted_tags(&detail.tags).into_iter().nth(tags.tag_cursor)
}

fn clamp_tags_cursor(view_data: &mut ViewData) {
    let categories = view_data.data.snapshot().tag_categories.len();
    let tags = &mut view_data.tags;
    tags.category_cursor = tags.category_cursor.min(categories.saturating_sub(1));
    let tag_count = tags.detail.as_ref().map_or(0, |detail| detail.tags.len());
    tags.tag_cursor = tags.tag_cursor.min(tag_count.saturating_sub(1));
}

fn move_cursor(view: ViewKind, view_data: &mut ViewData, delta: isize) {
    if view == ViewKind::Tags {
        let tags = &mut view_data.tags;
        if let Some(detail) = &tags.detail {
            tags.tag_cursor = step(tags.tag_cursor, delta, detail.tags.len());
        } else {
            let count = view_data.data.snapshot().tag_categories.len();
            view_data.tags.category_cursor = step(view_data.tags.category_cursor, delta, count);
        }
        return;
    }
    let rows = visible_ids(&view_data.data, view).len();
    view_data.cursor = step(view_data.cursor, delta, rows);
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).clamp(0, len as isize - 1) as usize
}

fn form_tags<R: AppRuntime>(
    runtime: &mut R,
    snapshot: &DataSnapshot,
    field: TagField,
) -> Vec<TagValue> {
    match runtime.load_tag_category(field.category()) {
        Ok(detail) => detail.tags,
        Err(error) => {
            tracing::warn!(category = field.category(), %error, "tag options load failed; using cached tags");
            snapshot
                .tag_category(field.category())
                .map(|category| category.tags.clone())
                .unwrap_or_default()
        }
    }
}

fn open_form<R: AppRuntime, T: Serialize>(
    runtime: &mut R,
    kind: FormKind,
    target: FormTarget,
    current: Option<&T>,
    snapshot: &DataSnapshot,
) -> Result<FormState> {
    FormState::open(kind, target, current, snapshot, today(), |field| {
        form_tags(runtime, snapshot, field)
    })
}

fn open_create<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if state.active_view == ViewKind::Tags {
        open_tag_editor(state, view_data, internal_tx, false);
        return;
    }
    let Some(entity) = state.active_view.entity() else {
        emit_status(state, view_data, internal_tx, "nothing to add on this view");
        return;
    };
    let Some(kind) = FormKind::create_for(entity) else {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!(
                "{} records cannot be added here -- edit an existing one instead",
                entity.singular()
            ),
        );
        return;
    };

    let opened = open_form(
        runtime,
        kind,
        FormTarget::Create,
        None::<&Value>,
        view_data.data.snapshot(),
    );
    show_form(state, runtime, view_data, internal_tx, kind, opened);
}

fn open_edit<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let view = state.active_view;
    if view == ViewKind::Tags {
        open_tag_editor(state, view_data, internal_tx, true);
        return;
    }
    let Some(entity) = view.entity() else {
        emit_status(state, view_data, internal_tx, "nothing to edit on this view");
        return;
    };
    let Some(id) = selected_id(view, view_data) else {
        emit_status(state, view_data, internal_tx, "no row selected");
        return;
    };

    let kind = FormKind::edit_for(entity);
    let target = FormTarget::Update(id);
    let snapshot = view_data.data.snapshot();
    let opened = match view {
        ViewKind::Departments => open_form(
            runtime,
            kind,
            target,
            snapshot
                .departments
                .iter()
                .find(|row| row.department_id.get() == id),
            snapshot,
        ),
        ViewKind::Applications => open_form(
            runtime,
            kind,
            target,
            snapshot.applications.iter().find(|row| row.app_id.get() == id),
            snapshot,
        ),
        ViewKind::Integrations => open_form(
            runtime,
            kind,
            target,
            snapshot
                .integrations
                .iter()
                .find(|row| row.integration_id.get() == id),
            snapshot,
        ),
        ViewKind::Contacts => open_form(
            runtime,
            kind,
            target,
            snapshot
                .contacts
                .iter()
                .find(|row| row.contact_id.get() == id),
            snapshot,
        ),
        ViewKind::Activities => open_form(
            runtime,
            kind,
            target,
            snapshot
                .activities
                .iter()
                .find(|row| row.activity_id.get() == id),
            snapshot,
        ),
        ViewKind::Incidents => open_form(
            runtime,
            kind,
            target,
            snapshot
                .incidents
                .iter()
                .find(|row| row.incident_id.get() == id),
            snapshot,
        ),
        ViewKind::Dashboard | ViewKind::Tags => return,
    };
    show_form(state, runtime, view_data, internal_tx, kind, opened);
}

fn show_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: FormKind,
    opened: Result<FormState>,
) {
    match opened {
        Ok(form) => {
            view_data.form = Some(form);
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::OpenForm(kind),
                internal_tx,
            );
        }
        Err(error) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("open form failed: {error}"),
            );
        }
    }
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(form) = view_data.form.as_mut() else {
        dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);
        return;
    };

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            view_data.form = None;
            dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);
            emit_status(state, view_data, internal_tx, "form canceled");
        }
        (KeyCode::Enter, _) => submit_form(state, runtime, view_data, internal_tx),
        (KeyCode::Tab, _) | (KeyCode::Down, _) => form.focus_next(),
        (KeyCode::BackTab, _) | (KeyCode::Up, _) => form.focus_prev(),
        (KeyCode::Left, _) => form.cycle(-1),
        (KeyCode::Right, _) => form.cycle(1),
        (KeyCode::Backspace, _) => form.backspace(),
        (KeyCode::Char(ch), modifiers)
            if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
        {
            form.type_char(ch);
        }
        _ => {}
    }
}

fn submit_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(form) = &view_data.form else {
        return;
    };
    let label = form.kind.label();
    let submission = match form.submission() {
        Ok(submission) => submission,
        Err(error) => {
            emit_status(state, view_data, internal_tx, error.to_string());
            return;
        }
    };

    if let Err(error) = runtime.submit_form(&submission) {
        tracing::warn!(endpoint = %submission.endpoint(), %error, "form submit failed");
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("save failed: {error}"),
        );
        return;
    }
    tracing::info!(endpoint = %submission.endpoint(), "form saved");

    view_data.form = None;
    dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);
    reload_all(runtime, view_data, submission.affects_dashboard());
    view_data.data.rebuild_filter_options();
    clamp_cursor(state.active_view, view_data);
    emit_status(state, view_data, internal_tx, format!("saved {label}"));
}

fn request_delete<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let view = state.active_view;
    if view == ViewKind::Tags {
        let Some(tag) = selected_tag(&view_data.tags) else {
            emit_status(state, view_data, internal_tx, "open a category and select a tag first");
            return;
        };
        view_data.confirm = Some(PendingConfirm::DeleteTag { tag_id: tag.tag_id });
        dispatch_and_refresh(state, runtime, view_data, AppCommand::OpenConfirm, internal_tx);
        return;
    }
    let Some(entity) = view.entity() else {
        emit_status(state, view_data, internal_tx, "nothing to delete on this view");
        return;
    };
    if !entity.supports_delete() {
        emit_status(state, view_data, internal_tx, entity.delete_prompt());
        return;
    }
    let Some(id) = selected_id(view, view_data) else {
        emit_status(state, view_data, internal_tx, "no row selected");
        return;
    };
    view_data.confirm = Some(PendingConfirm::DeleteRecord { entity, id });
    dispatch_and_refresh(state, runtime, view_data, AppCommand::OpenConfirm, internal_tx);
}

fn confirm_prompt(confirm: PendingConfirm, tags: &TagsUiState) -> String {
    match confirm {
        PendingConfirm::DeleteRecord { entity, .. } => entity.delete_prompt().to_owned(),
        PendingConfirm::DeleteTag { tag_id } => {
            let label = tags
                .detail
                .as_ref()
                .and_then(|detail| detail.tags.iter().find(|tag| tag.tag_id == tag_id))
                .map(|tag| tag.label.as_str())
                .unwrap_or("this tag");
            format!("Delete tag {label:?}?")
        }
        PendingConfirm::NewChat => NEW_CHAT_PROMPT.to_owned(),
    }
}

fn handle_confirm_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let confirmed = match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => true,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
        _ => return,
    };
    let Some(confirm) = view_data.confirm.take() else {
        return;
    };
    dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);

    if !confirmed {
        let message = match confirm {
            PendingConfirm::NewChat => "new chat canceled",
            _ => "delete canceled",
        };
        emit_status(state, view_data, internal_tx, message);
        return;
    }

    match confirm {
        PendingConfirm::DeleteRecord { entity, id } => {
            if let Err(error) = runtime.delete_record(entity, id) {
                tracing::warn!(entity = entity.singular(), id, %error, "delete failed");
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("delete failed: {error}"),
                );
                return;
            }
            tracing::info!(entity = entity.singular(), id, "record deleted");
            reload_all(runtime, view_data, entity.affects_dashboard());
            view_data.data.rebuild_filter_options();
            clamp_cursor(state.active_view, view_data);
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("deleted {}", entity.singular()),
            );
        }
        PendingConfirm::DeleteTag { tag_id } => {
            if let Err(error) = runtime.delete_tag(tag_id) {
                emit_status(state, view_data, internal_tx, error.to_string());
                return;
            }
            after_tag_mutation(runtime, view_data);
            emit_status(state, view_data, internal_tx, "tag deleted");
        }
        PendingConfirm::NewChat => {
            clear_chat(view_data);
            emit_status(state, view_data, internal_tx, "new chat");
        }
    }
}

fn reset_filters(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    view_data.data.filters.reset(state.active_view);
    clamp_cursor(state.active_view, view_data);
    emit_status(state, view_data, internal_tx, "filters reset");
}

fn handle_filter_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let view = state.active_view;
    let controls = view.filter_controls();
    if controls.is_empty() {
        dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);
        return;
    }
    let focus = view_data.filter_focus.min(controls.len() - 1);
    let id = controls[focus];
    let free_text = matches!(id.source(), OptionSource::FreeText);

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) | (KeyCode::Enter, _) => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);
        }
        (KeyCode::Tab, _) | (KeyCode::Down, _) => {
            view_data.filter_focus = (focus + 1) % controls.len();
        }
        (KeyCode::BackTab, _) | (KeyCode::Up, _) => {
            view_data.filter_focus = (focus + controls.len() - 1) % controls.len();
        }
        (KeyCode::Char('r'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            reset_filters(state, view_data, internal_tx);
        }
        (KeyCode::Left, _) => cycle_filter(view_data, id, -1),
        (KeyCode::Right, _) => cycle_filter(view_data, id, 1),
        (KeyCode::Backspace, _) if free_text => {
            let mut value = view_data.data.filters.value(id).to_owned();
            value.pop();
            view_data.data.filters.set(id, value);
        }
        (KeyCode::Char(ch), modifiers)
            if free_text && (modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) =>
        {
            let mut value = view_data.data.filters.value(id).to_owned();
            value.push(ch);
            view_data.data.filters.set(id, value);
        }
        _ => {}
    }
    clamp_cursor(view, view_data);
}

fn cycle_filter(view_data: &mut ViewData, id: FilterId, delta: isize) {
    let choices = view_data
        .data
        .filters
        .choices(id, view_data.data.snapshot());
    if choices.is_empty() {
        return;
    }
    let current = view_data.data.filters.value(id);
    let position = choices
        .iter()
        .position(|choice| choice.value == current)
        .unwrap_or(0) as isize;
    let next = (position + delta).rem_euclid(choices.len() as isize) as usize;
    let value = choices[next].value.clone();
    view_data.data.filters.set(id, value);
}

fn open_tag_category<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) {
    if view_data.tags.detail.is_some() {
        return;
    }
    let Some(category) = selected_category(view_data).cloned() else {
        return;
    };
    let detail = match runtime.load_tag_category(&category.name) {
        Ok(detail) => detail,
        Err(error) => {
            tracing::warn!(category = %category.name, %error, "tag category load failed; using cached tags");
            TagCategoryDetail {
                tags: category.tags.clone(),
                category,
            }
        }
    };
    view_data.tags.detail = Some(detail);
    view_data.tags.tag_cursor = 0;
}

fn open_tag_editor(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    edit: bool,
) {
    let Some(detail) = &view_data.tags.detail else {
        emit_status(state, view_data, internal_tx, "open a category first -- press enter");
        return;
    };
    let category = detail.category.name.clone();
    let editor = if edit {
        let Some(tag) = selected_tag(&view_data.tags) else {
            emit_status(state, view_data, internal_tx, "no tag selected");
            return;
        };
        TagEditorUiState::new(category, TagTarget::Edit(tag.tag_id), TagDraft::from_tag(tag))
    } else {
        TagEditorUiState::new(category, TagTarget::Create, TagDraft::default())
    };
    view_data.tags.editor = Some(editor);
}

fn handle_tag_editor_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(editor) = view_data.tags.editor.as_mut() else {
        return;
    };
    let fields = editor.field_count();

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            view_data.tags.editor = None;
            emit_status(state, view_data, internal_tx, "tag edit canceled");
        }
        (KeyCode::Enter, _) => submit_tag_editor(state, runtime, view_data, internal_tx),
        (KeyCode::Tab, _) | (KeyCode::Down, _) => editor.focus = (editor.focus + 1) % fields,
        (KeyCode::BackTab, _) | (KeyCode::Up, _) => {
            editor.focus = (editor.focus + fields - 1) % fields;
        }
        (KeyCode::Backspace, _) => {
            if let Some(text) = tag_editor_text(editor) {
                text.pop();
            }
        }
        (KeyCode::Char(' '), _) if editor.focus == TagEditorUiState::ACTIVE => {
            editor.draft.is_active = !editor.draft.is_active;
        }
        (KeyCode::Char(ch), modifiers)
            if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
        {
            let numeric = editor.focus == TagEditorUiState::SORT_ORDER;
            if numeric && !(ch.is_ascii_digit() || ch == '-') {
                return;
            }
            if let Some(text) = tag_editor_text(editor) {
                text.push(ch);
            }
        }
        _ => {}
    }
}

fn tag_editor_text(editor: &mut TagEditorUiState) -> Option<&mut String> {
    match editor.focus {
        TagEditorUiState::LABEL => Some(&mut editor.draft.label),
        TagEditorUiState::VALUE => Some(&mut editor.draft.value),
        TagEditorUiState::COLOR => Some(&mut editor.draft.color),
        TagEditorUiState::SORT_ORDER => Some(&mut editor.sort_order),
        _ => None,
    }
}

fn submit_tag_editor<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(editor) = view_data.tags.editor.as_mut() else {
        return;
    };
    let raw_order = editor.sort_order.trim().to_owned();
    let sort_order = if raw_order.is_empty() {
        Ok(0)
    } else {
        raw_order.parse::<i64>()
    };
    let Ok(sort_order) = sort_order else {
        let message = format!("sort order {raw_order:?} is not a number -- enter a whole number");
        emit_status(state, view_data, internal_tx, message);
        return;
    };
    editor.draft.sort_order = sort_order;
    if let Err(error) = editor.draft.validate() {
        emit_status(state, view_data, internal_tx, error.to_string());
        return;
    }

    let payload = editor.draft.to_payload(editor.target.is_edit());
    let result = match editor.target {
        TagTarget::Create => runtime.create_tag(&editor.category, &payload),
        TagTarget::Edit(tag_id) => runtime.update_tag(tag_id, &payload),
    };
    if let Err(error) = result {
        emit_status(state, view_data, internal_tx, error.to_string());
        return;
    }

    view_data.tags.editor = None;
    after_tag_mutation(runtime, view_data);
    emit_status(state, view_data, internal_tx, "tag saved");
}

/// Reloads the open category and the full snapshot so badges pick up new
/// labels and colors.
fn after_tag_mutation<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) {
    reload_all(runtime, view_data, false);
    let Some(name) = view_data
        .tags
        .detail
        .as_ref()
        .map(|detail| detail.category.name.clone())
    else {
        return;
    };
    match runtime.load_tag_category(&name) {
        Ok(detail) => view_data.tags.detail = Some(detail),
        Err(error) => {
            tracing::warn!(category = %name, %error, "tag category reload failed");
        }
    }
    clamp_tags_cursor(view_data);
}

fn handle_chat_overlay_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::CloseChat,
                internal_tx,
            );
        }
        (KeyCode::Char('l'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            clear_chat(view_data);
            emit_status(state, view_data, internal_tx, "chat cleared");
        }
        (KeyCode::Char('n'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            if view_data.chat.session.needs_new_chat_confirmation() {
                view_data.confirm = Some(PendingConfirm::NewChat);
                dispatch_and_refresh(
                    state,
                    runtime,
                    view_data,
                    AppCommand::OpenConfirm,
                    internal_tx,
                );
            } else {
                clear_chat(view_data);
                emit_status(state, view_data, internal_tx, "new chat");
            }
        }
        (KeyCode::Up, _) => {
            view_data.chat.scroll_back = view_data.chat.scroll_back.saturating_add(1);
        }
        (KeyCode::Down, _) => {
            view_data.chat.scroll_back = view_data.chat.scroll_back.saturating_sub(1);
        }
        (KeyCode::PageUp, _) => {
            view_data.chat.scroll_back = view_data.chat.scroll_back.saturating_add(CHAT_PAGE_LINES);
        }
        (KeyCode::PageDown, _) => {
            view_data.chat.scroll_back = view_data.chat.scroll_back.saturating_sub(CHAT_PAGE_LINES);
        }
        (KeyCode::Enter, _) => submit_chat_input(state, runtime, view_data, internal_tx),
        (KeyCode::Backspace, _) => {
            view_data.chat.input.pop();
        }
        (KeyCode::Char(ch), modifiers) => {
            if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT {
                view_data.chat.input.push(ch);
            }
        }
        _ => {}
    }
}

fn submit_chat_input<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if view_data.chat.session.in_flight() {
        emit_status(state, view_data, internal_tx, "waiting for reply");
        return;
    }
    let Some(outgoing) = view_data.chat.session.begin_send(&view_data.chat.input) else {
        return;
    };
    view_data.chat.input.clear();
    view_data.chat.scroll_back = 0;

    tracing::debug!(
        ticket = outgoing.ticket,
        history = outgoing.request.history.len(),
        "chat request"
    );
    if let Err(error) = runtime.spawn_chat(outgoing.ticket, outgoing.request, internal_tx.clone())
    {
        tracing::warn!(%error, "chat request could not start");
        view_data.chat.session.fail_transport(outgoing.ticket);
    }
}

fn clear_chat(view_data: &mut ViewData) {
    let chat = &mut view_data.chat;
    chat.session.clear(&mut chat.charts);
    chat.input.clear();
    chat.scroll_back = 0;
}

fn hex_color(raw: Option<&str>) -> Option<Color> {
    raw.and_then(parse_hex_color)
        .map(|(red, green, blue)| Color::Rgb(red, green, blue))
}

fn format_chart_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn render_text_chart(config: &ChartConfig) -> Vec<ChartRow> {
    let title = config.title.as_deref().unwrap_or("chart");
    let mut rows = vec![ChartRow {
        text: format!("[{}] {title}", config.kind.label()),
        color: None,
    }];

    if config.kind.is_circular() {
        let Some(dataset) = config.datasets.first() else {
            return rows;
        };
        let total: f64 = dataset
            .data
            .iter()
            .flatten()
            .filter(|value| **value > 0.0)
            .sum();
        for (index, label) in config.labels.iter().enumerate() {
            let value = dataset.data.get(index).copied().flatten().unwrap_or(0.0);
            let share = if total > 0.0 {
                value / total * 100.0
            } else {
                0.0
            };
            rows.push(ChartRow {
                text: format!("● {label}: {} ({share:.0}%)", format_chart_value(value)),
                color: hex_color(dataset.background.at(index)),
            });
        }
        return rows;
    }

    let max = config
        .datasets
        .iter()
        .flat_map(|dataset| dataset.data.iter().flatten())
        .fold(0.0_f64, |acc, value| acc.max(value.abs()));
    let label_width = config
        .labels
        .iter()
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(0);

    for dataset in &config.datasets {
        if !dataset.label.is_empty() {
            rows.push(ChartRow {
                text: dataset.label.clone(),
                color: hex_color(dataset.background.at(0)),
            });
        }
        for (index, label) in config.labels.iter().enumerate() {
            let Some(value) = dataset.data.get(index).copied().flatten() else {
                rows.push(ChartRow {
                    text: format!("{label:<label_width$} │"),
                    color: None,
                });
                continue;
            };
            let width = if max > 0.0 {
                (value.abs() / max * BAR_WIDTH).round() as usize
            } else {
                0
            };
            rows.push(ChartRow {
                text: format!(
                    "{label:<label_width$} │{} {}",
                    "█".repeat(width),
                    format_chart_value(value)
                ),
                color: hex_color(dataset.background.at(index)),
            });
        }
    }
    rows
}

fn badge_span(badge: &Badge) -> Span<'static> {
    match hex_color(badge.color()) {
        Some(color) => Span::styled(
            badge.text().to_owned(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        None => Span::raw(badge.text().to_owned()),
    }
}

fn badge_line(colors: &TagColorMap, field: TagField, raw: &str) -> Line<'static> {
    if !field.is_multi_value() {
        return Line::from(badge_span(&colors.badge(field, raw)));
    }
    let mut spans = Vec::new();
    for badge in colors.badges(field, raw) {
        if !spans.is_empty() {
            spans.push(Span::raw(" "));
        }
        spans.push(badge_span(&badge));
    }
    Line::from(spans)
}

fn fixed_label(pairs: &[(&str, &str)], value: &str) -> String {
    pairs
        .iter()
        .find(|(key, _)| *key == value)
        .map(|(_, label)| (*label).to_owned())
        .unwrap_or_else(|| value.to_owned())
}

fn text(value: impl Into<String>) -> Line<'static> {
    Line::from(value.into())
}

fn date_text(raw: Option<&str>) -> Line<'static> {
    text(raw.map(|value| value.get(..10).unwrap_or(value)).unwrap_or(""))
}

/// Header labels and rendered cells for an entity view, filtered.
fn table_rows(data: &AppData, view: ViewKind) -> (Vec<&'static str>, Vec<Vec<Line<'static>>>) {
    let snapshot = data.snapshot();
    let filters = &data.filters;
    let colors = data.tag_colors();
    match view {
        ViewKind::Departments => (
            vec!["id", "name", "acronym", "tier", "status", "owner team", "apps"],
            apply_filters(&snapshot.departments, view, filters)
                .into_iter()
                .map(|row| {
                    vec![
                        text(row.department_id.to_string()),
                        text(row.name.clone()),
                        text(row.acronym.clone()),
                        badge_line(colors, TagField::DepartmentTier, &row.tier),
                        badge_line(colors, TagField::DepartmentStatus, &row.status),
                        badge_line(colors, TagField::DepartmentOwnerTeam, &row.owner_team),
                        text(row.app_count.map(|count| count.to_string()).unwrap_or_default()),
                    ]
                })
                .collect(),
        ),
        ViewKind::Applications => (
            vec![
                "id",
                "name",
                "department",
                "environment",
                "auth type",
                "status",
                "go-live",
            ],
            apply_filters(&snapshot.applications, view, filters)
                .into_iter()
                .map(|row| {
                    vec![
                        text(row.app_id.to_string()),
                        text(row.app_name.clone()),
                        text(row.department_name.clone()),
                        badge_line(colors, TagField::ApplicationEnvironment, &row.environment),
                        badge_line(colors, TagField::ApplicationAuthType, &row.auth_type),
                        badge_line(colors, TagField::ApplicationStatus, &row.status),
                        date_text(row.go_live_date.as_deref()),
                    ]
                })
                .collect(),
        ),
        ViewKind::Integrations => (
            vec![
                "id",
                "application",
                "department",
                "stage",
                "status",
                "risk",
                "updated",
            ],
            apply_filters(&snapshot.integrations, view, filters)
                .into_iter()
                .map(|row| {
                    vec![
                        text(row.integration_id.to_string()),
                        text(row.app_name.clone()),
                        text(row.department_name.clone()),
                        badge_line(colors, TagField::IntegrationStage, &row.stage),
                        text(fixed_label(&crmdesk_app::INTEGRATION_STATUSES, &row.status)),
                        text(fixed_label(&crmdesk_app::RISK_LEVELS, &row.risk_level)),
                        date_text(row.last_updated.as_deref()),
                    ]
                })
                .collect(),
        ),
        ViewKind::Contacts => (
            vec!["id", "name", "department", "role", "email", "phone", "active"],
            apply_filters(&snapshot.contacts, view, filters)
                .into_iter()
                .map(|row| {
                    vec![
                        text(row.contact_id.to_string()),
                        text(row.name.clone()),
                        text(row.department_name.clone()),
                        badge_line(colors, TagField::ContactRole, &row.role),
                        text(row.email.clone()),
                        text(row.phone.clone()),
                        text(if row.active_flag { "yes" } else { "no" }),
                    ]
                })
                .collect(),
        ),
        ViewKind::Activities => (
            vec![
                "id",
                "date",
                "type",
                "department",
                "application",
                "summary",
                "owner",
            ],
            apply_filters(&snapshot.activities, view, filters)
                .into_iter()
                .map(|row| {
                    vec![
                        text(row.activity_id.to_string()),
                        date_text(row.date.as_deref()),
                        badge_line(colors, TagField::ActivityType, &row.activity_type),
                        text(row.department_name.clone()),
                        text(row.app_name.clone()),
                        text(row.summary.clone()),
                        text(row.owner.clone()),
                    ]
                })
                .collect(),
        ),
        ViewKind::Incidents => (
            vec![
                "id",
                "application",
                "severity",
                "status",
                "description",
                "created",
            ],
            apply_filters(&snapshot.incidents, view, filters)
                .into_iter()
                .map(|row| {
                    vec![
                        text(row.incident_id.to_string()),
                        text(row.app_name.clone()),
                        text(fixed_label(&crmdesk_app::INCIDENT_SEVERITIES, &row.severity)),
                        text(fixed_label(&crmdesk_app::INCIDENT_STATUSES, &row.status)),
                        text(row.description.clone()),
                        date_text(row.created_at.as_deref()),
                    ]
                })
                .collect(),
        ),
        ViewKind::Dashboard | ViewKind::Tags => (Vec::new(), Vec::new()),
    }
}

fn tab_title(view: ViewKind, state: &AppState, view_data: &ViewData) -> String {
    let active = view_data.data.filters.active_count(view);
    if state.active_view != view || active == 0 {
        return format!(" {} ", view.label());
    }
    let shown = visible_ids(&view_data.data, view).len();
    let total = view_data.data.snapshot().row_count(view).unwrap_or(0);
    format!(" {} {shown}/{total} ", view.label())
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = ViewKind::ALL
        .iter()
        .position(|view| *view == state.active_view)
        .unwrap_or(0);
    let titles = ViewKind::ALL
        .iter()
        .map(|view| tab_title(*view, state, view_data))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("crmdesk").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    match state.active_view {
        ViewKind::Dashboard => {
            let body = Paragraph::new(render_dashboard_text(&view_data.data.dashboard))
                .block(Block::default().borders(Borders::ALL).title("dashboard"));
            frame.render_widget(body, layout[1]);
        }
        ViewKind::Tags => render_tags(frame, layout[1], view_data),
        view => {
            let body = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(1)])
                .split(layout[1]);
            let filters = Paragraph::new(filter_bar_line(state, view_data))
                .block(Block::default().borders(Borders::ALL).title("filters"));
            frame.render_widget(filters, body[0]);
            render_table(frame, body[1], view, view_data);
        }
    }

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if let Some(form) = &view_data.form {
        let area = centered_rect(60, 70, frame.area());
        frame.render_widget(Clear, area);
        let title = match form.target {
            FormTarget::Create => format!("add {}", form.kind.label()),
            FormTarget::Update(id) => format!("edit {} {id}", form.kind.label()),
        };
        let overlay = Paragraph::new(render_form_lines(form))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(overlay, area);
    }

    if let Some(editor) = &view_data.tags.editor {
        let area = centered_rect(50, 40, frame.area());
        frame.render_widget(Clear, area);
        let title = match editor.target {
            TagTarget::Create => format!("new tag in {}", editor.category),
            TagTarget::Edit(id) => format!("edit tag {id}"),
        };
        let overlay = Paragraph::new(render_tag_editor_lines(editor))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(overlay, area);
    }

    if state.chat == ChatVisibility::Visible {
        render_chat(frame, centered_rect(80, 80, frame.area()), &view_data.chat);
    }

    if let Some(confirm) = view_data.confirm {
        let area = centered_rect(50, 20, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(vec![
            text(confirm_prompt(confirm, &view_data.tags)),
            Line::default(),
            text("y confirm | n cancel"),
        ])
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("confirm")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(overlay, area);
    }
}

fn render_dashboard_text(counts: &DashboardCounts) -> String {
    let mut lines = vec![
        format!(
            "departments: {} total | {} active | {} critical",
            counts.departments.total, counts.departments.active, counts.departments.critical
        ),
        format!(
            "applications: {} total | {} live | {} integrating",
            counts.applications.total, counts.applications.live, counts.applications.integrating
        ),
        format!(
            "risk: {} high risk | {} blocked | {} delayed",
            counts.risk.high_risk, counts.risk.blocked, counts.risk.delayed
        ),
        format!("incidents: {} open", counts.incidents.open),
    ];
    if let Some(engagement) = counts.engagement {
        lines.push(format!(
            "engagement: {} recent activities",
            engagement.recent_activities
        ));
    }
    lines.join("\n")
}

fn filter_choice_label(view_data: &ViewData, id: FilterId) -> String {
    let value = view_data.data.filters.value(id);
    if matches!(id.source(), OptionSource::FreeText) {
        return value.to_owned();
    }
    view_data
        .data
        .filters
        .choices(id, view_data.data.snapshot())
        .into_iter()
        .find(|choice| choice.value == value)
        .map(|choice| choice.label)
        .unwrap_or_else(|| value.to_owned())
}

fn filter_bar_line(state: &AppState, view_data: &ViewData) -> Line<'static> {
    let controls = state.active_view.filter_controls();
    let editing = state.mode == AppMode::Filter;
    let mut spans = Vec::new();
    for (index, id) in controls.iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw(" | "));
        }
        let mut style = Style::default();
        if !view_data.data.filters.value(*id).is_empty() {
            style = style.fg(Color::Cyan);
        }
        if editing && index == view_data.filter_focus {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(
            format!("{}: {}", id.label(), filter_choice_label(view_data, *id)),
            style,
        ));
    }
    Line::from(spans)
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, view: ViewKind, view_data: &ViewData) {
    let (headers, rows) = table_rows(&view_data.data, view);
    let widths = vec![Constraint::Min(6); headers.len().max(1)];
    let header = Row::new(headers.iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = rows
        .into_iter()
        .map(|cells| Row::new(cells.into_iter().map(Cell::from)));
    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title(view.label()));
    // The table state scrolls the window so the cursor row stays on screen.
    let mut table_state = TableState::default().with_selected(Some(view_data.cursor));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn tag_category_lines(view_data: &ViewData) -> Vec<Line<'static>> {
    let categories = &view_data.data.snapshot().tag_categories;
    let mut lines = Vec::new();
    let mut position = 0;
    for (entity_type, members) in group_by_entity_type(categories) {
        lines.push(Line::from(Span::styled(
            entity_type_label(&entity_type),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for category in members {
            let count = category
                .tag_count
                .unwrap_or(category.tags.len() as i64);
            let mut style = Style::default();
            if position == view_data.tags.category_cursor {
                style = if view_data.tags.detail.is_some() {
                    style.fg(Color::Cyan)
                } else {
                    style.fg(Color::Black).bg(Color::Cyan)
                };
            }
            lines.push(Line::from(Span::styled(
                format!("  {} ({count})", category.title()),
                style,
            )));
            position += 1;
        }
    }
    lines
}

fn tag_detail_lines(tags: &TagsUiState) -> Vec<Line<'static>> {
    let Some(detail) = &tags.detail else {
        return vec![text("enter opens the selected category")];
    };
    let mut lines = Vec::new();
    if !detail.category.description.is_empty() {
        lines.push(text(detail.category.description.clone()));
        lines.push(Line::default());
    }
    for (index, tag) in sorted_tags(&detail.tags).into_iter().enumerate() {
        let swatch = match hex_color(Some(tag.color.as_str())) {
            Some(color) => Span::styled("■ ", Style::default().fg(color)),
            None => Span::raw("□ "),
        };
        let mut style = Style::default();
        if !tag.is_active {
            style = style.fg(Color::DarkGray);
        }
        if index == tags.tag_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let inactive = if tag.is_active { "" } else { " (inactive)" };
        lines.push(Line::from(vec![
            swatch,
            Span::styled(
                format!(
                    "{}  [{}]  {}  #{}{inactive}",
                    tag.label, tag.value, tag.color, tag.sort_order
                ),
                style,
            ),
        ]));
    }
    if detail.tags.is_empty() {
        lines.push(text("no tags yet -- press a to add one"));
    }
    lines
}

fn render_tags(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    let categories = Paragraph::new(tag_category_lines(view_data))
        .block(Block::default().borders(Borders::ALL).title("categories"));
    frame.render_widget(categories, panes[0]);

    let title = view_data
        .tags
        .detail
        .as_ref()
        .map(|detail| detail.category.title().to_owned())
        .unwrap_or_else(|| "tags".to_owned());
    let detail = Paragraph::new(tag_detail_lines(&view_data.tags))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(detail, panes[1]);
}

fn render_form_lines(form: &FormState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, field) in form.fields.iter().enumerate() {
        let focused = index == form.focus;
        let marker = if focused { "> " } else { "  " };
        let required = if field.required { "*" } else { "" };
        let style = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{marker}{}{required}: {}", field.label, field.input.display()),
            style,
        )));
        if focused
            && let FieldInput::MultiSelect {
                options,
                order,
                cursor,
            } = &field.input
        {
            for (option_index, option) in options.iter().enumerate() {
                let pointer = if option_index == *cursor { ">" } else { " " };
                let check = if order.contains(&option_index) {
                    "[x]"
                } else {
                    "[ ]"
                };
                lines.push(text(format!("    {pointer} {check} {}", option.label)));
            }
        }
    }
    lines.push(Line::default());
    lines.push(text(
        "tab next | ←/→ choose | space toggle | enter save | esc cancel",
    ));
    lines
}

fn render_tag_editor_lines(editor: &TagEditorUiState) -> Vec<Line<'static>> {
    let mut fields = vec![
        ("label*", editor.draft.label.clone()),
        ("value*", editor.draft.value.clone()),
        ("color", editor.draft.color.clone()),
        ("sort order", editor.sort_order.clone()),
    ];
    if editor.target.is_edit() {
        let active = if editor.draft.is_active { "[x]" } else { "[ ]" };
        fields.push(("active", active.to_owned()));
    }
    let mut lines = fields
        .into_iter()
        .enumerate()
        .map(|(index, (label, value))| {
            let focused = index == editor.focus;
            let marker = if focused { "> " } else { "  " };
            let mut spans = vec![Span::raw(format!("{marker}{label}: {value}"))];
            if index == TagEditorUiState::COLOR
                && let Some(color) = hex_color(Some(editor.draft.color.as_str()))
            {
                spans.push(Span::styled(" ■", Style::default().fg(color)));
            }
            let line = Line::from(spans);
            if focused {
                line.style(Style::default().fg(Color::Cyan))
            } else {
                line
            }
        })
        .collect::<Vec<_>>();
    lines.push(Line::default());
    lines.push(text("tab next | enter save | esc cancel"));
    lines
}

fn span_style(style: SpanStyle) -> Style {
    match style {
        SpanStyle::Plain => Style::default(),
        SpanStyle::Bold => Style::default().add_modifier(Modifier::BOLD),
        SpanStyle::Italic => Style::default().add_modifier(Modifier::ITALIC),
    }
}

fn chat_transcript_lines(chat: &ChatUiState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, entry) in chat.session.transcript().iter().enumerate() {
        match entry {
            TranscriptEntry::Greeting => {
                lines.push(text(GREETING));
                lines.push(Line::from(Span::styled(
                    GREETING_HINT,
                    Style::default().fg(Color::DarkGray),
                )));
            }
            TranscriptEntry::User {
                text: message,
                excluded_from_context,
            } => {
                let style = if *excluded_from_context {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                for (line_index, line) in message.lines().enumerate() {
                    let prefix = if line_index == 0 { "you: " } else { "     " };
                    lines.push(Line::from(vec![
                        Span::styled(prefix, style.fg(Color::Cyan)),
                        Span::styled(line.to_owned(), style),
                    ]));
                }
                if *excluded_from_context {
                    lines.push(Line::from(Span::styled(
                        "     (not sent as context)",
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
            TranscriptEntry::Assistant { segments, .. } => {
                lines.push(Line::from(Span::styled(
                    "assistant:",
                    Style::default().fg(Color::Green),
                )));
                let mut chart_index = 0;
                for segment in segments {
                    match segment {
                        Segment::Text(rich) => {
                            for rich_line in &rich.lines {
                                let indent = match rich_line.kind {
                                    LineKind::Bullet | LineKind::Numbered => "  ",
                                    LineKind::Plain => "",
                                };
                                let mut spans = vec![Span::raw(indent)];
                                spans.extend(rich_line.spans.iter().map(|span| {
                                    Span::styled(span.text.clone(), span_style(span.style))
                                }));
                                lines.push(Line::from(spans));
                            }
                        }
                        Segment::Chart(_) => {
                            let slot = ChartSlotId {
                                message: index,
                                index: chart_index,
                            };
                            chart_index += 1;
                            if let Some(chart) = chat.charts.get(slot) {
                                for row in &chart.rows {
                                    let style = row
                                        .color
                                        .map_or_else(Style::default, |color| {
                                            Style::default().fg(color)
                                        });
                                    lines.push(Line::from(Span::styled(row.text.clone(), style)));
                                }
                            }
                        }
                        Segment::ChartError(message) => {
                            lines.push(Line::from(Span::styled(
                                message.clone(),
                                Style::default().fg(Color::Red),
                            )));
                        }
                    }
                }
            }
            TranscriptEntry::Error(message) => {
                lines.push(Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
            TranscriptEntry::Thinking => {
                lines.push(Line::from(Span::styled(
                    "Thinking...",
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )));
            }
        }
        lines.push(Line::default());
    }
    lines
}

fn render_chat(frame: &mut ratatui::Frame<'_>, area: Rect, chat: &ChatUiState) {
    frame.render_widget(Clear, area);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(area);

    let transcript = Paragraph::new(chat_transcript_lines(chat)).wrap(Wrap { trim: false });
    let visible = parts[0].height.saturating_sub(2);
    // Wrapped rows, not source lines, decide how far the newest reply sits.
    let rows = transcript.line_count(parts[0].width.saturating_sub(2));
    let bottom = u16::try_from(rows).unwrap_or(u16::MAX).saturating_sub(visible);
    let scroll = bottom.saturating_sub(chat.scroll_back);
    let transcript = transcript
        .scroll((scroll, 0))
        .block(Block::default().title("assistant").borders(Borders::ALL));
    frame.render_widget(transcript, parts[0]);

    let title = if chat.session.in_flight() {
        "message (waiting for reply)"
    } else {
        "message"
    };
    let input = Paragraph::new(format!("> {}", chat.input))
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(input, parts[1]);
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Filter => "FILTER",
        AppMode::Form(_) => "FORM",
        AppMode::Confirm => "CONFIRM",
    };
    let hints = if view_data.confirm.is_some() {
        "y confirm | n cancel"
    } else if view_data.tags.editor.is_some() || matches!(state.mode, AppMode::Form(_)) {
        "enter save | esc cancel"
    } else if state.chat == ChatVisibility::Visible {
        "enter send | ctrl+l clear | ctrl+n new chat | esc hide"
    } else if state.mode == AppMode::Filter {
        "tab next | ←/→ choose | type to search | ctrl+r reset | esc done"
    } else if state.active_view == ViewKind::Tags {
        "f/b views | j/k move | enter open | a add | e edit | d delete | esc back | ctrl+q"
    } else {
        "f/b views | j/k rows | a add | e edit | d delete | / filter | r reset | R reload | @ chat | ctrl+q"
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
