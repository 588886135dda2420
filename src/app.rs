use std::sync::Arc;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use docassist::api::{ApiError, ProgressFn};
use docassist::backend::Backend;
use docassist::chart::{ChartPayload, ChartViewer};
use docassist::chat::ChatWindow;
use docassist::files;
use docassist::input::TextInput;
use docassist::notify::Notifier;
use docassist::state::{now_millis, ChatResponse, UploadResponse};
use docassist::suggestions::SuggestedQuestions;
use docassist::upload::{UploadEvent, UploadPanel};

type ApiTask<T> = JoinHandle<Result<T, ApiError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Upload,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Messages,
    Suggestions,
    Input,
}

/// Modal text prompts drawn over the current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    AddFiles,
    ChartPrompt,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub popup: Option<Popup>,
    pub notifier: Notifier,

    // Upload screen
    pub upload: UploadPanel,
    pub path_input: TextInput,
    pub files_state: ListState,
    pub uploaded_file_ids: Vec<String>,

    // Chat screen
    pub chat: ChatWindow,
    pub chart_viewer: ChartViewer,
    pub suggestions_state: ListState,
    pub chat_scroll: u16,
    pub follow_chat: bool, // keep the newest message in view

    // Background requests
    pub backend: Backend,
    pub upload_task: Option<ApiTask<UploadResponse>>,
    pub progress_rx: Option<mpsc::UnboundedReceiver<u8>>,
    pub chat_task: Option<ApiTask<ChatResponse>>,
    pub chart_task: Option<ApiTask<ChatResponse>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub files_area: Option<Rect>,
    pub chat_area: Option<Rect>,
    pub suggestions_area: Option<Rect>,
    pub input_area: Option<Rect>,
}

impl App {
    pub fn new(backend: Backend) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Upload,
            input_mode: InputMode::Normal,
            focus: FocusPane::Messages,
            popup: None,
            notifier: Notifier::default(),
            upload: UploadPanel::new(),
            path_input: TextInput::new(),
            files_state: ListState::default(),
            uploaded_file_ids: Vec::new(),
            chat: ChatWindow::new(),
            chart_viewer: ChartViewer::new(),
            suggestions_state: ListState::default(),
            chat_scroll: 0,
            follow_chat: true,
            backend,
            upload_task: None,
            progress_rx: None,
            chat_task: None,
            chart_task: None,
            animation_frame: 0,
            files_area: None,
            chat_area: None,
            suggestions_area: None,
            input_area: None,
        }
    }

    pub fn switch_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.popup = None;
        self.input_mode = InputMode::Normal;
        self.focus = FocusPane::Messages;
        self.chat.blur_input();
    }

    // Upload screen

    pub fn open_add_files(&mut self) {
        if self.upload.is_uploading() {
            return;
        }
        self.popup = Some(Popup::AddFiles);
        self.input_mode = InputMode::Editing;
    }

    /// Add every accepted file named in the path prompt
    pub fn add_paths_from_input(&mut self) {
        let raw = self.path_input.take();
        let paths = files::split_path_list(&raw);
        let selected = files::select_paths(&paths);
        let added = self.upload.add_files(selected, &mut self.notifier);
        tracing::debug!(requested = paths.len(), added, "files added to upload set");
        if added > 0 && self.files_state.selected().is_none() {
            self.files_state.select(Some(0));
        }
        self.close_popup();
    }

    pub fn files_nav_down(&mut self) {
        let len = self.upload.files().len();
        if len > 0 {
            let i = self.files_state.selected().unwrap_or(0);
            self.files_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn files_nav_up(&mut self) {
        let i = self.files_state.selected().unwrap_or(0);
        self.files_state.select(Some(i.saturating_sub(1)));
    }

    pub fn remove_selected_file(&mut self) {
        if let Some(i) = self.files_state.selected() {
            if self.upload.remove_file(i).is_some() {
                let len = self.upload.files().len();
                if len == 0 {
                    self.files_state.select(None);
                } else if i >= len {
                    self.files_state.select(Some(len - 1));
                }
            }
        }
    }

    pub fn clear_files(&mut self) {
        if self.upload.clear_all() {
            self.files_state.select(None);
        }
    }

    pub fn start_upload(&mut self) {
        let Some(files) = self.upload.begin_upload(&mut self.notifier) else {
            return;
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let on_progress: ProgressFn = Arc::new(move |pct: u8| {
            let _ = tx.send(pct);
        });
        self.progress_rx = Some(rx);

        let backend = self.backend.clone();
        self.upload_task = Some(tokio::spawn(async move {
            backend.upload_files(&files, Some(on_progress)).await
        }));
    }

    fn on_upload_event(&mut self, event: UploadEvent) {
        match event {
            UploadEvent::Completed { file_ids, message } => {
                tracing::info!(count = file_ids.len(), %message, "upload complete");
                self.uploaded_file_ids.extend(file_ids);
                self.files_state.select(None);
            }
        }
    }

    // Chat screen

    pub fn start_editing_chat(&mut self) {
        self.focus = FocusPane::Input;
        self.input_mode = InputMode::Editing;
        self.chat.focus_input();
    }

    pub fn stop_editing_chat(&mut self) {
        self.focus = FocusPane::Messages;
        self.input_mode = InputMode::Normal;
        self.chat.blur_input();
    }

    pub fn send_message(&mut self) {
        let Some(request) = self.chat.submit(now_millis()) else {
            return;
        };

        self.suggestions_state.select(None);
        if self.focus == FocusPane::Suggestions {
            self.focus = FocusPane::Messages;
        }
        self.follow_chat = true;

        let backend = self.backend.clone();
        self.chat_task = Some(tokio::spawn(async move {
            backend.send_chat_message(&request.message, &request.history).await
        }));
    }

    pub fn suggestions(&self) -> SuggestedQuestions<'_> {
        match self.chat.attachments() {
            Some(extras) => SuggestedQuestions::new(extras.follow_ups),
            None => SuggestedQuestions::new(&[]),
        }
    }

    /// Chart shown under the latest assistant message, if any
    pub fn attached_chart(&self) -> Option<&ChartPayload> {
        self.chat.attachments().and_then(|extras| extras.chart)
    }

    pub fn suggestions_nav_down(&mut self) {
        let len = self.suggestions().len();
        if len > 0 {
            let i = self.suggestions_state.selected().unwrap_or(0);
            self.suggestions_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn suggestions_nav_up(&mut self) {
        let i = self.suggestions_state.selected().unwrap_or(0);
        self.suggestions_state.select(Some(i.saturating_sub(1)));
    }

    pub fn apply_suggestion(&mut self, index: usize) {
        let Some(question) = self.suggestions().click(index).cloned() else {
            return;
        };
        self.chat.apply_follow_up(&question);
        self.focus = FocusPane::Input;
        self.input_mode = InputMode::Editing;
    }

    pub fn apply_selected_suggestion(&mut self) {
        if let Some(i) = self.suggestions_state.selected() {
            self.apply_suggestion(i);
        }
    }

    /// Tab cycles messages -> suggestions (when shown) -> messages
    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Messages if self.suggestions().is_visible() => {
                if self.suggestions_state.selected().is_none() {
                    self.suggestions_state.select(Some(0));
                }
                FocusPane::Suggestions
            }
            _ => FocusPane::Messages,
        };
    }

    pub fn scroll_chat_down(&mut self) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_chat_up(&mut self) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn open_chart_prompt(&mut self) {
        if matches!(self.attached_chart(), Some(ChartPayload::Series(_))) {
            self.popup = Some(Popup::ChartPrompt);
            self.input_mode = InputMode::Editing;
        }
    }

    pub fn start_regenerate(&mut self) {
        let Some(prompt) = self.chart_viewer.begin_regenerate(&mut self.notifier) else {
            return;
        };
        self.close_popup();

        let backend = self.backend.clone();
        self.chart_task = Some(tokio::spawn(async move {
            backend.generate_chart(&prompt, None).await
        }));
    }

    pub fn open_chart_image(&mut self) {
        let Some(ChartPayload::Image(url)) = self.attached_chart() else {
            return;
        };
        let url = url.clone();
        if let Err(e) = open::that_detached(&url) {
            tracing::warn!(error = %e, %url, "failed to open chart image");
            self.notifier.error("Could not open chart image", Some(e.to_string()));
        }
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
        self.input_mode = if self.focus == FocusPane::Input {
            InputMode::Editing
        } else {
            InputMode::Normal
        };
    }

    // Background work

    /// Apply progress updates and the results of any finished requests
    pub async fn poll_tasks(&mut self) {
        if let Some(rx) = self.progress_rx.as_mut() {
            while let Ok(pct) = rx.try_recv() {
                self.upload.set_progress(pct);
            }
        }

        if let Some(task) = take_finished(&mut self.upload_task) {
            let result = flatten(task.await);
            self.progress_rx = None;
            if let Some(event) = self.upload.finish_upload(result, &mut self.notifier) {
                self.on_upload_event(event);
            }
        }

        if let Some(task) = take_finished(&mut self.chat_task) {
            let result = flatten(task.await);
            self.chat.receive(result, &mut self.notifier);
            self.follow_chat = true;
        }

        if let Some(task) = take_finished(&mut self.chart_task) {
            let result = flatten(task.await);
            if let Some(event) = self.chart_viewer.finish_regenerate(result, &mut self.notifier) {
                self.chat.apply_chart_event(event);
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.upload_task.is_some() || self.chat_task.is_some() || self.chart_task.is_some()
    }

    pub fn tick(&mut self) {
        self.tick_animation();
        self.notifier.tick();
    }

    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;
    }
}

fn take_finished<T>(slot: &mut Option<JoinHandle<T>>) -> Option<JoinHandle<T>> {
    if slot.as_ref().is_some_and(|task| task.is_finished()) {
        slot.take()
    } else {
        None
    }
}

fn flatten<T>(joined: Result<Result<T, ApiError>, JoinError>) -> Result<T, ApiError> {
    joined.unwrap_or_else(|e| Err(ApiError::Task(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docassist::api::ApiClient;
    use docassist::chart::ChartKind;
    use docassist::mock::MockBackend;
    use docassist::notify::Level;
    use std::time::Duration;

    fn app() -> App {
        App::new(Backend::Mock(MockBackend::new(Duration::ZERO)))
    }

    async fn settle(app: &mut App) {
        for _ in 0..200 {
            app.poll_tasks().await;
            if !app.is_busy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("background tasks did not finish");
    }

    #[tokio::test]
    async fn test_chat_round_trip_through_tasks() {
        let mut app = app();
        app.switch_screen(Screen::Chat);
        app.chat.input.set("show me a bar chart of revenue");
        app.send_message();
        assert!(app.chat.is_waiting());
        settle(&mut app).await;

        assert_eq!(app.chat.messages().len(), 2);
        match app.attached_chart() {
            Some(ChartPayload::Series(series)) => assert_eq!(series.kind, ChartKind::Bar),
            other => panic!("expected series chart, got {:?}", other),
        }
        assert_eq!(app.suggestions().len(), 3);
    }

    #[tokio::test]
    async fn test_suggestion_fills_input_and_focuses() {
        let mut app = app();
        app.chat.input.set("hello");
        app.send_message();
        settle(&mut app).await;

        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Suggestions);
        app.suggestions_nav_down();
        app.apply_selected_suggestion();

        assert_eq!(app.chat.input.value(), "What are the key trends in the data?");
        assert_eq!(app.focus, FocusPane::Input);
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.chat.messages().len(), 2);
        assert!(app.chat_task.is_none());
    }

    #[tokio::test]
    async fn test_regenerate_replaces_chart() {
        let mut app = app();
        app.chat.input.set("plot revenue");
        app.send_message();
        settle(&mut app).await;

        app.open_chart_prompt();
        assert_eq!(app.popup, Some(Popup::ChartPrompt));
        app.chart_viewer.prompt.set("line chart please");
        app.start_regenerate();
        assert!(app.popup.is_none());
        settle(&mut app).await;

        match app.attached_chart() {
            Some(ChartPayload::Series(series)) => assert_eq!(series.kind, ChartKind::Line),
            other => panic!("expected series chart, got {:?}", other),
        }
        assert_eq!(app.notifier.latest().unwrap().title, "Chart regenerated successfully");
        assert!(!app.chart_viewer.is_regenerating());
    }

    #[tokio::test]
    async fn test_failed_regenerate_keeps_previous_chart() {
        let mut app = app();
        app.chat.input.set("show me a bar chart of revenue");
        app.send_message();
        settle(&mut app).await;
        let before = app.attached_chart().cloned();
        assert!(matches!(before, Some(ChartPayload::Series(_))));

        // Nothing listens on the discard port
        app.backend = Backend::Http(ApiClient::new("http://127.0.0.1:9"));
        app.open_chart_prompt();
        app.chart_viewer.prompt.set("line chart please");
        app.start_regenerate();
        settle(&mut app).await;

        assert_eq!(app.attached_chart().cloned(), before);
        let toast = app.notifier.latest().unwrap();
        assert_eq!(toast.level, Level::Error);
        assert_eq!(toast.title, "Failed to regenerate chart");
        assert!(!app.chart_viewer.is_regenerating());
    }

    #[tokio::test]
    async fn test_empty_regenerate_prompt_warns() {
        let mut app = app();
        app.chat.input.set("graph it");
        app.send_message();
        settle(&mut app).await;

        app.open_chart_prompt();
        app.start_regenerate();
        assert!(app.chart_task.is_none());
        assert_eq!(app.popup, Some(Popup::ChartPrompt));
        assert_eq!(app.notifier.latest().unwrap().level, Level::Warning);
    }

    #[tokio::test]
    async fn test_upload_from_path_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("notes.exe"), b"MZ").unwrap();

        let mut app = app();
        app.open_add_files();
        app.path_input.set(&dir.path().display().to_string());
        app.add_paths_from_input();
        assert_eq!(app.upload.files().len(), 1);
        assert_eq!(app.files_state.selected(), Some(0));
        assert_eq!(app.input_mode, InputMode::Normal);

        app.start_upload();
        assert!(app.upload.is_uploading());
        settle(&mut app).await;

        assert!(app.upload.files().is_empty());
        assert!(!app.upload.is_uploading());
        assert_eq!(app.uploaded_file_ids.len(), 1);
        assert_eq!(app.notifier.latest().unwrap().title, "Upload complete!");
    }

    #[test]
    fn test_remove_selected_adjusts_selection() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let mut app = app();
        app.path_input.set(&dir.path().display().to_string());
        app.add_paths_from_input();
        app.files_nav_down();
        app.remove_selected_file();
        assert_eq!(app.files_state.selected(), Some(0));
        app.remove_selected_file();
        assert_eq!(app.files_state.selected(), None);
        assert!(app.upload.files().is_empty());
    }
}
