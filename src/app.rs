use std::time::{Duration, Instant};

use anyhow::anyhow;
use ratatui::widgets::ListState;

use crate::config::Config;
use crate::webhook::{RequestPayload, WebhookClient};

/// Model identifiers the webhook knows how to dispatch to.
pub const MODEL_CATALOG: [&str; 5] = ["chatgpt", "claude", "gemini", "perplexity", "azure"];

/// Sent when the user has toggled everything off.
pub const DEFAULT_MODELS: [&str; 1] = ["chatgpt"];

/// Fixed reply for any failed request; the underlying error never reaches
/// the transcript.
pub const ERROR_REPLY: &str = "⚠️ Error contacting server.";

const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    pub at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Chat state
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub loading: bool,
    pub pending: Option<tokio::task::JoinHandle<anyhow::Result<String>>>,

    // Chat scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area, set during render
    pub chat_width: u16,  // inner width, for wrap calculations

    // Model selection
    pub selected_models: Vec<String>,
    pub show_model_picker: bool,
    pub model_picker_state: ListState,

    // Toast notifications
    pub toasts: Vec<Toast>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub webhook: WebhookClient,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let url = config.webhook_url().ok_or_else(|| {
            anyhow!(
                "no webhook URL configured; set LLMX_WEBHOOK_URL or add \"webhook_url\" to {}",
                Config::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "the llmx config.json".to_string())
            )
        })?;

        // Keep only identifiers the webhook actually knows, in saved order
        let selected_models: Vec<String> = config
            .default_models
            .unwrap_or_else(|| DEFAULT_MODELS.iter().map(|m| m.to_string()).collect())
            .into_iter()
            .filter(|m| MODEL_CATALOG.contains(&m.as_str()))
            .collect();

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            messages: Vec::new(),
            input: String::new(),
            cursor: 0,
            loading: false,
            pending: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            selected_models,
            show_model_picker: false,
            model_picker_state: ListState::default(),

            toasts: Vec::new(),

            animation_frame: 0,

            webhook: WebhookClient::new(&url),
        })
    }

    /// Takes the pending input and turns it into a request payload, or None
    /// when there is nothing to send. Blank input is ignored, and sends are
    /// serialized: nothing goes out while a request is in flight.
    ///
    /// On success the user's message is already in the transcript and
    /// `loading` is set; the caller owns spawning the actual request.
    pub fn submit(&mut self) -> Option<RequestPayload> {
        if self.input.trim().is_empty() || self.loading {
            return None;
        }

        let message = self.input.clone();
        self.messages.push(ChatMessage {
            sender: Sender::User,
            text: message.clone(),
        });
        self.input.clear();
        self.cursor = 0;
        self.loading = true;
        self.scroll_to_bottom();

        let models = if self.selected_models.is_empty() {
            DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
        } else {
            self.selected_models.clone()
        };

        Some(RequestPayload { message, models })
    }

    /// Lands the outcome of one request: exactly one bot message and one
    /// toast per completed send, success or not, and the session goes back
    /// to ready.
    pub fn finish_request(&mut self, result: anyhow::Result<String>) {
        let (text, toast, kind) = match result {
            Ok(reply) => (reply, "✅ Response received", ToastKind::Success),
            Err(_) => (ERROR_REPLY.to_string(), ERROR_REPLY, ToastKind::Error),
        };

        self.messages.push(ChatMessage {
            sender: Sender::Bot,
            text,
        });
        self.push_toast(toast, kind);
        self.loading = false;
        self.pending = None;
        self.scroll_to_bottom();
    }

    /// Collects the in-flight request task once it has finished. Called from
    /// the main loop on every tick.
    pub async fn reap_pending(&mut self) {
        let finished = self.pending.as_ref().map(|t| t.is_finished()).unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.pending.take() {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(anyhow!("request task failed: {}", e)),
            };
            self.finish_request(result);
        }
    }

    pub fn push_toast(&mut self, text: &str, kind: ToastKind) {
        self.toasts.push(Toast {
            text: text.to_string(),
            kind,
            at: Instant::now(),
        });
    }

    /// Tick animation frame and expire old toasts (called by Tick event)
    pub fn tick(&mut self) {
        if self.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.toasts.retain(|t| t.at.elapsed() < TOAST_TTL);
    }

    // Chat scrolling
    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll the transcript so the latest message (or "Thinking...") is
    /// visible.
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.messages {
            total_lines += 1; // Sender line ("You:" or "Bot:")
            for line in msg.text.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.loading {
            total_lines += 2; // "Bot:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    // Model picker methods
    pub fn open_model_picker(&mut self) {
        let current_idx = MODEL_CATALOG
            .iter()
            .position(|m| self.selected_models.iter().any(|s| s == m))
            .unwrap_or(0);
        self.model_picker_state.select(Some(current_idx));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = MODEL_CATALOG.len();
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Toggle the highlighted catalog entry in or out of the selection,
    /// preserving toggle order.
    pub fn toggle_selected_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = MODEL_CATALOG.get(i) {
                if let Some(pos) = self.selected_models.iter().position(|m| m == model) {
                    self.selected_models.remove(pos);
                } else {
                    self.selected_models.push(model.to_string());
                }
            }
        }
    }

    pub fn close_model_picker(&mut self) {
        self.show_model_picker = false;
    }

    pub fn is_model_selected(&self, model: &str) -> bool {
        self.selected_models.iter().any(|m| m == model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        App::new(Config {
            webhook_url: Some("http://localhost:9999/webhook".to_string()),
            default_models: None,
        })
        .unwrap()
    }

    #[test]
    fn test_submit_appends_user_message_and_sets_loading() {
        let mut app = test_app();
        app.input = "hello".to_string();

        let payload = app.submit().expect("payload");

        assert_eq!(payload.message, "hello");
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].sender, Sender::User);
        assert_eq!(app.messages[0].text, "hello");
        assert!(app.input.is_empty());
        assert!(app.loading);
    }

    #[test]
    fn test_blank_input_is_a_no_op() {
        let mut app = test_app();
        app.input = "   \t ".to_string();

        assert!(app.submit().is_none());
        assert!(app.messages.is_empty());
        assert!(!app.loading);
    }

    #[test]
    fn test_submit_while_loading_is_rejected() {
        let mut app = test_app();
        app.input = "first".to_string();
        app.submit().unwrap();

        app.input = "second".to_string();
        assert!(app.submit().is_none());
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.input, "second"); // input kept, not swallowed
    }

    #[test]
    fn test_empty_selection_falls_back_to_default_models() {
        let mut app = test_app();
        app.selected_models.clear();
        app.input = "hi".to_string();

        let payload = app.submit().unwrap();
        assert_eq!(payload.models, vec!["chatgpt".to_string()]);
    }

    #[test]
    fn test_selected_models_are_sent_in_toggle_order() {
        let mut app = test_app();
        app.selected_models = vec!["gemini".to_string(), "claude".to_string()];
        app.input = "hi".to_string();

        let payload = app.submit().unwrap();
        assert_eq!(payload.models, vec!["gemini".to_string(), "claude".to_string()]);
    }

    #[test]
    fn test_success_appends_one_bot_message() {
        let mut app = test_app();
        app.input = "hi".to_string();
        app.submit().unwrap();

        app.finish_request(Ok("the reply".to_string()));

        assert_eq!(app.messages.len(), 2);
        assert_eq!(app.messages[1].sender, Sender::Bot);
        assert_eq!(app.messages[1].text, "the reply");
        assert!(!app.loading);
        assert_eq!(app.toasts.len(), 1);
        assert_eq!(app.toasts[0].kind, ToastKind::Success);
    }

    #[test]
    fn test_failure_appends_fixed_error_reply() {
        let mut app = test_app();
        app.input = "hi".to_string();
        app.submit().unwrap();

        app.finish_request(Err(anyhow!("connection refused")));

        assert_eq!(app.messages.len(), 2);
        assert_eq!(app.messages[1].text, ERROR_REPLY);
        assert!(!app.loading);
        assert_eq!(app.toasts[0].kind, ToastKind::Error);
    }

    #[test]
    fn test_session_is_ready_again_after_failure() {
        let mut app = test_app();
        app.input = "first".to_string();
        app.submit().unwrap();
        app.finish_request(Err(anyhow!("boom")));

        app.input = "second".to_string();
        assert!(app.submit().is_some());
    }

    #[test]
    fn test_toggle_model_adds_and_removes() {
        let mut app = test_app();
        app.model_picker_state.select(Some(2)); // gemini

        app.toggle_selected_model();
        assert!(app.is_model_selected("gemini"));

        app.toggle_selected_model();
        assert!(!app.is_model_selected("gemini"));
    }

    #[test]
    fn test_unknown_saved_models_are_dropped() {
        let app = App::new(Config {
            webhook_url: Some("http://localhost:9999/webhook".to_string()),
            default_models: Some(vec!["claude".to_string(), "grok".to_string()]),
        })
        .unwrap();

        assert_eq!(app.selected_models, vec!["claude".to_string()]);
    }
}
