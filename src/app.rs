// src/app.rs
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::auth::{self, AuthError};
use crate::config::Config;
use crate::db;
use crate::responder::{Completion, GenerationRequest, MockResponder};
use crate::session::{
    demo_chats, display_time, ChatSummary, Choice, ConverterMode, CreditEntry, GenerationOptions, IdGenerator,
    Message, OptionField, SessionFlags, User,
};
use crate::summary::truncate_title;

#[derive(Debug)]
pub struct App {
    pub config: Config,
    pub db_pool: SqlitePool,
    pub messages: Vec<Message>,
    pub chats: Vec<ChatSummary>,
    pub active_chat_id: Option<String>,
    pub draft: String,
    pub uploaded_file: Option<String>,
    pub options: GenerationOptions,
    pub active_mode: Option<ConverterMode>,
    pub flags: SessionFlags,
    pub search_query: String,
    pub login_email: String,
    pub user: Option<User>,
    pub error: Option<String>,
    pub is_generating: bool,
    ids: IdGenerator,
    responder: MockResponder,
    completions: UnboundedReceiver<Completion>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let db_url = config.database_url();
        let db_pool = db::init_db(&db_url)
            .await
            .map_err(|e| anyhow::anyhow!("DB init failed for {}: {}", db_url, e))?;
        Self::with_pool(config, db_pool).await
    }

    pub async fn with_pool(config: Config, db_pool: SqlitePool) -> Result<Self> {
        let (responder, completions) = MockResponder::new(config.mock.clone());
        let mut app = App {
            config,
            db_pool,
            messages: Vec::new(),
            chats: demo_chats(),
            active_chat_id: None,
            draft: String::new(),
            uploaded_file: None,
            options: GenerationOptions::default(),
            active_mode: None,
            flags: SessionFlags::default(),
            search_query: String::new(),
            login_email: String::new(),
            user: None,
            error: None,
            is_generating: false,
            ids: IdGenerator::default(),
            responder,
            completions,
        };
        app.restore().await?;
        Ok(app)
    }

    async fn restore(&mut self) -> Result<()> {
        let pool = &self.db_pool;
        if let Some(dark) = db::load_json::<bool>(pool, db::DARK_MODE_KEY).await? {
            self.flags.dark_mode = dark;
        }
        if let Some(messages) = db::load_json(pool, db::MESSAGES_KEY).await? {
            self.messages = messages;
        }
        if let Some(chats) = db::load_json(pool, db::CHATS_KEY).await? {
            self.chats = chats;
        }
        if let Some(draft) = db::load_json(pool, db::DRAFT_KEY).await? {
            self.draft = draft;
        }
        self.active_chat_id = db::load_json::<Option<String>>(pool, db::ACTIVE_CHAT_KEY).await?.flatten();
        self.active_mode = db::load_json::<Option<String>>(pool, db::ACTIVE_MODE_KEY)
            .await?
            .flatten()
            .and_then(|id| ConverterMode::from_id(&id));
        if let Some(options) = db::load_json(pool, db::OPTIONS_KEY).await? {
            self.options = options;
        }

        if let Some(user) = db::load_json::<User>(pool, db::USER_KEY).await? {
            let credential_ok = match &user.credential {
                Some(token) => match auth::decode_identity_token(token, Utc::now()) {
                    Ok(_) => true,
                    Err(e) => {
                        log::error!("Stored identity for {} is no longer usable: {}", user.email, e);
                        false
                    }
                },
                None => true,
            };
            if credential_ok {
                self.user = Some(user);
            } else {
                db::remove_item(pool, db::USER_KEY).await?;
            }
        }

        self.seed_ids().await?;

        log::info!(
            "Restored session: {} chats, {} visible messages, signed in: {}",
            self.chats.len(),
            self.messages.len(),
            self.user.is_some()
        );
        Ok(())
    }

    /// Moves the id floor past every id already in the store.
    async fn seed_ids(&mut self) -> Result<()> {
        for key in db::list_keys(&self.db_pool).await? {
            if key.starts_with(db::CHAT_KEY_PREFIX) {
                for msg in db::load_json::<Vec<Message>>(&self.db_pool, &key).await?.unwrap_or_default() {
                    self.ids.observe(&msg.id);
                }
            }
        }
        for msg in &self.messages {
            self.ids.observe(&msg.id);
        }
        for chat in &self.chats {
            self.ids.observe(&chat.id);
        }
        if let Some(user) = &self.user {
            for entry in &user.credit_history {
                self.ids.observe(&entry.id);
            }
        }
        Ok(())
    }

    async fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = db::save_json(&self.db_pool, key, value).await {
            log::error!("Failed to persist '{}': {}", key, e);
        }
    }

    async fn forget(&self, key: &str) {
        if let Err(e) = db::remove_item(&self.db_pool, key).await {
            log::error!("Failed to remove '{}': {}", key, e);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_generating && (!self.draft.trim().is_empty() || self.uploaded_file.is_some())
    }

    /// Appends the user's message and schedules the mock response.
    /// Returns false when nothing was submitted.
    pub async fn submit(&mut self) -> bool {
        if self.is_generating {
            log::debug!("Submit ignored: a response is still pending");
            return false;
        }
        let text = if self.draft.trim().is_empty() {
            match &self.uploaded_file {
                Some(name) => format!("Processing {}...", name),
                None => return false,
            }
        } else {
            self.draft.clone()
        };

        let mut charged = false;
        if let (Some(user), Some(mode)) = (self.user.as_mut(), self.active_mode) {
            let cost = mode.credit_cost();
            if cost > 0 {
                if user.credits < cost {
                    self.error = Some(format!("Not enough credits for {}", mode.label()));
                    return false;
                }
                user.credits -= cost;
                user.credit_history.insert(0, CreditEntry {
                    id: self.ids.next_id(),
                    mode,
                    points: cost,
                    date: display_time(Utc::now()),
                });
                charged = true;
            }
        }

        self.messages.push(Message::user_text(self.ids.next_id(), text.clone(), self.options));

        let chat = ChatSummary {
            id: self.ids.next_id(),
            title: truncate_title(&text),
            preview: text.clone(),
            date: display_time(Utc::now()),
        };
        let chat_id = chat.id.clone();
        self.chats.insert(0, chat);
        self.active_chat_id = Some(chat_id.clone());
        self.draft.clear();
        self.uploaded_file = None;
        self.flags.input_expanded = false;
        self.error = None;
        self.is_generating = true;

        self.persist(db::MESSAGES_KEY, &self.messages).await;
        self.persist(&db::chat_key(&chat_id), &self.messages).await;
        self.persist(db::CHATS_KEY, &self.chats).await;
        self.persist(db::ACTIVE_CHAT_KEY, &self.active_chat_id).await;
        self.persist(db::DRAFT_KEY, &self.draft).await;
        if charged {
            self.persist(db::USER_KEY, &self.user).await;
        }

        log::info!("Submitted to chat {} (mode: {:?})", chat_id, self.active_mode);
        self.responder.schedule(GenerationRequest {
            chat_id,
            prompt: text,
            options: self.options,
            mode: self.active_mode,
        });
        true
    }

    /// Lands a mock response in the chat it was requested from.
    pub async fn apply_completion(&mut self, completion: Completion) {
        self.is_generating = false;
        let message = Message::generated(self.ids.next_id(), completion.kind, completion.content);
        let key = db::chat_key(&completion.chat_id);

        if self.active_chat_id.as_deref() == Some(completion.chat_id.as_str()) {
            self.messages.push(message);
            self.persist(db::MESSAGES_KEY, &self.messages).await;
            self.persist(&key, &self.messages).await;
        } else if self.chats.iter().any(|c| c.id == completion.chat_id) {
            log::info!("Response for background chat {} stored without display", completion.chat_id);
            let mut stored: Vec<Message> = match db::load_json(&self.db_pool, &key).await {
                Ok(v) => v.unwrap_or_default(),
                Err(e) => {
                    log::error!("Failed to read '{}': {}", key, e);
                    Vec::new()
                }
            };
            stored.push(message);
            self.persist(&key, &stored).await;
        } else {
            log::info!("Discarding response for deleted chat {}", completion.chat_id);
        }
    }

    /// Applies every response that has already arrived. Never blocks.
    pub async fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.apply_completion(completion).await;
            applied += 1;
        }
        applied
    }

    pub async fn wait_for_completion(&mut self) -> bool {
        match self.completions.recv().await {
            Some(completion) => {
                self.apply_completion(completion).await;
                true
            }
            None => false,
        }
    }

    pub async fn new_chat(&mut self) {
        self.messages.clear();
        self.draft.clear();
        self.uploaded_file = None;
        self.active_chat_id = None;
        self.flags.sidebar_open = false;
        self.flags.input_expanded = false;
        self.persist(db::MESSAGES_KEY, &self.messages).await;
        self.persist(db::DRAFT_KEY, &self.draft).await;
        self.persist(db::ACTIVE_CHAT_KEY, &self.active_chat_id).await;
        log::info!("Started a new chat");
    }

    pub async fn select_chat(&mut self, chat_id: &str) -> bool {
        if !self.chats.iter().any(|c| c.id == chat_id) {
            log::warn!("Attempted to open non-existent chat {}", chat_id);
            return false;
        }
        let key = db::chat_key(chat_id);
        self.messages = match db::load_json(&self.db_pool, &key).await {
            Ok(v) => v.unwrap_or_default(),
            Err(e) => {
                log::error!("Failed to read '{}': {}", key, e);
                Vec::new()
            }
        };
        self.active_chat_id = Some(chat_id.to_string());
        self.flags.sidebar_open = false;
        self.persist(db::MESSAGES_KEY, &self.messages).await;
        self.persist(db::ACTIVE_CHAT_KEY, &self.active_chat_id).await;
        log::info!("Switched to chat {} ({} messages)", chat_id, self.messages.len());
        true
    }

    pub async fn delete_chat(&mut self, chat_id: &str) {
        self.chats.retain(|c| c.id != chat_id);
        self.forget(&db::chat_key(chat_id)).await;
        if self.active_chat_id.as_deref() == Some(chat_id) {
            self.active_chat_id = None;
            self.messages.clear();
            self.persist(db::MESSAGES_KEY, &self.messages).await;
            self.persist(db::ACTIVE_CHAT_KEY, &self.active_chat_id).await;
        }
        self.persist(db::CHATS_KEY, &self.chats).await;
        log::info!("Deleted chat {}", chat_id);
    }

    pub fn filtered_chats(&self) -> Vec<&ChatSummary> {
        self.chats.iter().filter(|c| c.matches(&self.search_query)).collect()
    }

    pub fn set_search_query(&mut self, query: String) {
        self.search_query = query;
    }

    pub async fn toggle_dark_mode(&mut self) {
        self.flags.dark_mode = !self.flags.dark_mode;
        self.persist(db::DARK_MODE_KEY, &self.flags.dark_mode).await;
    }

    pub fn toggle_sidebar(&mut self) {
        self.flags.sidebar_open = !self.flags.sidebar_open;
    }

    pub fn close_sidebar(&mut self) {
        self.flags.sidebar_open = false;
    }

    pub fn set_input_expanded(&mut self, expanded: bool) {
        self.flags.input_expanded = expanded;
    }

    pub fn open_auth_modal(&mut self) {
        if self.user.is_none() {
            self.flags.auth_modal_open = true;
        }
    }

    pub fn close_auth_modal(&mut self) {
        self.flags.auth_modal_open = false;
        self.login_email.clear();
        self.error = None;
    }

    pub fn toggle_profile(&mut self) {
        self.flags.profile_open = self.user.is_some() && !self.flags.profile_open;
    }

    pub fn set_login_email(&mut self, email: String) {
        self.login_email = email;
        self.error = None;
    }

    pub async fn set_draft(&mut self, draft: String) {
        self.draft = draft;
        self.error = None;
        self.persist(db::DRAFT_KEY, &self.draft).await;
    }

    pub async fn push_draft_char(&mut self, c: char) {
        self.draft.push(c);
        self.error = None;
        self.persist(db::DRAFT_KEY, &self.draft).await;
    }

    pub async fn pop_draft_char(&mut self) {
        self.error = None;
        if self.draft.pop().is_some() {
            self.persist(db::DRAFT_KEY, &self.draft).await;
        }
    }

    /// Only the file name is kept; the file itself is never read.
    pub async fn attach_file(&mut self, path: &str) -> bool {
        let Some(name) = Path::new(path.trim()).file_name().map(|n| n.to_string_lossy().to_string()) else {
            return false;
        };
        self.draft = format!("Processing {}...", name);
        self.uploaded_file = Some(name);
        self.flags.input_expanded = true;
        self.persist(db::DRAFT_KEY, &self.draft).await;
        true
    }

    pub async fn remove_file(&mut self) {
        self.uploaded_file = None;
        self.draft.clear();
        self.persist(db::DRAFT_KEY, &self.draft).await;
    }

    pub async fn set_converter_mode(&mut self, mode: Option<ConverterMode>) {
        self.active_mode = mode;
        self.error = None;
        self.persist(db::ACTIVE_MODE_KEY, &mode.map(|m| m.id())).await;
    }

    /// Steps through no mode, then each converter mode in turn.
    pub async fn cycle_converter_mode(&mut self) {
        let next = match self.active_mode {
            None => Some(ConverterMode::Summary),
            Some(ConverterMode::Sign) => None,
            Some(mode) => Some(mode.next()),
        };
        self.set_converter_mode(next).await;
    }

    pub async fn cycle_option(&mut self, field: OptionField, forward: bool) {
        self.options.cycle(field, forward);
        self.persist(db::OPTIONS_KEY, &self.options).await;
    }

    pub async fn login_with_email(&mut self) -> bool {
        match auth::user_from_email(&self.login_email, self.config.auth.starting_credits) {
            Ok(user) => {
                log::info!("Signed in as {}", user.email);
                self.user = Some(user);
                self.persist(db::USER_KEY, &self.user).await;
                self.close_auth_modal();
                true
            }
            Err(e) => {
                self.error = Some(e.to_string());
                false
            }
        }
    }

    pub async fn login_with_identity_token(&mut self, token: &str) -> Result<(), AuthError> {
        match auth::user_from_token(token, self.config.auth.starting_credits, Utc::now()) {
            Ok(user) => {
                log::info!("Signed in with identity token as {}", user.email);
                self.user = Some(user);
                self.persist(db::USER_KEY, &self.user).await;
                self.close_auth_modal();
                Ok(())
            }
            Err(e) => {
                log::error!("Identity sign-in failed: {}", e);
                self.user = None;
                self.forget(db::USER_KEY).await;
                self.error = Some(format!("Sign-in failed: {}", e));
                Err(e)
            }
        }
    }

    /// Wipes every stored key and returns to a fresh signed-out session.
    pub async fn logout(&mut self) {
        match db::list_keys(&self.db_pool).await {
            Ok(keys) => log::debug!("Clearing {} stored keys: {:?}", keys.len(), keys),
            Err(e) => log::warn!("Could not list stored keys: {}", e),
        }
        if let Err(e) = db::clear_items(&self.db_pool).await {
            log::error!("Failed to clear storage on logout: {}", e);
        }
        self.messages.clear();
        self.chats = demo_chats();
        self.active_chat_id = None;
        self.draft.clear();
        self.uploaded_file = None;
        self.options = GenerationOptions::default();
        self.active_mode = None;
        self.flags = SessionFlags::default();
        self.search_query.clear();
        self.login_email.clear();
        self.user = None;
        self.error = None;
        log::info!("Signed out and cleared local state");
    }
}
