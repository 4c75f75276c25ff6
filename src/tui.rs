// src/tui.rs
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

use crate::app::App;
use crate::session::{Choice, MessageKind, OptionField};
use crate::summary::{drop_last_word, username_from_email, word_count};

#[derive(Debug, Clone, Copy)]
struct Palette {
    fg: Color,
    bg: Color,
    dim: Color,
    accent: Color,
    panel: Color,
}

impl Palette {
    fn for_mode(dark: bool) -> Self {
        if dark {
            Palette { fg: Color::White, bg: Color::Black, dim: Color::DarkGray, accent: Color::LightBlue, panel: Color::Rgb(31, 41, 55) }
        } else {
            Palette { fg: Color::Black, bg: Color::White, dim: Color::Gray, accent: Color::Blue, panel: Color::Rgb(243, 244, 246) }
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }
}

/// Presentation-only state that never reaches the store.
#[derive(Debug, Default)]
struct ViewState {
    sidebar: ListState,
    option_focus: usize,
    file_prompt: Option<String>,
}

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    view: ViewState,
}

impl Tui {
    pub fn new() -> io::Result<Self> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal, view: ViewState::default() })
    }

    fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
        let popup_layout = Layout::default().direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]).split(r);
        Layout::default().direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]).split(popup_layout[1])[1]
    }

    pub async fn run_loop(&mut self, app: &mut App) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
        log::info!("TUI run loop started.");

        let result = self.event_loop(app).await;

        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(self.terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        result
    }

    async fn event_loop(&mut self, app: &mut App) -> io::Result<()> {
        loop {
            let applied = app.drain_completions().await;
            if applied > 0 {
                log::debug!("Applied {} mock responses", applied);
            }

            let view = &mut self.view;
            self.terminal.draw(|f| draw(f, &*app, view))?;

            if event::poll(Duration::from_millis(100))? {
                if let CrosstermEvent::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if handle_key(&mut self.view, app, key).await {
                        log::info!("Quit requested, exiting TUI loop.");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Routes a key press to the topmost surface. Returns true to quit.
async fn handle_key(view: &mut ViewState, app: &mut App, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c')) {
        return true;
    }

    if let Some(path) = view.file_prompt.as_mut() {
        match key.code {
            KeyCode::Esc => view.file_prompt = None,
            KeyCode::Enter => {
                let path = std::mem::take(path);
                view.file_prompt = None;
                if !app.attach_file(&path).await {
                    log::warn!("Nothing to attach from {:?}", path);
                }
            }
            KeyCode::Backspace => { path.pop(); }
            KeyCode::Char(c) if !ctrl => path.push(c),
            _ => {}
        }
        return false;
    }

    if app.flags.auth_modal_open {
        match key.code {
            KeyCode::Esc => app.close_auth_modal(),
            KeyCode::Enter => { app.login_with_email().await; }
            KeyCode::Char('g') if ctrl => {
                let token = app.login_email.clone();
                // Failures are surfaced inline through app.error.
                let _ = app.login_with_identity_token(&token).await;
            }
            KeyCode::Backspace => {
                let mut email = app.login_email.clone();
                email.pop();
                app.set_login_email(email);
            }
            KeyCode::Char(c) if !ctrl => {
                let mut email = app.login_email.clone();
                email.push(c);
                app.set_login_email(email);
            }
            _ => {}
        }
        return false;
    }

    if app.flags.profile_open {
        if key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('p')) {
            app.toggle_profile();
        }
        return false;
    }

    if app.flags.sidebar_open && handle_sidebar_key(view, app, key, ctrl).await {
        return false;
    }

    match key.code {
        KeyCode::Char('n') if ctrl => app.new_chat().await,
        KeyCode::Char('b') if ctrl => {
            app.toggle_sidebar();
            view.sidebar.select(if app.filtered_chats().is_empty() { None } else { Some(0) });
        }
        KeyCode::Char('t') if ctrl => app.toggle_dark_mode().await,
        KeyCode::Char('l') if ctrl => app.open_auth_modal(),
        KeyCode::Char('u') if ctrl => {
            if app.is_authenticated() {
                app.logout().await;
            }
        }
        KeyCode::Char('p') if ctrl => app.toggle_profile(),
        KeyCode::Char('o') if ctrl => view.file_prompt = Some(String::new()),
        KeyCode::Char('r') if ctrl => app.remove_file().await,
        KeyCode::Char('e') if ctrl => app.set_input_expanded(!app.flags.input_expanded),
        KeyCode::Char('k') if ctrl => app.cycle_converter_mode().await,
        KeyCode::Char('w') if ctrl => {
            let kept = drop_last_word(&app.draft);
            app.set_draft(kept).await;
        }
        KeyCode::Tab if app.flags.input_expanded => {
            view.option_focus = (view.option_focus + 1) % OptionField::ALL.len();
        }
        KeyCode::BackTab if app.flags.input_expanded => {
            view.option_focus = (view.option_focus + OptionField::ALL.len() - 1) % OptionField::ALL.len();
        }
        KeyCode::Left | KeyCode::Right if app.flags.input_expanded => {
            let field = OptionField::ALL[view.option_focus];
            app.cycle_option(field, key.code == KeyCode::Right).await;
        }
        KeyCode::Enter => { app.submit().await; }
        KeyCode::Esc => app.set_input_expanded(false),
        KeyCode::Backspace => app.pop_draft_char().await,
        KeyCode::Char(c) if !ctrl => {
            app.set_input_expanded(true);
            app.push_draft_char(c).await;
        }
        _ => {}
    }
    false
}

/// Returns true when the sidebar consumed the key.
async fn handle_sidebar_key(view: &mut ViewState, app: &mut App, key: KeyEvent, ctrl: bool) -> bool {
    let visible: Vec<String> = app.filtered_chats().iter().map(|c| c.id.clone()).collect();
    let selected = view.sidebar.selected();
    match key.code {
        KeyCode::Esc => app.close_sidebar(),
        KeyCode::Up => {
            let next = selected.map_or(0, |i| i.saturating_sub(1));
            view.sidebar.select((!visible.is_empty()).then_some(next));
        }
        KeyCode::Down => {
            let next = selected.map_or(0, |i| (i + 1).min(visible.len().saturating_sub(1)));
            view.sidebar.select((!visible.is_empty()).then_some(next));
        }
        KeyCode::Enter => {
            if let Some(id) = selected.and_then(|i| visible.get(i)) {
                app.select_chat(id).await;
            }
        }
        KeyCode::Delete => {
            if let Some(id) = selected.and_then(|i| visible.get(i)) {
                app.delete_chat(id).await;
                let remaining = app.filtered_chats().len();
                view.sidebar.select(if remaining == 0 { None } else { Some(selected.unwrap_or(0).min(remaining - 1)) });
            }
        }
        KeyCode::Backspace => {
            let mut query = app.search_query.clone();
            query.pop();
            app.set_search_query(query);
            view.sidebar.select(Some(0));
        }
        KeyCode::Char(c) if !ctrl => {
            let mut query = app.search_query.clone();
            query.push(c);
            app.set_search_query(query);
            view.sidebar.select(Some(0));
        }
        _ => return false,
    }
    true
}

fn draw(f: &mut Frame, app: &App, view: &mut ViewState) {
    let palette = Palette::for_mode(app.flags.dark_mode);
    f.render_widget(Block::default().style(palette.base()), f.area());

    let input_height = if app.flags.input_expanded { 12 } else { 3 };
    let rows = Layout::default().direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3), Constraint::Length(input_height)])
        .split(f.area());

    draw_header(f, app, palette, rows[0]);

    let body = if app.flags.sidebar_open {
        let cols = Layout::default().direction(Direction::Horizontal)
            .constraints([Constraint::Length(36), Constraint::Min(20)])
            .split(rows[1]);
        draw_sidebar(f, app, palette, &mut view.sidebar, cols[0]);
        cols[1]
    } else {
        rows[1]
    };
    draw_messages(f, app, palette, body);
    draw_input(f, app, palette, view.option_focus, rows[2]);

    if app.flags.auth_modal_open {
        draw_auth_modal(f, app, palette);
    }
    if app.flags.profile_open {
        draw_profile(f, app, palette);
    }
    if let Some(path) = &view.file_prompt {
        draw_file_prompt(f, path, palette);
    }
}

fn draw_header(f: &mut Frame, app: &App, palette: Palette, area: Rect) {
    let account = match &app.user {
        Some(user) => format!("@{} ({} credits)", user.username, user.credits),
        None => "Ctrl+L login".to_string(),
    };
    let mode = app.active_mode.map_or("image/video", |m| m.label());
    let line = Line::from(vec![
        Span::styled(" SumUpAI ", Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)),
        Span::styled(format!(" mode: {} ", mode), Style::default().fg(palette.dim)),
        Span::styled(format!(" {} ", if app.flags.dark_mode { "☾" } else { "☼" }), Style::default().fg(palette.fg)),
        Span::styled(account, Style::default().fg(palette.fg)),
    ]);
    f.render_widget(Paragraph::new(line).style(palette.base()), area);
}

fn draw_sidebar(f: &mut Frame, app: &App, palette: Palette, state: &mut ListState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Chats")
        .style(Style::default().fg(palette.fg).bg(palette.panel));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default().direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let search = if app.search_query.is_empty() { "Search chats...".to_string() } else { app.search_query.clone() };
    f.render_widget(Paragraph::new(format!("⌕ {}", search)).style(Style::default().fg(palette.dim)), parts[0]);

    let items: Vec<ListItem> = app.filtered_chats().into_iter().map(|chat| {
        let marker = if app.active_chat_id.as_deref() == Some(chat.id.as_str()) { "● " } else { "  " };
        ListItem::new(vec![
            Line::from(Span::styled(format!("{}{}", marker, chat.title), Style::default().add_modifier(Modifier::BOLD))),
            Line::from(Span::styled(format!("  {}", chat.preview), Style::default().fg(palette.dim))),
            Line::from(Span::styled(format!("  {}", chat.date), Style::default().fg(palette.dim))),
        ])
    }).collect();
    let list = List::new(items).highlight_style(Style::default().fg(palette.accent).add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, parts[1], state);

    f.render_widget(
        Paragraph::new("Enter open · Del delete · Ctrl+N new").style(Style::default().fg(palette.dim)),
        parts[2],
    );
}

fn draw_messages(f: &mut Frame, app: &App, palette: Palette, area: Rect) {
    if app.messages.is_empty() && !app.flags.input_expanded {
        let welcome = vec![
            Line::from(Span::styled("SumUpAI", Style::default().fg(palette.accent).add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from("Transform any text, passage, Word document, or PDF into stunning images and videos effortlessly."),
            Line::from(Span::styled("Discover the power of AI-driven creativity at your fingertips.", Style::default().fg(palette.dim))),
        ];
        let paragraph = Paragraph::new(welcome)
            .alignment(ratatui::layout::Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::NONE));
        f.render_widget(paragraph, Tui::centered_rect(80, 40, area));
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for msg in &app.messages {
        let (author, color) = if msg.is_from_user() { ("You", palette.accent) } else { ("SumUpAI", Color::Green) };
        let body = match msg.kind {
            MessageKind::Text => msg.content.clone(),
            MessageKind::Image => format!("[image] {}", msg.content),
            MessageKind::Video => format!("[video] {}", msg.content),
            MessageKind::Audio => format!("[audio] {}", msg.content),
        };
        lines.push(Line::from(Span::styled(format!("{}:", author), Style::default().fg(color).add_modifier(Modifier::BOLD))));
        for text_line in body.lines() {
            lines.push(Line::from(text_line.to_string()));
        }
        if msg.loading {
            lines.push(Line::from(Span::styled("…", Style::default().fg(palette.dim))));
        }
        lines.push(Line::from(""));
    }
    if app.is_generating {
        lines.push(Line::from(Span::styled("SumUpAI is generating…", Style::default().fg(palette.dim).add_modifier(Modifier::ITALIC))));
    }

    // Keep the latest message in view.
    let height = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(height) as u16;
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Messages"))
        .style(palette.base())
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(paragraph, area);
}

fn draw_input(f: &mut Frame, app: &App, palette: Palette, option_focus: usize, area: Rect) {
    let placeholder = if app.uploaded_file.is_some() { "Add additional instructions..." } else { "Describe what you want to create..." };
    let send_hint = if app.is_generating {
        " generating… ".to_string()
    } else if app.can_submit() {
        format!(" {} words · Enter send ", word_count(&app.draft))
    } else {
        String::new()
    };
    let mut block = Block::default().borders(Borders::ALL)
        .title(placeholder)
        .title_bottom(Line::from(send_hint).right_aligned())
        .style(palette.base());
    // The sign-in modal shows its own errors.
    if let Some(error) = app.error.as_ref().filter(|_| !app.flags.auth_modal_open) {
        block = block.title_bottom(Line::from(Span::styled(format!(" {} ", error), Style::default().fg(Color::Red))).left_aligned());
    }

    let mut lines: Vec<Line> = Vec::new();
    if app.flags.input_expanded {
        for (i, field) in OptionField::ALL.iter().enumerate() {
            let style = if i == option_focus {
                Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.dim)
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{:<14}", field.title()), style),
                Span::styled(format!("‹ {} ›", app.options.label_of(*field)), style),
            ]));
        }
        let mode = app.active_mode.map_or("none (Ctrl+K)".to_string(), |m| m.label().to_string());
        lines.push(Line::from(Span::styled(format!("{:<14}{}", "Converter", mode), Style::default().fg(palette.dim))));
        if let Some(file) = &app.uploaded_file {
            lines.push(Line::from(Span::styled(format!("📎 {}  (Ctrl+R remove)", file), Style::default().fg(palette.fg))));
        }
    }
    lines.push(Line::from(format!("> {}", app.draft)));

    let scroll = lines.len().saturating_sub(area.height.saturating_sub(2) as usize) as u16;
    f.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), area);
}

fn draw_auth_modal(f: &mut Frame, app: &App, palette: Palette) {
    let area = Tui::centered_rect(60, 50, f.area());
    f.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("Welcome to SumUpAI", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled("Join our community and start creating amazing AI-powered content", Style::default().fg(palette.dim))),
        Line::from(""),
        Line::from(format!("Email: {}", app.login_email)),
    ];
    if !app.login_email.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Your username will be: @{}", username_from_email(&app.login_email)),
            Style::default().fg(palette.dim),
        )));
    }
    if let Some(error) = &app.error {
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("[Enter] Continue with email   [Ctrl+G] Use field as identity token   [Esc] Maybe later"));
    if let Some(client_id) = &app.config.auth.client_id {
        lines.push(Line::from(Span::styled(format!("Identity client: {}", client_id), Style::default().fg(palette.dim))));
    }
    lines.push(Line::from(Span::styled(
        "By continuing, you agree to our Terms of Service and Privacy Policy",
        Style::default().fg(palette.dim),
    )));

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Sign in"))
        .style(Style::default().fg(palette.fg).bg(palette.panel))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_profile(f: &mut Frame, app: &App, palette: Palette) {
    let Some(user) = &app.user else { return };
    let area = Tui::centered_rect(60, 60, f.area());
    f.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("Manage your account and credits", Style::default().fg(palette.dim))),
        Line::from(""),
        Line::from(format!("Username  {}", user.username)),
        Line::from(format!("Email     {}", user.email)),
        Line::from(format!("Credits   {}", user.credits)),
    ];
    if let Some(pic) = &user.profile_pic {
        lines.push(Line::from(Span::styled(format!("Picture   {}", pic), Style::default().fg(palette.dim))));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Credit History", Style::default().add_modifier(Modifier::BOLD))));
    if user.credit_history.is_empty() {
        lines.push(Line::from(Span::styled("No credits spent yet.", Style::default().fg(palette.dim))));
    }
    for entry in &user.credit_history {
        lines.push(Line::from(vec![
            Span::raw(format!("{:<16}", entry.mode.label().to_uppercase())),
            Span::styled(format!("{:<10}", entry.date), Style::default().fg(palette.dim)),
            Span::styled(format!("-{}", entry.points), Style::default().fg(Color::Red)),
        ]));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Profile  [Esc] close"))
        .style(Style::default().fg(palette.fg).bg(palette.panel))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_file_prompt(f: &mut Frame, path: &str, palette: Palette) {
    let area = Tui::centered_rect(60, 20, f.area());
    f.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(format!("Path: {}", path)),
        Line::from(Span::styled("image, .pdf, .doc, .docx or .txt · [Enter] attach · [Esc] cancel", Style::default().fg(palette.dim))),
    ])
    .block(Block::default().borders(Borders::ALL).title("Attach file"))
    .style(Style::default().fg(palette.fg).bg(palette.panel));
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::make_token;
    use crate::config::{Config, MockConfig};
    use crate::db;
    use crate::session::ConverterMode;
    use chrono::Utc;
    use ratatui::backend::TestBackend;
    use serde_json::json;

    async fn test_app() -> App {
        let pool = db::init_db("sqlite::memory:").await.unwrap();
        let config = Config {
            mock: MockConfig { delay_ms: 200, ..Default::default() },
            ..Default::default()
        };
        App::with_pool(config, pool).await.unwrap()
    }

    fn plain(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn render(app: &App, view: &mut ViewState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| draw(f, app, view)).unwrap();
        terminal.backend().buffer().content().iter().map(|cell| cell.symbol()).collect()
    }

    #[tokio::test]
    async fn credits_error_is_drawn_under_the_input() {
        let mut app = test_app().await;
        app.config.auth.starting_credits = 5;
        app.set_login_email("dee@example.com".to_string());
        app.login_with_email().await;
        app.set_converter_mode(Some(ConverterMode::Video)).await;
        app.set_draft("a long film".to_string()).await;
        assert!(!app.submit().await);

        let mut view = ViewState::default();
        assert!(render(&app, &mut view).contains("Not enough credits for text to video"));

        handle_key(&mut view, &mut app, plain(KeyCode::Char('!'))).await;
        assert!(!render(&app, &mut view).contains("Not enough credits"));
    }

    #[tokio::test]
    async fn rejected_startup_token_is_visible_without_the_modal() {
        let mut app = test_app().await;
        assert!(app.login_with_identity_token("not-a-token").await.is_err());
        assert!(!app.flags.auth_modal_open);
        assert!(render(&app, &mut ViewState::default()).contains("Sign-in failed"));
    }

    #[tokio::test]
    async fn esc_closes_the_topmost_overlay_first() {
        let mut app = test_app().await;
        let mut view = ViewState::default();
        handle_key(&mut view, &mut app, ctrl('b')).await;
        handle_key(&mut view, &mut app, ctrl('l')).await;
        view.file_prompt = Some("notes.txt".to_string());
        assert!(app.flags.sidebar_open && app.flags.auth_modal_open);

        handle_key(&mut view, &mut app, plain(KeyCode::Esc)).await;
        assert!(view.file_prompt.is_none());
        assert!(app.flags.auth_modal_open);

        handle_key(&mut view, &mut app, plain(KeyCode::Esc)).await;
        assert!(!app.flags.auth_modal_open);
        assert!(app.flags.sidebar_open);

        handle_key(&mut view, &mut app, plain(KeyCode::Esc)).await;
        assert!(!app.flags.sidebar_open);
    }

    #[tokio::test]
    async fn sidebar_selection_clamps_through_moves_and_deletes() {
        let mut app = test_app().await;
        let mut view = ViewState::default();
        handle_key(&mut view, &mut app, ctrl('b')).await;
        assert_eq!(view.sidebar.selected(), Some(0));

        for _ in 0..6 {
            handle_key(&mut view, &mut app, plain(KeyCode::Down)).await;
        }
        assert_eq!(view.sidebar.selected(), Some(3));

        handle_key(&mut view, &mut app, plain(KeyCode::Delete)).await;
        assert_eq!(app.chats.len(), 3);
        assert!(app.chats.iter().all(|c| c.id != "demo-4"));
        assert_eq!(view.sidebar.selected(), Some(2));

        for c in "neon".chars() {
            handle_key(&mut view, &mut app, plain(KeyCode::Char(c))).await;
        }
        assert_eq!(app.search_query, "neon");
        assert!(app.draft.is_empty());
        assert_eq!(view.sidebar.selected(), Some(0));

        handle_key(&mut view, &mut app, plain(KeyCode::Delete)).await;
        assert!(app.filtered_chats().is_empty());
        assert_eq!(view.sidebar.selected(), None);
        handle_key(&mut view, &mut app, plain(KeyCode::Up)).await;
        assert_eq!(view.sidebar.selected(), None);
    }

    #[tokio::test]
    async fn ctrl_g_signs_in_with_the_field_as_a_token() {
        let mut app = test_app().await;
        let mut view = ViewState::default();
        handle_key(&mut view, &mut app, ctrl('l')).await;

        let expired = make_token(&json!({"email": "old@example.com", "exp": Utc::now().timestamp() - 60}));
        app.set_login_email(expired);
        handle_key(&mut view, &mut app, ctrl('g')).await;
        assert!(app.user.is_none());
        assert!(app.flags.auth_modal_open);
        assert!(app.error.as_deref().unwrap().starts_with("Sign-in failed"));

        let fresh = make_token(&json!({"email": "kim@example.com", "exp": Utc::now().timestamp() + 600}));
        app.set_login_email(fresh);
        handle_key(&mut view, &mut app, ctrl('g')).await;
        assert_eq!(app.user.as_ref().unwrap().username, "kim");
        assert!(!app.flags.auth_modal_open);
    }

    #[tokio::test]
    async fn ctrl_u_only_logs_out_a_signed_in_user() {
        let mut app = test_app().await;
        let mut view = ViewState::default();
        handle_key(&mut view, &mut app, ctrl('t')).await;
        assert!(!app.flags.dark_mode);

        handle_key(&mut view, &mut app, ctrl('u')).await;
        assert!(!app.flags.dark_mode);

        app.set_login_email("lee@example.com".to_string());
        app.login_with_email().await;
        handle_key(&mut view, &mut app, ctrl('u')).await;
        assert!(app.user.is_none());
        assert!(app.flags.dark_mode);
    }

    #[tokio::test]
    async fn typing_expands_the_input_and_ctrl_w_drops_a_word() {
        let mut app = test_app().await;
        let mut view = ViewState::default();
        for c in "hello big world".chars() {
            handle_key(&mut view, &mut app, plain(KeyCode::Char(c))).await;
        }
        assert!(app.flags.input_expanded);
        assert_eq!(app.draft, "hello big world");

        handle_key(&mut view, &mut app, ctrl('w')).await;
        assert_eq!(app.draft, "hello big ");
        handle_key(&mut view, &mut app, plain(KeyCode::Backspace)).await;
        assert_eq!(app.draft, "hello big");
        assert!(handle_key(&mut view, &mut app, ctrl('q')).await);
    }
}
