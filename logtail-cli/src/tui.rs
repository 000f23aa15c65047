use std::io;
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::client::LogClient;
use crate::health::HealthMonitor;
use crate::ui::{Theme, theme};
use crate::view::{ViewAction, ViewPrefs, numbered};

/// Most suggestions shown at once under the input
const MAX_SUGGESTIONS: u16 = 8;

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}

fn fit(s: &str, width: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= width {
        return s.to_string();
    }
    if width <= 1 {
        return "…".into();
    }
    let mut out: String = chars.into_iter().take(width - 1).collect();
    out.push('…');
    out
}

#[derive(Clone, Debug)]
struct LogsUiState {
    follow: bool,
    /// Lines scrolled up from the bottom
    scroll: usize,
}

impl LogsUiState {
    fn new() -> Self {
        Self {
            follow: true,
            scroll: 0,
        }
    }

    fn toggle_follow(&mut self) {
        self.follow = !self.follow;
        if self.follow {
            self.scroll = 0;
        }
    }

    fn scroll_up(&mut self, lines: usize, total: usize) {
        self.follow = false;
        self.scroll = self.scroll.saturating_add(lines).min(total);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
        if self.scroll == 0 {
            self.follow = true;
        }
    }

    fn jump_top(&mut self, total: usize) {
        self.follow = false;
        self.scroll = total;
    }

    fn jump_bottom(&mut self) {
        self.follow = true;
        self.scroll = 0;
    }

    /// First and one-past-last visible line for a pane `height` rows tall
    fn window(&self, total: usize, height: usize) -> (usize, usize) {
        let end = if self.follow {
            total
        } else {
            total.saturating_sub(self.scroll).max(height.min(total))
        };
        (end.saturating_sub(height), end)
    }
}

struct UiState {
    prefs: ViewPrefs,
    logs: LogsUiState,
    /// Transient notice shown in the status bar
    notice: Option<String>,
    log_height: usize,
    suggestion_area: Option<Rect>,
    /// Kept across frames so clicks can account for the list's scroll
    suggestion_list: ListState,
    input_area: Rect,
}

impl UiState {
    fn new(prefs: ViewPrefs) -> Self {
        Self {
            prefs,
            logs: LogsUiState::new(),
            notice: None,
            log_height: 0,
            suggestion_area: None,
            suggestion_list: ListState::default(),
            input_area: Rect::default(),
        }
    }

    fn theme(&self) -> &'static Theme {
        theme(self.prefs.theme)
    }
}

/// Run the interactive UI until the user quits
pub async fn run(mut client: LogClient, monitor: HealthMonitor, prefs: ViewPrefs) -> io::Result<()> {
    let mut terminal = setup_terminal()?;
    let result = tui_loop(&mut terminal, &mut client, prefs).await;
    drop(monitor);
    client.stop();
    restore_terminal(terminal)?;
    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: &mut LogClient,
    prefs: ViewPrefs,
) -> io::Result<()> {
    let mut ui = UiState::new(prefs);
    if client.input().is_empty() {
        client.focus();
    }

    loop {
        client.tick();
        if client.take_view_reset() {
            ui.logs.jump_top(client.session().logs().len());
        }

        terminal.draw(|f| draw(f, client, &mut ui))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }

        match event::read()? {
            CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key(terminal, client, &mut ui, key).await? {
                    return Ok(());
                }
            }
            CEvent::Mouse(mouse) => handle_mouse(client, &ui, mouse),
            _ => {}
        }
    }
}

/// Returns true when the user asked to quit
async fn handle_key(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: &mut LogClient,
    ui: &mut UiState,
    KeyEvent {
        code, modifiers, ..
    }: KeyEvent,
) -> io::Result<bool> {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }
    ui.notice = None;

    if client.is_focused() {
        match code {
            KeyCode::Esc => {
                client.blur();
            }
            KeyCode::Down => client.move_next(),
            KeyCode::Up => client.move_previous(),
            KeyCode::Tab => {
                if client.suggestions().cursor().is_none() {
                    client.move_next();
                }
                client.select_current();
            }
            KeyCode::Enter => {
                if client.select_current().is_none() {
                    client.blur();
                    start(terminal, client, ui).await?;
                }
            }
            KeyCode::Backspace => {
                let mut input = client.input().to_string();
                input.pop();
                client.set_input(&input);
            }
            KeyCode::Char(c) => {
                let mut input = client.input().to_string();
                input.push(c);
                client.set_input(&input);
            }
            _ => {}
        }
        return Ok(false);
    }

    let total = client.session().logs().len();
    let page = ui.log_height.max(1);
    match code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Char('/') | KeyCode::Char('i') => client.focus(),
        KeyCode::Char('s') | KeyCode::Enter => start(terminal, client, ui).await?,
        KeyCode::Char('x') => client.stop(),
        KeyCode::Char('c') => {
            client.clear();
            ui.logs.jump_bottom();
        }
        KeyCode::Char('r') => {
            client.refresh_files();
            ui.notice = Some("Reloading file list".into());
        }
        KeyCode::Char('n') => ui.prefs = ui.prefs.apply(ViewAction::ToggleLineNumbers),
        KeyCode::Char('t') => {
            ui.prefs = ui.prefs.apply(ViewAction::ToggleTheme);
            ui.notice = Some(format!("Theme: {}", ui.prefs.theme.label()));
        }
        KeyCode::Char('f') => ui.logs.toggle_follow(),
        KeyCode::Char('[') => client.cycle_host(-1),
        KeyCode::Char(']') => client.cycle_host(1),
        KeyCode::Up | KeyCode::Char('k') => ui.logs.scroll_up(1, total),
        KeyCode::Down | KeyCode::Char('j') => ui.logs.scroll_down(1),
        KeyCode::PageUp => ui.logs.scroll_up(page, total),
        KeyCode::PageDown => ui.logs.scroll_down(page),
        KeyCode::Home | KeyCode::Char('g') => ui.logs.jump_top(total),
        KeyCode::End | KeyCode::Char('G') => ui.logs.jump_bottom(),
        _ => {}
    }
    Ok(false)
}

fn handle_mouse(client: &mut LogClient, ui: &UiState, mouse: MouseEvent) {
    let MouseEventKind::Down(MouseButton::Left) = mouse.kind else {
        return;
    };
    let inside = |area: Rect| {
        mouse.column >= area.x
            && mouse.column < area.x + area.width
            && mouse.row >= area.y
            && mouse.row < area.y + area.height
    };

    if let Some(area) = ui.suggestion_area.filter(|a| inside(*a)) {
        if let Some(index) = suggestion_at(area, ui.suggestion_list.offset(), mouse.row) {
            client.press(index);
            client.blur();
        }
    } else if inside(ui.input_area) {
        client.focus();
    } else if client.is_focused() {
        client.blur();
    }
}

/// Suggestion under `row`, or `None` on the box's borders
fn suggestion_at(area: Rect, offset: usize, row: u16) -> Option<usize> {
    let first = area.y + 1;
    let last = (area.y + area.height).checked_sub(2)?;
    if row < first || row > last {
        return None;
    }
    Some(offset + (row - first) as usize)
}

/// Resolves once Esc or Ctrl+C is pressed; other input is dropped
async fn cancel_requested() -> io::Result<()> {
    loop {
        if !event::poll(Duration::ZERO)? {
            tokio::time::sleep(Duration::from_millis(50)).await;
            continue;
        }
        if let CEvent::Key(key) = event::read()? {
            let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
            if key.kind == KeyEventKind::Press && (ctrl_c || key.code == KeyCode::Esc) {
                return Ok(());
            }
        }
    }
}

/// Draw once with a connecting notice, then run the pre-flight and open.
/// Esc or Ctrl+C abandons the attempt.
async fn start(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: &mut LogClient,
    ui: &mut UiState,
) -> io::Result<()> {
    ui.notice = Some("Connecting… (Esc to cancel)".into());
    terminal.draw(|f| draw(f, client, ui))?;
    ui.notice = None;

    let cancelled = tokio::select! {
        result = client.start() => {
            if let Err(error) = result {
                tracing::debug!(%error, "start failed");
            }
            false
        }
        requested = cancel_requested() => {
            requested?;
            true
        }
    };
    if cancelled {
        client.cancel_start();
        ui.notice = Some("Connection cancelled".into());
    }
    ui.logs.jump_bottom();
    Ok(())
}

fn draw(f: &mut Frame, client: &LogClient, ui: &mut UiState) {
    let t = ui.theme();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, client, ui, rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(rows[1]);
    draw_hosts(f, client, t, cols[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(cols[1]);
    ui.input_area = right[0];
    draw_logs(f, client, ui, right[1]);
    draw_input(f, client, ui, right[0]);

    let error = match client.error() {
        Some(error) => Line::from(Span::styled(error.message().to_string(), t.error_style())),
        None => Line::from(""),
    };
    f.render_widget(Paragraph::new(error), rows[2]);
    draw_footer(f, client, t, rows[3]);
}

fn draw_header(f: &mut Frame, client: &LogClient, ui: &UiState, area: Rect) {
    let t = ui.theme();
    let phase = client.session().phase();
    let mut spans = vec![
        Span::styled(" logtail ", t.title_style()),
        Span::styled(t.phase_icon(phase), t.phase_style(phase)),
        Span::styled(format!(" {} ", phase.label()), t.phase_style(phase)),
    ];
    if let Some(target) = client.session().target() {
        spans.push(Span::styled(
            format!("{} @ {} ", target.file, target.host.name),
            t.text_dim_style(),
        ));
    }
    spans.push(Span::styled(
        format!("· {} lines ", client.session().logs().len()),
        t.text_muted_style(),
    ));
    if !ui.logs.follow {
        spans.push(Span::styled("· paused ", t.text_muted_style()));
    }
    if let Some(notice) = &ui.notice {
        spans.push(Span::styled(format!("· {}", notice), t.text_style()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_hosts(f: &mut Frame, client: &LogClient, t: &Theme, area: Rect) {
    let registry = client.registry();
    let active = registry.active();
    let implicit;
    let hosts = if registry.is_implicit() {
        implicit = active.cloned().into_iter().collect::<Vec<_>>();
        implicit.as_slice()
    } else {
        registry.hosts()
    };

    let width = area.width.saturating_sub(5) as usize;
    let items: Vec<ListItem> = hosts
        .iter()
        .map(|host| {
            let status = client.health().status(&host.name);
            ListItem::new(Line::from(vec![
                Span::styled(t.health_icon(status), t.health_style(status)),
                Span::raw(" "),
                Span::styled(fit(&host.name, width), t.text_style()),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(active.and_then(|a| hosts.iter().position(|h| h == a)));

    let online = client.health().online_count();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(t.subtle_border_style())
                .title(format!(" Hosts {}/{} ", online, hosts.len())),
        )
        .highlight_style(t.selection_style());
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_input(f: &mut Frame, client: &LogClient, ui: &mut UiState, area: Rect) {
    let t = ui.theme();
    let focused = client.is_focused();
    let border = if focused {
        t.focused_border_style()
    } else {
        t.subtle_border_style()
    };
    let title = if client.files_loading() {
        " Log file (loading…) ".to_string()
    } else {
        format!(" Log file ({} available) ", client.files().len())
    };

    let text = if client.input().is_empty() && !focused {
        Span::styled("press / to choose a file", t.text_muted_style())
    } else {
        Span::styled(client.input().to_string(), t.text_style())
    };
    f.render_widget(
        Paragraph::new(Line::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title),
        ),
        area,
    );

    if focused {
        let x = area.x + 1 + client.input().chars().count() as u16;
        f.set_cursor_position((x.min(area.x + area.width.saturating_sub(2)), area.y + 1));
    }

    ui.suggestion_area = None;
    let suggestions = client.suggestions().suggestions();
    if !focused || suggestions.is_empty() {
        return;
    }

    let height = (suggestions.len() as u16).min(MAX_SUGGESTIONS) + 2;
    let frame = f.area();
    let below = Rect {
        x: area.x,
        y: area.y + area.height,
        width: area.width,
        height: height.min(frame.height.saturating_sub(area.y + area.height)),
    };
    if below.height < 3 {
        return;
    }

    let items: Vec<ListItem> = suggestions
        .iter()
        .map(|s| ListItem::new(Span::styled(s.clone(), t.text_style())))
        .collect();
    let cursor = client.suggestions().cursor();
    let state = &mut ui.suggestion_list;
    state.select(cursor);
    if cursor.is_none() || state.offset() >= suggestions.len() {
        *state.offset_mut() = 0;
    }

    f.render_widget(Clear, below);
    f.render_stateful_widget(
        List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(t.focused_border_style()),
            )
            .highlight_style(t.selection_style()),
        below,
        state,
    );
    ui.suggestion_area = Some(below);
}

fn draw_logs(f: &mut Frame, client: &LogClient, ui: &mut UiState, area: Rect) {
    let t = ui.theme();
    let logs = client.session().logs();
    let height = area.height.saturating_sub(2) as usize;
    ui.log_height = height;

    let (start, end) = ui.logs.window(logs.len(), height);
    let first = logs.first_line_number();
    let digits = (first + logs.len()).to_string().len();

    let lines: Vec<Line> = logs
        .iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(i, line)| {
            if ui.prefs.line_numbers {
                let prefix = numbered(first + i, digits, "");
                Line::from(vec![
                    Span::styled(prefix, t.text_muted_style()),
                    Span::styled(line.text.clone(), t.text_style()),
                ])
            } else {
                Line::from(Span::styled(line.text.clone(), t.text_style()))
            }
        })
        .collect();

    let title = if logs.is_empty() {
        " Logs ".to_string()
    } else {
        format!(" Logs {}-{} ", first + start, first + end - 1)
    };
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(t.subtle_border_style())
                .title(title),
        ),
        area,
    );
}

fn draw_footer(f: &mut Frame, client: &LogClient, t: &Theme, area: Rect) {
    let hints: &[(&str, &str)] = if client.is_focused() {
        &[
            ("↑↓", "choose"),
            ("Tab", "complete"),
            ("Enter", "start"),
            ("Esc", "done"),
        ]
    } else {
        &[
            ("/", "file"),
            ("s", "start"),
            ("x", "stop"),
            ("c", "clear"),
            ("[ ]", "host"),
            ("n", "line no."),
            ("f", "follow"),
            ("t", "theme"),
            ("q", "quit"),
        ]
    };

    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {}", key), t.key_hint_style()));
        spans.push(Span::styled(format!(" {} ", label), t.text_dim_style()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
