use std::collections::VecDeque;
use std::error::Error;
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use chrono::{DateTime, Local};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::{debug, info};

use crate::board::{TimerBoard, TimerEvent};
use crate::config::Config;
use crate::domain::{format_time, DurationInput, TimerCollection, TimerKey, TimerPhase, MAX_TIMERS};

const EDIT_FIELD_WIDTH: usize = 4;
const FOCUSED_FIELD_COLOR: Color = Color::Yellow;
const INACTIVE_BORDER_COLOR: Color = Color::DarkGray;
const ALERT_BORDER_COLOR: Color = Color::LightRed;

const GLYPH_HEIGHT: usize = 5;
const DIGIT_GLYPHS: [[&str; GLYPH_HEIGHT]; 10] = [
	["███", "█ █", "█ █", "█ █", "███"],
	["  █", "  █", "  █", "  █", "  █"],
	["███", "  █", "███", "█  ", "███"],
	["███", "  █", "███", "  █", "███"],
	["█ █", "█ █", "███", "  █", "  █"],
	["███", "█  ", "███", "  █", "███"],
	["███", "█  ", "███", "█ █", "███"],
	["███", "  █", "  █", "  █", "  █"],
	["███", "█ █", "███", "█ █", "███"],
	["███", "█ █", "███", "  █", "███"],
];
const COLON_GLYPH: [&str; GLYPH_HEIGHT] = [" ", "█", " ", "█", " "];

pub fn run_dashboard(config: &Config) -> Result<(), Box<dyn Error>> {
	let (events_tx, events_rx) = mpsc::channel();
	let mut board = TimerBoard::new(config.default_duration_seconds, events_tx);

	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, &mut board, &events_rx, config);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	board: &mut TimerBoard,
	events: &Receiver<TimerEvent>,
	config: &Config,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::default();

	loop {
		board.advance(Instant::now());

		let mut finished_any = false;
		while let Ok(event) = events.try_recv() {
			app.on_timer_event(event, Local::now());
			finished_any = true;
		}
		if finished_any && config.bell {
			ring_bell();
		}

		terminal.draw(|frame| draw_dashboard(frame, &app, board.timers()))?;

		if event::poll(config.poll_interval())? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				if handle_key(&mut app, key.code, board, Instant::now()) {
					info!("dashboard closed");
					break;
				}
			}
		}
	}

	Ok(())
}

fn ring_bell() {
	let mut stdout = io::stdout();
	if let Err(err) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
		debug!(%err, "terminal bell failed");
	}
}

fn draw_dashboard(frame: &mut Frame, app: &App, timers: &TimerCollection) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Length(3),
			Constraint::Min(9),
			Constraint::Length(3),
			Constraint::Length(5),
		])
		.split(frame.area());

	render_header(frame, layout[0], timers);
	if timers.is_empty() {
		render_empty_face(frame, layout[1], timers);
	} else {
		render_timer_face(frame, layout[1], timers);
	}
	render_dots(frame, layout[2], timers);
	render_footer(frame, layout[3], app, timers);

	if let InputMode::Edit(dialog) = &app.mode {
		render_edit_popup(frame, dialog, timers);
	}
	if let Some(message) = app.alerts.front() {
		render_alert_popup(frame, message, app.alerts.len());
	}
}

fn render_header(frame: &mut Frame, area: Rect, timers: &TimerCollection) {
	let running = timers.iter().filter(|(_, timer)| timer.is_running).count();
	let capacity = if timers.is_full() {
		"full".to_string()
	} else {
		format!("next {}", timers.next_id())
	};
	let line = Line::from(vec![
		Span::styled("Countdown Deck", Style::default().add_modifier(Modifier::BOLD)),
		Span::raw(format!(
			" | timers {}/{MAX_TIMERS} | running {running} | {capacity}",
			timers.len()
		)),
	]);
	let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
	frame.render_widget(header, area);
}

fn render_empty_face(frame: &mut Frame, area: Rect, timers: &TimerCollection) {
	let mut lines = vertical_padding(area, 1);
	lines.push(Line::from(format!(
		"Press a to add a {} timer",
		format_time(timers.default_duration())
	)));
	let face = Paragraph::new(lines)
		.alignment(Alignment::Center)
		.block(Block::default().borders(Borders::ALL));
	frame.render_widget(face, area);
}

fn render_timer_face(frame: &mut Frame, area: Rect, timers: &TimerCollection) {
	let (Some(id), Some(timer)) = (timers.visible_id(), timers.visible()) else {
		render_empty_face(frame, area, timers);
		return;
	};

	let phase = timer.phase();
	let face_style = phase_style(phase);
	let mut lines = vertical_padding(area, GLYPH_HEIGHT + 2);
	for row in big_time_lines(&format_time(timer.time_left)) {
		lines.push(Line::from(Span::styled(row, face_style)));
	}
	lines.push(Line::from(""));
	lines.push(Line::from(format!(
		"{} | set {}",
		phase.label(),
		format_time(timer.input_time)
	)));

	let block = Block::default()
		.borders(Borders::ALL)
		.title(format!("Timer {id} of {}", timers.len()))
		.border_style(face_style);
	let face = Paragraph::new(lines).alignment(Alignment::Center).block(block);
	frame.render_widget(face, area);
}

fn render_dots(frame: &mut Frame, area: Rect, timers: &TimerCollection) {
	let visible_id = timers.visible_id();
	let mut spans = Vec::new();
	for (id, timer) in timers.iter() {
		if !spans.is_empty() {
			spans.push(Span::raw("  "));
		}

		let span = if Some(id) == visible_id {
			Span::styled("●", Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
		} else if timer.is_running {
			Span::styled("○", Style::default().fg(Color::Green))
		} else {
			Span::styled("○", Style::default().fg(Color::DarkGray))
		};
		spans.push(span);
	}

	let dots = Paragraph::new(Line::from(spans))
		.alignment(Alignment::Center)
		.block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(INACTIVE_BORDER_COLOR)));
	frame.render_widget(dots, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, timers: &TimerCollection) {
	let footer_lines = if !app.alerts.is_empty() {
		vec![
			Line::from("Alert"),
			Line::from("Enter/Esc dismiss"),
			Line::from(app.status.clone()),
		]
	} else {
		match &app.mode {
			InputMode::Normal => vec![
				Line::from("a add | d delete | space start/pause | r reset | e edit | q quit"),
				Line::from("left/right or h/l switch timer | 1-5 jump to timer"),
				Line::from(app.status.clone()),
			],
			InputMode::Edit(dialog) => vec![
				Line::from(format!(
					"Editing timer {}",
					timers
						.id_of(dialog.target)
						.map(|id| id.to_string())
						.unwrap_or_else(|| "?".to_string())
				)),
				Line::from("Tab switch field | Enter confirm | Esc cancel"),
				Line::from(app.status.clone()),
			],
		}
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_edit_popup(frame: &mut Frame, dialog: &EditDialog, timers: &TimerCollection) {
	let area = centered_rect(50, 40, frame.area());
	frame.render_widget(Clear, area);

	let title = match timers.id_of(dialog.target) {
		Some(id) => format!("Edit timer {id}"),
		None => "Edit timer".to_string(),
	};
	let lines = vec![
		Line::from("Enter new time:"),
		Line::from(""),
		Line::from(vec![
			field_span(&dialog.minutes, "Minutes", dialog.field == EditField::Minutes),
			Span::styled(" : ", Style::default().add_modifier(Modifier::BOLD)),
			field_span(&dialog.seconds, "Seconds", dialog.field == EditField::Seconds),
		]),
		Line::from(""),
		Line::from("Enter confirm | Esc cancel"),
	];

	let popup = Paragraph::new(lines)
		.alignment(Alignment::Center)
		.block(Block::default().borders(Borders::ALL).title(title));
	frame.render_widget(popup, area);
}

fn field_span(value: &str, placeholder: &str, focused: bool) -> Span<'static> {
	let text = if value.is_empty() {
		format!("[{placeholder:^9}]")
	} else {
		format!("[{value:^9}]")
	};

	let mut style = if value.is_empty() {
		Style::default().fg(Color::DarkGray)
	} else {
		Style::default()
	};
	if focused {
		style = style.fg(FOCUSED_FIELD_COLOR).add_modifier(Modifier::BOLD);
	}
	Span::styled(text, style)
}

fn render_alert_popup(frame: &mut Frame, message: &str, pending: usize) {
	let area = centered_rect(50, 25, frame.area());
	frame.render_widget(Clear, area);

	let title = if pending > 1 {
		format!("Alert (1/{pending})")
	} else {
		"Alert".to_string()
	};
	let lines = vec![
		Line::from(""),
		Line::from(Span::styled(message.to_string(), Style::default().add_modifier(Modifier::BOLD))),
		Line::from(""),
		Line::from("Enter/Esc dismiss"),
	];
	let popup = Paragraph::new(lines)
		.alignment(Alignment::Center)
		.wrap(Wrap { trim: true })
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(title)
				.border_style(Style::default().fg(ALERT_BORDER_COLOR)),
		);
	frame.render_widget(popup, area);
}

fn phase_style(phase: TimerPhase) -> Style {
	match phase {
		TimerPhase::Running => Style::default().fg(Color::Green),
		TimerPhase::Idle => Style::default().fg(Color::White),
		TimerPhase::Finished => Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
	}
}

fn vertical_padding(area: Rect, content_height: usize) -> Vec<Line<'static>> {
	let inner_height = usize::from(area.height.saturating_sub(2));
	let padding = inner_height.saturating_sub(content_height) / 2;
	vec![Line::from(""); padding]
}

/// Renders `MM:SS` text as rows of block glyphs.
fn big_time_lines(text: &str) -> Vec<String> {
	let glyphs = text
		.chars()
		.filter_map(|c| match c {
			':' => Some(COLON_GLYPH),
			_ => c.to_digit(10).map(|digit| DIGIT_GLYPHS[digit as usize]),
		})
		.collect::<Vec<_>>();

	(0..GLYPH_HEIGHT)
		.map(|row| {
			glyphs
				.iter()
				.map(|glyph| glyph[row])
				.collect::<Vec<_>>()
				.join(" ")
		})
		.collect()
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

/// Routes one key press. Returns true when the dashboard should exit.
fn handle_key(app: &mut App, code: KeyCode, board: &mut TimerBoard, now: Instant) -> bool {
	if !app.alerts.is_empty() {
		if matches!(code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
			app.alerts.pop_front();
		}
		return false;
	}

	if matches!(app.mode, InputMode::Edit(_)) {
		handle_edit_key(app, code, board);
		return false;
	}

	handle_normal_key(app, code, board, now)
}

fn handle_normal_key(app: &mut App, code: KeyCode, board: &mut TimerBoard, now: Instant) -> bool {
	let visible = board.timers().visible_id();

	match code {
		KeyCode::Char('q') | KeyCode::Esc => true,
		KeyCode::Char('a') => {
			match board.add() {
				Ok(id) => app.status = format!("Added timer {id}"),
				Err(err) => app.alert(err.to_string()),
			}
			false
		}
		KeyCode::Char('d') | KeyCode::Delete => {
			let Some(id) = visible else {
				app.status = "No timer to delete".to_string();
				return false;
			};
			app.status = match board.remove(id) {
				Ok(_) => format!("Deleted timer {id}"),
				Err(err) => format!("error: {err}"),
			};
			false
		}
		KeyCode::Char(' ') => {
			let Some(id) = visible else {
				app.status = "Add a timer first".to_string();
				return false;
			};
			app.status = match board.toggle(id, now) {
				Ok(true) => format!("Timer {id} started"),
				Ok(false) => format!("Timer {id} paused"),
				Err(err) => format!("error: {err}"),
			};
			false
		}
		KeyCode::Char('r') => {
			let Some(id) = visible else {
				app.status = "Add a timer first".to_string();
				return false;
			};
			app.status = match board.reset(id) {
				Ok(()) => format!("Timer {id} reset"),
				Err(err) => format!("error: {err}"),
			};
			false
		}
		KeyCode::Char('e') | KeyCode::Enter => {
			match board.timers().visible_key() {
				Some(key) => app.mode = InputMode::Edit(EditDialog::new(key)),
				None => app.status = "Add a timer first".to_string(),
			}
			false
		}
		KeyCode::Left | KeyCode::Char('h') => {
			board.select_previous();
			false
		}
		KeyCode::Right | KeyCode::Char('l') => {
			board.select_next();
			false
		}
		KeyCode::Char(value) if value.is_ascii_digit() => {
			let id = value.to_digit(10).unwrap_or_default() as usize;
			if !board.select(id) {
				app.status = format!("No timer {id}");
			}
			false
		}
		_ => false,
	}
}

fn handle_edit_key(app: &mut App, code: KeyCode, board: &mut TimerBoard) {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Edit cancelled".to_string();
		}
		KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
			if let InputMode::Edit(dialog) = &mut app.mode {
				dialog.field = dialog.field.other();
			}
		}
		KeyCode::Backspace => {
			if let InputMode::Edit(dialog) = &mut app.mode {
				dialog.active_input_mut().pop();
			}
		}
		KeyCode::Char(value) if !value.is_control() => {
			if let InputMode::Edit(dialog) = &mut app.mode {
				let input = dialog.active_input_mut();
				if input.chars().count() < EDIT_FIELD_WIDTH {
					input.push(value);
				}
			}
		}
		KeyCode::Enter => submit_edit(app, board),
		_ => {}
	}
}

fn submit_edit(app: &mut App, board: &mut TimerBoard) {
	let (target, input) = match &app.mode {
		InputMode::Edit(dialog) => (
			dialog.target,
			DurationInput::parse(&dialog.minutes, &dialog.seconds),
		),
		InputMode::Normal => return,
	};

	let Some(id) = board.timers().id_of(target) else {
		app.mode = InputMode::Normal;
		app.status = "Timer no longer exists".to_string();
		return;
	};

	match board.edit(id, input) {
		Ok(duration) => {
			app.mode = InputMode::Normal;
			app.status = format!("Timer {id} set to {}", format_time(duration));
		}
		Err(err) => app.alert(err.to_string()),
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditField {
	Minutes,
	Seconds,
}

impl EditField {
	fn other(self) -> Self {
		match self {
			EditField::Minutes => EditField::Seconds,
			EditField::Seconds => EditField::Minutes,
		}
	}
}

#[derive(Debug, Clone)]
struct EditDialog {
	target: TimerKey,
	minutes: String,
	seconds: String,
	field: EditField,
}

impl EditDialog {
	fn new(target: TimerKey) -> Self {
		Self {
			target,
			minutes: String::new(),
			seconds: String::new(),
			field: EditField::Minutes,
		}
	}

	fn active_input_mut(&mut self) -> &mut String {
		match self.field {
			EditField::Minutes => &mut self.minutes,
			EditField::Seconds => &mut self.seconds,
		}
	}
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Edit(EditDialog),
}

#[derive(Debug, Clone)]
struct App {
	mode: InputMode,
	alerts: VecDeque<String>,
	status: String,
}

impl Default for App {
	fn default() -> Self {
		Self {
			mode: InputMode::Normal,
			alerts: VecDeque::new(),
			status: "Ready".to_string(),
		}
	}
}

impl App {
	fn alert(&mut self, message: impl Into<String>) {
		self.alerts.push_back(message.into());
	}

	fn on_timer_event(&mut self, event: TimerEvent, at: DateTime<Local>) {
		match event {
			TimerEvent::Finished { id, .. } => {
				self.status = format!("Timer {id} finished at {}", at.format("%H:%M:%S"));
				self.alert(format!("Timer {id} has finished!"));
			}
		}
	}
}
