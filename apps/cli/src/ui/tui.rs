//! Terminal rendering and the event loop

use anyhow::Result;
use chrono::Local;
use crossterm::{
	event::{self, Event, KeyEventKind},
	execute,
	terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
	backend::CrosstermBackend,
	layout::{Alignment, Constraint, Direction, Layout, Rect},
	style::{Color, Modifier, Style},
	text::{Line, Span},
	widgets::{Block, Borders, Clear, Paragraph, Row, Table, TableState, Wrap},
	Frame, Terminal,
};
use stash_core::export::{export_items_csv, resolve_export_path};
use std::{
	io::{self, Stdout},
	time::Duration,
};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{info, warn};

use super::app::{Action, App, ItemForm, Mode, CATEGORY_FIELD, FORM_LABELS};
use crate::context::Context;

type Backend = CrosstermBackend<Stdout>;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn run(ctx: &Context) -> Result<()> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	execute!(stdout, EnterAlternateScreen)?;
	let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

	let result = event_loop(&mut terminal, ctx).await;

	// Restore terminal
	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

async fn event_loop(terminal: &mut Terminal<Backend>, ctx: &Context) -> Result<()> {
	let mut app = App::new();
	reload(&mut app, ctx).await;

	// Without sync nobody else can change the store under us.
	let (listener, mut reloads) = if ctx.config.sync.enabled {
		let (handle, rx) = ctx.listener().start_channel();
		(Some(handle), rx)
	} else {
		let (_tx, rx) = mpsc::unbounded_channel();
		(None, rx)
	};

	loop {
		if drain(&mut reloads) {
			info!("Reload requested by server");
			reload(&mut app, ctx).await;
		}

		terminal.draw(|f| render(f, &app))?;

		if !event::poll(POLL_INTERVAL)? {
			continue;
		}
		let Event::Key(key) = event::read()? else {
			continue;
		};
		if key.kind != KeyEventKind::Press {
			continue;
		}

		match app.handle_key(key) {
			Action::None => {}
			Action::Quit => break,
			Action::Reload => reload(&mut app, ctx).await,
			Action::Save { id, input } => {
				let result = match id {
					Some(id) => ctx.store.update(id, input).await.map(|()| id),
					None => ctx.store.add(input).await,
				};
				match result {
					Ok(saved) => {
						app.close_form();
						app.set_status(match id {
							Some(_) => format!("Updated item {}", saved),
							None => format!("Added item {}", saved),
						});
						reload(&mut app, ctx).await;
					}
					Err(e) => app.set_status(e.to_string()),
				}
			}
			Action::Delete(ids) => {
				delete(&mut app, ctx, &ids).await;
				reload(&mut app, ctx).await;
			}
			Action::Export => export(&mut app, ctx).await,
		}
	}

	if let Some(listener) = listener {
		listener.shutdown().await;
	}

	Ok(())
}

/// True when at least one reload is pending; several collapse into one.
fn drain(reloads: &mut mpsc::UnboundedReceiver<()>) -> bool {
	let mut pending = false;
	loop {
		match reloads.try_recv() {
			Ok(()) => pending = true,
			Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return pending,
		}
	}
}

async fn reload(app: &mut App, ctx: &Context) {
	let items = ctx.store.query(&app.query).await;
	let categories = ctx.store.categories().await;

	match (items, categories) {
		(Ok(items), Ok(categories)) => app.set_items(items, categories),
		(Err(e), _) | (_, Err(e)) => {
			warn!(error = %e, "Failed to load inventory");
			app.set_status(e.to_string());
		}
	}
}

/// Deletes one record at a time and stops at the first failure
async fn delete(app: &mut App, ctx: &Context, ids: &[i32]) {
	for (done, id) in ids.iter().enumerate() {
		if let Err(e) = ctx.store.delete(*id).await {
			warn!(id, error = %e, "Failed to delete item");
			return app.set_status(format!("Deleted {} of {} items: {}", done, ids.len(), e));
		}
	}

	app.set_status(match ids {
		[id] => format!("Deleted item {}", id),
		_ => format!("Deleted {} items", ids.len()),
	});
}

async fn export(app: &mut App, ctx: &Context) {
	let items = match ctx.store.list().await {
		Ok(items) => items,
		Err(e) => return app.set_status(e.to_string()),
	};

	let path = resolve_export_path(None, &ctx.config, Local::now().naive_local());
	match export_items_csv(&items, &path) {
		Ok(rows) => app.set_status(format!("Exported {} items to {}", rows, path.display())),
		Err(e) => app.set_status(format!("Export failed: {}", e)),
	}
}

fn render(f: &mut Frame, app: &App) {
	let chunks = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Length(3), // Header
			Constraint::Min(0),    // Items
			Constraint::Length(3), // Status
		])
		.split(f.area());

	render_header(f, chunks[0], app);
	render_items(f, chunks[1], app);
	render_footer(f, chunks[2], app);

	match &app.mode {
		Mode::Form(form) => render_form(f, form, app),
		Mode::Detail(id) => render_detail(f, *id, app),
		Mode::CategoryFilter { cursor } => render_category_filter(f, *cursor, app),
		Mode::ConfirmDelete(ids) => render_confirm(f, ids, app),
		Mode::Help => render_help(f),
		Mode::Browse | Mode::Search => {}
	}
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
	let search = app.query.search.as_deref().unwrap_or("");
	let search_style = if app.mode == Mode::Search {
		Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
	} else {
		Style::default()
	};

	let line = Line::from(vec![
		Span::styled("Search: ", Style::default().fg(Color::Gray)),
		Span::styled(format!("{:<20}", search), search_style),
		Span::styled("  Category: ", Style::default().fg(Color::Gray)),
		Span::raw(if app.query.categories.is_empty() {
			"all".to_string()
		} else {
			app.query.categories.join(", ")
		}),
		Span::styled("  Sort: ", Style::default().fg(Color::Gray)),
		Span::raw(format!(
			"{} {}",
			app.query.sort,
			if app.query.descending { "↓" } else { "↑" }
		)),
	]);

	let header = Paragraph::new(line).block(
		Block::default()
			.borders(Borders::ALL)
			.title(format!(" Stash - {} items ", app.items.len()))
			.border_style(Style::default().fg(Color::Blue)),
	);

	f.render_widget(header, area);
}

fn render_items(f: &mut Frame, area: Rect, app: &App) {
	let header = Row::new(["", "ID", "Name", "Category", "Purchased", "Serial", "Description"])
		.style(Style::default().add_modifier(Modifier::BOLD));

	let rows = app.items.iter().map(|item| {
		let marked = app.marked.contains(&item.id);
		let row = Row::new([
			if marked { "✗" } else { "" }.to_string(),
			item.id.to_string(),
			item.name.clone(),
			item.category.clone().unwrap_or_default(),
			item.purchase_date.clone().unwrap_or_default(),
			item.serial_number.clone().unwrap_or_default(),
			item.description.clone().unwrap_or_default(),
		]);
		if marked {
			row.style(Style::default().fg(Color::Red))
		} else {
			row
		}
	});

	let widths = [
		Constraint::Length(1),
		Constraint::Length(5),
		Constraint::Percentage(25),
		Constraint::Length(14),
		Constraint::Length(11),
		Constraint::Length(16),
		Constraint::Min(10),
	];

	let table = Table::new(rows, widths)
		.header(header)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.border_style(Style::default().fg(Color::Blue)),
		)
		.row_highlight_style(
			Style::default()
				.bg(Color::DarkGray)
				.add_modifier(Modifier::BOLD),
		)
		.highlight_symbol("► ");

	let mut state = TableState::default().with_selected(app.selected);
	f.render_stateful_widget(table, area, &mut state);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
	let text = match (&app.mode, &app.status) {
		(Mode::Search, _) => "Type to search, Enter to keep, Esc to clear".to_string(),
		(_, Some(status)) => status.clone(),
		_ if !app.marked.is_empty() => format!(
			"{} marked  space mark/unmark  d delete marked  Esc clear marks",
			app.marked.len()
		),
		_ => "a add  Enter view  e edit  space mark  d delete  / search  c categories  s sort  x export  h help  q quit"
			.to_string(),
	};

	let footer = Paragraph::new(text)
		.style(Style::default().fg(Color::Gray))
		.alignment(Alignment::Center)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.border_style(Style::default().fg(Color::Blue)),
		);

	f.render_widget(footer, area);
}

fn render_form(f: &mut Frame, form: &ItemForm, app: &App) {
	let area = centered_rect(60, 50, f.area());
	f.render_widget(Clear, area);

	let mut lines = Vec::new();
	for (i, label) in FORM_LABELS.iter().enumerate() {
		let focused = i == form.focus;
		let marker = if focused { "► " } else { "  " };
		let value_style = if focused {
			Style::default().fg(Color::Yellow)
		} else {
			Style::default()
		};

		lines.push(Line::from(vec![
			Span::raw(marker),
			Span::styled(format!("{}: ", label), Style::default().add_modifier(Modifier::BOLD)),
			Span::styled(form.values[i].clone(), value_style),
		]));

		if focused && i == CATEGORY_FIELD {
			lines.push(Line::from(Span::styled(
				format!("    ←/→ {}", app.category_suggestions().join(", ")),
				Style::default().fg(Color::DarkGray),
			)));
		}
	}
	lines.push(Line::from(""));
	lines.push(Line::from(Span::styled(
		"Tab next field  Enter save  Esc cancel",
		Style::default().fg(Color::Gray),
	)));

	let title = match form.editing {
		Some(id) => format!(" Edit item {} ", id),
		None => " New item ".to_string(),
	};

	let popup = Paragraph::new(lines).block(
		Block::default()
			.title(title)
			.borders(Borders::ALL)
			.border_style(Style::default().fg(Color::Green)),
	);
	f.render_widget(popup, area);
}

fn render_detail(f: &mut Frame, id: i32, app: &App) {
	let area = centered_rect(60, 50, f.area());
	f.render_widget(Clear, area);

	let Some(item) = app.item(id) else {
		return;
	};

	let field = |label: &str, value: Option<&str>| {
		Line::from(vec![
			Span::styled(format!("{:<15}", label), Style::default().add_modifier(Modifier::BOLD)),
			Span::raw(value.unwrap_or("").to_string()),
		])
	};

	let mut lines = vec![
		field("Name:", Some(item.name.as_str())),
		field("Category:", item.category.as_deref()),
		field("Purchase date:", item.purchase_date.as_deref()),
		field("Serial number:", item.serial_number.as_deref()),
		Line::from(""),
		Line::from(Span::styled("Description:", Style::default().add_modifier(Modifier::BOLD))),
	];
	lines.extend(
		item.description
			.as_deref()
			.unwrap_or("(no description)")
			.lines()
			.map(|line| Line::from(line.to_string())),
	);
	lines.push(Line::from(""));
	lines.push(Line::from(Span::styled(
		"e edit  d delete  Esc back",
		Style::default().fg(Color::Gray),
	)));

	let popup = Paragraph::new(lines)
		.wrap(Wrap { trim: false })
		.block(
			Block::default()
				.title(format!(" Item {} ", id))
				.borders(Borders::ALL)
				.border_style(Style::default().fg(Color::Green)),
		);
	f.render_widget(popup, area);
}

fn render_category_filter(f: &mut Frame, cursor: usize, app: &App) {
	let area = centered_rect(40, 60, f.area());
	f.render_widget(Clear, area);

	let mut lines: Vec<Line> = app
		.category_suggestions()
		.into_iter()
		.enumerate()
		.map(|(i, category)| {
			let checked = if app.query.categories.contains(&category) {
				"[x]"
			} else {
				"[ ]"
			};
			let style = if i == cursor {
				Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
			} else {
				Style::default()
			};
			Line::from(Span::styled(format!("{} {}", checked, category), style))
		})
		.collect();
	lines.push(Line::from(""));
	lines.push(Line::from(Span::styled(
		"space toggle  C clear  Esc close",
		Style::default().fg(Color::Gray),
	)));

	let popup = Paragraph::new(lines).block(
		Block::default()
			.title(" Categories ")
			.borders(Borders::ALL)
			.border_style(Style::default().fg(Color::Green)),
	);
	f.render_widget(popup, area);
}

fn render_confirm(f: &mut Frame, ids: &[i32], app: &App) {
	let area = centered_rect(40, 20, f.area());
	f.render_widget(Clear, area);

	let question = match ids {
		[id] => {
			let name = app.item(*id).map(|item| item.name.as_str()).unwrap_or("?");
			format!("Delete item {} ({})?", id, name)
		}
		_ => format!("Delete {} items?", ids.len()),
	};

	let popup = Paragraph::new(vec![
		Line::from(question),
		Line::from(""),
		Line::from("y yes  n no"),
	])
	.alignment(Alignment::Center)
	.block(
		Block::default()
			.title(" Confirm ")
			.borders(Borders::ALL)
			.border_style(Style::default().fg(Color::Red)),
	);
	f.render_widget(popup, area);
}

fn render_help(f: &mut Frame) {
	let area = centered_rect(50, 60, f.area());
	f.render_widget(Clear, area);

	let help = Paragraph::new(vec![
		Line::from("Keyboard Shortcuts:"),
		Line::from(""),
		Line::from("  ↑/k ↓/j  - Move selection"),
		Line::from("  a        - Add item"),
		Line::from("  Enter/v  - View item"),
		Line::from("  e        - Edit item"),
		Line::from("  space/m  - Mark item for deletion"),
		Line::from("  d/Del    - Delete marked or selected items"),
		Line::from("  /        - Search"),
		Line::from("  c        - Choose categories"),
		Line::from("  C        - Show all categories"),
		Line::from("  s        - Cycle sort column"),
		Line::from("  r        - Reverse sort"),
		Line::from("  x        - Export CSV"),
		Line::from("  F5       - Refresh"),
		Line::from("  q/Esc    - Quit"),
	])
	.block(
		Block::default()
			.title(" Help ")
			.borders(Borders::ALL)
			.border_style(Style::default().fg(Color::Green)),
	);
	f.render_widget(help, area);
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(r);

	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}
