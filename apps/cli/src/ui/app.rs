//! Terminal UI state and key handling, free of any terminal I/O

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use stash_core::domain::SUGGESTED_CATEGORIES;
use stash_core::{InventoryItem, ItemInput, ItemQuery};
use std::collections::BTreeSet;

pub const FORM_LABELS: [&str; 5] = [
	"Name",
	"Category",
	"Purchase date (YYYY-MM-DD)",
	"Serial number",
	"Description",
];
const FIELD_COUNT: usize = FORM_LABELS.len();
pub const CATEGORY_FIELD: usize = 1;

/// What the event loop should do after a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	None,
	Quit,
	Reload,
	Save { id: Option<i32>, input: ItemInput },
	/// Ascending ids, confirmed once for all of them
	Delete(Vec<i32>),
	Export,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
	Browse,
	Search,
	Form(ItemForm),
	/// Read-only view of one record
	Detail(i32),
	/// Toggle list over [`App::category_suggestions`]
	CategoryFilter { cursor: usize },
	ConfirmDelete(Vec<i32>),
	Help,
}

/// Add/edit form. `editing` is the id being edited, `None` for a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemForm {
	pub editing: Option<i32>,
	pub values: [String; FIELD_COUNT],
	pub focus: usize,
}

impl ItemForm {
	pub fn empty() -> Self {
		Self {
			editing: None,
			values: Default::default(),
			focus: 0,
		}
	}

	pub fn edit(item: &InventoryItem) -> Self {
		let field = |value: &Option<String>| value.clone().unwrap_or_default();
		Self {
			editing: Some(item.id),
			values: [
				item.name.clone(),
				field(&item.category),
				field(&item.purchase_date),
				field(&item.serial_number),
				field(&item.description),
			],
			focus: 0,
		}
	}

	pub fn to_input(&self) -> ItemInput {
		let [name, category, purchase_date, serial_number, description] = self.values.clone();
		ItemInput {
			name,
			category: Some(category),
			purchase_date: Some(purchase_date),
			serial_number: Some(serial_number),
			description: Some(description),
		}
		.normalized()
	}

	fn cycle_category(&mut self, suggestions: &[String], forward: bool) {
		if suggestions.is_empty() {
			return;
		}

		let current = &self.values[CATEGORY_FIELD];
		let next = match suggestions.iter().position(|s| s == current) {
			Some(i) if forward => (i + 1) % suggestions.len(),
			Some(i) => (i + suggestions.len() - 1) % suggestions.len(),
			None if forward => 0,
			None => suggestions.len() - 1,
		};
		self.values[CATEGORY_FIELD] = suggestions[next].clone();
	}
}

pub struct App {
	pub items: Vec<InventoryItem>,
	pub categories: Vec<String>,
	pub selected: Option<usize>,
	pub query: ItemQuery,
	/// Rows marked for a bulk delete
	pub marked: BTreeSet<i32>,
	pub mode: Mode,
	pub status: Option<String>,
}

impl App {
	pub fn new() -> Self {
		Self {
			items: Vec::new(),
			categories: Vec::new(),
			selected: None,
			query: ItemQuery::default(),
			marked: BTreeSet::new(),
			mode: Mode::Browse,
			status: None,
		}
	}

	/// Replace the visible rows, keeping the selection on the same item when
	/// it is still there.
	pub fn set_items(&mut self, items: Vec<InventoryItem>, categories: Vec<String>) {
		let previous_id = self.selected_item().map(|item| item.id);
		let previous_index = self.selected.unwrap_or(0);

		self.items = items;
		self.categories = categories;
		self.marked
			.retain(|id| self.items.iter().any(|item| item.id == *id));
		if let Mode::Detail(id) = self.mode {
			if self.item(id).is_none() {
				self.mode = Mode::Browse;
			}
		}

		self.selected = if self.items.is_empty() {
			None
		} else {
			previous_id
				.and_then(|id| self.items.iter().position(|item| item.id == id))
				.or(Some(previous_index.min(self.items.len() - 1)))
		};
	}

	pub fn selected_item(&self) -> Option<&InventoryItem> {
		self.selected.and_then(|i| self.items.get(i))
	}

	pub fn item(&self, id: i32) -> Option<&InventoryItem> {
		self.items.iter().find(|item| item.id == id)
	}

	pub fn set_status(&mut self, status: impl Into<String>) {
		self.status = Some(status.into());
	}

	/// Called once a submitted form has been saved
	pub fn close_form(&mut self) {
		if let Mode::Form(_) = self.mode {
			self.mode = Mode::Browse;
		}
	}

	/// Suggested categories first, then any others already in use
	pub fn category_suggestions(&self) -> Vec<String> {
		let mut suggestions: Vec<String> =
			SUGGESTED_CATEGORIES.iter().map(|c| c.to_string()).collect();
		for category in &self.categories {
			if !suggestions.contains(category) {
				suggestions.push(category.clone());
			}
		}
		suggestions
	}

	pub fn handle_key(&mut self, key: KeyEvent) -> Action {
		if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
			return Action::Quit;
		}

		match self.mode.clone() {
			Mode::Browse => self.browse_key(key),
			Mode::Search => self.search_key(key),
			Mode::Form(_) => self.form_key(key),
			Mode::Detail(id) => self.detail_key(key, id),
			Mode::CategoryFilter { cursor } => self.filter_key(key, cursor),
			Mode::ConfirmDelete(ids) => self.confirm_key(key, ids),
			Mode::Help => {
				self.mode = Mode::Browse;
				Action::None
			}
		}
	}

	fn browse_key(&mut self, key: KeyEvent) -> Action {
		match key.code {
			KeyCode::Esc if !self.marked.is_empty() => self.marked.clear(),
			KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
			KeyCode::Down | KeyCode::Char('j') => self.select_next(),
			KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
			KeyCode::Char('a') => self.mode = Mode::Form(ItemForm::empty()),
			KeyCode::Enter | KeyCode::Char('v') => {
				if let Some(id) = self.selected_item().map(|item| item.id) {
					self.mode = Mode::Detail(id);
				}
			}
			KeyCode::Char('e') => {
				if let Some(form) = self.selected_item().map(ItemForm::edit) {
					self.mode = Mode::Form(form);
				}
			}
			KeyCode::Char(' ') | KeyCode::Char('m') => self.toggle_mark(),
			KeyCode::Char('d') | KeyCode::Delete => {
				let ids: Vec<i32> = if self.marked.is_empty() {
					self.selected_item().map(|item| item.id).into_iter().collect()
				} else {
					self.marked.iter().copied().collect()
				};
				if !ids.is_empty() {
					self.mode = Mode::ConfirmDelete(ids);
				}
			}
			KeyCode::Char('/') => self.mode = Mode::Search,
			KeyCode::Char('c') => self.mode = Mode::CategoryFilter { cursor: 0 },
			KeyCode::Char('C') => {
				self.query.categories.clear();
				return Action::Reload;
			}
			KeyCode::Char('s') => {
				self.query.sort = self.query.sort.next();
				return Action::Reload;
			}
			KeyCode::Char('r') => {
				self.query.descending = !self.query.descending;
				return Action::Reload;
			}
			KeyCode::Char('x') => return Action::Export,
			KeyCode::F(5) => return Action::Reload,
			KeyCode::Char('h') | KeyCode::Char('?') => self.mode = Mode::Help,
			_ => {}
		}
		Action::None
	}

	fn search_key(&mut self, key: KeyEvent) -> Action {
		match key.code {
			KeyCode::Enter => {
				self.mode = Mode::Browse;
				Action::None
			}
			KeyCode::Esc => {
				self.mode = Mode::Browse;
				self.query.search = None;
				Action::Reload
			}
			KeyCode::Backspace => {
				if let Some(search) = self.query.search.as_mut() {
					search.pop();
					if search.is_empty() {
						self.query.search = None;
					}
				}
				Action::Reload
			}
			KeyCode::Char(c) => {
				self.query.search.get_or_insert_with(String::new).push(c);
				Action::Reload
			}
			_ => Action::None,
		}
	}

	fn form_key(&mut self, key: KeyEvent) -> Action {
		let suggestions = self.category_suggestions();
		let Mode::Form(form) = &mut self.mode else {
			return Action::None;
		};

		match key.code {
			KeyCode::Esc => self.mode = Mode::Browse,
			KeyCode::Enter => {
				return Action::Save {
					id: form.editing,
					input: form.to_input(),
				}
			}
			KeyCode::Tab | KeyCode::Down => form.focus = (form.focus + 1) % FIELD_COUNT,
			KeyCode::BackTab | KeyCode::Up => {
				form.focus = (form.focus + FIELD_COUNT - 1) % FIELD_COUNT
			}
			KeyCode::Right if form.focus == CATEGORY_FIELD => form.cycle_category(&suggestions, true),
			KeyCode::Left if form.focus == CATEGORY_FIELD => form.cycle_category(&suggestions, false),
			KeyCode::Backspace => {
				form.values[form.focus].pop();
			}
			KeyCode::Char(c) => form.values[form.focus].push(c),
			_ => {}
		}
		Action::None
	}

	fn detail_key(&mut self, key: KeyEvent, id: i32) -> Action {
		match key.code {
			KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('v') => {
				self.mode = Mode::Browse
			}
			KeyCode::Char('e') => {
				if let Some(form) = self.item(id).map(ItemForm::edit) {
					self.mode = Mode::Form(form);
				}
			}
			KeyCode::Char('d') | KeyCode::Delete => self.mode = Mode::ConfirmDelete(vec![id]),
			_ => {}
		}
		Action::None
	}

	fn filter_key(&mut self, key: KeyEvent, cursor: usize) -> Action {
		let options = self.category_suggestions();

		match key.code {
			KeyCode::Esc | KeyCode::Char('c') | KeyCode::Char('q') => self.mode = Mode::Browse,
			KeyCode::Down | KeyCode::Char('j') if !options.is_empty() => {
				self.mode = Mode::CategoryFilter {
					cursor: (cursor + 1) % options.len(),
				}
			}
			KeyCode::Up | KeyCode::Char('k') if !options.is_empty() => {
				self.mode = Mode::CategoryFilter {
					cursor: (cursor + options.len() - 1) % options.len(),
				}
			}
			KeyCode::Char(' ') | KeyCode::Enter => {
				if let Some(category) = options.get(cursor) {
					self.query.toggle_category(category);
					return Action::Reload;
				}
			}
			KeyCode::Char('C') => {
				self.query.categories.clear();
				return Action::Reload;
			}
			_ => {}
		}
		Action::None
	}

	fn confirm_key(&mut self, key: KeyEvent, ids: Vec<i32>) -> Action {
		match key.code {
			KeyCode::Char('y') | KeyCode::Char('Y') => {
				self.mode = Mode::Browse;
				self.marked.clear();
				Action::Delete(ids)
			}
			KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
				self.mode = Mode::Browse;
				Action::None
			}
			_ => Action::None,
		}
	}

	fn toggle_mark(&mut self) {
		let Some(id) = self.selected_item().map(|item| item.id) else {
			return;
		};
		if !self.marked.remove(&id) {
			self.marked.insert(id);
		}
		self.select_next();
	}

	fn select_next(&mut self) {
		if self.items.is_empty() {
			return;
		}
		self.selected = Some(match self.selected {
			Some(i) if i + 1 < self.items.len() => i + 1,
			_ => 0,
		});
	}

	fn select_previous(&mut self) {
		if self.items.is_empty() {
			return;
		}
		self.selected = Some(match self.selected {
			Some(0) | None => self.items.len() - 1,
			Some(i) => i - 1,
		});
	}
}
