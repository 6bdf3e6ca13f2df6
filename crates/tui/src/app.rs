use std::{
    io, thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use haggle_core::{
    game::SaveError,
    ledger::insta_buy_discount,
    pricing::PricingEngine,
    shop::{ShopSlot, SHOP_SIZE},
    AdvanceKind, AdvanceOutcome, AppConfig, BuildingKind, DayPhase, DayStart, Game, SaveEntry,
    SaveManager, TickOutcome, UpgradeKind,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{sync::mpsc, task::JoinHandle, time};
use tracing::{debug, error, info};

const INPUT_POLL: Duration = Duration::from_millis(50);
const REVEAL_STEP: Duration = Duration::from_millis(80);

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
    legendary: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            legendary: Color::Magenta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
    Shop,
    Town,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TownRow {
    Upgrade(UpgradeKind),
    Building(BuildingKind),
}

fn town_rows() -> Vec<TownRow> {
    UpgradeKind::ALL
        .into_iter()
        .map(TownRow::Upgrade)
        .chain(BuildingKind::ALL.into_iter().map(TownRow::Building))
        .collect()
}

enum AppEvent {
    Input(Event),
    Poll,
    ClockTick(u64),
}

/// Staggered display of the day report rows.
struct ReportReveal {
    shown: usize,
    last_step: Instant,
}

impl ReportReveal {
    fn new() -> Self {
        Self {
            shown: 0,
            last_step: Instant::now(),
        }
    }

    fn step(&mut self, total: usize) {
        if self.shown < total && self.last_step.elapsed() >= REVEAL_STEP {
            self.shown += 1;
            self.last_step = Instant::now();
        }
    }

    fn finish(&mut self, total: usize) {
        self.shown = total;
    }

    fn is_done(&self, total: usize) -> bool {
        self.shown >= total
    }
}

struct GameOverNote {
    day_reached: u32,
    daily_cost: i64,
    cash: i64,
}

struct UiState {
    status: String,
    should_quit: bool,
    panel: Panel,
    town_cursor: usize,
    reveal: Option<ReportReveal>,
    game_over: Option<GameOverNote>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: "Ready".to_string(),
            should_quit: false,
            panel: Panel::Shop,
            town_cursor: 0,
            reveal: None,
            game_over: None,
        }
    }
}

impl UiState {
    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn move_town_cursor(&mut self, delta: isize) {
        let len = town_rows().len() as isize;
        self.town_cursor = (self.town_cursor as isize + delta).rem_euclid(len) as usize;
    }
}

/// Terminal frontend for the trading game.
pub struct HaggleApp {
    game: Game,
    saves: SaveManager,
    active_save: Option<SaveEntry>,
    state: UiState,
    theme: Theme,
    pricing: PricingEngine,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    clock_task: Option<(u64, JoinHandle<()>)>,
}

impl HaggleApp {
    pub fn new(config: AppConfig) -> Self {
        Self {
            game: Game::new(&config),
            saves: SaveManager::new(config.save_dir.clone()),
            active_save: None,
            state: UiState::default(),
            theme: Theme::default(),
            pricing: PricingEngine,
            event_tx: None,
            clock_task: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        match self.saves.entries() {
            Ok(entries) if !entries.is_empty() => self.state.set_status(format!(
                "{} saves found. Press c to continue the latest.",
                entries.len()
            )),
            Ok(_) => self.state.set_status("Press Enter to open your first shop."),
            Err(err) => self.state.set_status(format!("Failed to list saves: {err}")),
        }

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
        }

        self.stop_clock_task();
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                if let Err(err) = self.handle_key(key) {
                    error!(?err, "Command failed");
                    self.state.set_status(format!("Error: {err}"));
                }
            }
            Some(AppEvent::Input(_)) => {}
            Some(AppEvent::Poll) => self.step_reveal(),
            Some(AppEvent::ClockTick(epoch)) => {
                if self.game.tick(epoch) == TickOutcome::DayEnded {
                    self.state.set_status("The sun has set on your trading day.");
                    self.begin_report();
                }
            }
            None => return false,
        }
        self.sync_clock_task();
        true
    }

    /// Keep the tick task in step with the game clock: one task per epoch,
    /// none while the clock is stopped.
    fn sync_clock_task(&mut self) {
        let clock = self.game.clock();
        let (running, epoch, interval) = (clock.is_running(), clock.epoch(), clock.interval());
        if !running {
            self.stop_clock_task();
            return;
        }
        if matches!(self.clock_task, Some((current, _)) if current == epoch) {
            return;
        }
        self.stop_clock_task();
        let Some(sender) = self.event_tx.clone() else {
            return;
        };
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if sender.send(AppEvent::ClockTick(epoch)).await.is_err() {
                    break;
                }
            }
        });
        debug!(epoch, "Clock task started");
        self.clock_task = Some((epoch, handle));
    }

    fn stop_clock_task(&mut self) {
        if let Some((epoch, handle)) = self.clock_task.take() {
            handle.abort();
            debug!(epoch, "Clock task stopped");
        }
    }

    fn step_reveal(&mut self) {
        let total = self.report_len();
        if let Some(reveal) = self.state.reveal.as_mut() {
            reveal.step(total);
        }
    }

    fn report_len(&self) -> usize {
        self.game.report().map_or(0, |report| report.rows.len())
    }

    fn begin_report(&mut self) {
        self.state.reveal = Some(ReportReveal::new());
        self.state.panel = Panel::Shop;
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.handle_global_shortcut(&key)? {
            return Ok(());
        }
        match self.game.phase() {
            DayPhase::Intro => self.handle_intro_key(key),
            DayPhase::Shopping => self.handle_shopping_key(key),
            DayPhase::Reporting => self.handle_report_key(key),
            DayPhase::GameOver => self.handle_game_over_key(key),
            DayPhase::Victory => self.handle_victory_key(key),
        }
    }

    fn handle_global_shortcut(&mut self, key: &KeyEvent) -> Result<bool> {
        if key.modifiers == KeyModifiers::CONTROL {
            match key.code {
                KeyCode::Char('c') => {
                    self.state.should_quit = true;
                    return Ok(true);
                }
                KeyCode::Char('s') => {
                    self.save_game()?;
                    return Ok(true);
                }
                KeyCode::Char('r') => {
                    self.game.reset_game();
                    self.state.reveal = None;
                    self.state.game_over = None;
                    self.active_save = None;
                    self.state.set_status("Started over. Press Enter to begin.");
                    return Ok(true);
                }
                _ => return Ok(false),
            }
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.state.should_quit = true;
                Ok(true)
            }
            KeyCode::Char('d') => {
                let on = self.game.toggle_debug();
                self.state
                    .set_status(format!("Debug mode {}", if on { "on" } else { "off" }));
                Ok(true)
            }
            KeyCode::Char('x') => {
                let path = self.saves.write_export(&self.game.export_game_data())?;
                self.state
                    .set_status(format!("Exported game data to {}", path.display()));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn handle_intro_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter => self.start_game(),
            KeyCode::Char('c') => self.continue_latest()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_shopping_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Tab {
            self.toggle_panel();
            return Ok(());
        }
        if self.state.panel == Panel::Town {
            return self.handle_town_key(key);
        }
        match key.code {
            KeyCode::Char(ch @ '1'..='9') => {
                let index = ch as usize - '1' as usize;
                if index < SHOP_SIZE {
                    self.buy_item(index);
                }
            }
            KeyCode::Char('a') => self.buy_all(),
            KeyCode::Char('n') => self.advance(AdvanceKind::Next),
            KeyCode::Char('s') => self.advance(AdvanceKind::Skip),
            KeyCode::Char('e') => match self.game.end_day().map(|_| ()) {
                Ok(()) => {
                    self.state.set_status("You closed up early.");
                    self.begin_report();
                }
                Err(err) => self.state.set_status(err.to_string()),
            },
            KeyCode::Char('g') if self.game.debug_mode() => match self.game.generate_shop() {
                Ok(()) => self.state.set_status("Shop re-rolled"),
                Err(err) => self.state.set_status(err.to_string()),
            },
            _ => {}
        }
        Ok(())
    }

    fn handle_town_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.state.move_town_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.state.move_town_cursor(1),
            KeyCode::Enter | KeyCode::Char('b') => self.buy_town_row(),
            _ => {}
        }
        Ok(())
    }

    fn handle_report_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Tab {
            self.toggle_panel();
            return Ok(());
        }
        if self.state.panel == Panel::Town {
            return self.handle_town_key(key);
        }
        let total = self.report_len();
        let revealing = self
            .state
            .reveal
            .as_ref()
            .map_or(false, |reveal| !reveal.is_done(total));
        if revealing {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                if let Some(reveal) = self.state.reveal.as_mut() {
                    reveal.finish(total);
                }
            }
            return Ok(());
        }
        if key.code == KeyCode::Enter {
            self.start_next_day()?;
        }
        Ok(())
    }

    fn handle_game_over_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Enter {
            self.state.game_over = None;
            self.active_save = None;
            self.start_game();
        }
        Ok(())
    }

    fn handle_victory_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Enter {
            self.game.reset_game();
            self.active_save = None;
            self.state.set_status("A new legend begins. Press Enter to start.");
        }
        Ok(())
    }

    fn toggle_panel(&mut self) {
        self.state.panel = match self.state.panel {
            Panel::Shop => Panel::Town,
            Panel::Town => Panel::Shop,
        };
    }

    fn start_game(&mut self) {
        match self.game.start_game() {
            Ok(epoch) => {
                info!(epoch, day = self.game.day(), "Play started");
                self.state.panel = Panel::Shop;
                self.state
                    .set_status(format!("Day {} begins. Buy low!", self.game.day()));
            }
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn buy_item(&mut self, index: usize) {
        match self.game.buy_item(index) {
            Ok(purchase) if purchase.victory => {
                self.state
                    .set_status("You bought the Potion of Immortality. You win!");
            }
            Ok(purchase) => {
                let name = self
                    .game
                    .shop()
                    .slots()
                    .get(purchase.index)
                    .map(|slot| slot.item.name().to_string())
                    .unwrap_or_default();
                self.state.set_status(format!(
                    "Bought {name} for {}",
                    format_currency(purchase.price)
                ));
            }
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn buy_all(&mut self) {
        match self.game.buy_all_shop() {
            Ok(bulk) if bulk.victory => {
                self.state
                    .set_status("The legendary item was in the lot. You win!");
            }
            Ok(bulk) => self.state.set_status(format!(
                "Bought {} items for {} ({}% off, saved {})",
                bulk.count,
                format_currency(bulk.total),
                bulk.discount_percent,
                format_currency(bulk.saved)
            )),
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn advance(&mut self, kind: AdvanceKind) {
        match self.game.advance_shop(kind) {
            Ok(AdvanceOutcome::Advanced { cost }) => self.state.set_status(format!(
                "Travelled for {cost:.0}s to a tier {} shop",
                self.game.tier()
            )),
            Ok(AdvanceOutcome::DayOver) => {
                self.state
                    .set_status("Not enough daylight left to travel. The day is over.");
                self.begin_report();
            }
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn buy_town_row(&mut self) {
        let Some(row) = town_rows().get(self.state.town_cursor).copied() else {
            return;
        };
        let result = match row {
            TownRow::Upgrade(kind) => self
                .game
                .buy_upgrade(kind)
                .map(|level| format!("{} upgraded to level {level}", kind.label())),
            TownRow::Building(kind) => self
                .game
                .buy_building(kind)
                .map(|count| format!("You now own {count} {}", kind.label())),
        };
        match result {
            Ok(message) => self.state.set_status(message),
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn start_next_day(&mut self) -> Result<()> {
        match self.game.start_next_day() {
            Ok(DayStart::Started {
                day,
                passive_income,
                daily_cost,
            }) => {
                self.state.reveal = None;
                self.state.set_status(format!(
                    "Day {day}: paid {} upkeep, buildings earned {}",
                    format_currency(daily_cost),
                    format_currency(passive_income)
                ));
                self.autosave()?;
            }
            Ok(DayStart::GameOver {
                day_reached,
                daily_cost,
                cash,
            }) => {
                self.state.reveal = None;
                self.state.game_over = Some(GameOverNote {
                    day_reached,
                    daily_cost,
                    cash,
                });
                self.state.set_status("Game over");
            }
            Err(err) => self.state.set_status(err.to_string()),
        }
        Ok(())
    }

    fn save_game(&mut self) -> Result<()> {
        let ledger = match self.game.save_game() {
            Ok(ledger) => ledger,
            Err(SaveError::Unavailable(phase)) => {
                debug!(?phase, "Save refused");
                self.state
                    .set_status("Saving is available again once the next day starts.");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let entry = match &self.active_save {
            Some(entry) => self.saves.update_save(entry, ledger)?,
            None => self.saves.create_save(ledger, None)?,
        };
        self.state
            .set_status(format!("Saved '{}' to {}", entry.name, entry.path.display()));
        self.active_save = Some(entry);
        Ok(())
    }

    fn autosave(&mut self) -> Result<()> {
        if let Some(entry) = &self.active_save {
            let ledger = self.game.save_game()?;
            self.active_save = Some(self.saves.update_save(entry, ledger)?);
        }
        Ok(())
    }

    fn continue_latest(&mut self) -> Result<()> {
        let Some(entry) = self.saves.latest()? else {
            self.state.set_status("No saves yet");
            return Ok(());
        };
        let payload = self.saves.load(&entry)?;
        if self.game.load_value(payload.into_ledger()) {
            self.state.set_status(format!(
                "Loaded '{}' (day {}). Press Enter to resume.",
                entry.name, entry.day
            ));
            self.active_save = Some(entry);
        } else {
            self.state
                .set_status(format!("Save '{}' is damaged and was not loaded", entry.name));
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_header(frame, layout[0]);
        match self.game.phase() {
            DayPhase::Intro => self.render_intro(frame, layout[1]),
            DayPhase::Shopping => self.render_play(frame, layout[1]),
            DayPhase::Reporting => {
                if self.state.panel == Panel::Town {
                    self.render_town(frame, layout[1]);
                } else {
                    self.render_report(frame, layout[1]);
                }
            }
            DayPhase::GameOver => self.render_game_over(frame, layout[1]),
            DayPhase::Victory => self.render_victory(frame, layout[1]),
        }
        self.render_status(frame, layout[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        let ledger = self.game.ledger();
        let summary = Line::from(vec![
            Span::styled(
                format!(" Day {} ", ledger.day()),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  Cash "),
            Span::styled(
                format_currency(ledger.cash()),
                Style::default()
                    .fg(self.theme.success)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  Tier {}", ledger.tier())),
            Span::styled(
                format!("  +{}/day", format_currency(ledger.passive_income())),
                Style::default().fg(self.theme.muted),
            ),
        ]);
        frame.render_widget(
            Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title("Haggle")),
            columns[0],
        );

        let max = ledger.max_day_time();
        let remaining = ledger.time_remaining();
        let ratio = if max > 0.0 {
            (remaining / max).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let color = if self.game.is_time_low() {
            self.theme.danger
        } else {
            self.theme.warning
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Daylight"))
            .gauge_style(Style::default().fg(color))
            .ratio(ratio)
            .label(format!("{remaining:.1}s"));
        frame.render_widget(gauge, columns[1]);
    }

    fn render_intro(&self, frame: &mut Frame, area: Rect) {
        let ledger = self.game.ledger();
        let lines = vec![
            Line::from(Span::styled(
                "H A G G L E",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Buy trinkets from roadside shops and sell them at market value."),
            Line::from("Every shop hides at least one bad deal. Upkeep grows each day."),
            Line::from(""),
            Line::from(format!(
                "Starting with {} on day {}.",
                format_currency(ledger.cash()),
                ledger.day()
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Enter: start   c: continue latest save   q: quit",
                Style::default().fg(self.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_play(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(area);
        self.render_shop(frame, columns[0]);
        self.render_town(frame, columns[1]);
    }

    fn render_shop(&self, frame: &mut Frame, area: Rect) {
        let shop = self.game.shop();
        let hint = self.game.best_deal_hint();
        let mut lines: Vec<Line> = shop
            .slots()
            .iter()
            .enumerate()
            .map(|(index, slot)| self.shop_line(index, slot, hint == Some(index)))
            .collect();

        lines.push(Line::from(""));
        let insta = self.game.ledger().upgrade_level(UpgradeKind::InstaBuy);
        let mut keys = format!(
            "n: next shop (-{:.0}s)  s: skip ahead (-{:.0}s)  e: end day",
            self.game.advance_cost(AdvanceKind::Next),
            self.game.advance_cost(AdvanceKind::Skip)
        );
        if insta > 0 {
            keys.push_str(&format!("  a: buy all (-{}%)", insta_buy_discount(insta)));
        }
        lines.push(Line::from(Span::styled(
            keys,
            Style::default().fg(self.theme.muted),
        )));
        if self.game.debug_mode() {
            lines.extend(self.debug_lines());
        }

        let title = if shop.is_legendary() {
            "A legendary merchant!".to_string()
        } else {
            format!("Shop, tier {}", self.game.tier())
        };
        let border = if self.state.panel == Panel::Shop {
            self.theme.accent
        } else {
            self.theme.muted
        };
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title(title),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn shop_line(&self, index: usize, slot: &ShopSlot, best: bool) -> Line<'static> {
        let item = &slot.item;
        let visuals = self.pricing.visuals(item);
        let base_color = parse_hex_color(&item.template.color).unwrap_or(self.theme.primary_fg);
        let name_color = if slot.bought {
            self.theme.muted
        } else if item.is_legendary {
            self.theme.legendary
        } else {
            scale_color(base_color, visuals.brightness)
        };

        let mut spans = vec![
            Span::styled(
                format!("[{}] ", index + 1),
                Style::default().fg(self.theme.muted),
            ),
            Span::raw(format!("{} ", item.template.glyph)),
            Span::styled(
                format!("{:<18}", item.name()),
                Style::default().fg(name_color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{:>10}", format_currency(item.shop_price))),
            Span::styled(
                format!("  {}", grime_marks(visuals.griminess)),
                Style::default().fg(self.theme.muted),
            ),
        ];
        if let Some(knowledge) = self.game.ledger().knowledge().get(item.name()) {
            if knowledge.is_unlocked() {
                spans.push(Span::styled(
                    format!("  base {}", format_currency(knowledge.base_value)),
                    Style::default().fg(self.theme.accent),
                ));
            }
        }
        if slot.bought {
            spans.push(Span::styled(
                "  SOLD",
                Style::default().fg(self.theme.muted),
            ));
        } else if slot.overpriced {
            spans.push(Span::styled(
                "  overpriced",
                Style::default().fg(self.theme.danger),
            ));
        }
        if best && !slot.bought {
            spans.push(Span::styled(
                "  ★ best deal",
                Style::default().fg(self.theme.success),
            ));
        }
        if self.game.debug_mode() {
            let info = self.pricing.profit(item);
            let color = if info.is_profitable {
                self.theme.success
            } else {
                self.theme.danger
            };
            spans.push(Span::styled(
                format!(
                    "  mv {} ({:+.0}%)",
                    format_currency(item.market_value),
                    info.profit_percent * 100.0
                ),
                Style::default().fg(color),
            ));
        }
        Line::from(spans)
    }

    fn debug_lines(&self) -> Vec<Line<'static>> {
        let ledger = self.game.ledger();
        let stats = self.game.day_stats();
        let style = Style::default().fg(self.theme.warning);
        vec![
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "debug: epoch {} streak {} best {:?} legendary {}",
                    self.game.clock().epoch(),
                    ledger.skip_streak(),
                    self.game.shop().best_deal(),
                    self.game.shop().is_legendary()
                ),
                style,
            )),
            Line::from(Span::styled(
                format!(
                    "today: {} items, spent {}, worth {}, efficiency {:.0}%",
                    stats.items_purchased,
                    format_currency(stats.total_spent),
                    format_currency(stats.total_earned),
                    self.game.time_efficiency()
                ),
                style,
            )),
        ]
    }

    fn render_town(&self, frame: &mut Frame, area: Rect) {
        let ledger = self.game.ledger();
        let focused = self.state.panel == Panel::Town;
        let mut lines = Vec::new();
        for (index, row) in town_rows().into_iter().enumerate() {
            let (label, detail) = match row {
                TownRow::Upgrade(kind) => {
                    let level = ledger.upgrade_level(kind);
                    let cost = kind
                        .next_cost(level)
                        .map(format_currency)
                        .unwrap_or_else(|| "max".to_string());
                    (
                        kind.label().to_string(),
                        format!("{level}/{}  {cost}", kind.max_level()),
                    )
                }
                TownRow::Building(kind) => (
                    kind.label().to_string(),
                    format!(
                        "x{}  {}",
                        ledger.building_count(kind),
                        format_currency(kind.unit_cost())
                    ),
                ),
            };
            let selected = focused && index == self.state.town_cursor;
            let style = if selected {
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.primary_fg)
            };
            lines.push(Line::from(Span::styled(
                format!("{} {label:<16}{detail:>14}", if selected { "▶" } else { " " }),
                style,
            )));
        }

        if let Some(TownRow::Upgrade(kind)) = town_rows().get(self.state.town_cursor).copied() {
            if focused {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    kind.description(),
                    Style::default().fg(self.theme.muted),
                )));
            }
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Tab: switch panel  ↑↓: select  Enter: buy",
            Style::default().fg(self.theme.muted),
        )));

        let border = if focused {
            self.theme.accent
        } else {
            self.theme.muted
        };
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title("Town"),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_report(&self, frame: &mut Frame, area: Rect) {
        let Some(report) = self.game.report() else {
            return;
        };
        let shown = self
            .state
            .reveal
            .as_ref()
            .map_or(report.rows.len(), |reveal| reveal.shown);

        let mut lines = Vec::new();
        if report.rows.is_empty() {
            lines.push(Line::from(Span::styled(
                "You bought nothing today.",
                Style::default().fg(self.theme.muted),
            )));
        }
        for row in report.rows.iter().take(shown) {
            let color = if row.profit >= 0 {
                self.theme.success
            } else {
                self.theme.danger
            };
            let mut spans = vec![
                Span::raw(format!("{:<20}", row.name)),
                Span::raw(format!("paid {:>9}", format_currency(row.paid))),
                Span::raw(format!("  sold {:>9}", format_currency(row.market_value))),
                Span::styled(
                    format!("  {:>+9}", row.profit),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ];
            if row.loss_reverted {
                spans.push(Span::styled(
                    "  ↺ loss reverted",
                    Style::default().fg(self.theme.accent),
                ));
            }
            lines.push(Line::from(spans));
        }

        if shown >= report.rows.len() {
            let ledger = self.game.ledger();
            let total_color = if report.total_profit >= 0 {
                self.theme.success
            } else {
                self.theme.danger
            };
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::raw("Total profit "),
                Span::styled(
                    format!("{:+}", report.total_profit),
                    Style::default()
                        .fg(total_color)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    "   revenue {}   balance {}",
                    format_currency(report.revenue),
                    format_currency(report.balance)
                )),
            ]));
            for name in &report.unlocked {
                lines.push(Line::from(Span::styled(
                    format!("You now know what a {name} is really worth."),
                    Style::default().fg(self.theme.accent),
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!(
                    "Enter: next day (upkeep {}, income {})   Tab: visit town",
                    format_currency(ledger.daily_cost()),
                    format_currency(ledger.passive_income())
                ),
                Style::default().fg(self.theme.muted),
            )));
        } else {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Space: skip",
                Style::default().fg(self.theme.muted),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Day {} report", report.day)),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_game_over(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(Span::styled(
                "GAME OVER",
                Style::default()
                    .fg(self.theme.danger)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        if let Some(note) = &self.state.game_over {
            lines.push(Line::from(format!(
                "You reached day {} but could not pay {} upkeep with {}.",
                note.day_reached,
                format_currency(note.daily_cost),
                format_currency(note.cash)
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter: try again   q: quit",
            Style::default().fg(self.theme.muted),
        )));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_victory(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(Span::styled(
                "VICTORY",
                Style::default()
                    .fg(self.theme.legendary)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!(
                "The Potion of Immortality is yours, on day {} with {} to spare.",
                self.game.day(),
                format_currency(self.game.cash())
            )),
        ];
        let achievements = self.game.achievements();
        if !achievements.is_empty() {
            lines.push(Line::from(""));
            for achievement in achievements {
                lines.push(Line::from(Span::styled(
                    format!("★ {}", achievement.title()),
                    Style::default().fg(self.theme.warning),
                )));
            }
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "x: export   Enter: new game   q: quit",
            Style::default().fg(self.theme.muted),
        )));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let secondary = match &self.active_save {
            Some(entry) => format!("Save: {}  (auto-saved each morning)", entry.name),
            None => "Ctrl-S save  x export  d debug  Ctrl-R restart  q quit".to_string(),
        };
        let paragraph = Paragraph::new(vec![
            Line::from(self.state.status.clone()),
            Line::from(Span::styled(
                secondary,
                Style::default().fg(self.theme.muted),
            )),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(INPUT_POLL) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Poll).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn parse_hex_color(input: &str) -> Option<Color> {
    let hex = input.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

fn scale_color(color: Color, factor: f64) -> Color {
    match color {
        Color::Rgb(r, g, b) => {
            let scale = |channel: u8| (f64::from(channel) * factor).round().clamp(0.0, 255.0) as u8;
            Color::Rgb(scale(r), scale(g), scale(b))
        }
        other => other,
    }
}

fn grime_marks(griminess: f64) -> &'static str {
    if griminess >= 0.4 {
        "▓▓▓"
    } else if griminess >= 0.25 {
        "▒▒ "
    } else if griminess >= 0.1 {
        "░  "
    } else {
        "   "
    }
}

fn format_currency(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
