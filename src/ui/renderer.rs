/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame into `front` from a `RenderSnapshot`
///   2. Compare each cell with `back` (the previous frame)
///   3. Emit terminal commands only for cells that changed, batched with
///      `queue!` and flushed once
///   4. Swap front/back
///
/// The renderer only ever sees snapshots, never the live world.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use mazechase::domain::tile::{Position, TileKind};
use mazechase::sim::scores::HighScores;
use mazechase::sim::snapshot::RenderSnapshot;
use mazechase::sim::world::{GameResult, Mode, Outcome, Phase};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Every cell gets this explicit background, never the terminal default,
    /// so cleared areas and drawn areas match exactly.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell; filling `back` with it forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = if bg == Color::Reset { Self::BASE_BG } else { bg };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Screen: everything one frame needs ──

pub struct Screen<'a> {
    pub snapshot: &'a RenderSnapshot,
    pub scores: &'a HighScores,
    pub result: Option<GameResult>,
    pub message: &'a str,
}

// ── Renderer ──

/// Each maze cell is two terminal columns wide so the maze looks square.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const TITLE_FG: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const HI_FG: Color = Color::Rgb { r: 80, g: 255, b: 80 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Keyboard enhancement flags were pushed and must be popped on cleanup.
    key_release: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            key_release: false,
        }
    }

    /// Returns true when the terminal will report key Release events.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        self.key_release = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.key_release {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        tracing::debug!(key_release = self.key_release, "terminal initialized");

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(self.key_release)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.key_release {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, screen: &Screen) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change → clean slate
        let phase = screen.snapshot.phase;
        if self.last_phase != Some(phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(phase);
        }

        self.compose(screen);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn compose(&mut self, screen: &Screen) {
        self.front.clear();
        match screen.snapshot.phase {
            Phase::Menu => self.compose_menu(screen.scores),
            Phase::Running => self.compose_game(screen.snapshot),
            Phase::Paused => {
                self.compose_game(screen.snapshot);
                self.compose_pause_overlay(screen.snapshot);
            }
            Phase::GameOver => {
                self.compose_game(screen.snapshot);
                self.compose_game_over(screen.snapshot.mode, screen.result, screen.scores);
            }
        }
        if !screen.message.is_empty() {
            self.compose_message(screen.message);
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the terminal's own.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) { continue; }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: game ──

    fn compose_game(&mut self, s: &RenderSnapshot) {
        let gait = if s.running { "RUN " } else { "WALK" };
        let mut hud = format!(
            " {}  Score:{:<6}  Time:{:>5.1}s  Stamina:{:>3}/{:<3} {}",
            s.mode.label(), s.score, s.elapsed_secs, s.stamina, s.stamina_max, gait,
        );
        if s.mode == Mode::Escape {
            hud.push_str(&format!("  Traps:{}/{}", s.active_traps, s.max_traps));
        }
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        for row in 0..s.rows {
            let y = MAP_ROW + row;
            if y >= self.front.height { break; }
            for col in 0..s.cols {
                let x = col * CELL_W;
                if x + 1 >= self.front.width { break; }
                let (c0, c1, fg, bg) = cell_glyph(s, Position::new(row, col));
                self.front.set(x, y, Cell::new(c0, fg, bg));
                self.front.set(x + 1, y, Cell::new(c1, fg, bg));
            }
        }

        let help_row = MAP_ROW + s.rows + 1;
        let help = match s.mode {
            Mode::Escape => " Arrows/WASD:Move  Tab:Run  Space:Trap  P:Pause  R:Restart  Esc:Menu",
            Mode::Hunter => " Arrows/WASD:Move  Tab:Run  P:Pause  R:Restart  Q:End hunt  Esc:Menu",
        };
        self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_message(&mut self, message: &str) {
        let row = self.front.height.saturating_sub(1);
        self.front.fill_row(row, MSG_BG);
        self.front.put_str(0, row, &format!(" * {} ", message), Color::Black, MSG_BG);
    }

    fn compose_pause_overlay(&mut self, s: &RenderSnapshot) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let lines = [
            "+------------------------+",
            "|         PAUSED         |",
            "|                        |",
            "|  P    Resume           |",
            "|  R    Restart          |",
            "|  Esc  Back to menu     |",
            "+------------------------+",
        ];
        let box_w = lines[0].len();
        let x = (s.cols * CELL_W).saturating_sub(box_w) / 2;
        let y = MAP_ROW + s.rows.saturating_sub(lines.len()) / 2;
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(x, y + i, line, TITLE_FG, dim);
        }
    }

    fn compose_game_over(&mut self, mode: Mode, result: Option<GameResult>, scores: &HighScores) {
        let bg = Color::Rgb { r: 30, g: 10, b: 10 };
        let (headline, fg) = match result.map(|r| r.outcome) {
            Some(Outcome::Won) => ("ESCAPED!", HI_FG),
            Some(Outcome::Caught) => ("CAUGHT", Color::Rgb { r: 255, g: 60, b: 60 }),
            Some(Outcome::Ended) => ("HUNT OVER", TITLE_FG),
            None => ("GAME OVER", Color::White),
        };
        let mut lines = vec![
            format!("  {headline}"),
            String::new(),
        ];
        if let Some(r) = result {
            lines.push(format!("  Score: {}", r.score));
            lines.push(format!("  Time:  {:.1}s", r.elapsed.as_secs_f64()));
            lines.push(String::new());
        }
        lines.extend(score_table_lines(mode, scores));
        lines.push(String::new());
        lines.push("  Enter: menu   R: play again".to_string());

        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
        for (i, line) in lines.iter().enumerate() {
            let y = MAP_ROW + 1 + i;
            for x in 2..2 + width {
                self.front.set(x, y, Cell::new(' ', fg, bg));
            }
            self.front.put_str(2, y, line, fg, bg);
        }
    }

    // ── Compose: menu ──

    fn compose_menu(&mut self, scores: &HighScores) {
        let title = [
            r"  __  __               ___ _                 ",
            r" |  \/  |__ _ ______  / __| |_  __ _ ___ ___ ",
            r" | |\/| / _` |_ / -_)| (__| ' \/ _` (_-</ -_)",
            r" |_|  |_\__,_/__\___| \___|_||_\__,_/__/\___|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 1 + i, line, TITLE_FG, Color::Reset);
        }

        let menu_base = 7;
        self.front.put_str(6, menu_base, "1   Escape  - reach an exit, dodge the pursuers", HI_FG, Color::Reset);
        self.front.put_str(6, menu_base + 1, "2   Hunter  - catch them before they get out", HI_FG, Color::Reset);
        self.front.put_str(6, menu_base + 2, "Q   Quit", Color::White, Color::Reset);

        let mut y = menu_base + 4;
        for mode in Mode::ALL {
            for line in score_table_lines(mode, scores) {
                self.front.put_str(6, y, &line, Color::White, Color::Reset);
                y += 1;
            }
            y += 1;
        }
    }
}

/// Two terminal glyphs plus colors for one maze cell. Entities are drawn
/// over tiles; the player over enemies.
fn cell_glyph(s: &RenderSnapshot, pos: Position) -> (char, char, Color, Color) {
    if s.player == pos {
        let fg = if s.running { Color::Rgb { r: 255, g: 255, b: 120 } } else { Color::Rgb { r: 120, g: 220, b: 255 } };
        return ('<', '>', fg, Color::Reset);
    }
    if s.enemy_at(pos) {
        let fg = match s.mode {
            Mode::Escape => Color::Rgb { r: 255, g: 70, b: 70 },
            Mode::Hunter => Color::Rgb { r: 255, g: 160, b: 60 },
        };
        return ('{', '}', fg, Color::Reset);
    }
    match s.tile(pos) {
        TileKind::Wall => ('█', '█', Color::Rgb { r: 90, g: 90, b: 110 }, Color::Rgb { r: 60, g: 60, b: 80 }),
        TileKind::Path => (' ', ' ', Color::Reset, Color::Reset),
        TileKind::Vine => ('%', '%', Color::Rgb { r: 60, g: 200, b: 60 }, Color::Rgb { r: 10, g: 40, b: 10 }),
        TileKind::Tunnel => ('=', '=', Color::Rgb { r: 160, g: 130, b: 255 }, Color::Rgb { r: 30, g: 20, b: 50 }),
        TileKind::Exit => ('[', ']', HI_FG, Color::Rgb { r: 10, g: 60, b: 10 }),
        TileKind::Trap => ('^', '^', Color::Rgb { r: 255, g: 120, b: 0 }, Color::Reset),
    }
}

fn score_table_lines(mode: Mode, scores: &HighScores) -> Vec<String> {
    let mut lines = vec![format!("TOP 5 - {}", mode.label())];
    let top = scores.top(mode);
    if top.is_empty() {
        lines.push("  (no scores yet)".to_string());
    }
    for (i, e) in top.iter().enumerate() {
        lines.push(format!("  {}. {:<16} {:>6}  {}", i + 1, e.name, e.score, e.date).trim_end().to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazechase::config::RulesConfig;
    use mazechase::domain::clock::ManualClock;
    use mazechase::sim::generator::fallback_maze;
    use mazechase::sim::scores::ScoreRecord;
    use mazechase::sim::world::WorldState;

    fn renderer(w: usize, h: usize) -> Renderer {
        let mut r = Renderer::new();
        r.front.resize(w, h);
        r.back.resize(w, h);
        r
    }

    fn world(mode: Mode) -> WorldState {
        let rules = RulesConfig { enemy_count: 0, ..RulesConfig::default() };
        let mut w = WorldState::with_seed(rules, Box::new(ManualClock::new()), 1);
        w.start_with_maze(mode, "ana", fallback_maze(12, 18));
        w
    }

    #[test]
    fn game_frame_draws_player_enemy_and_exit() {
        let mut w = world(Mode::Escape);
        w.add_enemy_at(Position::new(6, 1));
        let snap = w.snapshot();
        let scores = HighScores::default();
        let mut r = renderer(80, 24);
        r.compose(&Screen { snapshot: &snap, scores: &scores, result: None, message: "" });

        assert!(r.front.row_text(HUD_ROW).contains("ESCAPE"));
        assert!(r.front.row_text(HUD_ROW).contains("Traps:0/3"));
        let glyph = |row: usize, col: usize| -> String {
            r.front.row_text(MAP_ROW + row).chars().skip(col * CELL_W).take(2).collect()
        };
        assert_eq!(glyph(6, 9), "<>");
        assert_eq!(glyph(6, 1), "{}");
        assert_eq!(glyph(1, 0), "██");
        assert!(r.front.row_text(MAP_ROW).starts_with("[]"));
    }

    #[test]
    fn hunter_hud_has_no_trap_counter() {
        let snap = world(Mode::Hunter).snapshot();
        let scores = HighScores::default();
        let mut r = renderer(100, 30);
        r.compose(&Screen { snapshot: &snap, scores: &scores, result: None, message: "hello" });
        assert!(!r.front.row_text(HUD_ROW).contains("Traps"));
        assert!(r.front.row_text(29).contains("hello"));
    }

    #[test]
    fn menu_lists_both_tables() {
        let mut w = world(Mode::Escape);
        w.abandon();
        let snap = w.snapshot();
        let mut scores = HighScores::default();
        scores.add(ScoreRecord {
            player_name: "alice".into(),
            score: 2100,
            mode: Mode::Escape,
            date: "19/10/2026 14:05".into(),
        });
        let mut r = renderer(80, 30);
        r.compose(&Screen { snapshot: &snap, scores: &scores, result: None, message: "" });

        let text: Vec<String> = (0..30).map(|y| r.front.row_text(y)).collect();
        assert!(text.iter().any(|l| l.contains("TOP 5 - ESCAPE")));
        assert!(text.iter().any(|l| l.contains("TOP 5 - HUNTER")));
        assert!(text.iter().any(|l| l.contains("alice") && l.contains("2100") && l.contains("19/10/2026 14:05")));
    }

    #[test]
    fn cells_outside_the_buffer_are_ignored() {
        let mut fb = FrameBuffer::new(4, 2);
        fb.put_str(2, 1, "abcdef", Color::White, Color::Reset);
        assert_eq!(fb.row_text(1), "  ab");
        fb.set(10, 10, Cell::BLANK);
        assert_eq!(fb.get(10, 10), Cell::BLANK);
    }
}
