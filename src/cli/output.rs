// Output formatting utilities

use crate::board::{BoardView, CardView, StageView};
use crate::models::{Stage, StageTransition};
use crate::utils::{format_brl, format_datetime, format_idle};
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_FG_GREEN: &str = "\x1b[32m";
const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";
const ANSI_FG_BRIGHT_BLACK: &str = "\x1b[90m";

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

/// Rendering options for the board
#[derive(Debug, Clone, Copy)]
pub struct BoardRenderOptions {
    pub color: bool,
    pub width: usize,
}

impl BoardRenderOptions {
    /// Color follows the rc override, then TTY detection
    pub fn detect(color_override: Option<bool>) -> Self {
        let tty = is_tty();
        Self {
            color: color_override.unwrap_or(tty),
            width: get_terminal_width(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false, width: 120 }
    }
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("{}{}{}", code, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Truncate to `max` characters, marking the cut with `…`
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

fn stage_color(stage: Stage) -> &'static str {
    match stage {
        Stage::Ganho => ANSI_FG_GREEN,
        Stage::Perdido => ANSI_FG_RED,
        _ => ANSI_BOLD,
    }
}

fn format_card(card: &CardView, options: &BoardRenderOptions) -> String {
    let lead = card.lead_name.as_deref().unwrap_or("(no lead)");
    let property = card.property_title.as_deref().unwrap_or("-");
    let price = card.price_cents.map(format_brl).unwrap_or_else(|| "-".to_string());
    let idle = format_idle(card.idle_days);

    // Fixed columns: id(6) + idle(8) + price(18) + stale mark(8) + spacing
    let flexible = options.width.saturating_sub(48).max(20);
    let lead_width = flexible * 2 / 5;
    let property_width = flexible - lead_width;

    let line = format!(
        "  {:>4}  {:<lead_w$}  {:<prop_w$}  {:>16}  {:>6}",
        card.id,
        truncate(lead, lead_width),
        truncate(property, property_width),
        price,
        idle,
        lead_w = lead_width,
        prop_w = property_width,
    );

    if card.stale {
        format!("{}  {}", line, paint("stale", ANSI_FG_YELLOW, options.color))
    } else {
        line
    }
}

/// Format one stage column
pub fn format_stage(view: &StageView, options: &BoardRenderOptions) -> String {
    let header = format!(
        "{} ({}) {}",
        view.label,
        view.count,
        format_brl(view.total_cents)
    );
    let mut out = paint(&header, stage_color(view.stage), options.color);
    out.push('\n');

    if view.cards.is_empty() {
        out.push_str(&paint("  (empty)", ANSI_FG_BRIGHT_BLACK, options.color));
        out.push('\n');
    }
    for card in &view.cards {
        out.push_str(&format_card(card, options));
        out.push('\n');
    }
    out
}

/// Format the whole board, one stage section after another
pub fn format_board(board: &BoardView, options: &BoardRenderOptions) -> String {
    let mut sections: Vec<String> = board
        .stages
        .iter()
        .map(|stage| format_stage(stage, options))
        .collect();
    sections.push(format!(
        "{} negotiations, {} in pipeline",
        board.total_count,
        format_brl(board.total_cents)
    ));
    sections.join("\n")
}

/// Format the stage list with wire codes
pub fn format_stages() -> String {
    let mut out = String::new();
    for stage in Stage::ALL {
        let closed = if stage.is_closed() { "  (closed)" } else { "" };
        out.push_str(&format!(
            "{:>2}  {:<18} {}{}\n",
            stage.position() + 1,
            stage.as_str(),
            stage.label(),
            closed
        ));
    }
    out
}

/// Format the stage transitions of one negotiation
pub fn format_history(id: i64, transitions: &[StageTransition]) -> String {
    if transitions.is_empty() {
        return format!("No stage history for negotiation {}.\n", id);
    }

    let mut out = format!("Negotiation {}\n", id);
    for t in transitions {
        let from = t.from_stage.map(|s| s.label()).unwrap_or("(created)");
        out.push_str(&format!(
            "  {}  {} -> {}\n",
            format_datetime(t.changed_ts),
            from,
            t.to_stage.label()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Board, LeadRef, NegotiationRecord, PropertyRef, SECS_PER_DAY};
    use crate::store::PipelineState;

    const NOW: i64 = 1_800_000_000;

    fn sample_board() -> BoardView {
        let mut board = Board::new();
        board.insert(
            Stage::Qualificado,
            vec![NegotiationRecord {
                id: 3,
                stage: Stage::Qualificado,
                order_hint: None,
                lead: Some(LeadRef { id: 1, name: "Ana Souza".into(), phone: None }),
                property: Some(PropertyRef { id: 1, title: "Apto Centro".into(), price_cents: Some(45_000_000) }),
                updated_ts: NOW - 10 * SECS_PER_DAY,
            }],
        );
        let state = PipelineState::from_board(board).unwrap();
        BoardView::project(&state, NOW, None)
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long title", 6), "a lon…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_format_board_plain() {
        let out = format_board(&sample_board(), &BoardRenderOptions::plain());
        assert!(out.contains("Qualificado (1) R$ 450.000,00"));
        assert!(out.contains("Ana Souza"));
        assert!(out.contains("Apto Centro"));
        assert!(out.contains("10d"));
        assert!(out.contains("stale"));
        assert!(out.contains("Novo Lead (0) R$ 0,00"));
        assert!(out.contains("1 negotiations, R$ 450.000,00 in pipeline"));
        assert!(!out.contains("\x1b["));
    }

    #[test]
    fn test_format_board_color() {
        let options = BoardRenderOptions { color: true, width: 120 };
        let out = format_board(&sample_board(), &options);
        assert!(out.contains(ANSI_RESET));
    }

    #[test]
    fn test_format_stages_lists_all() {
        let out = format_stages();
        assert_eq!(out.lines().count(), Stage::ALL.len());
        assert!(out.lines().next().unwrap().contains("NOVO_LEAD"));
        assert!(out.contains("GANHO"));
        assert!(out.contains("(closed)"));
    }

    #[test]
    fn test_format_history() {
        assert!(format_history(9, &[]).contains("No stage history for negotiation 9"));

        let out = format_history(
            2,
            &[
                StageTransition { negotiation_id: 2, from_stage: None, to_stage: Stage::NovoLead, changed_ts: NOW },
                StageTransition {
                    negotiation_id: 2,
                    from_stage: Some(Stage::NovoLead),
                    to_stage: Stage::Qualificado,
                    changed_ts: NOW + 60,
                },
            ],
        );
        assert!(out.contains("(created) -> Novo Lead"));
        assert!(out.contains("Novo Lead -> Qualificado"));
    }
}
