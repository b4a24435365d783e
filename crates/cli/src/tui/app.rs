use coinboard_common::types::SortKey;
use crossterm::event::{KeyCode, KeyModifiers};

use super::state::{App, TAB_COIN, TAB_MARKETS};

/// Actions the TUI can perform in response to input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Refresh,
    Tab(usize),
    NextTab,
    PrevTab,
    ScrollUp,
    ScrollDown,
    ToggleHelp,
    Open,
    Back,
    Sort(SortKey),
    NextPage,
    PrevPage,
    NextRange,
    StartFilter,
    FilterInput(char),
    FilterBackspace,
    FilterCommit,
    FilterCancel,
}

/// The parts of [`App`] that decide what a key means.
#[derive(Debug, Clone, Copy)]
pub struct KeyContext {
    pub show_help: bool,
    pub filter_editing: bool,
    pub tab: usize,
}

impl From<&App> for KeyContext {
    fn from(app: &App) -> Self {
        Self {
            show_help: app.show_help,
            filter_editing: app.filter_editing,
            tab: app.tab,
        }
    }
}

/// Map a key press to an Action.
pub fn handle_key(app: &App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    map_key(KeyContext::from(app), code, modifiers)
}

pub fn map_key(ctx: KeyContext, code: KeyCode, modifiers: KeyModifiers) -> Action {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    // Help overlay captures all keys except close
    if ctx.show_help {
        return match code {
            KeyCode::Char('?') | KeyCode::Esc => Action::ToggleHelp,
            _ => Action::None,
        };
    }

    // Filter prompt captures text input
    if ctx.filter_editing {
        return match code {
            KeyCode::Enter => Action::FilterCommit,
            KeyCode::Esc => Action::FilterCancel,
            KeyCode::Backspace => Action::FilterBackspace,
            KeyCode::Char(c) => Action::FilterInput(c),
            _ => Action::None,
        };
    }

    match code {
        // ── Quit ────────────────────────────────────────────
        KeyCode::Char('q') => Action::Quit,

        // ── Refresh ─────────────────────────────────────────
        KeyCode::Char('r') => Action::Refresh,

        // ── Tab switching ───────────────────────────────────
        KeyCode::Char('1') => Action::Tab(TAB_MARKETS),
        KeyCode::Char('2') => Action::Tab(TAB_COIN),
        KeyCode::Tab => Action::NextTab,
        KeyCode::BackTab => Action::PrevTab, // Shift+Tab
        KeyCode::Char('l') | KeyCode::Right => Action::NextTab,
        KeyCode::Char('h') | KeyCode::Left => Action::PrevTab,

        // ── Scroll ──────────────────────────────────────────
        KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
        KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,

        // ── Help ────────────────────────────────────────────
        KeyCode::Char('?') => Action::ToggleHelp,

        _ if ctx.tab == TAB_MARKETS => markets_key(code),
        _ if ctx.tab == TAB_COIN => coin_key(code),
        _ => Action::None,
    }
}

fn markets_key(code: KeyCode) -> Action {
    match code {
        KeyCode::Enter => Action::Open,
        KeyCode::Char('/') => Action::StartFilter,
        KeyCode::Esc => Action::FilterCancel,
        KeyCode::Char(']') | KeyCode::PageDown => Action::NextPage,
        KeyCode::Char('[') | KeyCode::PageUp => Action::PrevPage,
        KeyCode::Char('R') => Action::Sort(SortKey::MarketCapRank),
        KeyCode::Char('P') => Action::Sort(SortKey::CurrentPrice),
        KeyCode::Char('C') => Action::Sort(SortKey::PriceChangePercentage24h),
        KeyCode::Char('M') => Action::Sort(SortKey::MarketCap),
        KeyCode::Char('V') => Action::Sort(SortKey::TotalVolume),
        _ => Action::None,
    }
}

fn coin_key(code: KeyCode) -> Action {
    match code {
        KeyCode::Char('t') => Action::NextRange,
        KeyCode::Esc | KeyCode::Backspace => Action::Back,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(tab: usize) -> KeyContext {
        KeyContext {
            show_help: false,
            filter_editing: false,
            tab,
        }
    }

    #[test]
    fn test_sort_keys_only_on_markets() {
        let none = KeyModifiers::NONE;
        assert_eq!(
            map_key(ctx(TAB_MARKETS), KeyCode::Char('P'), none),
            Action::Sort(SortKey::CurrentPrice)
        );
        assert_eq!(
            map_key(ctx(TAB_MARKETS), KeyCode::Char('C'), none),
            Action::Sort(SortKey::PriceChangePercentage24h)
        );
        assert_eq!(map_key(ctx(TAB_COIN), KeyCode::Char('P'), none), Action::None);
    }

    #[test]
    fn test_filter_prompt_captures_letters() {
        let editing = KeyContext {
            filter_editing: true,
            ..ctx(TAB_MARKETS)
        };
        let none = KeyModifiers::NONE;
        assert_eq!(map_key(editing, KeyCode::Char('q'), none), Action::FilterInput('q'));
        assert_eq!(map_key(editing, KeyCode::Enter, none), Action::FilterCommit);
        assert_eq!(map_key(editing, KeyCode::Esc, none), Action::FilterCancel);
        assert_eq!(
            map_key(editing, KeyCode::Char('c'), KeyModifiers::CONTROL),
            Action::Quit
        );
    }

    #[test]
    fn test_help_overlay_swallows_keys() {
        let help = KeyContext {
            show_help: true,
            ..ctx(TAB_MARKETS)
        };
        assert_eq!(map_key(help, KeyCode::Char('q'), KeyModifiers::NONE), Action::None);
        assert_eq!(map_key(help, KeyCode::Esc, KeyModifiers::NONE), Action::ToggleHelp);
    }

    #[test]
    fn test_coin_tab_keys() {
        let none = KeyModifiers::NONE;
        assert_eq!(map_key(ctx(TAB_COIN), KeyCode::Char('t'), none), Action::NextRange);
        assert_eq!(map_key(ctx(TAB_COIN), KeyCode::Esc, none), Action::Back);
        assert_eq!(map_key(ctx(TAB_MARKETS), KeyCode::Enter, none), Action::Open);
    }
}
