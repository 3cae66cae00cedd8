//! Glyphs and colours for the kinds of records and outcomes the CLI prints

use owo_colors::Style;
use std::sync::OnceLock;

static PALETTE: OnceLock<Palette> = OnceLock::new();

/// Glyphs keyed by what they mark, not how they look
pub struct Glyph;

impl Glyph {
    pub const ACCOUNT: &str = "🗂️";
    pub const SAVED: &str = "✅";
    pub const CAUTION: &str = "⚠️";
    pub const DETAIL: &str = "ℹ️";
    pub const COUNTS: &str = "📊";
    pub const FILE: &str = "📄";
    pub const FOLDER: &str = "📁";
}

/// Styles per record kind and outcome; all plain when stdout is not a terminal
#[derive(Debug, Clone)]
pub struct Palette {
    pub account: Style,
    pub saved: Style,
    pub caution: Style,
    pub folder: Style,
    pub muted: Style,
}

impl Palette {
    fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self {
                account: Style::new(),
                saved: Style::new(),
                caution: Style::new(),
                folder: Style::new(),
                muted: Style::new(),
            };
        }
        Self {
            account: Style::new().magenta().bold(),
            saved: Style::new().green(),
            caution: Style::new().yellow().bold(),
            folder: Style::new().blue().bold(),
            muted: Style::new().dimmed(),
        }
    }
}

pub fn palette() -> &'static Palette {
    PALETTE.get_or_init(Palette::detect)
}
