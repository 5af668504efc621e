//! Ayu color theme and styling functions for dbsafe terminal output.
//!
//! Color source: <https://github.com/ayu-theme/ayu-colors>
//!
//! Design principles:
//! - Risk drives color: SAFE green, CAUTION yellow, DANGEROUS red
//! - Methods that need tooling (gh-ost, pt-osc) get the accent color
//! - Small Unicode symbols for icons, NOT emoji blobs

use dbsafe_core::enums::{ExecutionMethod, RiskLevel};
use owo_colors::OwoColorize;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Ayu Dark color palette (RGB values)
// ---------------------------------------------------------------------------

const SAFE: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c - bright green
const CAUTION: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454 - bright yellow
const DANGER: (u8, u8, u8) = (0xf0, 0x71, 0x78); // #f07178 - bright red
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680 - muted gray
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff - bright blue

// Icons
pub const ICON_SAFE: &str = "\u{2713}"; // ✓
pub const ICON_CAUTION: &str = "\u{26A0}"; // ⚠
pub const ICON_DANGER: &str = "\u{2716}"; // ✖
pub const ICON_INFO: &str = "\u{2139}"; // ℹ

// Separators
pub const SEPARATOR_LIGHT: &str = "\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}";

// ---------------------------------------------------------------------------
// Helper: apply truecolor only when color is supported
// ---------------------------------------------------------------------------

fn color_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

fn color_bold_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).bold().to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Semantic render helpers
// ---------------------------------------------------------------------------

/// Renders a risk level with its icon, bold-colored by severity.
pub fn render_risk(risk: RiskLevel) -> String {
    let (icon, rgb) = match risk {
        RiskLevel::Safe => (ICON_SAFE, SAFE),
        RiskLevel::Caution => (ICON_CAUTION, CAUTION),
        RiskLevel::Dangerous => (ICON_DANGER, DANGER),
    };
    color_bold_str(&format!("{} {}", icon, risk.as_str()), rgb)
}

/// Renders an execution method; OSC tools get the accent color.
pub fn render_method(method: ExecutionMethod) -> String {
    if method.is_osc_tool() {
        color_str(method.as_str(), ACCENT)
    } else {
        render_bold(method.as_str())
    }
}

/// Renders a warning line.
pub fn render_warning(s: &str) -> String {
    color_str(&format!("{} {}", ICON_CAUTION, s), CAUTION)
}

/// Renders a cluster warning line (danger-colored: clusters amplify impact).
pub fn render_cluster_warning(s: &str) -> String {
    color_str(&format!("{} {}", ICON_DANGER, s), DANGER)
}

/// Renders muted/secondary text.
pub fn render_muted(s: &str) -> String {
    color_str(s, MUTED)
}

/// Renders an accent-colored section header in uppercase.
pub fn render_section(s: &str) -> String {
    color_bold_str(&s.to_uppercase(), ACCENT)
}

/// Renders text in bold.
pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

/// Renders the light separator line in muted color.
pub fn render_separator() -> String {
    render_muted(SEPARATOR_LIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    // NO_COLOR may or may not be set in the test environment; assert on
    // content, not on escape codes.

    #[test]
    fn risk_rendering_contains_label() {
        assert!(render_risk(RiskLevel::Safe).contains("SAFE"));
        assert!(render_risk(RiskLevel::Caution).contains("CAUTION"));
        assert!(render_risk(RiskLevel::Dangerous).contains("DANGEROUS"));
    }

    #[test]
    fn method_rendering_contains_label() {
        assert!(render_method(ExecutionMethod::Direct).contains("DIRECT"));
        assert!(render_method(ExecutionMethod::Ghost).contains("GHOST"));
        assert!(render_method(ExecutionMethod::PtOsc).contains("PTOSC"));
    }

    #[test]
    fn warning_rendering_keeps_text() {
        let w = render_warning("charset change forces a rewrite");
        assert!(w.contains("charset change forces a rewrite"));
    }

    #[test]
    fn section_is_uppercased() {
        assert!(render_section("rollback").contains("ROLLBACK"));
    }
}
