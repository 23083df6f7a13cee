//! Welcome banner: "SCHOOL" in the standard figlet font with a vertical gradient.

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Deep blue (#1e3a8a).
const INK_BLUE: (u8, u8, u8) = (0x1e, 0x3a, 0x8a);
/// Chalk yellow (#fde68a).
const CHALK: (u8, u8, u8) = (0xfd, 0xe6, 0x8a);

/// One color per banner line, ink blue at the top fading to chalk at the bottom.
fn line_colors(lines: usize) -> Vec<(u8, u8, u8)> {
    let steps = lines.saturating_sub(1).max(1) as f64;
    let mix = |from: u8, to: u8, t: f64| {
        (f64::from(from) + (f64::from(to) - f64::from(from)) * t).round() as u8
    };
    (0..lines)
        .map(|i| {
            let t = i as f64 / steps;
            (
                mix(INK_BLUE.0, CHALK.0, t),
                mix(INK_BLUE.1, CHALK.1, t),
                mix(INK_BLUE.2, CHALK.2, t),
            )
        })
        .collect()
}

fn banner_art() -> String {
    FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("SCHOOL").map(|fig| fig.to_string()))
        .unwrap_or_else(|| "SCHOOL RECORDS".to_string())
}

/// Prints the banner followed by the crate version.
pub fn print_welcome() {
    let mut out = stdout();
    let art = banner_art();
    let lines: Vec<&str> = art.lines().collect();

    for (line, (r, g, b)) in lines.iter().zip(line_colors(lines.len())) {
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let version = env!("CARGO_PKG_VERSION");
    let _ = out.execute(Print(format!("school-records v{}\r\n", version)));
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_runs_from_ink_to_chalk() {
        let colors = line_colors(3);
        assert_eq!(colors.first(), Some(&INK_BLUE));
        assert_eq!(colors.last(), Some(&CHALK));
        // Halfway between #1e3a8a and #fde68a.
        assert_eq!(colors[1], (0x8e, 0x90, 0x8a));
    }

    #[test]
    fn single_line_banner_gets_the_top_color() {
        assert_eq!(line_colors(1), [INK_BLUE]);
        assert!(line_colors(0).is_empty());
    }
}
