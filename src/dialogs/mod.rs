pub mod settings;

use ratatui::layout::Rect;

/// A `width` × `height` rectangle centred in `area`, shrunk to leave a
/// two-cell margin when the terminal is small.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width.saturating_sub(4));
    let h = height.min(area.height.saturating_sub(2));
    let x = area.x + area.width.saturating_sub(w) / 2;
    let y = area.y + area.height.saturating_sub(h) / 2;
    Rect::new(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centres_inside_area() {
        let rect = centered_rect(20, 10, Rect::new(0, 0, 100, 40));
        assert_eq!(rect, Rect::new(40, 15, 20, 10));
    }

    #[test]
    fn shrinks_on_small_terminals() {
        let rect = centered_rect(64, 30, Rect::new(0, 0, 40, 12));
        assert_eq!(rect.width, 36);
        assert_eq!(rect.height, 10);
        assert_eq!(rect.x, 2);
    }
}
