use ratatui::layout::Rect;

/// Rows left between the anchor's bottom edge and the panel's top border.
pub const ANCHOR_GAP: u16 = 1;

/// Where the floating panel goes, relative to the terminal area. Height
/// is not part of the geometry: it depends on content and is resolved at
/// draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayGeometry {
    pub top: u16,
    pub left: u16,
    pub width: u16,
}

/// Positions the panel directly below the anchor, spanning its width,
/// clamped to the terminal area. Pure; recomputed on open, scroll and
/// resize so the first paint after any of those is already in place.
pub fn compute_geometry(anchor: Rect, area: Rect) -> OverlayGeometry {
    let top = anchor
        .y
        .saturating_add(anchor.height)
        .saturating_add(ANCHOR_GAP)
        .min(area.y.saturating_add(area.height.saturating_sub(1)));
    let left = anchor.x.clamp(area.x, area.x.saturating_add(area.width));
    let max_width = area.x.saturating_add(area.width).saturating_sub(left);
    let width = anchor.width.max(1).min(max_width);

    OverlayGeometry { top, left, width }
}
