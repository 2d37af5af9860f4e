mod chrome;
mod layout;
mod overlay;

pub use chrome::{ANCHOR_ROW, anchor_rect, assignee_display, draw_chrome, max_form_scroll};
pub use layout::{UiLayout, split_layout};
pub use overlay::{
    MAX_LIST_ROWS, draw_picker_overlay, list_capacity, list_row_at, panel_rect, sentinel_visible,
};
