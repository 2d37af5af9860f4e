mod geometry;
mod manager;
mod types;

pub use geometry::{ANCHOR_GAP, OverlayGeometry, compute_geometry};
pub use manager::PickerManager;
pub use types::{
    PickerChoice, PickerItemView, PickerKeyResult, PickerOptions, PickerSubmitAction, PickerView,
    SelectionValue,
};
