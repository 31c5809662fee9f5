mod app;
mod hex;

pub use app::run_gui;
pub use hex::{FieldClick, ProviderView};
