pub mod fractal_view;
pub mod hud_message;
pub mod overlay;
