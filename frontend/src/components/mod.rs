pub mod capture_panel;
pub mod comparison_view;
pub mod handlers;
pub mod header;
pub mod result_panel;
pub mod utils;
