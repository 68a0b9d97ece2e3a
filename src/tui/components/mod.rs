// Components module - UI building blocks
//
// Each component renders one surface from `App` state:
// - Sidebar: uploads and pipeline progress
// - Results panel: stage tabs and the selectable analysis document
// - Query bar: the inline question affordance
// - Chat panel: follow-up conversation
// - Logs overlay, status bar, toast

pub mod chat_panel;
pub mod logs_overlay;
pub mod query_bar;
pub mod results_panel;
pub mod sidebar;
pub mod status_bar;
pub mod toast;

