pub mod config_modal;
pub mod confirm_modal;
pub mod entry_modal;
pub mod export_modal;
pub mod filter_modal;
