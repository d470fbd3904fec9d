pub mod fx_history;
pub mod news;
