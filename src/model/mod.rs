pub mod build;
pub mod state;
