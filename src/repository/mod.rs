pub mod build;
pub mod database;
