pub mod build;
pub mod dispatch;
pub mod storage;
