mod storage;

pub use self::storage::*;
