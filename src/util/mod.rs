pub mod id;
pub mod time;
#[cfg(test)]
pub mod test_server;
