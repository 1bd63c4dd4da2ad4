pub mod binding;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ipc;
pub mod launcher;

#[cfg(test)]
mod tests;

pub const DEFAULT_HOSTNAME: &str = "127.0.0.1";
pub const DEFAULT_HOST_ADDR: &str = const_format::concatcp!(DEFAULT_HOSTNAME, ":0");
pub const DEFAULT_SERVER_PATH: &str = "/bridge";
