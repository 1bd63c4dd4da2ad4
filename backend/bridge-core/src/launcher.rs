//! Whatever shows the front end to the user: a browser, a webview, a test
//! client.

use std::io;

pub trait Launcher: Send + Sync {
    /// Shows `url`.
    fn open(&self, url: &str) -> io::Result<()>;

    /// Called once the server has closed.
    fn close(&self) {}
}
