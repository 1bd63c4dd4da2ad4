//! Opens the demo page in the system browser.

use bridge_core::launcher::Launcher;

use std::io;
use std::process::Stdio;

use log::info;
use tokio::process::Command as TokioCommand;

/// Hands the URL to the platform's default opener.
///
/// `open` must run inside a Tokio runtime; the opener is left running once
/// spawned.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl SystemBrowser {
    /// The opener program and its arguments for `url`.
    pub fn command_for(url: &str) -> (&'static str, Vec<String>) {
        if cfg!(target_os = "windows") {
            ("cmd", vec!["/C".into(), "start".into(), String::new(), url.into()])
        } else if cfg!(target_os = "macos") {
            ("open", vec![url.into()])
        } else {
            ("xdg-open", vec![url.into()])
        }
    }
}

impl Launcher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        let (program, args) = Self::command_for(url);
        info!("Opening {url} with {program}");
        TokioCommand::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }

    fn close(&self) {
        info!("Server closed; the browser tab can be closed");
    }
}
