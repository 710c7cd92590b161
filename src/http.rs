use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::io::Write;
use std::time::Duration;
use tracing::debug;

/// Network seam used by the catalog client and the installer.
pub trait Transport: Sync + Send {
    /// Stream the body of `url` into `sink` and return the number of bytes
    /// written. Non-2xx responses are errors; the reason is human readable.
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64, String>;
}

pub struct HttpTransport {
    client: Client,
    progress: bool,
}

impl HttpTransport {
    /// `timeout` bounds each whole request, body included, so a stalled
    /// mirror cannot hang the command.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("zvm/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            progress: false,
        })
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn progress_bar(&self, len: Option<u64>, url: &str) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let name = url.rsplit('/').next().unwrap_or(url).to_string();
        match len {
            Some(len) => {
                let pb = ProgressBar::new(len);
                let style = ProgressStyle::with_template(
                    "{msg} [{bar:30}] {bytes}/{total_bytes} ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
                pb.set_style(style);
                pb.set_message(name);
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_message(name);
                pb
            }
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64, String> {
        debug!(url, "GET");
        let mut resp = self.client.get(url).send().map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let pb = self.progress_bar(resp.content_length(), url);
        let mut writer = pb.wrap_write(sink);
        let written = resp.copy_to(&mut writer).map_err(|e| e.to_string());
        pb.finish_and_clear();
        written
    }
}
