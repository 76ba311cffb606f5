//! Default desktop implementations of the capability traits.
//!
//! [`DesktopControl`] shells out to the platform's standard tools
//! (`xdg-open`/`open`/`cmd start`, `pkill`/`taskkill`, …) — best-effort OS
//! glue, not a process-management layer. [`HttpIotTransport`] sends HTTP
//! IoT payloads via `reqwest`; MQTT and Serial transports are reported as
//! unavailable and must be supplied by the embedding application.

use crate::capability::{HttpMethod, IotTransport, SystemControl};
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tracing::info;

/// Desktop OS control via standard platform tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopControl;

impl DesktopControl {
    fn open_with_default_handler(&self, target: &str) -> Result<()> {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", "", target]);
            c
        } else if cfg!(target_os = "macos") {
            let mut c = Command::new("open");
            c.arg(target);
            c
        } else {
            let mut c = Command::new("xdg-open");
            c.arg(target);
            c
        };
        cmd.spawn()
            .map_err(|e| AssistantError::Capability(format!("cannot open {target}: {e}")))?;
        Ok(())
    }
}

impl SystemControl for DesktopControl {
    fn launch(&self, target: &str) -> Result<()> {
        info!(target, "launching application");
        Command::new(target)
            .spawn()
            .map_err(|e| AssistantError::Capability(format!("cannot launch {target}: {e}")))?;
        Ok(())
    }

    fn open_path(&self, path: &str) -> Result<()> {
        if !std::path::Path::new(path).exists() {
            return Err(AssistantError::Capability(format!("path not found: {path}")));
        }
        self.open_with_default_handler(path)
    }

    fn open_url(&self, url: &str) -> Result<()> {
        let url = if url.starts_with("http") {
            url.to_owned()
        } else {
            format!("https://{url}")
        };
        self.open_with_default_handler(&url)
    }

    fn terminate(&self, process: &str) -> Result<()> {
        info!(process, "terminating process");
        let status = if cfg!(target_os = "windows") {
            Command::new("taskkill").args(["/F", "/IM", process]).status()
        } else {
            Command::new("pkill").args(["-f", process]).status()
        }
        .map_err(|e| AssistantError::Capability(format!("cannot terminate {process}: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(AssistantError::Capability(format!(
                "no running process matched {process}"
            )))
        }
    }

    fn minimize_all(&self) -> Result<()> {
        // Super+D via xdotool on Linux; explorer shortcut elsewhere. All
        // best-effort: a missing helper becomes a capability error that the
        // dispatcher turns into a spoken reply.
        let result = if cfg!(target_os = "windows") {
            Command::new("powershell")
                .args(["-Command", "(New-Object -ComObject Shell.Application).MinimizeAll()"])
                .status()
        } else if cfg!(target_os = "macos") {
            Command::new("osascript")
                .args(["-e", r#"tell application "System Events" to key code 103"#])
                .status()
        } else {
            Command::new("xdotool").args(["key", "super+d"]).status()
        };
        match result {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(AssistantError::Capability(format!(
                "window helper exited with {status}"
            ))),
            Err(e) => Err(AssistantError::Capability(format!(
                "window helper unavailable: {e}"
            ))),
        }
    }

    fn screenshot(&self) -> Result<PathBuf> {
        Err(AssistantError::Capability(
            "screenshot capability is not wired on this platform".to_owned(),
        ))
    }

    fn power_off(&self) -> Result<()> {
        info!("power off requested");
        let result = if cfg!(target_os = "windows") {
            Command::new("shutdown").args(["/p", "/f"]).status()
        } else {
            Command::new("shutdown").args(["-h", "now"]).status()
        };
        result
            .map_err(|e| AssistantError::Capability(format!("shutdown unavailable: {e}")))
            .and_then(|status| {
                if status.success() {
                    Ok(())
                } else {
                    Err(AssistantError::Capability(format!(
                        "shutdown exited with {status}"
                    )))
                }
            })
    }

    fn suspend(&self) -> Result<()> {
        info!("suspend requested");
        let result = if cfg!(target_os = "windows") {
            Command::new("rundll32.exe")
                .args(["powrprof.dll,SetSuspendState", "0,1,0"])
                .status()
        } else if cfg!(target_os = "macos") {
            Command::new("pmset").arg("sleepnow").status()
        } else {
            Command::new("systemctl").arg("suspend").status()
        };
        result
            .map_err(|e| AssistantError::Capability(format!("suspend unavailable: {e}")))
            .and_then(|status| {
                if status.success() {
                    Ok(())
                } else {
                    Err(AssistantError::Capability(format!(
                        "suspend exited with {status}"
                    )))
                }
            })
    }
}

/// Timeout for one IoT HTTP send.
const IOT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// IoT transport with HTTP support only.
pub struct HttpIotTransport {
    client: reqwest::Client,
}

impl HttpIotTransport {
    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(IOT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::Iot(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl IotTransport for HttpIotTransport {
    async fn http_send(&self, url: &str, method: HttpMethod, payload: &str) -> Result<()> {
        let response = match method {
            HttpMethod::Get => {
                // Query-style payloads are appended to the URL.
                let url = if payload.is_empty() {
                    url.to_owned()
                } else if url.contains('?') {
                    format!("{url}&{payload}")
                } else {
                    format!("{url}?{payload}")
                };
                self.client.get(&url).send().await
            }
            HttpMethod::Post => self.client.post(url).body(payload.to_owned()).send().await,
        }
        .map_err(|e| AssistantError::Iot(format!("HTTP send failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AssistantError::Iot(format!(
                "device returned HTTP {status}"
            )))
        }
    }

    async fn mqtt_publish(&self, _broker: &str, _topic: &str, _payload: &str) -> Result<()> {
        Err(AssistantError::Iot(
            "MQTT transport is not available in this build".to_owned(),
        ))
    }

    async fn serial_write(&self, _port: &str, _baud: u32, _payload: &str) -> Result<()> {
        Err(AssistantError::Iot(
            "serial transport is not available in this build".to_owned(),
        ))
    }
}
