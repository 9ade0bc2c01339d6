//! Supervision of the Baileys sidecar process.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use {
    anyhow::{Context, Result, bail},
    tokio::{
        io::{AsyncBufReadExt, AsyncRead, BufReader},
        process::{Child, Command},
    },
    tracing::{debug, error, info, warn},
};

/// Environment variable pointing at the sidecar checkout.
pub const SIDECAR_DIR_ENV: &str = "SATELE_SIDECAR_DIR";

const STARTUP_GRACE: Duration = Duration::from_millis(500);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const DEV_PATHS: [&str; 3] = ["sidecar", "../sidecar", "../../sidecar"];

/// How to launch the sidecar.
#[derive(Debug, Clone)]
pub struct SidecarLaunch {
    /// Directory holding `package.json` and the built `dist/index.js`.
    pub dir: PathBuf,
    pub port: u16,
    /// Where the sidecar keeps Baileys auth state.
    pub auth_dir: PathBuf,
}

/// A running sidecar.
pub struct SidecarProcess {
    child: Child,
    port: u16,
}

impl SidecarProcess {
    /// Spawn `node dist/index.js` and forward its output to tracing.
    pub async fn start(launch: &SidecarLaunch) -> Result<Self> {
        let dir = &launch.dir;
        if !dir.join("dist/index.js").exists() {
            bail!(
                "WhatsApp sidecar is not built at {}; run `npm install && npm run build` there",
                dir.display()
            );
        }

        info!(path = %dir.display(), port = launch.port, "starting WhatsApp sidecar");

        let mut child = Command::new("node")
            .arg("dist/index.js")
            .current_dir(dir)
            .env("SATELE_SIDECAR_PORT", launch.port.to_string())
            .env("SATELE_AUTH_DIR", &launch.auth_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("failed to spawn sidecar process")?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, true));
        }

        tokio::time::sleep(STARTUP_GRACE).await;
        if let Some(status) = child
            .try_wait()
            .context("failed to check sidecar process status")?
        {
            bail!("sidecar process exited immediately with status: {status}");
        }

        info!(port = launch.port, "WhatsApp sidecar started");
        Ok(Self {
            child,
            port: launch.port,
        })
    }

    /// SIGTERM, then kill if the process does not exit in time.
    pub async fn stop(&mut self) {
        info!(port = self.port, "stopping WhatsApp sidecar");

        #[cfg(unix)]
        {
            use nix::{
                sys::signal::{Signal, kill},
                unistd::Pid,
            };

            if let Some(pid) = self.child.id().and_then(|id| i32::try_from(id).ok()) {
                let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.child.start_kill();
        }

        match tokio::time::timeout(STOP_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => info!(?status, "WhatsApp sidecar exited"),
            Ok(Err(e)) => warn!(error = %e, "error waiting for sidecar process"),
            Err(_) => {
                warn!("sidecar did not exit in time, killing");
                let _ = self.child.kill().await;
            },
        }
    }
}

/// Locate the sidecar checkout: explicit path, then `SATELE_SIDECAR_DIR`,
/// then paths next to the executable and the working directory.
pub fn find_sidecar_dir(
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf> {
    let is_sidecar = |p: &Path| p.join("package.json").exists();

    if let Some(path) = explicit {
        if is_sidecar(path) {
            return Ok(path.to_path_buf());
        }
        bail!("no sidecar package.json in {}", path.display());
    }

    if let Some(dir) = lookup(SIDECAR_DIR_ENV) {
        let path = PathBuf::from(&dir);
        if is_sidecar(&path) {
            return Ok(path);
        }
        warn!(path = %dir, "{SIDECAR_DIR_ENV} set but package.json not found");
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let candidates = exe_dir
        .iter()
        .flat_map(|exe| [exe.join("../sidecar"), exe.join("../../sidecar")])
        .chain(DEV_PATHS.iter().map(PathBuf::from));
    for candidate in candidates {
        if is_sidecar(&candidate) {
            debug!(path = %candidate.display(), "found WhatsApp sidecar");
            return Ok(candidate.canonicalize().unwrap_or(candidate));
        }
    }

    bail!("WhatsApp sidecar not found; set {SIDECAR_DIR_ENV} or sidecar.dir")
}

/// Pino numeric level of a JSON log line, with its message.
fn parse_pino(line: &str) -> Option<(u64, String)> {
    if !line.starts_with('{') {
        return None;
    }
    let log: serde_json::Value = serde_json::from_str(line).ok()?;
    let level = log.get("level").and_then(|v| v.as_u64()).unwrap_or(30);
    let msg = log
        .get("msg")
        .and_then(|v| v.as_str())
        .unwrap_or(line)
        .to_string();
    Some((level, msg))
}

async fn forward_lines(reader: impl AsyncRead + Unpin, stderr: bool) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if stderr {
            warn!(target: "whatsapp_sidecar", "{line}");
            continue;
        }
        match parse_pino(&line) {
            Some((10 | 20, msg)) => debug!(target: "whatsapp_sidecar", "{msg}"),
            Some((30, msg)) => info!(target: "whatsapp_sidecar", "{msg}"),
            Some((40, msg)) => warn!(target: "whatsapp_sidecar", "{msg}"),
            Some((_, msg)) => error!(target: "whatsapp_sidecar", "{msg}"),
            None => info!(target: "whatsapp_sidecar", "{line}"),
        }
    }
}
