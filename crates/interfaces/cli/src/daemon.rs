//! Background daemon process management: start/stop/status over a pid
//! file and the Unix socket, mirroring the teacher's `daemon.rs`
//! fork-and-poll pattern but trimmed to the single `run_daemon` process
//! this crate needs (no Telegram bot, no lock-file mode tracking).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Result};

use affinity_config::AffinityConfig;
use affinity_runtime::DaemonClient;

const DEFAULT_SOCKET: &str = ".affinity/runtime/affinity.sock";
const DEFAULT_CONFIG: &str = "config/default.toml";

pub(crate) struct DaemonPaths {
    pub(crate) runtime_dir: PathBuf,
    pub(crate) pid_file: PathBuf,
    pub(crate) log_file: PathBuf,
}

pub(crate) fn daemon_paths() -> DaemonPaths {
    let runtime_dir = Path::new(".affinity").join("runtime");
    DaemonPaths {
        pid_file: runtime_dir.join("daemon.pid"),
        log_file: runtime_dir.join("daemon.log"),
        runtime_dir,
    }
}

pub(crate) fn socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET)
}

pub(crate) fn start(force: bool) -> Result<()> {
    let paths = daemon_paths();
    fs::create_dir_all(&paths.runtime_dir)?;
    let socket = socket_path();

    if is_socket_live(&socket) && !force {
        bail!("daemon already running on socket {}; use --force to restart", socket.display());
    }

    if let Some(pid) = read_pid(&paths.pid_file)? {
        if is_pid_running(pid) {
            if !force {
                bail!("daemon already running with pid {pid}; pass --force to restart");
            }
            terminate_pid(pid)?;
        }
        let _ = fs::remove_file(&paths.pid_file);
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }

    let exe = std::env::current_exe()?;
    let out = std::fs::OpenOptions::new().create(true).append(true).open(&paths.log_file)?;
    let err = out.try_clone()?;

    let mut child = Command::new(exe)
        .arg("daemon")
        .arg("run")
        .env("AFFINITY_DAEMON_PROCESS", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::from(out))
        .stderr(Stdio::from(err))
        .spawn()?;

    fs::write(&paths.pid_file, child.id().to_string())?;

    for _ in 0..40 {
        if is_socket_live(&socket) {
            println!("daemon started");
            println!("- pid: {}", child.id());
            println!("- socket: {}", socket.display());
            println!("- log: {}", paths.log_file.display());
            return Ok(());
        }
        if let Some(status) = child.try_wait()? {
            let _ = fs::remove_file(&paths.pid_file);
            bail!("daemon exited during startup with status {status}; check {}", paths.log_file.display());
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    let _ = fs::remove_file(&paths.pid_file);
    bail!("daemon did not become ready on socket {}; check {}", socket.display(), paths.log_file.display())
}

pub(crate) async fn stop() -> Result<()> {
    let paths = daemon_paths();
    let client = DaemonClient::new(socket_path());
    if client.shutdown().await.is_ok() {
        println!("daemon stop requested gracefully");
    }

    let Some(pid) = read_pid(&paths.pid_file)? else {
        println!("daemon is not running");
        return Ok(());
    };

    if !is_pid_running(pid) {
        let _ = fs::remove_file(&paths.pid_file);
        println!("daemon was not running (stale pid file cleaned)");
        return Ok(());
    }

    terminate_pid(pid)?;
    wait_for_pid_exit(pid, Duration::from_secs(4));
    let _ = fs::remove_file(&paths.pid_file);
    println!("daemon stopped (pid {pid})");
    Ok(())
}

pub(crate) fn status() -> Result<()> {
    let paths = daemon_paths();
    let socket = socket_path();
    let socket_live = is_socket_live(&socket);

    match read_pid(&paths.pid_file)? {
        Some(pid) if is_pid_running(pid) || socket_live => {
            println!("daemon status: running");
            println!("- pid: {pid}");
            println!("- socket: {}", socket.display());
        }
        _ => {
            println!("daemon status: stopped");
            println!("- socket: {}", socket.display());
        }
    }
    Ok(())
}

/// Entry point for the forked child process: loads config, binds the
/// socket, and runs the scheduler loop until a `Shutdown` command or a
/// terminal signal arrives.
pub(crate) async fn run_process() -> Result<()> {
    let paths = daemon_paths();
    fs::create_dir_all(&paths.runtime_dir)?;
    fs::write(&paths.pid_file, std::process::id().to_string())?;

    let config = AffinityConfig::load_from(DEFAULT_CONFIG)?;
    let registry = affinity_memory::AffordanceRegistry::new();
    let socket = socket_path();

    let daemon = affinity_runtime::run_daemon(config, registry, &socket);

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = async {
        tokio::signal::ctrl_c().await?;
        Ok::<(), anyhow::Error>(())
    };

    tokio::select! {
        result = daemon => { result?; }
        result = terminate => {
            result?;
            let client = DaemonClient::new(&socket);
            let _ = client.shutdown().await;
        }
    }

    let _ = fs::remove_file(&paths.pid_file);
    Ok(())
}

pub(crate) fn is_socket_live(path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(path).is_ok()
}

pub(crate) fn read_pid(path: &Path) -> Result<Option<u32>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    Ok(raw.trim().parse::<u32>().ok())
}

pub(crate) fn is_pid_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

pub(crate) fn terminate_pid(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let status = Command::new("kill").arg(pid.to_string()).status()?;
        if !status.success() {
            bail!("failed to terminate daemon pid {pid}");
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        bail!("daemon stop is only implemented on unix in this build")
    }
}

pub(crate) fn wait_for_pid_exit(pid: u32, timeout: Duration) {
    let step = Duration::from_millis(50);
    let mut waited = Duration::from_millis(0);
    while waited < timeout {
        if !is_pid_running(pid) {
            return;
        }
        std::thread::sleep(step);
        waited += step;
    }
}
