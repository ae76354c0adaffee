//! Thin wrapper around sending a real unix signal to a child process by
//! pid — `tokio::process::Child::kill()` only ever sends `SIGKILL`, but
//! the controller needs `SIGINT` (graceful stop) and `SIGTERM` (shutdown)
//! distinctly.

#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Interrupt,
    Terminate,
}

#[cfg(unix)]
pub fn send(pid: u32, signal: Signal) {
    let raw = match signal {
        Signal::Interrupt => libc::SIGINT,
        Signal::Terminate => libc::SIGTERM,
    };
    unsafe {
        libc::kill(pid as libc::pid_t, raw);
    }
}

#[cfg(not(unix))]
pub fn send(_pid: u32, _signal: Signal) {
    tracing::warn!("signal delivery to child processes is unix-only; no-op on this platform");
}
