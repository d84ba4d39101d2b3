//! Accept loop and runtime entry for the notification server.

use std::fs;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use tokio::sync::broadcast;

use crate::config::{ListenAddr, ServerConfig};
use crate::error::{io_err, ServerError};
use crate::session::run_session;

#[derive(Debug)]
enum BoundListener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

enum SubscriberStream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

/// Watches one filesystem resource and broadcasts change notifications to
/// every connected subscriber, each over its own independent session.
#[derive(Debug)]
pub struct NotificationServer {
    config: ServerConfig,
    listener: BoundListener,
    next_session: AtomicU64,
}

impl NotificationServer {
    /// Validate the watch target and bind the listener.
    ///
    /// A missing watch target is a startup error: refusing to come up beats
    /// greeting subscribers and immediately failing their sessions.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        if !config.watch_path.exists() {
            return Err(ServerError::WatchTargetMissing {
                path: config.watch_path.clone(),
            });
        }

        let listener = match &config.listen {
            ListenAddr::Tcp(addr) => {
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|e| io_err(addr.to_string(), e))?;
                BoundListener::Tcp(listener)
            }
            ListenAddr::Unix(path) => {
                prepare_socket_for_bind(path)?;
                let listener = UnixListener::bind(path).map_err(|e| io_err(path, e))?;
                set_socket_permissions(path)?;
                BoundListener::Unix(listener)
            }
        };

        Ok(Self {
            config,
            listener,
            next_session: AtomicU64::new(1),
        })
    }

    /// Actual bound TCP address; `None` for Unix listeners. Lets callers
    /// bind port 0 and discover the assigned port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            BoundListener::Tcp(listener) => listener.local_addr().ok(),
            BoundListener::Unix(_) => None,
        }
    }

    /// Accept subscribers until shutdown. Session failures are logged and
    /// isolated; only accept-level failures propagate.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        tracing::info!(
            listen = %self.config.listen,
            watch = %self.config.watch_path.display(),
            "listening for subscribers",
        );

        let outcome = loop {
            tokio::select! {
                _ = shutdown.recv() => break Ok(()),
                accepted = self.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) => break Err(err),
                    };
                    let session = self.next_session.fetch_add(1, Ordering::Relaxed);
                    let watch_path = self.config.watch_path.clone();
                    tracing::info!(session, %peer, "subscriber connected");
                    tokio::spawn(async move {
                        let result = match stream {
                            SubscriberStream::Tcp(stream) => {
                                run_session(stream, session, &watch_path).await
                            }
                            SubscriberStream::Unix(stream) => {
                                run_session(stream, session, &watch_path).await
                            }
                        };
                        if let Err(err) = result {
                            tracing::error!(session, error = %err, "session error");
                        }
                    });
                }
            }
        };

        // Shutdown and accept failure leave the listener through the same
        // door: a Unix socket file never outlives its listener.
        remove_listener_socket(&self.config.listen);
        outcome
    }

    async fn accept(&self) -> Result<(SubscriberStream, String), ServerError> {
        match &self.listener {
            BoundListener::Tcp(listener) => {
                let (stream, peer) = listener
                    .accept()
                    .await
                    .map_err(|e| io_err(self.config.listen.to_string(), e))?;
                Ok((SubscriberStream::Tcp(stream), peer.to_string()))
            }
            BoundListener::Unix(listener) => {
                let (stream, _) = listener
                    .accept()
                    .await
                    .map_err(|e| io_err(self.config.listen.to_string(), e))?;
                Ok((SubscriberStream::Unix(stream), "unix".to_string()))
            }
        }
    }
}

/// Start the server runtime and block the current thread until it exits.
pub fn start_blocking(config: ServerConfig) -> Result<(), ServerError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run_until_signalled(config))
}

async fn run_until_signalled(config: ServerConfig) -> Result<(), ServerError> {
    let server = NotificationServer::bind(config).await?;
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let server_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = server.run(shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(ServerError::Runtime(format!(
                            "ctrl-c handler failed: {err}"
                        ))),
                    }
                }
            }
        })
    };

    let (server_result, signal_result) = tokio::join!(server_handle, signal_handle);
    handle_join("server", server_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), ServerError>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(ServerError::Runtime(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Unlink the listener's socket file, if it listens on one.
fn remove_listener_socket(listen: &ListenAddr) {
    if let ListenAddr::Unix(path) = listen {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), ServerError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(ServerError::SocketInUse {
                path: socket.to_path_buf(),
            });
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale listener socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), ServerError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), ServerError> {
    Ok(())
}
