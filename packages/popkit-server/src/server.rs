use axum::routing::{get, post};
use axum::Router;
use clap::{Args, Subcommand};
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use crate::proxy;

#[derive(Args)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub action: Option<ServerAction>,

    /// Port to listen on
    #[arg(long, default_value = "9000")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Base URL of the headless CMS (e.g. https://cms.example.com)
    #[arg(long)]
    pub cms: Option<String>,
}

#[derive(Subcommand)]
pub enum ServerAction {
    /// Stop the running server
    Stop,
    /// Show server status
    Status,
}

/// Shared state for the proxy handlers
pub struct AppState {
    cms_base: Option<String>,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(cms_base: Option<String>) -> Self {
        // Normalize so handlers can append absolute paths directly
        let cms_base = cms_base
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Self {
            cms_base,
            client: reqwest::Client::new(),
        }
    }

    pub fn cms_base(&self) -> Option<&str> {
        self.cms_base.as_deref()
    }
}

pub async fn run(args: ServerArgs) {
    let cms = args.cms.or_else(|| std::env::var("CMS_API").ok());
    match args.action {
        None => start_server(args.port, args.host, cms).await,
        Some(ServerAction::Stop) => stop_server(),
        Some(ServerAction::Status) => server_status(),
    }
}

/// Build the API routes (CORS wide open; the front end may be served from
/// anywhere).
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/csrf", get(proxy::csrf_handler))
        .route("/api/webform/submit", post(proxy::webform_handler))
        .route("/api/webform/submit/{*rest}", post(proxy::webform_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn start_server(port: u16, host: String, cms: Option<String>) {
    write_pid_file();

    if cms.is_none() {
        eprintln!("[popkit] CMS base URL not set (--cms or CMS_API); proxy endpoints will fail");
    }

    let state = Arc::new(AppState::new(cms));
    let app = api_routes().with_state(state);

    let addr: std::net::SocketAddr = format!("{}:{}", host, port)
        .parse()
        .unwrap_or_else(|_| std::net::SocketAddr::from(([0, 0, 0, 0], port)));

    println!("popkit server running at http://{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    remove_pid_file();
}

// ============================================
// PID file management
// ============================================

fn pid_file_path() -> std::path::PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp"))
        .join(".popkit");
    std::fs::create_dir_all(&dir).ok();
    dir.join("popkit.pid")
}

fn write_pid_file() {
    let pid = std::process::id();
    std::fs::write(pid_file_path(), pid.to_string()).ok();
}

fn remove_pid_file() {
    std::fs::remove_file(pid_file_path()).ok();
}

fn read_pid_file() -> Option<u32> {
    std::fs::read_to_string(pid_file_path())
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    false
}

fn stop_server() {
    match read_pid_file() {
        Some(pid) => {
            if !is_process_alive(pid) {
                println!("Server is not running (stale PID file for pid {})", pid);
                remove_pid_file();
                return;
            }

            #[cfg(unix)]
            {
                use nix::sys::signal::{self, Signal};
                use nix::unistd::Pid;
                match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    Ok(_) => {
                        println!("Sent SIGTERM to server (pid {})", pid);
                        remove_pid_file();
                    }
                    Err(e) => eprintln!("Failed to stop server (pid {}): {}", pid, e),
                }
            }

            #[cfg(not(unix))]
            eprintln!("Stop not supported on this platform");
        }
        None => println!("Server is not running (no PID file found)"),
    }
}

fn server_status() {
    match read_pid_file() {
        Some(pid) => {
            if is_process_alive(pid) {
                println!("Server is running (pid {})", pid);
            } else {
                println!("Server is not running (stale PID file for pid {})", pid);
                remove_pid_file();
            }
        }
        None => println!("Server is not running"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    println!("\nShutting down...");
}
