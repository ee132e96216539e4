//! Server Implementation
//!
//! HTTP 服务器启动和管理

use crate::api;
use crate::core::{CanteenState, Config, Result};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<CanteenState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: CanteenState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => CanteenState::initialize(&self.config).await?,
        };

        let app = api::build_app(state.clone());

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("🍵 Canteen server listening on {}", addr);

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        // 停止所有 listen_* 订阅任务
        state.bus.shutdown();
        Ok(())
    }
}
