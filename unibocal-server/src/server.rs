use std::{env, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use tokio::net::TcpListener;
use unibocal_core::{
    ServiceConfig,
    course::CourseCatalog,
    providers::{opendata::OpenDataProvider, unibo::UniboProvider},
    service::CalendarService,
};

use crate::handlers::create_app;

const DEFAULT_DATA_PATH: &str = "data/courses.json";
const DEFAULT_OPENDATA_URL: &str = "https://dati.unibo.it/";

/// 服务器配置，来自环境变量
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub data_path: PathBuf,
    pub opendata_url: String,
    pub warm_cache: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        // 从环境变量获取端口，默认为3000
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let data_path = env::var("DATA_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        let opendata_url = env::var("OPENDATA_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_OPENDATA_URL.to_string());

        let warm_cache = env::var("WARM_CACHE")
            .map(|v| !matches!(v.trim(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        Self {
            port,
            data_path,
            opendata_url,
            warm_cache,
        }
    }
}

/// 刷新开放数据快照；失败时继续使用已有快照
async fn refresh_catalog(config: &ServerConfig) {
    let provider = match OpenDataProvider::with_root(&config.opendata_url) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::warn!(error = %e, "unable to create open data provider");
            return;
        }
    };

    if let Err(e) = provider
        .refresh_snapshot(&config.data_path, Utc::now().year())
        .await
    {
        tracing::warn!(error = %e, "open data refresh failed, using existing snapshot");
    }
}

pub async fn start_server(config: ServerConfig) -> Result<()> {
    refresh_catalog(&config).await;

    let catalog = CourseCatalog::load(&config.data_path)
        .await
        .with_context(|| format!("unable to load courses from {}", config.data_path.display()))?;

    let source = Arc::new(UniboProvider::new()?);
    let service = Arc::new(CalendarService::new(
        Arc::new(catalog),
        source,
        ServiceConfig::default(),
    ));

    service.caches().spawn_sweepers();
    if config.warm_cache {
        service.spawn_warmer();
    }

    let app = create_app(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Unibocal server starting on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
