use std::sync::Arc;

use clap::Parser;
use foundation::DEFAULT_MOUNT_ID;
use layers::LayerName;
use runtime::MountGate;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use viewer::headless::HeadlessEngineFactory;
use viewer::{Fetcher, HttpFetcher, SessionRegistry, ViewerOptions, ViewerSession};

#[derive(Parser, Debug)]
#[command(author, version, about = "Compose a viewer session without a renderer")]
struct Args {
    /// Mount id for the session
    #[arg(long, default_value = DEFAULT_MOUNT_ID)]
    mount: String,

    /// Base URL that relative locations resolve against
    #[arg(long)]
    base_url: Option<String>,

    /// Vector boundary document (GeoJSON/TopoJSON)
    #[arg(long)]
    boundaries: Option<String>,

    /// Label table: code,latitude,longitude,name
    #[arg(long)]
    labels: Option<String>,

    /// Packet document fed to the streaming layer before activation
    #[arg(long)]
    packets: Option<String>,

    /// Layers to hide (boundaries, streaming, labels)
    #[arg(long)]
    hide: Vec<LayerName>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let options = ViewerOptions::from_env();

    let mut fetcher = HttpFetcher::new();
    if let Some(base) = &args.base_url {
        fetcher = fetcher.with_base(base)?;
    }
    let fetcher = Arc::new(fetcher);
    let registry = SessionRegistry::new(Arc::new(HeadlessEngineFactory::new()), fetcher.clone());

    let session = registry.get_or_create(args.mount.as_str(), options);
    if let Some(location) = &args.packets {
        let text = fetcher.fetch_text(location).await?;
        let outcome = session.ingest_json(&text)?;
        info!("packets from {location}: {outcome:?}");
    }
    for layer in &args.hide {
        session.set_layer_visible(*layer, false)?;
    }

    session.activate(&MountGate::ready()).await?;

    if let Some(location) = &args.boundaries
        && let Err(err) = session.load_boundaries(location).await
    {
        error!("boundaries not loaded: {err}");
    }
    if let Some(location) = &args.labels {
        match session.load_labels(location).await {
            Ok(count) => info!("{count} labels loaded"),
            Err(err) => error!("labels not loaded: {err}"),
        }
    }

    println!("{}", serde_json::to_string_pretty(&summary(&session))?);

    registry.dispose(session.id());
    Ok(())
}

fn summary(session: &ViewerSession) -> serde_json::Value {
    let layers: Vec<_> = LayerName::STACKING_ORDER
        .into_iter()
        .map(|name| json!({"name": name, "visible": session.layer_visible(name)}))
        .collect();
    let capabilities = session
        .attach_report()
        .map(|report| report.attached)
        .unwrap_or_default();
    json!({
        "mount": session.id(),
        "state": format!("{:?}", session.state()),
        "capabilities": capabilities,
        "layers": layers,
        "boundaries": session.boundary_source(),
        "streaming_entities": session.streaming_entities().len(),
        "labels": session.label_entities().len(),
    })
}
