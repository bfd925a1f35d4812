use space_core::SpaceConfig;
use space_kernel::Kernel;
use tracing::info;

/// Minimal launcher: resolve the workspace root, open every store, and —
/// when `SPACE_IDENTITY` is set — run that identity through `wake` and
/// print its orientation as JSON. With no identity configured this just
/// proves the workspace opens cleanly; real orchestration happens
/// through the `space_kernel::Kernel` library API, not this binary.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "space_kernel=info".into()),
        )
        .init();

    let cwd = std::env::current_dir()?;
    let root = SpaceConfig::resolve_root(&cwd);
    let config = SpaceConfig::load(root)?;

    info!(root = %config.workspace_root.display(), "opening workspace");
    let kernel = Kernel::open(config)?;

    if let Ok(identity) = std::env::var("SPACE_IDENTITY") {
        let orientation = kernel.wake(&identity)?;
        println!("{}", serde_json::to_string_pretty(&orientation)?);
    } else {
        info!("workspace ready, no SPACE_IDENTITY set");
    }

    Ok(())
}
