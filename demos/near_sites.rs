use aemet_clima::{AemetClima, AemetError, ClientConfig};
use std::env;

#[tokio::main]
async fn main() -> Result<(), AemetError> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    configure_polars_display();

    let config = ClientConfig::from_env()?;
    let cache = aemet_cache_folder();
    let mut client = AemetClima::with_cache_folder(config, cache).await?;

    // Santander
    let near = client
        .near_sites()
        .latitude(43.4623)
        .longitude(-3.8099)
        .n_near(5)
        .max_distance_km(60.0)
        .call()
        .await?;

    println!("{}", near.to_frame()?);
    Ok(())
}

fn aemet_cache_folder() -> std::path::PathBuf {
    env::temp_dir().join("aemet_clima_demo")
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
