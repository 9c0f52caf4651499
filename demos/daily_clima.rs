use aemet_clima::{AemetClima, AemetError, ClientConfig, ColumnSelection};
use chrono::NaiveDate;
use std::env;

#[tokio::main]
async fn main() -> Result<(), AemetError> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    env::set_var("POLARS_FMT_MAX_COLS", "-1");

    let config = ClientConfig::from_env()?;
    let mut client =
        AemetClima::with_cache_folder(config, env::temp_dir().join("aemet_clima_demo")).await?;

    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();

    let observations = client
        .daily_clima()
        .sites("1111X")
        .start(start)
        .end(end)
        .call()
        .await?;
    println!("{}", observations.frame.head(Some(10)));

    let columns = ColumnSelection::from(vec!["temp_avg", "precipitation"]);
    let report = client.evaluate_completeness(&observations, start, end, 0.8, &columns)?;
    println!(
        "sufficient: {}, mean coverage: {:.3}",
        report.is_sufficient, report.mean_coverage
    );

    let candidates = client
        .near_sites()
        .latitude(43.4623)
        .longitude(-3.8099)
        .n_near(3)
        .call()
        .await?;
    let curation = client
        .sites_curation()
        .sites(&candidates)
        .start(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap())
        .end(NaiveDate::from_ymd_opt(2022, 12, 31).unwrap())
        .columns(columns)
        .save_folder(env::temp_dir().join("aemet_clima_curated"))
        .call()
        .await?;
    println!("usable sites: {:?}", curation.sufficient_sites());
    Ok(())
}
