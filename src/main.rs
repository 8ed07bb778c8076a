use anyhow::Result;
use bookscout::errors::AppResult;
use bookscout::fetch::{FetchConfig, ImageFetcher};
use bookscout::lookup::PurchaseLookup;
use bookscout::ocr::OcrAdapter;
use bookscout::ocr_config::OcrConfig;
use bookscout::preprocessing::{EnhancementPipeline, PipelineConfig, Strategy, StrategySelector};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Runtime settings resolved from the environment at startup.
struct RunConfig {
    ocr: OcrConfig,
    fetch: FetchConfig,
    strategy_override: Option<Strategy>,
}

/// Validate environment variables at startup
fn load_environment() -> Result<RunConfig> {
    let mut ocr = OcrConfig::default();

    if let Ok(path) = env::var("BOOKSCOUT_TESSDATA") {
        if path.trim().is_empty() {
            return Err(anyhow::anyhow!("BOOKSCOUT_TESSDATA cannot be empty when set"));
        }
        if !std::path::Path::new(&path).is_dir() {
            return Err(anyhow::anyhow!(
                "BOOKSCOUT_TESSDATA does not point to a directory: {}",
                path
            ));
        }
        ocr.tessdata_path = Some(path);
    }

    if let Ok(lang) = env::var("BOOKSCOUT_OCR_LANG") {
        ocr.language = lang;
    }

    ocr.validate()
        .map_err(|e| anyhow::anyhow!("Invalid OCR configuration: {}", e))?;

    let mut fetch = FetchConfig::default();
    if let Ok(max_bytes) = env::var("BOOKSCOUT_MAX_IMAGE_BYTES") {
        fetch.max_bytes = max_bytes.parse().map_err(|_| {
            anyhow::anyhow!("BOOKSCOUT_MAX_IMAGE_BYTES must be a byte count, got '{}'", max_bytes)
        })?;
    }

    let strategy_override = match env::var("BOOKSCOUT_STRATEGY") {
        Ok(name) => Some(
            name.parse::<Strategy>()
                .map_err(|e| anyhow::anyhow!("Invalid BOOKSCOUT_STRATEGY: {}", e))?,
        ),
        Err(_) => None,
    };

    info!("Environment variables validated successfully");
    Ok(RunConfig {
        ocr,
        fetch,
        strategy_override,
    })
}

/// Fetch, enhance, read and look up a single cover photograph.
async fn process_url(
    url: &str,
    fetcher: &ImageFetcher,
    selector: &StrategySelector,
    pipeline: &EnhancementPipeline,
    ocr: &OcrAdapter,
    lookup: &PurchaseLookup,
    strategy_override: Option<Strategy>,
) -> AppResult<()> {
    let image = fetcher.fetch_image(url).await?;

    let config = selector.select(
        &image,
        strategy_override.map(PipelineConfig::for_strategy),
    );
    info!(
        "Processing {} with strategy '{}'",
        url,
        config.strategy().as_str()
    );

    let enhanced = pipeline.run(image, &config)?;
    let text = ocr.extract_text(&enhanced.image).await?;

    println!("Image: {}", url);
    if text.is_empty() {
        println!("  No text recognized");
        return Ok(());
    }
    println!("  Extracted text: {}", text.replace('\n', " / "));

    match lookup.find_purchase_link(&text).await? {
        Some(link) => println!("  Purchase link: {}", link),
        None => println!("  No purchase link found"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let urls: Vec<String> = env::args().skip(1).collect();
    if urls.is_empty() {
        return Err(anyhow::anyhow!(
            "Usage: bookscout <image-url> [<image-url>...]"
        ));
    }

    let run_config = load_environment()?;

    let fetcher = ImageFetcher::new(run_config.fetch)
        .map_err(|e| anyhow::anyhow!("Failed to build image fetcher: {}", e))?;
    let ocr = OcrAdapter::new(run_config.ocr)
        .map_err(|e| anyhow::anyhow!("Failed to initialize OCR engine: {}", e))?;
    let lookup = PurchaseLookup::new(reqwest::Client::new());
    let selector = StrategySelector::new();
    let pipeline = EnhancementPipeline::new();

    let mut failures = 0usize;
    for url in &urls {
        if let Err(e) = process_url(
            url,
            &fetcher,
            &selector,
            &pipeline,
            &ocr,
            &lookup,
            run_config.strategy_override,
        )
        .await
        {
            // Keep going: one broken cover must not sink the batch
            error!("Failed to process {}: {}", url, e);
            failures += 1;
        }
    }

    if failures == urls.len() {
        return Err(anyhow::anyhow!("All {} images failed to process", failures));
    }
    Ok(())
}
