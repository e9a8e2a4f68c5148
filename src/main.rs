use anyhow::{bail, Context};
use msr_dcp_rs::image_pipeline::{DenoiseConfig, FileEnhanceConfig, FileEnhancePipeline};
use msr_dcp_rs::logger;

use tracing::{error, info};

const USAGE: &str = "usage: msr_dcp_rs <input.tiff> <output.tiff> [--denoise]";

fn main() -> anyhow::Result<()> {
    logger::init();

    let mut denoise = false;
    let mut paths = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--denoise" => denoise = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ => paths.push(arg),
        }
    }
    let [input, output] = paths.as_slice() else {
        bail!("{}", USAGE);
    };

    info!("Starting msr_dcp_rs...");

    let config = FileEnhanceConfig::builder()
        .denoise(denoise.then(DenoiseConfig::default))
        .build();
    let pipeline = FileEnhancePipeline::new(config).context("invalid pipeline configuration")?;

    info!("Scales: {:?}", pipeline.config().enhance.scales);
    info!("Denoise: {}", if denoise { "enabled" } else { "disabled" });

    if let Err(e) = pipeline.convert_file(input, output) {
        error!("Enhancement failed: {}", e);
        return Err(e).with_context(|| format!("{} -> {}", input, output));
    }

    info!("Enhancement successful!");
    Ok(())
}
