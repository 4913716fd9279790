use argh::FromArgs;
use std::path::PathBuf;

use satlens::image::Image;
use satlens::io::functional as F;
use satlens::io::remote::{
    ClientConfig, Credentials, DataCollection, Evalscript, Polygon, ProcessClient, TileRequest,
    TimeRange,
};
use satlens::{run_pipeline, PipelineConfig, PipelineError, PipelineOutputs};

#[derive(FromArgs, Debug, PartialEq)]
/// Derive luminance, equalized, smoothed and edge maps from a satellite image
struct Args {
    /// directory receiving the outputs
    #[argh(option, short = 'o', default = "PathBuf::from(\"output\")")]
    output_dir: PathBuf,

    /// JSON file with the pipeline parameters
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// also write the original and the outputs as a 2x3 montage
    #[argh(switch)]
    montage: bool,

    /// log the outputs to a Rerun viewer (needs the `rerun` feature)
    #[argh(switch)]
    show: bool,

    #[argh(subcommand)]
    source: Source,
}

#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand)]
enum Source {
    Local(LocalArgs),
    Remote(RemoteArgs),
}

#[derive(FromArgs, Debug, PartialEq)]
/// Process an image file
#[argh(subcommand, name = "local")]
struct LocalArgs {
    /// path to an input image
    #[argh(option, short = 'i')]
    image: PathBuf,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Fetch a true color Sentinel-2 tile and process it
#[argh(subcommand, name = "remote")]
struct RemoteArgs {
    /// longitude of the tile center in degrees
    #[argh(option)]
    lon: f64,

    /// latitude of the tile center in degrees
    #[argh(option)]
    lat: f64,

    /// half side of the tile in degrees
    #[argh(option, default = "0.005")]
    half_extent: f64,

    /// start of the acquisition window, YYYY-MM-DD or RFC 3339
    #[argh(option)]
    from: String,

    /// end of the acquisition window, YYYY-MM-DD or RFC 3339
    #[argh(option)]
    to: String,

    /// output width in pixels
    #[argh(option, default = "512")]
    width: u32,

    /// output height in pixels
    #[argh(option, default = "512")]
    height: u32,

    /// data collection, S2L2A (default) or S2L1C
    #[argh(option, default = "DataCollection::default()")]
    collection: DataCollection,

    /// comma separated bands rendered as output channels instead of true color,
    /// e.g. B08,B04,B03
    #[argh(option)]
    bands: Option<String>,

    /// host serving the token and process endpoints instead of Sentinel Hub
    #[argh(option)]
    base_url: Option<String>,
}

async fn acquire(source: &Source) -> Result<Image<u8, 3>, PipelineError> {
    match source {
        Source::Local(local) => Ok(F::read_image_any_rgb8(&local.image)?),
        Source::Remote(remote) => {
            // fail on missing credentials before building the request
            let credentials = Credentials::from_env()?;

            let mut request = TileRequest::true_color(
                Polygon::from_center(remote.lon, remote.lat, remote.half_extent)?,
                TimeRange::parse(&remote.from, &remote.to)?,
                remote.width,
                remote.height,
            );
            request.collection = remote.collection;
            if let Some(bands) = &remote.bands {
                let bands = bands.split(',').map(str::trim).collect::<Vec<_>>();
                request.evalscript = Evalscript::from_bands(&bands)?;
            }

            let config = match &remote.base_url {
                Some(base_url) => ClientConfig::with_base_url(base_url),
                None => ClientConfig::default(),
            };

            let client = ProcessClient::new(config)?;
            Ok(client.fetch_image(&request, &credentials).await?)
        }
    }
}

#[cfg(feature = "rerun")]
fn show(outputs: &PipelineOutputs) -> Result<(), Box<dyn std::error::Error>> {
    // create a Rerun recording stream
    let rec = rerun::RecordingStreamBuilder::new("satlens").spawn()?;

    rec.log(
        "original",
        &rerun::Image::from_elements(
            outputs.original.as_slice(),
            outputs.original.size().into(),
            rerun::ColorModel::RGB,
        ),
    )?;

    for (name, raster) in outputs.named_rasters() {
        rec.log(
            name,
            &rerun::Image::from_elements(
                raster.as_slice(),
                raster.size().into(),
                rerun::ColorModel::L,
            ),
        )?;
    }

    Ok(())
}

#[cfg(not(feature = "rerun"))]
fn show(_outputs: &PipelineOutputs) -> Result<(), Box<dyn std::error::Error>> {
    log::warn!("built without the rerun feature, ignoring --show");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let rgb = acquire(&args.source).await?;
    log::info!("processing {} image", rgb.size());

    let outputs = run_pipeline(&rgb, &config)?;

    for path in outputs.write_all(&args.output_dir, &config.output_extension)? {
        log::info!("saved {}", path.display());
    }

    if args.montage {
        let path = args
            .output_dir
            .join(format!("montage.{}", config.output_extension));
        outputs.write_montage(&path, config.strategy)?;
        log::info!("saved {}", path.display());
    }

    if args.show {
        show(&outputs)?;
    }

    Ok(())
}
