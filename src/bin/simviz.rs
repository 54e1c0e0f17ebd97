use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "simviz", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a payload + document pair.
    Validate(InputArgs),
    /// Evaluate every element at one time index and dump the resulting
    /// state as JSON.
    Frame(FrameArgs),
    /// Drive playback in real time, printing the x label at every tick.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct InputArgs {
    /// Input payload JSON.
    #[arg(long)]
    payload: PathBuf,

    /// Input document JSON.
    #[arg(long)]
    doc: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Time index (0-based).
    #[arg(long)]
    x: usize,

    /// Use the gradient pattern encoding instead of the banded default.
    #[arg(long)]
    gradient: bool,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Playback speed multiplier.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn read_payload(path: &Path) -> anyhow::Result<simviz::VisPayload> {
    let f = File::open(path).with_context(|| format!("open payload '{}'", path.display()))?;
    let payload: simviz::VisPayload =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse payload JSON")?;
    Ok(payload)
}

fn read_document(path: &Path) -> anyhow::Result<simviz::Document> {
    let f = File::open(path).with_context(|| format!("open document '{}'", path.display()))?;
    let doc: simviz::Document =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse document JSON")?;
    Ok(doc)
}

fn cmd_validate(args: InputArgs) -> anyhow::Result<()> {
    let payload = read_payload(&args.payload)?;
    let doc = read_document(&args.doc)?;
    payload.validate()?;

    let mut missing = 0usize;
    for specs in payload.element_data.values() {
        for spec in specs {
            for id in &spec.ids {
                if !doc.contains_node(id) {
                    eprintln!("warning: element node '{id}' not found in document");
                    missing += 1;
                }
            }
        }
    }

    eprintln!(
        "payload ok: {} steps, {} element kinds, {} unresolved node ids",
        payload.x_series.len(),
        payload.element_data.len(),
        missing
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let payload = read_payload(&args.input.payload)?;
    let doc = read_document(&args.input.doc)?;

    let encoding = if args.gradient {
        simviz::PatternEncoding::Gradient
    } else {
        simviz::PatternEncoding::Banded
    };
    let mut context = simviz::ElementContext::with_encoding(payload, doc, encoding)?;
    context.update_elements(simviz::XIndex(args.x));

    let snapshot = serde_json::json!({
        "x": args.x,
        "label": context.current_label(),
        "document": context.document(),
        "elements": context.elements(),
    });
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let payload = read_payload(&args.input.payload)?;
    let doc = read_document(&args.input.doc)?;

    let mut context = simviz::ElementContext::new(payload, doc)?;
    let mut controller = simviz::PlaybackController::new(context.series_len());
    while controller.speed() < args.speed
        && controller.speed() < simviz::playback::DEFAULT_MAX_SPEED
    {
        controller.cycle_speed();
    }

    eprintln!(
        "playing {} steps at {}x",
        context.series_len(),
        controller.speed()
    );

    let mut delay = controller.play(|x| {
        context.update_elements(x);
        println!("{}", context.current_label());
    });
    while let Some(d) = delay {
        std::thread::sleep(d);
        delay = controller.tick(|x| {
            context.update_elements(x);
            println!("{}", context.current_label());
        });
    }

    eprintln!("done at x={}", controller.current_x().0);
    Ok(())
}
