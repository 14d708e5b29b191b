use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use restorable::{
    CompositeMode, ContextOpts, CpuBackend, DrawTriangles, Filter, Geometry, ImageId, Pixels,
    Region, RestorableContext, Rgba8Premul, UniformValue, Uniforms, programs,
};

#[derive(Parser, Debug)]
#[command(name = "restore-sim", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a chain of images each copied from the previous one, lose the context, restore and
    /// verify every pixel.
    Chain(ChainArgs),
    /// Draw between images for many frames, losing the context periodically, and check that
    /// every restore reproduces the pre-loss pixels.
    Soak(SoakArgs),
}

#[derive(Parser, Debug)]
struct ChainArgs {
    /// Number of images in the chain.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    len: u32,

    /// Width and height of every image.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    size: u32,

    /// Copy through the `sum_images` program instead of a textured copy.
    #[arg(long, default_value_t = false)]
    shader: bool,

    /// Resolve stale images before losing the context.
    #[arg(long, default_value_t = false)]
    resolve_first: bool,

    /// Skip the simulated context loss.
    #[arg(long, default_value_t = false)]
    keep_context: bool,

    /// Context options JSON.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Write the last image of the chain as a PNG.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SoakArgs {
    /// Frames to simulate.
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// Number of images drawn between.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(2..))]
    images: u32,

    /// Width and height of every image.
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u32).range(1..))]
    size: u32,

    /// Lose the context every this many frames.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    loss_every: u32,

    /// Draws per frame.
    #[arg(long, default_value_t = 3)]
    draws_per_frame: u32,

    /// Seed of the draw sequence.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Context options JSON.
    #[arg(long)]
    opts: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Chain(args) => cmd_chain(args),
        Command::Soak(args) => cmd_soak(args),
    }
}

fn load_opts(path: Option<&Path>) -> anyhow::Result<ContextOpts> {
    let Some(path) = path else {
        return Ok(ContextOpts::default());
    };
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read options '{}'", path.display()))?;
    Ok(ContextOpts::from_json_str(&s)?)
}

fn size_uniform(size: u32) -> UniformValue {
    UniformValue::from(vec![size as f32; 2])
}

fn cmd_chain(args: ChainArgs) -> anyhow::Result<()> {
    let opts = load_opts(args.opts.as_deref())?;
    let mut ctx = RestorableContext::new(CpuBackend::default(), opts);
    let size = args.size;
    let seed = Rgba8Premul::new(255, 0, 0, 255);

    let first = ctx.new_image(size, size, false)?;
    ctx.replace_pixels(
        first,
        &seed.to_array().repeat((size * size) as usize),
        Region::full(size, size),
    )?;
    let shader = args
        .shader
        .then(|| ctx.new_shader(programs::sum_images(1)));

    let mut ids = vec![first];
    let mut prev = first;
    for _ in 1..args.len {
        let next = ctx.new_image(size, size, false)?;
        let geometry = Geometry::full_quad(size, size);
        let draw = match &shader {
            Some(s) => {
                let uniforms: Uniforms = [(0, size_uniform(size)), (1, UniformValue::from(prev))]
                    .into_iter()
                    .collect();
                DrawTriangles::new(geometry).shader(s, uniforms)
            }
            None => DrawTriangles::new(geometry)
                .source(prev)
                .mode(CompositeMode::Copy),
        };
        ctx.draw_triangles(next, draw)?;
        ids.push(next);
        prev = next;
    }

    if args.resolve_first {
        ctx.resolve_stale_images()?;
    }
    if !args.keep_context {
        ctx.backend_mut().lose_context();
        ctx.restore_if_needed()?;
    }

    let mut mismatches = 0usize;
    for &id in &ids {
        let px = ctx.read_pixels(id)?;
        let bad = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .filter(|&(x, y)| px.pixel(x, y) != Some(seed))
            .count();
        tracing::debug!(image = ?id, digest = px.digest(), bad, "verified");
        mismatches += bad;
    }

    let stats = ctx.backend().stats();
    eprintln!(
        "chain of {} images: {mismatches} mismatched pixels, {} allocations, {} draws",
        ids.len(),
        stats.allocations,
        stats.draws
    );
    if let Some(out) = &args.out {
        write_png(out, &ctx.read_pixels(prev)?)?;
        eprintln!("wrote {}", out.display());
    }
    anyhow::ensure!(mismatches == 0, "{mismatches} pixels differ from the seed color");
    Ok(())
}

fn write_png(out: &Path, pixels: &Pixels) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    pixels
        .to_rgba_image()?
        .save_with_format(out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", out.display()))
}

/// SplitMix64; enough to vary the draw sequence reproducibly.
struct SplitMix(u64);

impl SplitMix {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn below(&mut self, n: u32) -> u32 {
        (self.next() % u64::from(n.max(1))) as u32
    }
}

const SOAK_MODES: [CompositeMode; 5] = [
    CompositeMode::SourceOver,
    CompositeMode::Copy,
    CompositeMode::Lighter,
    CompositeMode::Xor,
    CompositeMode::DestinationOver,
];

fn random_region(rng: &mut SplitMix, size: u32) -> Region {
    let x = rng.below(size);
    let y = rng.below(size);
    Region::new(x, y, 1 + rng.below(size - x), 1 + rng.below(size - y))
}

fn soak_step(
    ctx: &mut RestorableContext<CpuBackend>,
    rng: &mut SplitMix,
    ids: &[ImageId],
    size: u32,
) -> anyhow::Result<()> {
    let n = ids.len() as u32;
    let target = rng.below(n);
    let target_id = ids[target as usize];

    if rng.below(4) == 0 {
        let region = random_region(rng, size);
        let mut data = Vec::with_capacity(region.area() * 4);
        for _ in 0..region.area() {
            let a = rng.below(256) as u8;
            let mut channel = || rng.below(u32::from(a) + 1) as u8;
            data.extend_from_slice(&[channel(), channel(), channel(), a]);
        }
        ctx.replace_pixels(target_id, &data, region)?;
        return Ok(());
    }

    let source = ids[((target + 1 + rng.below(n - 1)) % n) as usize];
    let dst = random_region(rng, size);
    let src = random_region(rng, size);
    let rect = |r: Region| {
        kurbo::Rect::new(
            f64::from(r.x),
            f64::from(r.y),
            f64::from(r.x + r.width),
            f64::from(r.y + r.height),
        )
    };
    let filter = if rng.below(2) == 0 {
        Filter::Nearest
    } else {
        Filter::Linear
    };
    let draw = DrawTriangles::new(Geometry::quad(rect(dst), rect(src)))
        .source(source)
        .mode(SOAK_MODES[rng.below(SOAK_MODES.len() as u32) as usize])
        .filter(filter);
    ctx.draw_triangles(target_id, draw)?;
    Ok(())
}

fn cmd_soak(args: SoakArgs) -> anyhow::Result<()> {
    let opts = load_opts(args.opts.as_deref())?;
    let mut ctx = RestorableContext::new(CpuBackend::default(), opts);
    let mut rng = SplitMix(args.seed);
    let ids = (0..args.images)
        .map(|_| ctx.new_image(args.size, args.size, false))
        .collect::<Result<Vec<_>, _>>()?;

    let mut losses = 0u32;
    let mut mismatched_images = 0u32;
    for frame in 0..args.frames {
        for _ in 0..args.draws_per_frame {
            soak_step(&mut ctx, &mut rng, &ids, args.size)?;
        }

        if (frame + 1) % args.loss_every == 0 {
            let before = ids
                .iter()
                .map(|&id| ctx.read_pixels(id).map(|p| p.digest()))
                .collect::<Result<Vec<_>, _>>()?;
            let pending = ctx.total_history_len();

            ctx.backend_mut().lose_context();
            ctx.restore_if_needed()
                .with_context(|| format!("restore after frame {frame}"))?;
            losses += 1;

            for (&id, digest) in ids.iter().zip(before) {
                if ctx.read_pixels(id)?.digest() != digest {
                    tracing::warn!(frame, image = ?id, "restored pixels differ");
                    mismatched_images += 1;
                }
            }
            tracing::debug!(frame, pending, "context loss survived");
        }

        ctx.end_frame()?;
    }

    let stats = ctx.backend().stats();
    eprintln!(
        "{} frames, {losses} context losses, {mismatched_images} mismatched images, \
         {} draws, {} reads",
        args.frames,
        stats.draws,
        stats.reads
    );
    anyhow::ensure!(mismatched_images == 0, "{mismatched_images} images restored incorrectly");
    Ok(())
}
