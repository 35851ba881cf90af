//! Offline rendering of a graph file.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use std::path::PathBuf;

use clap::Args;
use patchbay_core::{GraphRenderer, NodeId};

use super::common;

#[derive(Args)]
pub struct RenderArgs {
    /// Graph file to render
    pub file: PathBuf,

    /// Duration in seconds
    #[arg(short, long, default_value = "1.0")]
    pub duration: f32,

    /// Sample rate in Hz
    #[arg(long, default_value = "48000")]
    pub sample_rate: u32,

    /// Frames per render block
    #[arg(long, default_value = "256")]
    pub block_size: usize,
}

/// Peak and RMS accumulator for one output channel.
#[derive(Default, Clone, Copy)]
struct Meter {
    peak: f32,
    sum_sq: f64,
    samples: u64,
}

impl Meter {
    fn add(&mut self, block: &[f32]) {
        for &s in block {
            self.peak = self.peak.max(s.abs());
            self.sum_sq += f64::from(s) * f64::from(s);
        }
        self.samples += block.len() as u64;
    }

    fn rms(&self) -> f32 {
        if self.samples == 0 {
            return 0.0;
        }
        (self.sum_sq / self.samples as f64).sqrt() as f32
    }
}

fn to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Run the render command.
pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if args.block_size == 0 {
        anyhow::bail!("block size must be at least 1");
    }
    let sample_rate = args.sample_rate as f32;
    let controller = common::open(&args.file, sample_rate, args.block_size)?;

    let total = (args.duration.max(0.0) * sample_rate) as usize;
    let mut renderer = GraphRenderer::new(controller.snapshot(), args.block_size);

    // (node, channel) in execution order
    let schedule = controller.processor().schedule();
    let channels: Vec<(NodeId, usize)> = schedule
        .steps()
        .iter()
        .flat_map(|step| (0..step.audio_outputs()).map(move |ch| (step.node(), ch)))
        .collect();
    let mut meters = vec![Meter::default(); channels.len()];

    let mut rendered = 0;
    while rendered < total {
        let frames = args.block_size.min(total - rendered);
        renderer.process(frames);
        for ((node, ch), meter) in channels.iter().zip(meters.iter_mut()) {
            if let Some(out) = renderer.output(*node, *ch) {
                meter.add(&out[..frames]);
            }
        }
        rendered += frames;
    }

    tracing::info!(frames = rendered, "render complete");
    println!(
        "Rendered {} frames at {} Hz ({} blocks of {})",
        rendered,
        args.sample_rate,
        rendered.div_ceil(args.block_size),
        args.block_size
    );
    println!();
    println!("  {:6}  {:14}  {:>10}  {:>10}", "Node", "Output", "Peak dB", "RMS dB");
    println!("  {:6}  {:14}  {:>10}  {:>10}", "----", "------", "-------", "------");
    for ((node, ch), meter) in channels.iter().zip(&meters) {
        println!(
            "  {:6}  {:14}  {:>10.1}  {:>10.1}",
            node.get(),
            format!("audio_out_{}", ch + 1),
            to_db(meter.peak),
            to_db(meter.rms())
        );
    }

    Ok(())
}
