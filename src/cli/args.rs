use crate::dispatch::Strategy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "driver")]
#[command(about = "Convert every RGB PNG in a folder to grayscale using a chosen concurrency strategy")]
#[command(version)]
pub struct Cli {
    /// Concurrency ceiling (threads, workers or child processes)
    pub concurrency: usize,

    /// Dispatch strategy: t = gated threads, q = queue-backed pool, p = process pool
    #[arg(value_enum)]
    pub mode: Mode,

    /// Folder whose direct entries are converted
    pub folder: PathBuf,

    /// Write a JSON batch report to this path
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging and log progress instead of printing it
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Admission-gated per-job threads
    #[value(name = "t")]
    Threads,
    /// Queue-backed fixed worker pool
    #[value(name = "q")]
    Queue,
    /// Forked process pool
    #[value(name = "p")]
    Processes,
}

impl From<Mode> for Strategy {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Threads => Strategy::GatedThreads,
            Mode::Queue => Strategy::QueuePool,
            Mode::Processes => Strategy::ProcessPool,
        }
    }
}
