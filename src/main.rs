use anyhow::{Context, Result};
use error::Error;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use structopt::StructOpt;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;

mod angle;
mod calibration;
mod error;
mod frame;
mod history;
mod point;
mod pose;
mod rep_counter;
mod session;
mod settings;

fn write_json<W, T>(out: &mut W, value: &T) -> Result<(), Error>
where
    W: Write,
    T: serde::Serialize,
{
    serde_json::to_writer(&mut *out, value).map_err(Error::SerializeSnapshot)?;
    out.write_all(b"\n").map_err(Error::WriteSnapshot)?;
    out.flush().map_err(Error::WriteSnapshot)
}

/// Exit code for a process killed by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Record a Ctrl-C press. Returns `true` on the first press, which asks the
/// frame loop to finish after the current line. Reading blocks, so a second
/// press is needed to leave an idle stdin.
fn request_stop(running: &AtomicBool) -> bool {
    running.swap(false, Ordering::SeqCst)
}

fn progress_message(session: &session::Session) -> String {
    let arms = session.arms();
    format!(
        "{:?} => reps R: {} L: {}",
        session.phase(),
        arms.right.rep_count,
        arms.left.rep_count,
    )
}

/// Count arm-curl reps from a stream of pose frames.
///
/// Ctrl-C stops after the frame being read and still writes the report. While
/// waiting on an idle stdin, press it twice to exit without a report.
#[derive(structopt::StructOpt)]
struct Opt {
    /// Newline-delimited JSON pose frames. Reads stdin when omitted.
    input: Option<PathBuf>,

    #[structopt(flatten)]
    settings: settings::Settings,

    /// Write a state snapshot every N frames; 0 disables snapshots.
    #[structopt(short = "n", long, default_value = "30")]
    snapshot_every: usize,

    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(short, long)]
    show_progress: bool,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .with(opt.log_level),
    )?;

    let reader: Box<dyn BufRead> = match &opt.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed opening {:?}", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = running.clone();

    ctrlc::set_handler(move || {
        if !request_stop(&running_ctrl_c) {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    })
    .context("failed setting Ctrl-C handler")?;

    let pb = if opt.show_progress {
        Some(
            ProgressBar::new_spinner().with_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                    .template("{prefix:.bold.dim} {spinner} {wide_msg}"),
            ),
        )
    } else {
        None
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut session = session::Session::new(opt.settings);
    let mut nframes = 0_usize;

    for (index, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            warn!(message = "interrupted, finishing session early", nframes);
            break;
        }

        let line = line.map_err(Error::ReadFrame)?;
        if line.trim().is_empty() {
            continue;
        }

        let frame = frame::Frame::parse(&line, index + 1)?;
        let pose = frame
            .pose()
            .with_context(|| format!("invalid pose on line {}", index + 1))?;

        if nframes == 0 {
            session.start(frame.t)?;
        }
        session
            .process_frame(pose.as_ref(), frame.t)
            .context("failed processing frame")?;
        nframes += 1;

        if opt.snapshot_every > 0 && nframes % opt.snapshot_every == 0 {
            write_json(&mut out, &session.snapshot()).context("failed writing snapshot")?;
        }

        if let Some(pb) = pb.as_ref() {
            pb.set_message(progress_message(&session));
            pb.inc(1);
        }
    }

    session.stop();
    if let Some(pb) = pb {
        pb.finish_with_message(progress_message(&session));
    }

    let report = session.final_report();
    info!(
        message = "session report",
        nframes,
        duration = report.duration,
        total_reps = report.total_reps,
    );
    write_json(&mut out, &report).context("failed writing report")?;

    Ok(())
}
