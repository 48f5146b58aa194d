use std::fs::File;
use std::io::{stdout, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hifitime::Epoch;
use serde::Serialize;
use spartn::{DecodeConfig, Decoder, ErrorHandling, FrameReader, TimeAnchor, TransportFrame};
use tracing::info;

#[derive(Debug, Clone)]
pub struct Options {
    pub decrypt: bool,
    pub key: Option<String>,
    pub validate: bool,
    pub anchor: Option<u32>,
}

#[derive(Serialize)]
struct Record<'a> {
    identity: &'a str,
    length: usize,
    time: Option<Epoch>,
    #[serde(flatten)]
    frame: &'a TransportFrame,
}

fn decoder(opts: &Options) -> Result<Decoder> {
    let anchor = match opts.anchor {
        Some(t) => TimeAnchor::with_time(t),
        None => TimeAnchor::new(),
    };
    // The builder's setters change its type, so optional fields are set on the result
    let mut config = DecodeConfig::builder()
        .decrypt(opts.decrypt)
        .validate(opts.validate)
        .time_anchor(anchor)
        .build();
    config.key.clone_from(&opts.key);
    Decoder::new(config).context("creating decoder")
}

pub fn decode(fpath: &Path, opts: &Options) -> Result<()> {
    let decoder = decoder(opts)?;
    let file = File::open(fpath).with_context(|| format!("opening {fpath:?}"))?;
    let mut reader =
        FrameReader::new(BufReader::new(file), decoder).with_error_handling(ErrorHandling::Log);

    let mut out = BufWriter::new(stdout().lock());
    let mut count = 0usize;
    for frame in reader.by_ref() {
        let frame = frame.context("reading frames")?;
        let record = Record {
            identity: frame.identity(),
            length: frame.len(),
            time: frame.epoch(),
            frame: &frame,
        };
        serde_json::to_writer(&mut out, &record).context("serializing frame")?;
        out.write_all(b"\n").context("writing to stdout")?;
        count += 1;
    }
    out.flush().context("writing to stdout")?;

    info!(
        frames = count,
        failed = reader.failed,
        skipped_bytes = reader.skipped,
        "decoded {fpath:?}"
    );
    Ok(())
}
