use std::{
    cmp,
    collections::BTreeMap,
    fs::File,
    io::{stdout, BufReader, Write},
    path::Path,
};

use anyhow::{Context, Result};
use handlebars::handlebars_helper;
use hifitime::{Duration, Epoch};
use serde::Serialize;
use spartn::{Decoder, Error, ErrorHandling, FrameReader, TransportFrame};
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Default, Debug, Clone, Serialize)]
struct Summary {
    total_frames: usize,
    encrypted_frames: usize,
    first_frame_time: Option<Epoch>,
    last_frame_time: Option<Epoch>,
    duration: Duration,
}

impl Summary {
    fn add(&mut self, frame: &TransportFrame) {
        self.total_frames += 1;
        if frame.eaf() {
            self.encrypted_frames += 1;
        }
        // only 32-bit time tags are absolute
        let Some(epoch) = frame.epoch() else {
            return;
        };
        let first = self.first_frame_time.map_or(epoch, |cur| cmp::min(epoch, cur));
        let last = self.last_frame_time.map_or(epoch, |cur| cmp::max(epoch, cur));
        self.first_frame_time = Some(first);
        self.last_frame_time = Some(last);
        self.duration = last - first;
    }
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    summary: Summary,
    crc_errors: usize,
    other_errors: usize,
    skipped_bytes: usize,
    messages: BTreeMap<String, Summary>,
}

fn summarize(fpath: &Path) -> Result<Info> {
    let file = File::open(fpath).context("opening input")?;
    // Only the transport layer is inspected, so there is no need to decrypt
    let mut reader = FrameReader::new(BufReader::new(file), Decoder::default())
        .with_error_handling(ErrorHandling::Raise);

    let mut summary = Summary::default();
    let mut messages: BTreeMap<String, Summary> = BTreeMap::default();
    let mut crc_errors = 0;
    let mut other_errors = 0;

    for zult in reader.by_ref() {
        let frame = match zult {
            Ok(frame) => frame,
            Err(Error::InvalidCrc { actual, computed }) => {
                debug!(actual, computed, "crc error");
                crc_errors += 1;
                continue;
            }
            Err(Error::Io(err)) => return Err(err).context("reading input"),
            Err(err) => {
                debug!("frame error: {err}");
                other_errors += 1;
                continue;
            }
        };
        summary.add(&frame);
        messages
            .entry(frame.identity().to_string())
            .or_default()
            .add(&frame);
    }

    Ok(Info {
        filename: fpath.to_string_lossy().to_string(),
        summary,
        crc_errors,
        other_errors,
        skipped_bytes: reader.skipped,
        messages,
    })
}

pub fn info(fpath: &Path, format: &Format) -> Result<()> {
    let info = summarize(fpath)?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&info).context("serializing info")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn render_text(info: &Info) -> Result<String> {
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => String::new(),
            _ => v.to_string()
        };
        let width = usize::try_from(num).unwrap_or(0).max(v.len());
        format!("{v:>width$}")
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_template_string("info", TEXT_TEMPLATE)
        .context("registering template")?;

    hb.render("info", &info).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
===============================================================================================
First:      {{ summary.first_frame_time }}
Last:       {{ summary.last_frame_time }}
Duration:   {{ summary.duration }}
Count:      {{ summary.total_frames }}
Encrypted:  {{ summary.encrypted_frames }}
CRC errors: {{ crc_errors }}
Errors:     {{ other_errors }}
Skipped:    {{ skipped_bytes }} bytes
-----------------------------------------------------------------------------------------------
Message                 First                              Last                   Count   Encrypted
-----------------------------------------------------------------------------------------------
{{ #each messages }}{{ lpad 22 @key }}  {{ lpad 33 first_frame_time }}  {{ lpad 20 last_frame_time }}   {{ lpad 6 total_frames }}   {{ lpad 9 encrypted_frames }}
{{/each }}
";
