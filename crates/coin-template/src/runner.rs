//! Template runners.
//!
//! A runner applies the template filter to a whole template stream. Plain
//! streams are filtered end to end. Tar archives are filtered entry by entry:
//! names, link names and bodies all pass through the filter, and each
//! rewritten entry is appended by a background writer while the next entry
//! is being filtered.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, warn};
use thiserror::Error;

use crate::filter::{Filter, FilterError, FilterMap};

/// Errors running a template.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("unknown compression format '{0}'")]
    UnknownCompression(String),
    #[error("unsupported stream type '{0}'")]
    UnsupportedStreamType(String),
    /// Template error in a plain stream
    #[error("failed to filter template stream: {0}")]
    Template(#[source] FilterError),
    /// Template or read error in an archive entry
    #[error("failed to filter '{entry}': {source}")]
    Filter {
        entry: String,
        #[source]
        source: io::Error,
    },
    /// The background writer failed to append an entry
    #[error("failed to write archive entry: {0}")]
    Write(#[source] io::Error),
    #[error("archive writer stopped unexpectedly")]
    WriterGone,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Compression wrapped around a tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    fn from_suffix(suffix: &str) -> Result<Self, RunError> {
        match suffix {
            "" => Ok(Compression::None),
            "gz" => Ok(Compression::Gzip),
            other => Err(RunError::UnknownCompression(other.to_owned())),
        }
    }
}

/// How a template stream is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runner {
    /// Filter the stream as a whole.
    Filter,
    /// Filter each entry of a tar archive.
    Tar { compression: Compression },
}

impl Runner {
    /// Pick the runner for a template's stream type (its file extension).
    ///
    /// `tar` and `tar.<compression>` select the archive runner; anything else
    /// is filtered as a plain stream.
    pub fn from_stream_type(stream_type: &str) -> Result<Self, RunError> {
        let lowered = stream_type.to_ascii_lowercase();
        let parts: Vec<&str> = lowered.split('.').collect();
        match parts.as_slice() {
            ["tar"] => Ok(Runner::Tar { compression: Compression::None }),
            ["tar", suffix] => Ok(Runner::Tar { compression: Compression::from_suffix(suffix)? }),
            ["tar", ..] => Err(RunError::UnsupportedStreamType(stream_type.to_owned())),
            _ => Ok(Runner::Filter),
        }
    }

    /// Filter `input` into `output` and hand the output back when done.
    pub fn run<R, W>(&self, input: R, output: W, substitutions: impl Into<Arc<FilterMap>>) -> Result<W, RunError>
    where
        R: Read,
        W: Write + Send,
    {
        let substitutions = substitutions.into();
        match *self {
            Runner::Filter => run_plain(input, output, substitutions),
            Runner::Tar { compression: Compression::None } => {
                run_tar(input, Encoder::Plain(output), substitutions)
            }
            Runner::Tar { compression: Compression::Gzip } => run_tar(
                GzDecoder::new(input),
                Encoder::Gzip(GzEncoder::new(output, flate2::Compression::default())),
                substitutions,
            ),
        }
    }
}

fn run_plain<R: Read, W: Write>(input: R, mut output: W, substitutions: Arc<FilterMap>) -> Result<W, RunError> {
    let mut filter = Filter::new(input, substitutions);
    match io::copy(&mut filter, &mut output) {
        Ok(_) => Ok(output),
        Err(err) => match FilterError::from_io(&err) {
            Some(template) => Err(RunError::Template(template.clone())),
            None => Err(RunError::Io(err)),
        },
    }
}

/// Output side of a tar stream.
enum Encoder<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    fn finish(self) -> io::Result<W> {
        match self {
            Encoder::Plain(mut inner) => {
                inner.flush()?;
                Ok(inner)
            }
            Encoder::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::Plain(inner) => inner.write(buf),
            Encoder::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Plain(inner) => inner.flush(),
            Encoder::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// A filtered entry waiting to be appended.
struct PendingEntry {
    name: String,
    header: tar::Header,
    path: PathBuf,
    link: Option<PathBuf>,
    body: Vec<u8>,
}

impl PendingEntry {
    fn append_to<W: Write>(mut self, builder: &mut tar::Builder<W>) -> io::Result<()> {
        self.header.set_size(self.body.len() as u64);
        match &self.link {
            Some(link) => builder.append_link(&mut self.header, &self.path, link)?,
            None => builder.append_data(&mut self.header, &self.path, self.body.as_slice())?,
        }
        debug!("wrote archive entry {}", self.name);
        Ok(())
    }
}

/// Run `input` through a parked filter and park it again.
fn filter_into<S: Read>(
    parked: Filter<io::Empty>,
    input: S,
    out: &mut Vec<u8>,
) -> (Filter<io::Empty>, io::Result<usize>) {
    let mut filter = parked.reset(input);
    let result = filter.read_to_end(out);
    (filter.reset(io::empty()), result)
}

fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Background writer loop: append entries in order, reporting each result.
fn write_entries<W: Write>(
    mut builder: tar::Builder<W>,
    jobs: Receiver<PendingEntry>,
    done: SyncSender<io::Result<()>>,
) -> tar::Builder<W> {
    for entry in jobs {
        let name = entry.name.clone();
        let result = entry.append_to(&mut builder);
        let failed = result.is_err();
        if let Err(err) = &result {
            warn!("failed to write archive entry {}: {}", name, err);
        }
        if done.send(result).is_err() || failed {
            break;
        }
    }
    builder
}

/// Wait for the in-flight write to finish.
fn await_write(done: &Receiver<io::Result<()>>) -> Result<(), RunError> {
    match done.recv() {
        Ok(result) => result.map_err(RunError::Write),
        Err(_) => Err(RunError::WriterGone),
    }
}

/// Read, filter and hand off every entry of the input archive.
fn filter_entries<I: Read>(
    archive: &mut tar::Archive<I>,
    substitutions: Arc<FilterMap>,
    jobs: &SyncSender<PendingEntry>,
    done: &Receiver<io::Result<()>>,
) -> Result<(), RunError> {
    let mut parked = Filter::new(io::empty(), substitutions);
    let mut in_flight = false;

    for entry in archive.entries()? {
        let entry = entry?;
        let raw_path = entry.path_bytes().into_owned();
        let raw_link = entry.link_name_bytes().map(|link| link.into_owned());
        let header = entry.header().clone();
        let name = String::from_utf8_lossy(&raw_path).into_owned();
        let failure = |source| RunError::Filter { entry: name.clone(), source };

        let mut path = Vec::with_capacity(raw_path.len());
        let (filter, result) = filter_into(parked, raw_path.as_slice(), &mut path);
        result.map_err(failure)?;

        let mut link = None;
        let filter = match raw_link {
            Some(raw_link) => {
                let mut filtered = Vec::with_capacity(raw_link.len());
                let (filter, result) = filter_into(filter, raw_link.as_slice(), &mut filtered);
                result.map_err(failure)?;
                link = Some(bytes_to_path(&filtered));
                filter
            }
            None => filter,
        };

        // bodies are filtered whole; the header needs the final size
        let mut body = Vec::new();
        let (filter, result) = filter_into(filter, entry, &mut body);
        result.map_err(failure)?;
        parked = filter;

        debug!("filtered archive entry {} ({} bytes)", name, body.len());

        if in_flight {
            await_write(done)?;
        }
        let pending = PendingEntry { name, header, path: bytes_to_path(&path), link, body };
        jobs.send(pending).map_err(|_| RunError::WriterGone)?;
        in_flight = true;
    }

    if in_flight {
        await_write(done)?;
    }
    Ok(())
}

fn run_tar<I, W>(input: I, output: Encoder<W>, substitutions: Arc<FilterMap>) -> Result<W, RunError>
where
    I: Read,
    W: Write + Send,
{
    let mut archive = tar::Archive::new(input);
    let builder = tar::Builder::new(output);

    thread::scope(|scope| -> Result<W, RunError> {
        let (job_tx, job_rx) = sync_channel::<PendingEntry>(0);
        let (done_tx, done_rx) = sync_channel::<io::Result<()>>(1);

        let writer = thread::Builder::new()
            .name("archive-writer".into())
            .spawn_scoped(scope, move || write_entries(builder, job_rx, done_tx))?;

        let result = filter_entries(&mut archive, substitutions, &job_tx, &done_rx);
        drop(job_tx);

        let builder = writer.join().map_err(|_| RunError::WriterGone)?;
        result?;
        Ok(builder.into_inner()?.finish()?)
    })
}
