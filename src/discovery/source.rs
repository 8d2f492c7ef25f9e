use futures::stream::{self, BoxStream, StreamExt};
use linkify::{LinkFinder, LinkKind};
use log::{debug, warn};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

use super::paths::expand_paths;
use crate::core::error::Result;
use crate::core::types::{RawOccurrence, SourceLocation};

/// Producer of raw link occurrences.
///
/// Document parsers plug in here. The stream is consumed lazily, so a source
/// may keep reading documents while earlier links are already being checked.
pub trait OccurrenceSource {
    fn into_stream(self) -> BoxStream<'static, RawOccurrence>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Text { document: String, text: String },
    File(PathBuf),
}

/// Finds URLs in plain text documents, one line locator per occurrence.
#[derive(Debug, Clone, Default)]
pub struct TextSource {
    inputs: Vec<Input>,
}

fn link_finder() -> LinkFinder {
    let mut finder = LinkFinder::new();
    finder.kinds(&[LinkKind::Url]);
    finder
}

/// Extract every link in `text`, tagged with its 1-indexed line
pub fn extract_links(document: &str, text: &str) -> Vec<RawOccurrence> {
    let finder = link_finder();
    text.lines()
        .enumerate()
        .flat_map(|(index, line)| {
            finder
                .links(line)
                .map(|link| {
                    RawOccurrence::new_unchecked(
                        link.as_str().to_string(),
                        SourceLocation::line(document, index as u64 + 1),
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

impl TextSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text that is already in memory (pasted text, stdin)
    pub fn from_text<D: Into<String>, T: Into<String>>(document: D, text: T) -> Self {
        Self::new().with_text(document, text)
    }

    /// Files read one at a time as the stream is polled. A path given
    /// twice is read once.
    pub fn from_files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut seen = FxHashSet::default();
        let inputs = paths
            .into_iter()
            .map(Into::into)
            .filter(|path: &PathBuf| seen.insert(path.clone()))
            .map(Input::File)
            .collect();
        Self { inputs }
    }

    /// Files and directories; directories are walked recursively and
    /// filtered by `file_types` (see `expand_paths`).
    pub fn from_paths<P: AsRef<Path>>(paths: &[P], file_types: Option<&[String]>) -> Result<Self> {
        Ok(Self::from_files(expand_paths(paths, file_types)?))
    }

    pub fn with_text<D: Into<String>, T: Into<String>>(mut self, document: D, text: T) -> Self {
        self.inputs.push(Input::Text {
            document: document.into(),
            text: text.into(),
        });
        self
    }

    /// Number of documents this source will read
    pub fn documents(&self) -> usize {
        self.inputs.len()
    }

    /// Files this source will read, in order
    pub fn paths(&self) -> Vec<&Path> {
        self.inputs
            .iter()
            .filter_map(|input| match input {
                Input::File(path) => Some(path.as_path()),
                Input::Text { .. } => None,
            })
            .collect()
    }
}

async fn read_input(input: Input) -> Vec<RawOccurrence> {
    match input {
        Input::Text { document, text } => extract_links(&document, &text),
        Input::File(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let document = path.display().to_string();
                let links = extract_links(&document, &text);
                debug!("Found {} link(s) in {document}", links.len());
                links
            }
            Err(err) => {
                warn!("Skipping {}: {err}", path.display());
                Vec::new()
            }
        },
    }
}

impl OccurrenceSource for TextSource {
    fn into_stream(self) -> BoxStream<'static, RawOccurrence> {
        stream::iter(self.inputs)
            .then(read_input)
            .flat_map(stream::iter)
            .boxed()
    }
}

impl OccurrenceSource for Vec<RawOccurrence> {
    fn into_stream(self) -> BoxStream<'static, RawOccurrence> {
        stream::iter(self).boxed()
    }
}
