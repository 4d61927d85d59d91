use std::{
    collections::HashMap,
    io::{BufReader, Read},
    mem, str,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, error, warn};
use quick_xml::{
    escape::resolve_predefined_entity,
    events::{BytesRef, Event},
    reader::Reader,
};

use super::{BATCH_ITEM_TAG_NAME_PARAM, BATCH_TAG_NAME_PARAM};
use crate::{
    core::{
        config::BatchReadConfig,
        format::Formatters,
        reader::{BatchFileReader, ReaderState, ResolvedField, open_sources, resolve_fields},
        sink::RecordSink,
        source::InputSource,
    },
    error::BatchError,
};

/// How long `close` waits for the parser thread before abandoning it.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Values of one batch item, indexed like the configured fields.
type ItemValues = Vec<Option<String>>;

/// What the calling thread asks of the parser thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Demand {
    Read,
    Skip,
    Stop,
}

/// What the parser thread answers.
#[derive(Debug)]
enum Handoff {
    Item(ItemValues),
    Skipped,
    End,
    Failed(BatchError),
}

/// Owned view of the parser events the item state machine cares about.
enum Token {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
    Eof,
    Ignored,
}

fn tag_name(name: &[u8]) -> Result<String, BatchError> {
    str::from_utf8(name)
        .map(str::to_string)
        .map_err(|e| BatchError::RecordFormat(format!("Tag name is not valid UTF-8: {}", e)))
}

fn text(bytes: &[u8]) -> Result<String, BatchError> {
    str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| BatchError::RecordFormat(format!("Text is not valid UTF-8: {}", e)))
}

/// Resolves `&amp;`-style and `&#NN;` references.
fn resolve_reference(reference: &BytesRef) -> Result<String, BatchError> {
    let character = reference.resolve_char_ref().map_err(|e| {
        BatchError::RecordFormat(format!("Invalid character reference: {}", e))
    })?;
    if let Some(c) = character {
        return Ok(c.to_string());
    }

    let name = text(reference)?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| BatchError::RecordFormat(format!("Unknown entity reference &{};", name)))
}

/// Event-driven decoder of batch items, owned by the parser thread.
struct ItemParser {
    xml: Reader<BufReader<Box<dyn Read + Send>>>,
    buffer: Vec<u8>,
    batch_tag: String,
    item_tag: String,
    field_index: HashMap<String, usize>,
    field_count: usize,
    in_batch: bool,
    text: String,
    cancel: Arc<AtomicBool>,
}

impl ItemParser {
    fn new(
        source: Box<dyn Read + Send>,
        batch_tag: String,
        item_tag: String,
        fields: &[ResolvedField],
        cancel: Arc<AtomicBool>,
    ) -> Self {
        let field_index = fields
            .iter()
            .enumerate()
            .map(|(index, (field, _))| (field.source_name().to_string(), index))
            .collect();

        Self {
            xml: Reader::from_reader(BufReader::new(source)),
            buffer: Vec::with_capacity(1024),
            batch_tag,
            item_tag,
            field_index,
            field_count: fields.len(),
            in_batch: false,
            text: String::new(),
            cancel,
        }
    }

    fn next_token(&mut self) -> Result<Token, BatchError> {
        self.buffer.clear();
        let event = self.xml.read_event_into(&mut self.buffer).map_err(|e| {
            BatchError::RecordFormat(format!(
                "Malformed XML at position {}: {}",
                self.xml.buffer_position(),
                e
            ))
        })?;

        Ok(match event {
            Event::Start(ref e) => Token::Open(tag_name(e.name().as_ref())?),
            Event::End(ref e) => Token::Close(tag_name(e.name().as_ref())?),
            Event::Empty(ref e) => Token::Empty(tag_name(e.name().as_ref())?),
            Event::Text(ref e) => Token::Text(text(e)?),
            Event::CData(ref e) => Token::Text(text(e)?),
            Event::GeneralRef(ref e) => Token::Text(resolve_reference(e)?),
            Event::Eof => Token::Eof,
            _ => Token::Ignored,
        })
    }

    /// Records the value of a field whose element just closed.
    fn end_field(&self, values: &mut ItemValues, name: &str, value: String) -> Result<(), BatchError> {
        let index = *self.field_index.get(name).ok_or_else(|| {
            BatchError::UnknownFieldTag(format!("<{}> in <{}>", name, self.item_tag))
        })?;

        if values[index].is_some() {
            return Err(BatchError::DuplicateFieldTag(format!(
                "<{}> in <{}>",
                name, self.item_tag
            )));
        }

        values[index] = Some(value);
        Ok(())
    }

    /// Inside the batch every element belongs to an item; elements around
    /// the batch are ignored.
    fn outside_item(&self, name: &str) -> Result<(), BatchError> {
        if self.in_batch {
            return Err(BatchError::UnknownFieldTag(format!(
                "<{}> in <{}> outside any <{}>",
                name, self.batch_tag, self.item_tag
            )));
        }
        Ok(())
    }

    fn start_item(&self, item: &Option<ItemValues>) -> Result<ItemValues, BatchError> {
        if !self.in_batch {
            return Err(BatchError::MissingStartTag(format!(
                "<{}> before <{}>",
                self.item_tag, self.batch_tag
            )));
        }
        if item.is_some() {
            return Err(BatchError::NestedItemTag(format!(
                "<{}> inside <{}>",
                self.item_tag, self.item_tag
            )));
        }
        Ok(vec![None; self.field_count])
    }

    /// Parses up to the end of the next batch item. Returns `None` at the end
    /// of the batch, at the end of input, or once cancelled.
    fn next_item(&mut self) -> Result<Option<ItemValues>, BatchError> {
        let mut item: Option<ItemValues> = None;

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return Ok(None);
            }

            match self.next_token()? {
                Token::Open(name) if name == self.batch_tag => self.in_batch = true,
                Token::Open(name) if name == self.item_tag => {
                    item = Some(self.start_item(&item)?);
                }
                Token::Open(_) => self.text.clear(),
                Token::Empty(name) if name == self.batch_tag => return Ok(None),
                Token::Empty(name) if name == self.item_tag => {
                    return self.start_item(&item).map(Some);
                }
                Token::Empty(name) => match item.as_mut() {
                    Some(values) => self.end_field(values, &name, String::new())?,
                    None => self.outside_item(&name)?,
                },
                Token::Close(name) if name == self.batch_tag => return Ok(None),
                Token::Close(name) if name == self.item_tag => {
                    if item.is_some() {
                        return Ok(item);
                    }
                }
                Token::Close(name) => match item.as_mut() {
                    Some(values) => {
                        let value = mem::take(&mut self.text);
                        self.end_field(values, &name, value)?;
                    }
                    None => self.outside_item(&name)?,
                },
                Token::Text(content) => {
                    if item.is_some() {
                        self.text.push_str(&content);
                    }
                }
                Token::Eof if item.is_some() => {
                    return Err(BatchError::NestedItemTag(format!(
                        "<{}> not closed at end of input",
                        self.item_tag
                    )));
                }
                Token::Eof if !self.in_batch => {
                    return Err(BatchError::MissingStartTag(format!(
                        "no <{}> in document",
                        self.batch_tag
                    )));
                }
                Token::Eof => return Ok(None),
                Token::Ignored => {}
            }
        }
    }

    /// Decodes one item ahead of the caller, then waits for the caller's
    /// demand before handing it over. Ends after the last item, an error or a
    /// stop demand; the input stream is dropped with `self`.
    fn run(mut self, demands: Receiver<Demand>, handoff: Sender<Handoff>) {
        loop {
            let parsed = self.next_item();
            if self.cancel.load(Ordering::Relaxed) {
                debug!("XML parser cancelled");
                return;
            }

            let Ok(demand) = demands.recv() else {
                debug!("XML reader gone, parser stopping");
                return;
            };

            let reply = match (parsed, demand) {
                (_, Demand::Stop) => return,
                (Ok(Some(values)), Demand::Read) => Handoff::Item(values),
                (Ok(Some(_)), Demand::Skip) => Handoff::Skipped,
                (Ok(None), _) => Handoff::End,
                (Err(e), _) => Handoff::Failed(e),
            };

            let last = matches!(reply, Handoff::End | Handoff::Failed(_));
            if handoff.send(reply).is_err() || last {
                return;
            }
        }
    }
}

/// Calling-thread side of a running parser thread.
struct Worker {
    demands: Sender<Demand>,
    handoff: Receiver<Handoff>,
    cancel: Arc<AtomicBool>,
    done: Receiver<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn start(parser: ItemParser, cancel: Arc<AtomicBool>) -> Result<Self, BatchError> {
        let (demand_tx, demand_rx) = bounded(1);
        let (handoff_tx, handoff_rx) = bounded(1);
        let (done_tx, done_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("xml-batch-reader".to_string())
            .spawn(move || {
                // Disconnects `done` whichever way the thread ends.
                let _done = done_tx;
                parser.run(demand_rx, handoff_tx);
            })
            .map_err(|e| {
                BatchError::Configuration(format!("Failed to start XML parser thread: {}", e))
            })?;

        Ok(Self {
            demands: demand_tx,
            handoff: handoff_rx,
            cancel,
            done: done_rx,
            handle,
        })
    }

    /// Sends one demand and blocks for its answer.
    fn exchange(&self, demand: Demand) -> Result<Handoff, BatchError> {
        let lost = || BatchError::RecordFormat("XML parser stopped unexpectedly".to_string());
        self.demands.send(demand).map_err(|_| lost())?;
        self.handoff.recv().map_err(|_| lost())
    }

    /// Signals the parser thread to stop and waits up to `timeout` for it.
    /// Never blocks longer than that: a thread stuck in a blocking read is
    /// abandoned.
    fn stop(self, timeout: Duration) {
        let Worker {
            demands,
            handoff,
            cancel,
            done,
            handle,
        } = self;

        cancel.store(true, Ordering::Relaxed);
        if demands.try_send(Demand::Stop).is_err() {
            debug!("XML parser already stopping");
        }
        drop(demands);
        drop(handoff);

        match done.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "XML parser thread did not stop within {:?}, abandoning it",
                    timeout
                );
            }
            _ => match handle.join() {
                Ok(()) => debug!("XML parser thread stopped"),
                Err(_) => error!("XML parser thread panicked"),
            },
        }
    }
}

fn required_tag(config: &BatchReadConfig, name: &str) -> Result<String, BatchError> {
    let tag: String = config.required_parameter(name)?;
    if tag.trim().is_empty() {
        return Err(BatchError::Configuration(format!(
            "Parameter {} must not be blank",
            name
        )));
    }
    Ok(tag.trim().to_string())
}

/// Reader of XML batch files.
///
/// `open` starts a parser thread on the first source; each read or skip
/// exchanges one demand and one answer with it over bounded channels, so items
/// arrive in document order and no more than one is decoded ahead. Field
/// values are written to the sink on the calling thread, in configuration
/// order; a field whose element is absent from an item is stored as `None`.
/// Inside the batch element every element must belong to an item, so a stray
/// element between items fails with [`BatchError::UnknownFieldTag`].
///
/// After a structural error has been returned, further reads report the end of
/// input. `close` (also run on drop) stops the parser thread within
/// [`DEFAULT_STOP_TIMEOUT`] or the timeout given to
/// [`XmlReader::with_stop_timeout`].
pub struct XmlReader {
    state: ReaderState,
    fields: Vec<ResolvedField>,
    worker: Option<Worker>,
    exhausted: bool,
    stop_timeout: Duration,
}

impl Default for XmlReader {
    fn default() -> Self {
        Self {
            state: ReaderState::default(),
            fields: Vec::new(),
            worker: None,
            exhausted: false,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

impl XmlReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Exchanges one demand with the parser thread. `None` means end of input.
    fn exchange(&mut self, demand: Demand) -> Result<Option<Handoff>, BatchError> {
        if self.exhausted {
            return Ok(None);
        }

        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| BatchError::IllegalState("XML parser not running".to_string()))?;

        match worker.exchange(demand) {
            Ok(Handoff::End) => {
                debug!("End of XML batch");
                self.exhausted = true;
                Ok(None)
            }
            Ok(Handoff::Failed(e)) | Err(e) => {
                self.exhausted = true;
                Err(e)
            }
            Ok(handoff) => Ok(Some(handoff)),
        }
    }
}

impl BatchFileReader for XmlReader {
    fn open(
        &mut self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
    ) -> Result<(), BatchError> {
        self.state.ensure_unopened()?;

        let batch_tag = required_tag(config, BATCH_TAG_NAME_PARAM)?;
        let item_tag = required_tag(config, BATCH_ITEM_TAG_NAME_PARAM)?;
        self.fields = resolve_fields(config, formatters)?;

        let mut sources = open_sources(sources)?;
        if sources.len() > 1 {
            warn!(
                "XML reader reads a single source, ignoring {} more",
                sources.len() - 1
            );
        }
        let source = sources.pop_front().ok_or_else(|| {
            BatchError::Configuration("No batch file source supplied".to_string())
        })?;

        let cancel = Arc::new(AtomicBool::new(false));
        let parser = ItemParser::new(source, batch_tag, item_tag, &self.fields, cancel.clone());
        self.worker = Some(Worker::start(parser, cancel)?);
        self.state = ReaderState::Open;
        debug!("XML reader opened with {} fields", self.fields.len());

        if config.is_skip_first_record() {
            self.skip_next_record()?;
        }
        Ok(())
    }

    fn read_next_record(&mut self, sink: &mut dyn RecordSink) -> Result<bool, BatchError> {
        self.state.ensure_open()?;

        match self.exchange(Demand::Read)? {
            Some(Handoff::Item(values)) => {
                for ((field, formatter), value) in self.fields.iter().zip(values) {
                    sink.store(
                        field.field_name(),
                        value.as_deref().map(|value| field.clean(value)),
                        formatter.as_deref(),
                    )?;
                }
                Ok(true)
            }
            Some(other) => Err(BatchError::IllegalState(format!(
                "Unexpected answer to a read: {:?}",
                other
            ))),
            None => Ok(false),
        }
    }

    fn skip_next_record(&mut self) -> Result<bool, BatchError> {
        self.state.ensure_open()?;
        Ok(self.exchange(Demand::Skip)?.is_some())
    }

    fn close(&mut self) {
        if self.state == ReaderState::Closed {
            return;
        }
        self.state = ReaderState::Closed;

        if let Some(worker) = self.worker.take() {
            worker.stop(self.stop_timeout);
        }
        debug!("XML reader closed");
    }
}

impl Drop for XmlReader {
    fn drop(&mut self) {
        self.close();
    }
}
