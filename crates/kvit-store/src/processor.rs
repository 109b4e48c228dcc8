//! Parallel receipt processing pipeline.
//!
//! A bounded queue feeds a fixed pool of worker threads. Each worker
//! runs the full per-receipt pipeline: recognize, reorient if needed,
//! extract, crop, and persist the receipt together with its image. A
//! failing task is logged and skipped; the pool keeps going.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, error, info};

use kvit_core::ocr::{auto_rotate, crop_image, detect_orientation};
use kvit_core::{Extractor, OcrError, Recognizer};

use crate::entities::{Image, Receipt};
use crate::error::ProcessError;
use crate::keys::{ImageKey, ReceiptKey};
use crate::store::{Entry, Store};

/// One unit of work: a named image to process.
struct Task {
    name: String,
    image: DynamicImage,
}

/// Callbacks around pipeline stages.
///
/// The per-receipt hooks run on worker threads; anything they share must
/// carry its own synchronization.
#[derive(Default)]
pub struct Hooks {
    /// Runs once before any worker starts.
    pub before_start: Option<Box<dyn Fn() + Send + Sync>>,
    /// Runs once after every worker has exited.
    pub after_end: Option<Box<dyn Fn() + Send + Sync>>,
    /// Runs before a receipt is persisted.
    pub before_each: Option<ReceiptHook>,
    /// Runs after a receipt is persisted.
    pub after_each: Option<ReceiptHook>,
}

pub type ReceiptHook = Box<dyn Fn(&Receipt) -> Result<(), ProcessError> + Send + Sync>;

/// Append each receipt's soft failures to a report file, one
/// `source: message` line per failure.
pub fn write_errors_hook(path: impl Into<PathBuf>) -> ReceiptHook {
    use std::fs::OpenOptions;
    use std::io::Write;

    let path = path.into();
    let file = Mutex::new(None::<std::fs::File>);
    Box::new(move |receipt| {
        let mut guard = file.lock().map_err(|_| {
            ProcessError::Hook("error report lock poisoned".to_string())
        })?;
        if guard.is_none() {
            *guard = Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)?,
            );
        }
        let f = guard.as_mut().ok_or_else(|| {
            ProcessError::Hook("error report file unavailable".to_string())
        })?;
        for e in &receipt.errors {
            writeln!(f, "{}: {}", receipt.source, e)?;
        }
        Ok(())
    })
}

/// Pipeline configuration.
pub struct ParallelOptions {
    /// Number of worker threads.
    pub workers: usize,
    pub hooks: Hooks,
    /// When set, each receipt's soft failures are appended here via
    /// [`write_errors_hook`].
    pub error_report: Option<PathBuf>,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            workers: 20,
            hooks: Hooks::default(),
            error_report: None,
        }
    }
}

/// A fixed pool of workers fed from a bounded queue.
///
/// [`add`](Self::add) blocks when the queue is full, so a producer can
/// never outrun the pool; [`wait`](Self::wait) closes the queue and
/// returns once every queued task has been processed.
pub struct ParallelProcessor {
    tx: Sender<Task>,
    workers: Vec<JoinHandle<()>>,
    hooks: Arc<Hooks>,
}

impl ParallelProcessor {
    pub fn new(
        store: Store,
        recognizer: Arc<dyn Recognizer>,
        account_id: &str,
        batch_id: &str,
        options: ParallelOptions,
    ) -> Self {
        let workers = options.workers.max(1);
        let hooks = Arc::new(options.hooks);
        let report = Arc::new(options.error_report.map(write_errors_hook));
        let extractor = Arc::new(Extractor::new());

        if let Some(before_start) = &hooks.before_start {
            before_start();
        }

        // a little slack so workers are never starved while the producer
        // decodes the next image
        let (tx, rx) = bounded::<Task>(workers + 2);

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let rx: Receiver<Task> = rx.clone();
            let store = store.clone();
            let recognizer = Arc::clone(&recognizer);
            let extractor = Arc::clone(&extractor);
            let hooks = Arc::clone(&hooks);
            let report = Arc::clone(&report);
            let account_id = account_id.to_string();
            let batch_id = batch_id.to_string();

            handles.push(thread::spawn(move || {
                for task in rx.iter() {
                    let name = task.name.clone();
                    if let Err(e) = process_task(
                        &store,
                        recognizer.as_ref(),
                        &extractor,
                        &hooks,
                        report.as_ref().as_ref(),
                        &account_id,
                        &batch_id,
                        task,
                    ) {
                        error!(worker, task = %name, error = %e, "task failed");
                    }
                }
                debug!(worker, "worker drained");
            }));
        }

        info!(workers, account = account_id, batch = batch_id, "processor started");
        Self {
            tx,
            workers: handles,
            hooks,
        }
    }

    /// Queue one image. Blocks while the queue is full; fails only when
    /// every worker has already exited.
    pub fn add(&self, name: &str, image: DynamicImage) -> Result<(), ProcessError> {
        self.tx
            .send(Task {
                name: name.to_string(),
                image,
            })
            .map_err(|_| ProcessError::Closed)
    }

    /// Close the queue, wait for every worker to finish, then fire the
    /// end-of-batch hook.
    pub fn wait(self) -> Result<(), ProcessError> {
        let Self { tx, workers, hooks } = self;
        drop(tx);

        let mut panicked = false;
        for handle in workers {
            if handle.join().is_err() {
                panicked = true;
            }
        }
        if panicked {
            return Err(ProcessError::WorkerPanicked);
        }

        if let Some(after_end) = &hooks.after_end {
            after_end();
        }
        Ok(())
    }
}

/// The per-receipt pipeline.
fn process_task(
    store: &Store,
    recognizer: &dyn Recognizer,
    extractor: &Extractor,
    hooks: &Hooks,
    report: Option<&ReceiptHook>,
    account_id: &str,
    batch_id: &str,
    task: Task,
) -> Result<(), ProcessError> {
    let page = recognizer.recognize(&task.image)?;
    if page.is_empty() {
        return Err(OcrError::NoText.into());
    }

    // one corrective rotation at most, then a second recognition pass so
    // extraction sees upright text
    let orientation = detect_orientation(&page.fragments);
    let (page, image) = if orientation.needs_rotation() {
        debug!(task = %task.name, ?orientation, "rotating for second pass");
        let rotated = auto_rotate(&task.image, orientation)?;
        let page = recognizer.recognize(&rotated)?;
        if page.is_empty() {
            return Err(OcrError::NoText.into());
        }
        (page, rotated)
    } else {
        (page, task.image)
    };

    let extraction = extractor.extract(&page, orientation)?;

    let cropped = crop_image(&image, &extraction.crop);
    let mut png = Vec::new();
    cropped.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    let receipt = Receipt::from_extraction(&extraction, batch_id, &task.name);
    if let Some(before_each) = &hooks.before_each {
        before_each(&receipt)?;
    }

    // the receipt and its image land in one transaction under one id
    let receipt_key = ReceiptKey {
        account_id: account_id.to_string(),
        receipt_id: receipt.id.clone(),
    };
    let image_key = ImageKey {
        account_id: account_id.to_string(),
        receipt_id: receipt.id.clone(),
    };
    store.set_all(vec![
        Entry::new(&receipt_key, &receipt)?,
        Entry::new(&image_key, &Image(png))?,
    ])?;

    if let Some(after_each) = &hooks.after_each {
        after_each(&receipt)?;
    }
    if let Some(report) = report {
        report(&receipt)?;
    }
    debug!(task = %task.name, receipt = %receipt.id, "task processed");
    Ok(())
}
