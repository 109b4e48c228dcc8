//! End-to-end pipeline tests with a scripted recognizer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use pretty_assertions::assert_eq;

use kvit_core::ocr::{Fragment, Point, RecognizedPage, Recognizer};
use kvit_core::OcrError;

use kvit_store::{
    BatchService, Hooks, ImageService, ParallelOptions, ParallelProcessor, ProcessError,
    ReceiptService, Store,
};

/// Task images encode a fixture index in their width.
const BASE_WIDTH: u32 = 200;

fn task_image(index: u32) -> DynamicImage {
    DynamicImage::new_rgba8(BASE_WIDTH + index, 100)
}

/// Lay text out as positioned fragments, one row per line.
fn page_from_text(text: &str) -> RecognizedPage {
    let mut fragments = Vec::new();
    for (row, line) in text.split('\n').enumerate() {
        let mut x = 10;
        for word in line.split_whitespace() {
            let width = 12 * word.len() as i32;
            let top = 30 * row as i32;
            fragments.push(Fragment::from_rect(word, x, top, x + width, top + 20));
            x += width + 8;
        }
    }
    RecognizedPage {
        text: text.to_string(),
        fragments,
    }
}

/// Scripted recognizer keyed on the fixture index:
/// - 4 fails outright, 5 returns an empty page;
/// - 2 and 3 return receipts with no recognizable vendor;
/// - everything else is a complete receipt.
struct ScriptedRecognizer;

impl Recognizer for ScriptedRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<RecognizedPage, OcrError> {
        let index = image.width() - BASE_WIDTH;
        match index {
            4 => Err(OcrError::Recognition("scripted failure".to_string())),
            5 => Ok(RecognizedPage::default()),
            i => {
                // letters only: the vendor fix-up pass rewrites digits
                let vendor = if i == 2 || i == 3 {
                    "JUST WORDS".to_string()
                } else {
                    format!("OU VENDOR{} Estonia", (b'A' + i as u8) as char)
                };
                let text = format!(
                    "{vendor}\nkviitung: 77{i}\n09.12.2023\nSumma {},00\nKM {},00",
                    6 * (i + 1),
                    i + 1,
                );
                Ok(page_from_text(&text))
            }
        }
    }
}

fn run_pipeline(workers: usize, tasks: u32, options: ParallelOptions) -> (Store, String) {
    let store = Store::in_memory().unwrap();
    let batches = BatchService::new(store.clone());
    let (batch_id, _) = batches.create_batch("acct1", "start").unwrap();

    let processor = ParallelProcessor::new(
        store.clone(),
        Arc::new(ScriptedRecognizer),
        "acct1",
        &batch_id,
        ParallelOptions { workers, ..options },
    );
    for i in 0..tasks {
        processor.add(&format!("receipt-{i}.png"), task_image(i)).unwrap();
    }
    processor.wait().unwrap();
    (store, batch_id)
}

#[test]
fn failures_are_skipped_and_the_rest_lands() {
    let dir = tempfile::tempdir().unwrap();
    let errors_path = dir.path().join("errors.txt");

    let processed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&processed);
    let options = ParallelOptions {
        hooks: Hooks {
            after_each: Some(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
            ..Hooks::default()
        },
        error_report: Some(errors_path.clone()),
        ..ParallelOptions::default()
    };

    // 6 tasks, 2 scripted failures
    let (store, batch_id) = run_pipeline(3, 6, options);

    let receipts = ReceiptService::new(store.clone())
        .get_batch("acct1", &batch_id)
        .unwrap();
    assert_eq!(receipts.len(), 4);
    assert_eq!(processed.load(Ordering::SeqCst), 4);

    // batch totals equal the sum over stored receipts
    let batch = BatchService::new(store.clone())
        .get_batch("acct1", &batch_id)
        .unwrap();
    assert_eq!(batch.num_receipts, 4);
    assert_eq!(batch.total, 600 + 1200 + 1800 + 2400);
    assert_eq!(batch.vat, 100 + 200 + 300 + 400);

    // every receipt has its cropped image stored under the same id
    let images = ImageService::new(store);
    for receipt in &receipts {
        let image = images.get("acct1", &receipt.id).unwrap();
        let decoded = image::load_from_memory(&image.0).unwrap();
        assert!(decoded.width() > 0);
        assert_eq!(receipt.date, "09/12/2023");
        assert_eq!(receipt.batch_id, batch_id);
    }

    // the two vendor-less receipts each contributed one report line
    let report = std::fs::read_to_string(&errors_path).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        assert!(line.ends_with("no vendor found"), "{line}");
        assert!(line.starts_with("receipt-"), "{line}");
    }
}

#[test]
fn extracted_fields_survive_to_storage() {
    let (store, batch_id) = run_pipeline(2, 1, ParallelOptions::default());
    let receipts = ReceiptService::new(store)
        .get_batch("acct1", &batch_id)
        .unwrap();
    assert_eq!(receipts.len(), 1);

    let receipt = &receipts[0];
    assert_eq!(receipt.vendor, "OU VENDORA Estonia");
    assert_eq!(receipt.receipt_number, "770");
    assert_eq!(receipt.total, 600);
    assert_eq!(receipt.vat, 100);
    assert_eq!(receipt.total_string(), "6.00");
    assert_eq!(receipt.source, "receipt-0.png");
    assert!(receipt.errors.is_empty());
}

#[test]
fn single_worker_drains_a_queue_larger_than_capacity() {
    let (store, batch_id) = run_pipeline(1, 4, ParallelOptions::default());
    let receipts = ReceiptService::new(store)
        .get_batch("acct1", &batch_id)
        .unwrap();
    assert_eq!(receipts.len(), 4);
}

#[test]
fn more_workers_than_tasks_still_terminates() {
    let (store, batch_id) = run_pipeline(8, 2, ParallelOptions::default());
    let receipts = ReceiptService::new(store)
        .get_batch("acct1", &batch_id)
        .unwrap();
    assert_eq!(receipts.len(), 2);
}

#[test]
fn start_and_end_hooks_fire_once() {
    let started = Arc::new(AtomicUsize::new(0));
    let ended = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&started);
    let e = Arc::clone(&ended);
    let hooks = Hooks {
        before_start: Some(Box::new(move || {
            s.fetch_add(1, Ordering::SeqCst);
        })),
        after_end: Some(Box::new(move || {
            e.fetch_add(1, Ordering::SeqCst);
        })),
        ..Hooks::default()
    };

    run_pipeline(
        2,
        2,
        ParallelOptions {
            hooks,
            ..ParallelOptions::default()
        },
    );
    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert_eq!(ended.load(Ordering::SeqCst), 1);
}

struct PanickingRecognizer;

impl Recognizer for PanickingRecognizer {
    fn recognize(&self, _: &DynamicImage) -> Result<RecognizedPage, OcrError> {
        panic!("recognizer crashed");
    }
}

#[test]
fn worker_panic_surfaces_from_wait() {
    let store = Store::in_memory().unwrap();
    let batches = BatchService::new(store.clone());
    let (batch_id, _) = batches.create_batch("acct1", "start").unwrap();

    let processor = ParallelProcessor::new(
        store,
        Arc::new(PanickingRecognizer),
        "acct1",
        &batch_id,
        ParallelOptions {
            workers: 1,
            ..ParallelOptions::default()
        },
    );
    processor.add("boom.png", task_image(0)).unwrap();
    let err = processor.wait().unwrap_err();
    assert!(matches!(err, ProcessError::WorkerPanicked));
}

/// Recognizer that reports sideways text on landscape images and upright
/// text once the image has been rotated to portrait.
struct SidewaysRecognizer;

impl Recognizer for SidewaysRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<RecognizedPage, OcrError> {
        if image.width() > image.height() {
            // vertex ring starts at the top-right corner: a 90° vote
            let fragments = vec![
                Fragment::new(
                    "sideways",
                    vec![
                        Point::new(10, 0),
                        Point::new(10, 10),
                        Point::new(0, 10),
                        Point::new(0, 0),
                    ],
                );
                3
            ];
            return Ok(RecognizedPage {
                text: "sideways".to_string(),
                fragments,
            });
        }
        Ok(page_from_text(
            "OU UPRIGHT Estonia\nkviitung: 42\n09.12.2023\nSumma 6,00\nKM 1,00",
        ))
    }
}

#[test]
fn sideways_pages_get_a_second_upright_pass() {
    let store = Store::in_memory().unwrap();
    let batches = BatchService::new(store.clone());
    let (batch_id, _) = batches.create_batch("acct1", "start").unwrap();

    let processor = ParallelProcessor::new(
        store.clone(),
        Arc::new(SidewaysRecognizer),
        "acct1",
        &batch_id,
        ParallelOptions {
            workers: 1,
            ..ParallelOptions::default()
        },
    );
    processor
        .add("sideways.png", DynamicImage::new_rgba8(120, 60))
        .unwrap();
    processor.wait().unwrap();

    let receipts = ReceiptService::new(store)
        .get_batch("acct1", &batch_id)
        .unwrap();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].vendor, "OU UPRIGHT Estonia");
    assert_eq!(receipts[0].receipt_number, "42");
}
