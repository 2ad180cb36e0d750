// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identifier barcode contract.
//
// Decoding itself is delegated to a `BarcodeDecoder`. Failures never abort a
// paper: sentinel identifiers are assigned and a note is recorded.
//
// # Feature Gate
//
// `QrDecoder` (QR symbols via `rqrr`) is only available with the `qr`
// feature:
//
// ```toml
// markscan-omr = { path = "crates/markscan-omr", features = ["qr"] }
// ```

#[cfg(feature = "qr")]
pub mod qr;

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use image::GrayImage;
use markscan_core::diagnostics::Note;
use markscan_core::profile::BarcodeParams;
use tracing::{debug, warn};

use crate::raster::crop_clamped;

#[cfg(feature = "qr")]
pub use qr::QrDecoder;

/// Result of one decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Decoded(String),
    TimedOut,
    Unreadable(String),
}

/// Reads the identifier payload from a binarized barcode region.
pub trait BarcodeDecoder: Send + Sync {
    /// Decode `region` (ink = 255) within `timeout`.
    fn decode(&self, region: &GrayImage, timeout: Duration) -> DecodeOutcome;
}

/// Decoder used when none is configured. Every paper gets sentinel ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDecoder;

impl BarcodeDecoder for NullDecoder {
    fn decode(&self, _region: &GrayImage, _timeout: Duration) -> DecodeOutcome {
        warn!("BarcodeDecoder::decode called on null decoder");
        DecodeOutcome::Unreadable("no barcode decoder configured".into())
    }
}

/// Enforces the time budget around any decoder.
///
/// The wrapped decoder runs on a worker thread; when the budget expires the
/// caller gets [`DecodeOutcome::TimedOut`] and the worker's late result is
/// discarded.
///
/// Threads cannot be cancelled, so a timed-out worker is detached rather than
/// stopped: it keeps its CPU time and its copy of the region until the inner
/// decoder returns. Decoders that can stop early should watch the `timeout`
/// they are handed; otherwise every timeout leaves one busy thread behind for
/// as long as the decode takes.
pub struct Deadline<D> {
    inner: Arc<D>,
}

impl<D: BarcodeDecoder + 'static> Deadline<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl<D: BarcodeDecoder + 'static> BarcodeDecoder for Deadline<D> {
    fn decode(&self, region: &GrayImage, timeout: Duration) -> DecodeOutcome {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let region = region.clone();

        let spawned = thread::Builder::new()
            .name("barcode-decode".into())
            .spawn(move || {
                // The receiver is gone once the deadline has passed.
                let _ = tx.send(inner.decode(&region, timeout));
            });
        if let Err(err) = spawned {
            return DecodeOutcome::Unreadable(format!("could not start decoder thread: {err}"));
        }

        match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => DecodeOutcome::TimedOut,
            Err(RecvTimeoutError::Disconnected) => {
                DecodeOutcome::Unreadable("decoder stopped without a result".into())
            }
        }
    }
}

/// Identifiers assigned to one paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperIds {
    pub test_id: String,
    pub paper_id: String,
}

impl PaperIds {
    /// Split a payload after `test_id_len` characters.
    ///
    /// A payload no longer than the split is the test id alone.
    pub fn from_payload(payload: &str, test_id_len: usize) -> Self {
        let (test_id, paper_id) = match payload.char_indices().nth(test_id_len) {
            Some((split, _)) => payload.split_at(split),
            None => (payload, ""),
        };
        Self {
            test_id: test_id.to_owned(),
            paper_id: paper_id.to_owned(),
        }
    }

    pub fn sentinel(params: &BarcodeParams) -> Self {
        Self {
            test_id: params.test_id_sentinel.clone(),
            paper_id: params.paper_id_sentinel.clone(),
        }
    }
}

/// Decode the identifiers of a binarized canonical paper.
pub fn read_ids(
    decoder: &dyn BarcodeDecoder,
    binary: &GrayImage,
    params: &BarcodeParams,
) -> (PaperIds, Option<Note>) {
    let r = params.region;
    let region = crop_clamped(binary, r.x, r.y, r.width, r.height);
    let timeout = Duration::from_millis(params.timeout_ms);

    match decoder.decode(&region, timeout) {
        DecodeOutcome::Decoded(payload) => {
            let ids = PaperIds::from_payload(&payload, params.test_id_len);
            debug!(test_id = %ids.test_id, paper_id = %ids.paper_id, "Barcode decoded");
            (ids, None)
        }
        DecodeOutcome::TimedOut => {
            debug!(timeout_ms = params.timeout_ms, "Barcode decode timed out");
            (
                PaperIds::sentinel(params),
                Some(Note::BarcodeTimedOut {
                    timeout_ms: params.timeout_ms,
                }),
            )
        }
        DecodeOutcome::Unreadable(reason) => {
            debug!(%reason, "Barcode unreadable");
            (
                PaperIds::sentinel(params),
                Some(Note::BarcodeUnreadable { reason }),
            )
        }
    }
}
