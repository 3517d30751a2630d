// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preview stream — an unbounded, rate-limited sequence of JPEG frames.
//
// Each step locks the device for one read plus encode, releases it, sleeps
// the frame interval, then yields. A capture request waiting on the lock
// therefore only ever waits behind one in-flight preview read.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded};
use lutrin_core::error::LutrinError;
use tracing::{debug, info, warn};

use crate::manager::CameraManager;

/// Cooperative stop signal for a preview consumer.
///
/// Checked between frames; a read already in progress completes first.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One item of the preview sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewFrame {
    /// A JPEG-encoded frame. Framing for transport is the caller's concern.
    Jpeg(Vec<u8>),
    /// The camera is disabled. Always the first and only item when emitted.
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Starting,
    Running,
    Finished,
}

/// Iterator over preview frames. Not restartable: once it returns `None`
/// it stays finished.
pub struct PreviewStream {
    manager: CameraManager,
    cancel: CancelToken,
    interval: Duration,
    state: StreamState,
    frames: u64,
}

impl PreviewStream {
    pub(crate) fn new(manager: CameraManager, cancel: CancelToken, interval: Duration) -> Self {
        Self {
            manager,
            cancel,
            interval,
            state: StreamState::Starting,
            frames: 0,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run the stream on a worker thread feeding a channel of `capacity`
    /// frames. The worker stops when the token is cancelled, the receiver is
    /// dropped, or the stream ends.
    pub fn spawn(self, capacity: usize) -> std::io::Result<PreviewWorker> {
        let (sender, receiver) = bounded(capacity.max(1));
        let cancel = self.cancel.clone();
        let handle = thread::Builder::new()
            .name("lutrin-preview".into())
            .spawn(move || {
                for frame in self {
                    if sender.send(frame).is_err() {
                        debug!("Preview receiver dropped");
                        break;
                    }
                }
            })?;
        Ok(PreviewWorker {
            receiver,
            cancel,
            handle: Some(handle),
        })
    }

    fn finish(&mut self) -> Option<PreviewFrame> {
        self.state = StreamState::Finished;
        info!(frames = self.frames, "Preview stream ended");
        None
    }
}

impl Iterator for PreviewStream {
    type Item = PreviewFrame;

    fn next(&mut self) -> Option<PreviewFrame> {
        if self.state == StreamState::Finished {
            return None;
        }
        if self.cancel.is_cancelled() {
            return self.finish();
        }

        if self.state == StreamState::Starting {
            self.state = StreamState::Running;
            if let Err(err) = self.manager.initialize() {
                warn!(error = %err, "Preview requested but camera is unavailable");
                self.state = StreamState::Finished;
                return Some(PreviewFrame::Unavailable(unavailable_notice(&err)));
            }
        }

        let jpeg = match self.manager.read_preview_jpeg() {
            Ok(jpeg) => jpeg,
            Err(err) => {
                warn!(error = %err, "Preview read failed");
                return self.finish();
            }
        };

        if !self.interval.is_zero() {
            thread::sleep(self.interval);
        }
        if self.cancel.is_cancelled() {
            return self.finish();
        }

        self.frames += 1;
        Some(PreviewFrame::Jpeg(jpeg))
    }
}

fn unavailable_notice(err: &LutrinError) -> String {
    match err {
        LutrinError::DeviceUnavailable(reason) => format!("Camera not available: {reason}"),
        other => format!("Camera not available: {other}"),
    }
}

/// A preview stream running on its own thread.
pub struct PreviewWorker {
    receiver: Receiver<PreviewFrame>,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl PreviewWorker {
    pub fn receiver(&self) -> &Receiver<PreviewFrame> {
        &self.receiver
    }

    /// Signal the worker and wait for it to exit.
    pub fn stop(mut self) {
        self.cancel.cancel();
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            // Drain so a worker blocked on a full channel can observe the
            // cancellation.
            while !handle.is_finished() {
                let _ = self.receiver.recv_timeout(Duration::from_millis(10));
            }
            if handle.join().is_err() {
                warn!("Preview worker panicked");
            }
        }
    }
}

impl Drop for PreviewWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.join();
    }
}
