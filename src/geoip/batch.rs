//! Batch coalescing of concurrent lookups
//!
//! A single long-lived worker owns the intake queue. It accumulates requests
//! until the batch fills or a short deadline passes, then fans the batch out
//! as one concurrent resolution task per request. Replies travel over each
//! request's private oneshot channel, so a failure for one IP never affects
//! its siblings.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::debug;

use crate::geoip::models::LocationInfo;
use crate::geoip::resolver::GeoIpError;
use crate::geoip::service::ServiceCore;

/// One in-flight lookup: the validated address, its normalized cache key,
/// and the single-use channel the result is delivered on.
pub(crate) struct LookupRequest {
    pub addr: IpAddr,
    pub key: String,
    pub reply: oneshot::Sender<Result<LocationInfo, GeoIpError>>,
}

pub(crate) struct BatchWorker {
    pub receiver: mpsc::Receiver<LookupRequest>,
    pub shutdown_rx: watch::Receiver<bool>,
    pub core: Arc<ServiceCore>,
    pub batch_size: usize,
    pub batch_timeout: Duration,
}

impl BatchWorker {
    pub async fn run(mut self) {
        let mut batch: Vec<LookupRequest> = Vec::with_capacity(self.batch_size);
        // Armed only while the batch is non-empty, via the select guard below.
        let mut deadline = Instant::now();

        loop {
            tokio::select! {
                maybe = self.receiver.recv() => match maybe {
                    Some(request) => {
                        batch.push(request);
                        if batch.len() == 1 {
                            deadline = Instant::now() + self.batch_timeout;
                        }
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch);
                        }
                    }
                    // All senders gone; answer what is left and stop.
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline), if !batch.is_empty() => {
                    self.flush(&mut batch);
                }
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        // Stop accepting new work; requests already queued
                        // still get their replies.
                        self.receiver.close();
                        while let Some(request) = self.receiver.recv().await {
                            batch.push(request);
                        }
                        break;
                    }
                }
            }
        }

        self.flush(&mut batch);
        debug!("geoip batch worker stopped");
    }

    /// Launch one resolution task per request in the batch. Emptying the
    /// batch also disarms the timeout arm, so exactly one trigger fires per
    /// batch.
    fn flush(&self, batch: &mut Vec<LookupRequest>) {
        if batch.is_empty() {
            return;
        }

        self.core.stats.record_batch();
        debug!(len = batch.len(), "flushing geoip lookup batch");

        for request in batch.drain(..) {
            let core = Arc::clone(&self.core);
            tokio::spawn(async move {
                let result = core.resolve_one(request.addr, &request.key);
                // The caller may have gone away; nothing to deliver then.
                let _ = request.reply.send(result);
            });
        }
    }
}
