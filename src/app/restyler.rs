use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use anyhow::{anyhow, Result};
use tracing::info;

use crate::{
    restyle::{RestyleClient, RestyleResult},
    session::RestyleJob,
};

pub const NOT_CONFIGURED: &str =
    "AI styling is not configured. Set a restyle endpoint to enable it.";

/// Runs restyle requests off the UI thread, one at a time.
pub struct Restyler {
    job_tx: Sender<RestyleJob>,
    result_rx: Receiver<(u64, RestyleResult)>,
    enabled: bool,
}

impl Restyler {
    pub fn new(client: Option<RestyleClient>) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<RestyleJob>();
        let (result_tx, result_rx) = mpsc::channel();
        let enabled = client.is_some();
        if let Some(client) = &client {
            info!(endpoint = client.endpoint(), "restyle enabled");
        }

        thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                let result = match &client {
                    Some(client) => client.restyle(&job.image, &job.instruction),
                    None => RestyleResult::Failure {
                        reason: NOT_CONFIGURED.to_string(),
                        status: None,
                    },
                };
                if result_tx.send((job.ticket, result)).is_err() {
                    break;
                }
            }
        });

        Self {
            job_tx,
            result_rx,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn submit(&self, job: RestyleJob) -> Result<()> {
        self.job_tx
            .send(job)
            .map_err(|e| anyhow!("Failed to send restyle request: {}", e))
    }

    pub fn check_completions(&self) -> Vec<(u64, RestyleResult)> {
        self.result_rx.try_iter().collect()
    }
}
