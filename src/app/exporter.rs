use std::{
    path::PathBuf,
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use anyhow::{anyhow, Result};
use tracing::warn;

use crate::{
    compose::{compose, BackgroundOption, FrameAssets},
    export::{open_url, save_image, share_action, SharePlatform, ShareAction},
    image_utils::ImageHandle,
};

pub const MANUAL_SAVE_HINT: &str =
    "Could not generate the image automatically. Please take a screenshot of the preview instead.";

pub struct ExportRequest {
    pub subject: ImageHandle,
    pub background: BackgroundOption,
    pub user_name: String,
    pub frame: FrameAssets,
    pub dir: PathBuf,
    pub file_name: String,
    pub share: Option<ShareTarget>,
}

pub struct ShareTarget {
    pub platform: SharePlatform,
    pub message: String,
    pub link: String,
}

#[derive(Debug)]
pub struct ExportDone {
    pub path: PathBuf,
    pub share: Option<ShareAction>,
}

pub struct ExportStatus {
    pub file_name: String,
    pub result: Result<ExportDone>,
}

/// Composes, saves and optionally shares DPs on a background thread.
pub struct Exporter {
    export_tx: Sender<ExportRequest>,
    status_rx: Receiver<ExportStatus>,
    pub pending: Vec<String>,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter {
    pub fn new() -> Self {
        let (export_tx, export_rx) = mpsc::channel::<ExportRequest>();
        let (status_tx, status_rx) = mpsc::channel();

        thread::spawn(move || {
            while let Ok(req) = export_rx.recv() {
                let file_name = req.file_name.clone();
                let result = run_export(req);
                if let Err(err) = &result {
                    warn!(%file_name, "export failed: {err:#}");
                }
                if status_tx.send(ExportStatus { file_name, result }).is_err() {
                    break;
                }
            }
        });

        Self {
            export_tx,
            status_rx,
            pending: Vec::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn queue(&mut self, request: ExportRequest) -> Result<()> {
        self.pending.push(request.file_name.clone());
        self.export_tx
            .send(request)
            .map_err(|e| anyhow!("Failed to send export request: {}", e))
    }

    pub fn check_completions(&mut self) -> Vec<ExportStatus> {
        let mut completed = Vec::new();
        while let Ok(status) = self.status_rx.try_recv() {
            if let Some(idx) = self.pending.iter().position(|f| *f == status.file_name) {
                self.pending.remove(idx);
            }
            completed.push(status);
        }
        completed
    }
}

fn run_export(req: ExportRequest) -> Result<ExportDone> {
    let image = compose(req.background, &req.subject, &req.user_name, &req.frame)
        .ok_or_else(|| anyhow!(MANUAL_SAVE_HINT))?;
    let path = save_image(&image, &req.dir, &req.file_name)?;

    let share = match req.share {
        Some(target) => {
            let action = share_action(target.platform, &target.message, &target.link)?;
            open_url(action.url())?;
            Some(action)
        }
        None => None,
    };
    Ok(ExportDone { path, share })
}
