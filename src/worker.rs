//! Background dithering.
//!
//! Dithering a page can take a while, so it runs on a dedicated thread. Each
//! request carries its own reply channel and is answered exactly once with
//! either the finished image or the error that stopped it.

use log::debug;
use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};

use crate::{
    dither::{self, BinaryImage, DitherSettings},
    error::{Error, Result},
    strip::Strip,
};

struct Request {
    image: Strip,
    settings: DitherSettings,
    reply: Sender<Result<BinaryImage>>,
}

/// Handle to a dithering thread. Dropping it stops the thread once queued
/// requests are served.
pub struct DitherWorker {
    requests: Option<Sender<Request>>,
    thread: Option<JoinHandle<()>>,
}

impl DitherWorker {
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Request>();
        let thread = thread::Builder::new()
            .name("dither".to_string())
            .spawn(move || serve(rx))?;
        Ok(DitherWorker {
            requests: Some(tx),
            thread: Some(thread),
        })
    }

    /// Queue `image` for dithering.
    pub fn submit(&self, image: Strip, settings: DitherSettings) -> Result<PendingImage> {
        let (reply, response) = mpsc::channel();
        self.requests
            .as_ref()
            .ok_or(Error::WorkerGone)?
            .send(Request {
                image,
                settings,
                reply,
            })
            .map_err(|_| Error::WorkerGone)?;
        Ok(PendingImage { response })
    }
}

impl Drop for DitherWorker {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("dither worker panicked");
            }
        }
    }
}

/// Answer to one [`DitherWorker::submit`] call.
pub struct PendingImage {
    response: Receiver<Result<BinaryImage>>,
}

impl PendingImage {
    /// Block until the worker answers.
    pub fn wait(self) -> Result<BinaryImage> {
        self.response.recv().map_err(|_| Error::WorkerGone)?
    }
}

fn serve(requests: Receiver<Request>) {
    debug!("dither worker started");
    for request in requests {
        let Request {
            image,
            settings,
            reply,
        } = request;
        let result = dither::process(image.width(), image.height(), image.pixels(), &settings);
        if reply.send(result).is_err() {
            debug!("dither result dropped, requester went away");
        }
    }
    debug!("dither worker stopped");
}
