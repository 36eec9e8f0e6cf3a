//! Rotating rendered page images on a pool of worker threads.
//!
//! Rendering happens at the page's own orientation; when the viewer is
//! turned, the already rendered images are rotated instead of rendered
//! again. Results come back in whatever order the workers finish, tagged
//! with the id of their request.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, RecvError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use image::{imageops, RgbaImage};
use log::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Rotation0 => 0,
            Rotation::Rotation90 => 90,
            Rotation::Rotation180 => 180,
            Rotation::Rotation270 => 270,
        }
    }

    /// Any multiple of 90 degrees, including negative ones, maps to a
    /// rotation.
    pub fn from_degrees(degrees: i32) -> Option<Rotation> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Rotation0),
            90 => Some(Rotation::Rotation90),
            180 => Some(Rotation::Rotation180),
            _ => Some(Rotation::Rotation270),
        }
    }

    /// Applying `self` and then `other`.
    pub fn compose(self, other: Rotation) -> Rotation {
        match (self.degrees() + other.degrees()) % 360 {
            0 => Rotation::Rotation0,
            90 => Rotation::Rotation90,
            180 => Rotation::Rotation180,
            _ => Rotation::Rotation270,
        }
    }

    /// The clockwise rotation that turns something at `from` into `to`.
    pub fn between(from: Rotation, to: Rotation) -> Rotation {
        match (360 + to.degrees() - from.degrees()) % 360 {
            0 => Rotation::Rotation0,
            90 => Rotation::Rotation90,
            180 => Rotation::Rotation180,
            _ => Rotation::Rotation270,
        }
    }
}

/// A rotated image along with what was asked for.
#[derive(Debug, Clone)]
pub struct RotatedImage {
    pub image: RgbaImage,
    pub rotation: Rotation,
    pub id: u64,
}

/// Turns an image rendered at one orientation into another.
#[derive(Debug, Clone)]
pub struct RotationJob {
    image: RgbaImage,
    old_rotation: Rotation,
    new_rotation: Rotation,
    id: u64,
}

impl RotationJob {
    pub fn new(
        image: RgbaImage,
        old_rotation: Rotation,
        new_rotation: Rotation,
        id: u64,
    ) -> Self {
        RotationJob {
            image,
            old_rotation,
            new_rotation,
            id,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn run(self) -> RotatedImage {
        let turn = Rotation::between(self.old_rotation, self.new_rotation);
        let image = match turn {
            Rotation::Rotation0 => self.image,
            Rotation::Rotation90 => imageops::rotate90(&self.image),
            Rotation::Rotation180 => imageops::rotate180(&self.image),
            Rotation::Rotation270 => imageops::rotate270(&self.image),
        };

        RotatedImage {
            image,
            rotation: self.new_rotation,
            id: self.id,
        }
    }
}

struct Request {
    page: usize,
    job: RotationJob,
}

struct Response {
    page: usize,
    result: RotatedImage,
}

/// A fixed pool of threads running rotation jobs. A newer request for a
/// page makes results of older requests for the same page stale; those are
/// dropped instead of being handed out.
pub struct RotationWorker {
    requests: Option<Sender<Request>>,
    responses: Receiver<Response>,
    latest: HashMap<usize, u64>,
    pending: usize,
    threads: Vec<JoinHandle<()>>,
}

impl RotationWorker {
    pub fn new(thread_count: usize) -> Self {
        let (request_sender, request_receiver) = channel::<Request>();
        let (response_sender, response_receiver) = channel();
        let request_receiver = Arc::new(Mutex::new(request_receiver));

        let threads = (0..thread_count.max(1))
            .map(|_| {
                let requests = Arc::clone(&request_receiver);
                let responses = response_sender.clone();
                thread::spawn(move || loop {
                    let request = match requests.lock() {
                        Ok(receiver) => receiver.recv(),
                        Err(_) => return,
                    };
                    let Request { page, job } = match request {
                        Ok(request) => request,
                        // The worker was dropped.
                        Err(_) => return,
                    };
                    trace!("rotating image {} for page {}", job.id(), page);
                    let result = job.run();
                    if responses.send(Response { page, result }).is_err() {
                        return;
                    }
                })
            })
            .collect();

        RotationWorker {
            requests: Some(request_sender),
            responses: response_receiver,
            latest: HashMap::new(),
            pending: 0,
            threads,
        }
    }

    /// Queues a rotation of `image` for `page`. Ids are chosen by the
    /// caller; the most recently submitted id for a page is the one whose
    /// result will be delivered.
    pub fn submit(
        &mut self,
        page: usize,
        image: RgbaImage,
        current: Rotation,
        target: Rotation,
        id: u64,
    ) {
        self.latest.insert(page, id);
        let job = RotationJob::new(image, current, target, id);

        if let Some(requests) = &self.requests {
            if requests.send(Request { page, job }).is_ok() {
                self.pending += 1;
            }
        }
    }

    /// Blocks until the next result that hasn't been superseded is done.
    /// Returns None once nothing is left in flight.
    pub fn recv(&mut self) -> Option<RotatedImage> {
        while self.pending > 0 {
            let response = match self.responses.recv() {
                Ok(response) => response,
                Err(RecvError) => return None,
            };
            self.pending -= 1;

            if self.latest.get(&response.page) == Some(&response.result.id) {
                self.latest.remove(&response.page);
                return Some(response.result);
            }
            debug!(
                "dropping stale rotation {} for page {}",
                response.result.id, response.page
            );
        }
        None
    }
}

impl Drop for RotationWorker {
    fn drop(&mut self) {
        // Closing the channel makes every thread's recv() fail.
        self.requests.take();
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}
