//! Worker pool: one queue per worker, sessions pinned to a worker by
//! handle index so each session's jobs run in arrival order.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use mt_rs_proto::packets::AccessDeniedCode;

use crate::connection::ConnectionHandler;
use crate::session::SessionHandle;

const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Packet {
        handle: SessionHandle,
        opcode: u16,
        payload: Bytes,
    },
    Disconnect {
        handle: SessionHandle,
        timed_out: bool,
    },
    Deny {
        handle: SessionHandle,
        code: AccessDeniedCode,
    },
    CancelSudo {
        handle: SessionHandle,
    },
}

impl Job {
    pub fn handle(&self) -> SessionHandle {
        match self {
            Job::Packet { handle, .. }
            | Job::Disconnect { handle, .. }
            | Job::Deny { handle, .. }
            | Job::CancelSudo { handle } => *handle,
        }
    }
}

pub struct WorkerPool {
    queues: Vec<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(count: usize, handler: Arc<ConnectionHandler>) -> Self {
        let count = count.max(1);
        let mut queues = Vec::with_capacity(count);
        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            let (tx, mut rx) = mpsc::channel::<Job>(QUEUE_CAPACITY);
            let handler = handler.clone();
            workers.push(tokio::spawn(async move {
                while let Some(job) = rx.recv().await {
                    handler.process(job);
                }
                debug!("worker {id} stopped");
            }));
            queues.push(tx);
        }
        Self { queues, workers }
    }

    pub fn worker_for(&self, handle: SessionHandle) -> usize {
        handle.index as usize % self.queues.len()
    }

    pub async fn submit(&self, job: Job) {
        let worker = self.worker_for(job.handle());
        if self.queues[worker].send(job).await.is_err() {
            warn!("worker {worker} is gone; dropping job");
        }
    }

    /// Close the queues and wait for queued jobs to finish.
    pub async fn shutdown(self) {
        drop(self.queues);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}
