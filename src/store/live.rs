//! Background storage worker.
//!
//! The worker thread is the only owner of the SQLite connection. Callers talk
//! to it through a cloneable [`StoreHandle`]; every request returns a
//! [`Pending`] completion instead of blocking, and every successful write
//! publishes a fresh list snapshot to all [`LiveNotes`] subscribers. A list
//! that cannot be read is published as an error instead.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use crate::error::{JotError, Result};
use crate::model::{Note, NoteDraft};
use crate::store::db::NoteDb;

/// Outcome of a write, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Inserted(Note),
    Updated { id: i64, rows: usize },
    Deleted { id: i64, rows: usize },
}

type Reply<T> = Sender<Result<T>>;
type Snapshot = Result<Vec<Note>>;

#[derive(Debug)]
enum Request {
    Insert(NoteDraft, Reply<Change>),
    Update(Note, Reply<Change>),
    Delete(Note, Reply<Change>),
    Get(i64, Reply<Option<Note>>),
    Subscribe(Sender<Snapshot>),
    Shutdown,
}

/// One-shot completion of a storage request.
#[derive(Debug)]
pub struct Pending<T> {
    rx: Receiver<Result<T>>,
}

impl<T> Pending<T> {
    fn closed() -> Self {
        let (_tx, rx) = mpsc::channel();
        Self { rx }
    }

    /// Block until the worker answers.
    pub fn wait(self) -> Result<T> {
        self.rx.recv().map_err(|_| JotError::StoreClosed)?
    }

    /// Return the result if it is ready. `None` means still running.
    pub fn poll(&self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(JotError::StoreClosed)),
        }
    }
}

/// Subscription to the live note list.
#[derive(Debug)]
pub struct LiveNotes {
    rx: Receiver<Snapshot>,
}

impl LiveNotes {
    /// Drain queued snapshots and return the newest one, if any arrived.
    pub fn latest(&self) -> Option<Result<Vec<Note>>> {
        let mut newest = None;
        while let Ok(snapshot) = self.rx.try_recv() {
            newest = Some(snapshot);
        }
        newest
    }

    /// Block for the next snapshot.
    pub fn recv(&self) -> Result<Vec<Note>> {
        self.rx.recv().map_err(|_| JotError::StoreClosed)?
    }

    /// Block for the next snapshot, up to `timeout`. `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Vec<Note>>> {
        match self.rx.recv_timeout(timeout) {
            Ok(snapshot) => snapshot.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(JotError::StoreClosed),
        }
    }
}

/// Cloneable request side of the storage worker.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: Sender<Request>,
}

impl StoreHandle {
    fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Request) -> Pending<T> {
        let (reply, rx) = mpsc::channel();
        if self.tx.send(build(reply)).is_err() {
            return Pending::closed();
        }
        Pending { rx }
    }

    pub fn insert(&self, draft: NoteDraft) -> Pending<Change> {
        self.request(|reply| Request::Insert(draft, reply))
    }

    pub fn update(&self, note: Note) -> Pending<Change> {
        self.request(|reply| Request::Update(note, reply))
    }

    pub fn delete(&self, note: Note) -> Pending<Change> {
        self.request(|reply| Request::Delete(note, reply))
    }

    pub fn get(&self, id: i64) -> Pending<Option<Note>> {
        self.request(|reply| Request::Get(id, reply))
    }

    /// Subscribe to the live list. The current snapshot is delivered first.
    pub fn subscribe(&self) -> LiveNotes {
        let (tx, rx) = mpsc::channel();
        // A closed store leaves the receiver disconnected; recv reports it.
        let _ = self.tx.send(Request::Subscribe(tx));
        LiveNotes { rx }
    }
}

/// Owner of the storage worker thread. Construct once per process and pass
/// handles down.
pub struct NoteStore {
    handle: StoreHandle,
    worker: Option<JoinHandle<()>>,
}

impl NoteStore {
    /// Open the database file on the calling thread, then hand it to the worker.
    pub fn open(path: &Path) -> Result<Self> {
        let db = NoteDb::open(path)?;
        Ok(Self::spawn(db))
    }

    pub fn open_memory() -> Result<Self> {
        Ok(Self::spawn(NoteDb::open_memory()?))
    }

    pub fn spawn(db: NoteDb) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("jotter-store".into())
            .spawn(move || run_worker(db, rx));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                // Without a worker every request resolves to StoreClosed.
                error!("event=store_worker module=store status=error error={err}");
                None
            }
        };

        Self {
            handle: StoreHandle { tx },
            worker,
        }
    }

    pub fn handle(&self) -> StoreHandle {
        self.handle.clone()
    }

    /// Stop the worker and wait for it. Outstanding handles start failing
    /// with [`JotError::StoreClosed`].
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.handle.tx.send(Request::Shutdown);
            if worker.join().is_err() {
                warn!("event=store_worker module=store status=panicked");
            }
        }
    }
}

impl Drop for NoteStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(db: NoteDb, rx: Receiver<Request>) {
    info!("event=store_worker module=store status=start");
    let mut subscribers: Vec<Sender<Snapshot>> = Vec::new();

    while let Ok(request) = rx.recv() {
        match request {
            Request::Insert(draft, reply) => {
                let result = db.insert(&draft).map(Change::Inserted);
                finish_write(&db, &mut subscribers, result, reply);
            }
            Request::Update(note, reply) => {
                let result = db.update(&note).map(|rows| Change::Updated { id: note.id, rows });
                finish_write(&db, &mut subscribers, result, reply);
            }
            Request::Delete(note, reply) => {
                let result = db.delete(&note).map(|rows| Change::Deleted { id: note.id, rows });
                finish_write(&db, &mut subscribers, result, reply);
            }
            Request::Get(id, reply) => {
                let _ = reply.send(db.get(id));
            }
            Request::Subscribe(subscriber) => {
                let snapshot = db.list_all();
                if let Err(err) = &snapshot {
                    error!("event=snapshot module=store status=error error={err}");
                }
                if subscriber.send(snapshot).is_ok() {
                    subscribers.push(subscriber);
                }
            }
            Request::Shutdown => break,
        }
    }

    info!("event=store_worker module=store status=stop");
}

fn finish_write(
    db: &NoteDb,
    subscribers: &mut Vec<Sender<Snapshot>>,
    result: Result<Change>,
    reply: Reply<Change>,
) {
    match &result {
        Ok(_) => publish(db, subscribers),
        Err(err) => error!("event=note_write module=store status=error error={err}"),
    }
    let _ = reply.send(result);
}

fn publish(db: &NoteDb, subscribers: &mut Vec<Sender<Snapshot>>) {
    if subscribers.is_empty() {
        return;
    }
    match db.list_all() {
        Ok(snapshot) => subscribers.retain(|sub| sub.send(Ok(snapshot.clone())).is_ok()),
        Err(err) => {
            error!("event=snapshot module=store status=error error={err}");
            let message = err.to_string();
            subscribers.retain(|sub| sub.send(Err(JotError::Snapshot(message.clone()))).is_ok());
        }
    }
}
