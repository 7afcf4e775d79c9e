use std::sync::Arc;

use log::debug;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Shared receiving end of the record index queue.
///
/// Every worker holds a clone; whichever one asks first gets the next index.
#[derive(Clone)]
pub struct IndexStream {
    receiver: Arc<Mutex<mpsc::Receiver<u64>>>,
}

impl IndexStream {
    /// Next record index, or `None` once all indices were handed out.
    pub async fn next(&self) -> Option<u64> {
        self.receiver.lock().await.recv().await
    }
}

/// Start feeding indices `1..=count` into a queue holding at most `depth` entries.
///
/// The returned handle resolves to the number of indices actually delivered,
/// which is less than `count` only if every worker went away early.
pub fn spawn_dispatcher(count: u64, depth: usize) -> (IndexStream, JoinHandle<u64>) {
    let (sender, receiver) = mpsc::channel(depth.max(1));
    let handle = tokio::spawn(async move {
        let mut dispatched = 0;
        for record_id in 1..=count {
            if sender.send(record_id).await.is_err() {
                debug!("No worker left to receive record {}, stopping dispatch", record_id);
                break;
            }
            dispatched += 1;
        }
        dispatched
    });
    let stream = IndexStream {
        receiver: Arc::new(Mutex::new(receiver)),
    };
    (stream, handle)
}
