#![allow(dead_code)]

use quotebook_core::{
    KeyValueStore, NetworkError, Quote, RemoteResponse, RemoteSource, RetryPolicy,
    SqliteKeyValueStore, StorageError, StorageResult, SyncConfig,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Remote source replaying scripted responses; repeats the last one.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<RemoteResponse, NetworkError>>>,
    last: Mutex<Option<Result<RemoteResponse, NetworkError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<RemoteResponse, NetworkError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn serving(body: &str) -> Arc<Self> {
        Self::new(vec![Ok(RemoteResponse::ok(body))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteSource for ScriptedSource {
    fn fetch_remote(&self, _url: &str) -> Result<RemoteResponse, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(response) => {
                *last = Some(response.clone());
                response
            }
            None => (*last)
                .clone()
                .unwrap_or_else(|| Err(NetworkError::transport("script exhausted"))),
        }
    }
}

/// Remote source that blocks inside `fetch_remote` until released.
pub struct BlockingSource {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
    pub calls: AtomicUsize,
    body: String,
}

impl BlockingSource {
    pub fn new(entered: Sender<()>, release: Receiver<()>, body: &str) -> Arc<Self> {
        Arc::new(Self {
            entered: Mutex::new(entered),
            release: Mutex::new(release),
            calls: AtomicUsize::new(0),
            body: body.to_string(),
        })
    }
}

impl RemoteSource for BlockingSource {
    fn fetch_remote(&self, _url: &str) -> Result<RemoteResponse, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(RemoteResponse::ok(self.body.clone()))
    }
}

/// Key-value store whose writes can be switched to fail.
pub struct FlakyStore {
    inner: SqliteKeyValueStore,
    pub fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        let store = Self {
            inner: SqliteKeyValueStore::in_memory().unwrap(),
            fail_writes: Arc::clone(&flag),
        };
        (store, flag)
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Encode {
                key: key.to_string(),
                message: "disk full".to_string(),
            });
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.inner.remove(key)
    }
}

/// Sync config with no retry delay for fast tests.
pub fn fast_config() -> SyncConfig {
    SyncConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            delay_ms: 0,
            ..RetryPolicy::default()
        },
        ..SyncConfig::default()
    }
}

pub fn quote(id: u64, text: &str, category: &str) -> Quote {
    Quote::new(id, text, category, 0)
}

pub fn texts(quotes: &[Quote]) -> Vec<&str> {
    quotes.iter().map(|quote| quote.text.as_str()).collect()
}
