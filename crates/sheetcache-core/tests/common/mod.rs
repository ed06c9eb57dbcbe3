#![allow(dead_code)]

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sheetcache_core::{
    CellRef, CellWrite, Credential, CredentialPool, RemoteError, RemoteSheets, RetryPolicy,
    SheetKey, WriteReceipt,
};
use std::collections::VecDeque;
use std::time::Duration;

/// What the fake remote answers to the next call.
#[derive(Clone, Debug)]
pub enum Reply {
    Ok,
    /// Confirm only these cells.
    Partial(Vec<CellRef>),
    Err(RemoteError),
}

/// A remote that replays a script and records every call.
/// Once the script runs out every call succeeds.
#[derive(Default)]
pub struct ScriptedRemote {
    script: Mutex<VecDeque<Reply>>,
    rows: Mutex<Vec<Vec<String>>>,
    calls: Mutex<Vec<Call>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub operation: &'static str,
    pub credential: String,
    pub cells: Vec<CellWrite>,
}

impl ScriptedRemote {
    pub fn new(script: Vec<Reply>) -> Self {
        ScriptedRemote {
            script: Mutex::new(script.into()),
            ..ScriptedRemote::default()
        }
    }

    pub fn with_rows(self, rows: Vec<Vec<String>>) -> Self {
        *self.rows.lock() = rows;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn credentials_used(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.credential.clone()).collect()
    }

    fn next_reply(&self) -> Reply {
        self.script.lock().pop_front().unwrap_or(Reply::Ok)
    }
}

impl RemoteSheets for ScriptedRemote {
    fn read_all(
        &self,
        _sheet: &SheetKey,
        credential: &Credential,
        _timeout: Duration,
    ) -> Result<Vec<Vec<String>>, RemoteError> {
        self.calls.lock().push(Call {
            operation: "read",
            credential: credential.id().to_string(),
            cells: Vec::new(),
        });
        match self.next_reply() {
            Reply::Err(err) => Err(err),
            _ => Ok(self.rows.lock().clone()),
        }
    }

    fn write_batch(
        &self,
        _sheet: &SheetKey,
        credential: &Credential,
        cells: &[CellWrite],
        _timeout: Duration,
    ) -> Result<WriteReceipt, RemoteError> {
        self.calls.lock().push(Call {
            operation: "write",
            credential: credential.id().to_string(),
            cells: cells.to_vec(),
        });
        match self.next_reply() {
            Reply::Ok => Ok(WriteReceipt::all(cells)),
            Reply::Partial(confirmed) => Ok(WriteReceipt { confirmed }),
            Reply::Err(err) => Err(err),
        }
    }
}

pub fn rate_limited() -> Reply {
    Reply::Err(RemoteError::http(429, "Quota exceeded for quota metric 'Write requests'"))
}

pub fn pool(size: usize) -> CredentialPool {
    let credentials = (0..size)
        .map(|i| Credential::new(format!("key{i}.json"), format!("{{\"n\":{i}}}")))
        .collect();
    CredentialPool::with_rng(credentials, StdRng::seed_from_u64(7)).unwrap()
}

pub fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff_base: Duration::from_millis(1),
        call_timeout: Duration::from_secs(5),
    }
}

pub fn cell(label: &str) -> CellRef {
    CellRef::parse(label).unwrap()
}

pub fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect()
}
