//! Scripted in-memory adapters for exercising the engine without a backend.

#![allow(dead_code)]

use std::collections::VecDeque;

use tidewire_engine::{Adapter, ConnectorError, PullAdapter, QueryAdapter, Record, SinkAdapter};
use tidewire_types::record::message_record;

/// What a scripted backend call should do.
#[derive(Debug, Clone)]
pub enum Step {
    Ok,
    Fail(ConnectorError),
}

pub fn lost() -> ConnectorError {
    ConnectorError::connection("CONNECTION_LOST", "server closed the connection unexpectedly")
}

pub fn bad_input() -> ConnectorError {
    ConnectorError::data("MISSING_FIELD", "request data missing required field")
}

/// Connection bookkeeping shared by the fakes. Handles are connection ids.
#[derive(Debug, Default)]
pub struct Connections {
    pub connect_script: VecDeque<Step>,
    pub connects: u64,
    pub closed: Vec<u64>,
}

impl Connections {
    fn connect(&mut self) -> Result<u64, ConnectorError> {
        if let Some(Step::Fail(err)) = self.connect_script.pop_front() {
            return Err(err);
        }
        self.connects += 1;
        Ok(self.connects)
    }
}

fn next_step(script: &mut VecDeque<Step>) -> Result<(), ConnectorError> {
    match script.pop_front() {
        Some(Step::Fail(err)) => Err(err),
        Some(Step::Ok) | None => Ok(()),
    }
}

/// Queue backend holding `messages`. Each `fetch_one`/`acknowledge` call
/// consumes one step of its script; an exhausted script means success.
#[derive(Debug, Default)]
pub struct FakeQueue {
    pub conn: Connections,
    pub messages: VecDeque<String>,
    pub fetch_script: VecDeque<Step>,
    pub ack_script: VecDeque<Step>,
    pub acknowledged: Vec<String>,
    /// Handle used by every fetch call, in order.
    pub fetch_handles: Vec<u64>,
}

impl FakeQueue {
    pub fn with_messages(count: usize) -> Self {
        Self {
            messages: (1..=count).map(|i| format!("message-{i}")).collect(),
            ..Self::default()
        }
    }
}

impl Adapter for FakeQueue {
    type Handle = u64;

    fn name(&self) -> &str {
        "fake-queue"
    }

    async fn connect(&mut self) -> Result<u64, ConnectorError> {
        self.conn.connect()
    }

    async fn disconnect(&mut self, handle: u64) {
        self.conn.closed.push(handle);
    }
}

impl PullAdapter for FakeQueue {
    type Message = String;

    async fn fetch_one(&mut self, handle: &mut u64) -> Result<Option<String>, ConnectorError> {
        self.fetch_handles.push(*handle);
        next_step(&mut self.fetch_script)?;
        Ok(self.messages.front().cloned())
    }

    async fn acknowledge(&mut self, _handle: &mut u64, message: &String) -> Result<(), ConnectorError> {
        next_step(&mut self.ack_script)?;
        self.messages.pop_front();
        self.acknowledged.push(message.clone());
        Ok(())
    }

    fn into_record(&self, message: String) -> Record {
        message_record(message)
    }
}

/// Query backend returning `rows` unless the script says otherwise.
#[derive(Debug, Default)]
pub struct FakeQuery {
    pub conn: Connections,
    pub rows: Vec<Record>,
    pub script: VecDeque<Step>,
    pub calls: u32,
}

impl Adapter for FakeQuery {
    type Handle = u64;

    fn name(&self) -> &str {
        "fake-query"
    }

    async fn connect(&mut self) -> Result<u64, ConnectorError> {
        self.conn.connect()
    }

    async fn disconnect(&mut self, handle: u64) {
        self.conn.closed.push(handle);
    }
}

impl QueryAdapter for FakeQuery {
    async fn query(&mut self, _handle: &mut u64) -> Result<Vec<Record>, ConnectorError> {
        self.calls += 1;
        next_step(&mut self.script)?;
        Ok(self.rows.clone())
    }
}

/// Sink backend that stores written records.
#[derive(Debug, Default)]
pub struct FakeSink {
    pub conn: Connections,
    pub script: VecDeque<Step>,
    pub attempts: u32,
    pub written: Vec<Record>,
    pub put_handles: Vec<u64>,
}

impl Adapter for FakeSink {
    type Handle = u64;

    fn name(&self) -> &str {
        "fake-sink"
    }

    async fn connect(&mut self) -> Result<u64, ConnectorError> {
        self.conn.connect()
    }

    async fn disconnect(&mut self, handle: u64) {
        self.conn.closed.push(handle);
    }
}

impl SinkAdapter for FakeSink {
    async fn put_one(&mut self, handle: &mut u64, record: &Record) -> Result<(), ConnectorError> {
        self.attempts += 1;
        self.put_handles.push(*handle);
        next_step(&mut self.script)?;
        self.written.push(record.clone());
        Ok(())
    }
}
