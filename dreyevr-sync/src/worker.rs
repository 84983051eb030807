// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Background status exchange

use crate::channel::StatusTransport;
use crate::codec::StatusCodec;
use crate::configuration::worker::{Builder, WorkerTiming};
use crate::error::{Error, Result};
use crate::status::{StatusStore, Transition, VehicleStatus};
use log::{debug, error, info, trace, warn};
use std::fmt::Display;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

/// Life cycle of a status worker
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Connecting,
    Running,
    StopRequested,
    Stopped,
}

impl TryFrom<u8> for WorkerState {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self> {
        let state = match v {
            v if v == WorkerState::Created as u8 => WorkerState::Created,
            v if v == WorkerState::Connecting as u8 => WorkerState::Connecting,
            v if v == WorkerState::Running as u8 => WorkerState::Running,
            v if v == WorkerState::StopRequested as u8 => WorkerState::StopRequested,
            v if v == WorkerState::Stopped as u8 => WorkerState::Stopped,
            _ => return Err(Error::Channel("invalid worker state")),
        };
        Ok(state)
    }
}

impl Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// State shared between the worker thread and its handles
struct Shared {
    store: StatusStore,
    state: AtomicU8,
    stop: AtomicUsize,
}

impl Shared {
    fn set_state(&self, state: WorkerState) {
        debug!("Status worker {state}");
        self.state.store(state as u8, Ordering::Release);
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire) != 0
    }
}

/// Frame-rate side access to the status maintained by a [`StatusWorker`]
#[derive(Clone)]
pub struct StatusHandle {
    shared: Arc<Shared>,
    requests: mpsc::Sender<VehicleStatus>,
}

impl StatusHandle {
    /// Current vehicle status
    pub fn current(&self) -> VehicleStatus {
        self.shared.store.current()
    }

    /// Vehicle status before the last transition
    pub fn previous(&self) -> VehicleStatus {
        self.shared.store.previous()
    }

    /// Current and previous status read together
    pub fn snapshot(&self) -> Transition {
        self.shared.store.snapshot()
    }

    /// Latest countdown timer received from the controller
    pub fn schedule_timer(&self) -> String {
        self.shared.store.schedule_timer()
    }

    pub fn state(&self) -> WorkerState {
        self.shared
            .state
            .load(Ordering::Acquire)
            .try_into()
            .unwrap_or(WorkerState::Stopped)
    }

    /// Request a local status change.
    ///
    /// The worker publishes `status` on its next iteration and applies it once the
    /// publish succeeded.
    pub fn update(&self, status: VehicleStatus) -> Result<()> {
        self.requests
            .send(status)
            .map_err(|_| Error::Channel("status worker is gone"))
    }
}

/// Background thread exchanging the vehicle status with the controller
pub struct StatusWorker {
    handle: StatusHandle,
    thread: Option<thread::JoinHandle<()>>,
}

impl StatusWorker {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Spawn the worker thread.
    ///
    /// The worker waits for the initial delay, connects `transport`, publishes
    /// `initial` and then exchanges statuses until it is stopped.
    pub fn spawn(
        transport: Box<dyn StatusTransport>,
        codec: StatusCodec,
        timing: WorkerTiming,
        initial: VehicleStatus,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            store: StatusStore::default(),
            state: AtomicU8::new(WorkerState::Created as u8),
            stop: AtomicUsize::new(0),
        });
        let (requests, request_receiver) = mpsc::channel();

        let context = Context {
            shared: shared.clone(),
            transport,
            codec,
            timing,
            requests: request_receiver,
            publish_failing: false,
        };
        let thread = thread::Builder::new()
            .name("status-worker".into())
            .spawn(move || context.run(initial))
            .map_err(Error::Spawn)?;

        Ok(StatusWorker {
            handle: StatusHandle { shared, requests },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> StatusHandle {
        self.handle.clone()
    }

    pub fn current(&self) -> VehicleStatus {
        self.handle.current()
    }

    pub fn previous(&self) -> VehicleStatus {
        self.handle.previous()
    }

    pub fn state(&self) -> WorkerState {
        self.handle.state()
    }

    pub fn update(&self, status: VehicleStatus) -> Result<()> {
        self.handle.update(status)
    }

    /// Ask the worker to stop after its current iteration
    pub fn stop(&self) {
        self.handle.shared.stop.fetch_add(1, Ordering::AcqRel);
    }

    /// Stop the worker and wait for its thread to end
    pub fn join(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Status worker thread panicked");
            }
        }
    }
}

impl Drop for StatusWorker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Everything owned by the worker thread
struct Context {
    shared: Arc<Shared>,
    transport: Box<dyn StatusTransport>,
    codec: StatusCodec,
    timing: WorkerTiming,
    requests: mpsc::Receiver<VehicleStatus>,
    publish_failing: bool,
}

impl Context {
    fn run(mut self, initial: VehicleStatus) {
        thread::sleep(self.timing.initial_delay);

        self.shared.set_state(WorkerState::Connecting);
        if self.connect() {
            thread::sleep(self.timing.settle_delay);
            self.publish_and_apply(initial);
            self.shared.set_state(WorkerState::Running);
            while !self.shared.stop_requested() {
                self.step();
            }
        }

        self.shared.set_state(WorkerState::StopRequested);
        self.transport.disconnect();
        thread::sleep(self.timing.grace_delay);
        self.shared.set_state(WorkerState::Stopped);
    }

    /// Connect, retrying until success. Returns false if stopped first.
    fn connect(&mut self) -> bool {
        while !self.shared.stop_requested() {
            match self.transport.connect() {
                Ok(()) => return true,
                Err(e) => {
                    warn!("Status worker failed to connect, retrying: {e}");
                    thread::sleep(self.timing.backoff);
                }
            }
        }
        false
    }

    /// One iteration of the exchange loop
    fn step(&mut self) {
        while let Ok(status) = self.requests.try_recv() {
            self.publish_and_apply(status);
        }

        let current = self.shared.store.current();
        match self.publish(current) {
            Ok(()) => self.publish_failing = false,
            Err(e @ Error::Connection(_)) => {
                self.back_off(e);
                return;
            }
            Err(e) if self.publish_failing => trace!("Publishing status failed again: {e}"),
            Err(e) => {
                warn!("Publishing status failed, dropping it: {e}");
                self.publish_failing = true;
            }
        }

        match self.transport.try_receive() {
            Ok(Some(payload)) => self.apply_inbound(&payload),
            Ok(None) => {}
            Err(e) => self.back_off(e),
        }
    }

    fn publish(&mut self, status: VehicleStatus) -> Result<()> {
        let payload = self.codec.encode(status)?;
        self.transport.try_send(&payload)
    }

    fn publish_and_apply(&mut self, status: VehicleStatus) {
        match self.publish(status) {
            Ok(()) => {
                let transition = self.shared.store.transition(status);
                if transition.is_change() {
                    info!(
                        "Vehicle status {} -> {} (local)",
                        transition.previous, transition.current
                    );
                }
            }
            Err(e) => error!("Failed to publish status {status}, not applied: {e}"),
        }
    }

    fn apply_inbound(&mut self, payload: &[u8]) {
        let record = match self.codec.decode(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!("Discarding malformed status message: {e}");
                return;
            }
        };
        trace!("Received {record:?}");

        self.shared.store.set_schedule_timer(record.time_data.clone());
        let transition = self.shared.store.transition(record.status());
        if transition.is_change() {
            info!(
                "Vehicle status {} -> {} (from {})",
                transition.previous, transition.current, record.from
            );
        }
    }

    fn back_off(&self, e: Error) {
        match e {
            Error::Connection(_) => {
                warn!("Status channel unavailable: {e}");
                thread::sleep(self.timing.backoff);
            }
            e => debug!("Status exchange failed: {e}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::StatusChannel;
    use crate::codec::StatusRecord;
    use crate::configuration::channel::Builder as ChannelBuilder;
    use std::collections::VecDeque;
    use std::io::ErrorKind;
    use std::net::TcpListener;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    const FAST: WorkerTiming = WorkerTiming {
        initial_delay: Duration::ZERO,
        settle_delay: Duration::ZERO,
        grace_delay: Duration::ZERO,
        backoff: Duration::from_millis(5),
    };

    #[derive(Default)]
    struct MockState {
        connected: bool,
        connect_failures: usize,
        failing_sends: bool,
        inbound: VecDeque<Vec<u8>>,
        sent: Vec<Vec<u8>>,
    }

    #[derive(Clone, Default)]
    struct MockTransport(Arc<Mutex<MockState>>);

    impl MockTransport {
        fn push(&self, payload: Vec<u8>) {
            self.0.lock().unwrap().inbound.push_back(payload);
        }

        fn sent_statuses(&self) -> Vec<VehicleStatus> {
            let controller = StatusCodec::builder().mirrored().build();
            self.0
                .lock()
                .unwrap()
                .sent
                .iter()
                .map(|payload| controller.decode(payload).unwrap().status())
                .collect()
        }
    }

    impl StatusTransport for MockTransport {
        fn connect(&mut self) -> Result<()> {
            let mut state = self.0.lock().unwrap();
            if state.connect_failures > 0 {
                state.connect_failures -= 1;
                return Err(Error::Connection((
                    ErrorKind::ConnectionRefused.into(),
                    "mock refused",
                )));
            }
            state.connected = true;
            Ok(())
        }

        fn disconnect(&mut self) -> bool {
            std::mem::replace(&mut self.0.lock().unwrap().connected, false)
        }

        fn is_connected(&self) -> bool {
            self.0.lock().unwrap().connected
        }

        fn try_send(&mut self, payload: &[u8]) -> Result<()> {
            let mut state = self.0.lock().unwrap();
            if state.failing_sends {
                return Err(Error::Send((ErrorKind::BrokenPipe.into(), "mock send")));
            }
            state.sent.push(payload.to_vec());
            Ok(())
        }

        fn try_receive(&mut self) -> Result<Option<Vec<u8>>> {
            let message = self.0.lock().unwrap().inbound.pop_front();
            if message.is_none() {
                thread::sleep(Duration::from_millis(1));
            }
            Ok(message)
        }
    }

    fn controller_message(status: &str, time_data: &str) -> Vec<u8> {
        StatusCodec::builder()
            .sender("client")
            .mirrored()
            .build()
            .encode_record(&StatusRecord {
                from: "client".into(),
                timestamp: "01/01/2025 00:00:00.000".into(),
                vehicle_status: status.into(),
                time_data: time_data.into(),
            })
            .unwrap()
    }

    fn spawn(transport: &MockTransport) -> StatusWorker {
        StatusWorker::builder()
            .transport(Box::new(transport.clone()))
            .timing(FAST)
            .build()
            .unwrap()
    }

    fn wait_until(what: &str, condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn starts_in_manual_drive() {
        let transport = MockTransport::default();
        let worker = spawn(&transport);
        wait_until("running", || worker.state() == WorkerState::Running);

        assert_eq!(worker.current(), VehicleStatus::ManualDrive);
        assert_eq!(worker.previous(), VehicleStatus::Unknown);
        assert_eq!(
            transport.sent_statuses().first(),
            Some(&VehicleStatus::ManualDrive)
        );
    }

    #[test]
    fn inbound_status_is_applied() {
        let transport = MockTransport::default();
        let worker = spawn(&transport);
        wait_until("running", || worker.state() == WorkerState::Running);

        transport.push(controller_message("TakeOver", "42"));
        wait_until("take over", || worker.current() == VehicleStatus::TakeOver);
        assert_eq!(worker.previous(), VehicleStatus::ManualDrive);
        assert_eq!(worker.handle().schedule_timer(), "42");
    }

    #[test]
    fn repeated_inbound_status_becomes_previous() {
        let transport = MockTransport::default();
        let worker = spawn(&transport);
        wait_until("running", || worker.state() == WorkerState::Running);

        transport.push(controller_message("TakeOver", "2"));
        transport.push(controller_message("TakeOver", "1"));
        wait_until("repeated take over", || {
            worker.previous() == VehicleStatus::TakeOver
        });
        assert_eq!(
            worker.handle().snapshot(),
            Transition {
                previous: VehicleStatus::TakeOver,
                current: VehicleStatus::TakeOver,
            }
        );
        assert_eq!(worker.handle().schedule_timer(), "1");
    }

    #[test]
    fn receives_while_publishing_fails() {
        let transport = MockTransport::default();
        let worker = spawn(&transport);
        wait_until("running", || worker.state() == WorkerState::Running);

        transport.0.lock().unwrap().failing_sends = true;
        transport.push(controller_message("TakeOver", "7"));
        wait_until("take over", || worker.current() == VehicleStatus::TakeOver);
        assert_eq!(worker.handle().schedule_timer(), "7");
        assert!(transport.0.lock().unwrap().inbound.is_empty());
    }

    #[test]
    fn initial_status_is_configurable() {
        let transport = MockTransport::default();
        let worker = StatusWorker::builder()
            .transport(Box::new(transport.clone()))
            .timing(FAST)
            .initial_status(VehicleStatus::Autopilot)
            .build()
            .unwrap();
        wait_until("running", || worker.state() == WorkerState::Running);

        assert_eq!(worker.current(), VehicleStatus::Autopilot);
        assert_eq!(
            transport.sent_statuses().first(),
            Some(&VehicleStatus::Autopilot)
        );
    }

    #[test]
    fn malformed_message_is_discarded() {
        let transport = MockTransport::default();
        let worker = spawn(&transport);
        wait_until("running", || worker.state() == WorkerState::Running);

        let truncated = controller_message("TakeOver", "1");
        transport.push(truncated[..truncated.len() - 2].to_vec());
        transport.push(controller_message("Autopilot", ""));
        wait_until("autopilot", || worker.current() == VehicleStatus::Autopilot);
        assert_eq!(worker.previous(), VehicleStatus::ManualDrive);
        assert_eq!(worker.handle().schedule_timer(), "");
    }

    #[test]
    fn local_update_is_published_then_applied() {
        let transport = MockTransport::default();
        let worker = spawn(&transport);
        wait_until("running", || worker.state() == WorkerState::Running);

        worker.update(VehicleStatus::TakeOverManual).unwrap();
        wait_until("take over manual", || {
            worker.current() == VehicleStatus::TakeOverManual
        });
        assert_eq!(worker.previous(), VehicleStatus::ManualDrive);
        assert!(transport
            .sent_statuses()
            .contains(&VehicleStatus::TakeOverManual));
    }

    #[test]
    fn connect_is_retried() {
        let transport = MockTransport::default();
        transport.0.lock().unwrap().connect_failures = 3;
        let worker = spawn(&transport);
        wait_until("running", || worker.state() == WorkerState::Running);
        assert!(transport.is_connected());
    }

    #[test]
    fn drop_stops_and_disconnects() {
        let transport = MockTransport::default();
        let worker = spawn(&transport);
        let handle = worker.handle();
        wait_until("running", || handle.state() == WorkerState::Running);

        drop(worker);
        assert_eq!(handle.state(), WorkerState::Stopped);
        assert!(!transport.is_connected());
        assert!(handle.update(VehicleStatus::Autopilot).is_err());
    }

    #[test]
    fn exchanges_status_with_a_controller() {
        let unused = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut peer = ChannelBuilder::default()
            .subscribe(format!("tcp://{}", unused.local_addr().unwrap()))
            .publish("tcp://127.0.0.1:0")
            .build();
        drop(unused);
        peer.connect().unwrap();
        let peer_addr = peer.local_addr().unwrap();

        let worker = StatusWorker::builder()
            .channel(
                ChannelBuilder::default()
                    .subscribe(format!("tcp://{peer_addr}"))
                    .publish("tcp://127.0.0.1:0")
                    .reconnect_interval(Duration::from_millis(10))
                    .config(),
            )
            .timing(FAST)
            .build()
            .unwrap();

        // Wait until the worker's subscriber is attached, then send a single update
        let manual = controller_message("ManualDrive", "");
        let deadline = Instant::now() + Duration::from_secs(5);
        while peer.subscribers() == 0 {
            assert!(Instant::now() < deadline, "worker never subscribed");
            peer.try_send(&manual).unwrap();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(peer.subscribers(), 1);

        peer.try_send(&controller_message("TakeOver", "")).unwrap();
        wait_until("take over", || worker.current() == VehicleStatus::TakeOver);
        assert_eq!(worker.previous(), VehicleStatus::ManualDrive);
    }

    #[test]
    fn status_channel_is_a_transport() {
        fn assert_transport<T: StatusTransport>() {}
        assert_transport::<StatusChannel>();
    }
}
