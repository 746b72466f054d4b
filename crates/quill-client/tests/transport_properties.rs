//! Model-based property tests for the transport client.
//!
//! Random sequences of lifecycle operations and hub signals are applied to
//! the real client and to a reference model of the four-state machine. After
//! every step the states must agree, and a send must succeed exactly when the
//! model is connected.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "Test helpers")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use proptest::prelude::*;
use quill_client::{
    ConnectionState, Hub, HubFrame, TransportClient, TransportError, TransportEvent,
};
use quill_proto::{HubEvent, HubInvocation, Identity};

/// Hub whose frame queue is fed by the test.
#[derive(Clone, Default)]
struct QueueHub {
    frames: Arc<Mutex<VecDeque<HubFrame>>>,
    refuse_connect: Arc<Mutex<bool>>,
    sent: Arc<Mutex<usize>>,
}

impl Hub for QueueHub {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.frames.lock().unwrap().clear();
        if *self.refuse_connect.lock().unwrap() {
            return Err(TransportError::Connection("refused".into()));
        }
        Ok(())
    }

    async fn invoke(&mut self, invocation: HubInvocation) -> Result<(), TransportError> {
        if matches!(invocation, HubInvocation::SendMessage(..)) {
            *self.sent.lock().unwrap() += 1;
        }
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<HubFrame> {
        self.frames.lock().unwrap().pop_front()
    }

    async fn close(&mut self) {}
}

#[derive(Debug, Clone)]
enum Op {
    Start { refuse: bool },
    Stop,
    Send,
    Signal(HubFrame),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(|refuse| Op::Start { refuse }),
        Just(Op::Stop),
        Just(Op::Send),
        Just(Op::Signal(HubFrame::Reconnecting)),
        Just(Op::Signal(HubFrame::Reconnected)),
        Just(Op::Signal(HubFrame::Closed)),
    ]
}

/// Reference model: next state after a hub signal.
fn model_signal(state: ConnectionState, frame: &HubFrame) -> ConnectionState {
    match (state, frame) {
        (ConnectionState::Connected, HubFrame::Reconnecting) => ConnectionState::Reconnecting,
        (ConnectionState::Reconnecting, HubFrame::Reconnected) => ConnectionState::Connected,
        (_, HubFrame::Closed) => ConnectionState::Disconnected,
        (state, _) => state,
    }
}

fn sentinel() -> HubFrame {
    HubFrame::Event(HubEvent::MessagesRead("sentinel".into(), "sentinel".into()))
}

fn run(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))?;

    runtime.block_on(async {
        let hub = QueueHub::default();
        let mut client = TransportClient::new(hub.clone());
        let mut model = ConnectionState::Disconnected;
        let mut expected_sends = 0usize;
        let (a, b) = (Identity::new("a"), Identity::new("b"));

        for op in ops {
            match op {
                Op::Start { refuse } => {
                    *hub.refuse_connect.lock().unwrap() = refuse;
                    let result = client.start().await;
                    if model == ConnectionState::Disconnected {
                        prop_assert_eq!(result.is_err(), refuse);
                        model = if refuse {
                            ConnectionState::Disconnected
                        } else {
                            ConnectionState::Connected
                        };
                    } else {
                        prop_assert!(result.is_ok());
                    }
                },
                Op::Stop => {
                    client.stop().await;
                    model = ConnectionState::Disconnected;
                },
                Op::Send => {
                    let result = client.send(&a, &b, "x".into()).await;
                    if model == ConnectionState::Connected {
                        prop_assert!(result.is_ok());
                        expected_sends += 1;
                    } else {
                        prop_assert_eq!(result, Err(TransportError::SendFailed { state: model }));
                    }
                },
                Op::Signal(frame) => {
                    if model == ConnectionState::Disconnected {
                        // Nothing is read from a closed hub.
                        continue;
                    }
                    model = model_signal(model, &frame);
                    {
                        let mut frames = hub.frames.lock().unwrap();
                        frames.push_back(frame);
                        frames.push_back(sentinel());
                    }
                    while let Some(event) = client.next_event().await {
                        if matches!(event, TransportEvent::ReadReceiptUpdated { .. }) {
                            break;
                        }
                    }
                },
            }

            prop_assert_eq!(client.state(), model);
        }

        prop_assert_eq!(*hub.sent.lock().unwrap(), expected_sends);
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_client_matches_model(ops in prop::collection::vec(op_strategy(), 1..40)) {
        run(ops)?;
    }
}
