// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use more_asserts::assert_gt;
use serde_json::{json, Value};

use pushtx_provider::message::Endpoint;
use pushtx_provider::packed::CompressionMode;
use pushtx_provider::types::ChainId;
use pushtx_provider::RpcError;
use pushtx_sdk::observer::{PipelineEvent, RecordingObserver, RunId};
use pushtx_sdk::state::{PipelineState, Stage};
use pushtx_sdk::{ActionArgs, ErrorKind, Pipeline, PipelineError, PushOptions};
use pushtx_signer::key::{random_private_key, PrivateKey};
use pushtx_signer::{recover_signers, Void, Wallet, WalletManager};

mod common;

use common::{alice_key, bob_key, chain_id, transfer_args, CountingKeyStore, MockNode};

async fn wallets(keys: impl IntoIterator<Item = PrivateKey>) -> WalletManager {
    let manager = WalletManager::new();
    manager
        .insert(Wallet::with_keys("default", "password", keys))
        .await
        .unwrap();
    manager
}

fn options() -> PushOptions {
    PushOptions {
        authorization: "alice@active".parse().unwrap(),
        ..Default::default()
    }
}

fn transfer(memo: &str) -> ActionArgs {
    ActionArgs::new("token", "transfer", transfer_args(memo))
}

fn only_run(recorder: &RecordingObserver) -> RunId {
    let events = recorder.events();
    let run = events.first().expect("no events recorded").run();
    assert!(events.iter().all(|e| e.run() == run));
    run
}

#[tokio::test]
async fn pushes_token_transfer() {
    let node = Arc::new(MockNode {
        required_keys: Some(vec![alice_key().public_key()]),
        ..Default::default()
    });
    let keys = Arc::new(wallets([alice_key(), bob_key()]).await);
    let recorder = RecordingObserver::new();
    let pipeline =
        Pipeline::with_observer(node.clone(), keys, recorder.clone()).with_options(options());

    let receipt = pipeline.run(transfer("")).await.unwrap();

    // One signature, for the one key the node asked for, bound to this chain.
    let trx = receipt.packed.transaction().unwrap();
    assert_eq!(trx.ref_block_num, 100);
    assert_eq!(trx.actions[0].data.0, vec![0xaa, 0xbb, 0xcc]);
    assert_eq!(trx.actions[0].authorization[0].to_string(), "alice@active");
    assert_eq!(receipt.packed.signatures.len(), 1);
    let digest = trx.signing_digest(&chain_id());
    assert!(receipt.packed.signatures[0].verify(&alice_key().public_key(), &digest));
    let other = ChainId::from_str(common::OTHER_CHAIN_ID).unwrap();
    assert!(!receipt.packed.signatures[0].verify(&alice_key().public_key(), &trx.signing_digest(&other)));
    assert_eq!(
        recover_signers(&receipt.packed.unpack().unwrap(), &chain_id()).unwrap(),
        vec![alice_key().public_key()]
    );

    let payload = serde_json::to_value(&receipt.packed).unwrap();
    assert_eq!(payload["compression"], "none");
    assert!(payload["packed_trx"].is_string());
    assert_eq!(payload["signatures"].as_array().unwrap().len(), 1);
    assert_eq!(receipt.transaction_id, receipt.packed.id().unwrap());
    assert_eq!(receipt.processed["receipt"]["status"], "executed");

    assert_eq!(
        node.calls(),
        vec![
            Endpoint::AbiJsonToBin,
            Endpoint::GetInfo,
            Endpoint::GetRequiredKeys,
            Endpoint::PushTransaction
        ]
    );

    let run = receipt.run;
    assert_eq!(only_run(&recorder), run);
    assert_eq!(
        recorder.states_for(run),
        vec![
            PipelineState::Idle,
            PipelineState::Encoding,
            PipelineState::AwaitingChainInfo,
            PipelineState::Building,
            PipelineState::ResolvingKeys,
            PipelineState::Signing,
            PipelineState::Packing,
            PipelineState::Broadcasting,
            PipelineState::Succeeded,
        ]
    );
    assert_eq!(recorder.requested_stages(run), Stage::ALL.to_vec());

    let events = recorder.events_for(run);
    let first_request = events
        .iter()
        .find_map(|e| match e {
            PipelineEvent::Request { stage, payload, .. } if *stage == Stage::AbiJsonToBin => {
                Some(payload.clone())
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(first_request["code"], "token");
    assert_eq!(first_request["action"], "transfer");
    assert_eq!(first_request["args"]["quantity"], "1.0000 TOK");

    // The resolver saw every unlocked key.
    let resolver_request = events
        .iter()
        .find_map(|e| match e {
            PipelineEvent::Request { stage, payload, .. } if *stage == Stage::GetRequiredKeys => {
                Some(payload.clone())
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(resolver_request["available_keys"].as_array().unwrap().len(), 2);
    assert_eq!(resolver_request["transaction"]["ref_block_num"], 100);

    // Every request is paired with its response.
    let responses = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::Response { .. }))
        .count();
    assert_eq!(responses, 4);
    assert!(matches!(events.last(), Some(PipelineEvent::Success { .. })));
}

#[tokio::test]
async fn rejects_bad_args_before_any_call() {
    let node = Arc::new(MockNode::default());
    let keys = Arc::new(wallets([alice_key()]).await);
    let recorder = RecordingObserver::new();
    let pipeline = Pipeline::with_observer(node.clone(), keys, recorder.clone());

    for (contract, args) in [
        ("token", ""),
        ("token", "   "),
        ("token", "{\"from\": "),
        ("token", "[1, 2, 3]"),
        ("Not A Name", "{}"),
    ] {
        let err = pipeline
            .run(ActionArgs::new(contract, "transfer", args))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "args {args:?}");
    }
    assert!(node.calls().is_empty());

    // Failures are reported without leaving Idle.
    assert!(recorder
        .events()
        .iter()
        .all(|e| matches!(e, PipelineEvent::Failure { kind: ErrorKind::InvalidArgument, .. })));
}

#[tokio::test]
async fn encoding_rejection_keeps_raw_response() {
    let raw = json!({
        "code": 500,
        "message": "Internal Service Error",
        "error": {"code": 3015014, "name": "pack_exception", "what": "Pack data exception", "details": []}
    });
    let node = Arc::new(MockNode {
        reject: Some((Endpoint::AbiJsonToBin, raw.clone())),
        ..Default::default()
    });
    let keys = Arc::new(wallets([alice_key()]).await);
    let recorder = RecordingObserver::new();
    let pipeline = Pipeline::with_observer(node.clone(), keys, recorder.clone());

    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EncodingFailed);
    assert_eq!(err.stage(), Stage::AbiJsonToBin);
    assert_eq!(err.raw_response(), Some(&raw));
    assert!(err.to_string().contains("pack_exception"));
    assert_eq!(node.calls(), vec![Endpoint::AbiJsonToBin]);

    let run = only_run(&recorder);
    assert_eq!(
        recorder.states_for(run),
        vec![
            PipelineState::Idle,
            PipelineState::Encoding,
            PipelineState::Failed
        ]
    );
    assert!(recorder.events_for(run).iter().any(|e| matches!(
        e,
        PipelineEvent::Response { stage: Stage::AbiJsonToBin, payload, .. } if *payload == raw
    )));
}

#[tokio::test]
async fn empty_binargs_is_malformed_input() {
    let node = Arc::new(MockNode {
        binargs: String::new(),
        ..Default::default()
    });
    let keys = Arc::new(wallets([alice_key()]).await);
    let pipeline = Pipeline::new(node.clone(), keys);

    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert_eq!(node.calls(), vec![Endpoint::AbiJsonToBin, Endpoint::GetInfo]);
}

#[tokio::test]
async fn chain_info_transport_failure() {
    let node = Arc::new(MockNode {
        transport_failure: Some(Endpoint::GetInfo),
        ..Default::default()
    });
    let keys = Arc::new(wallets([alice_key()]).await);
    let pipeline = Pipeline::new(node.clone(), keys);

    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.stage(), Stage::GetInfo);
    assert_eq!(err.raw_response(), None);
    assert_eq!(node.calls(), vec![Endpoint::AbiJsonToBin, Endpoint::GetInfo]);
}

#[tokio::test]
async fn chain_info_rejection_keeps_raw_response() {
    let raw = json!({"code": 503, "message": "Service Unavailable"});
    let node = Arc::new(MockNode {
        reject: Some((Endpoint::GetInfo, raw.clone())),
        ..Default::default()
    });
    let keys = Arc::new(wallets([alice_key()]).await);
    let recorder = RecordingObserver::new();
    let pipeline = Pipeline::with_observer(node.clone(), keys, recorder.clone());

    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainInfoUnavailable);
    assert_eq!(err.stage(), Stage::GetInfo);
    assert_eq!(err.raw_response(), Some(&raw));
    assert_eq!(node.calls(), vec![Endpoint::AbiJsonToBin, Endpoint::GetInfo]);

    let run = only_run(&recorder);
    assert_eq!(
        recorder.states_for(run),
        vec![
            PipelineState::Idle,
            PipelineState::Encoding,
            PipelineState::AwaitingChainInfo,
            PipelineState::Failed
        ]
    );
    assert!(recorder.events_for(run).iter().any(|e| matches!(
        e,
        PipelineEvent::Response { stage: Stage::GetInfo, payload, .. } if *payload == raw
    )));
}

#[tokio::test]
async fn key_resolution_rejection_never_signs() {
    let raw = json!({
        "code": 500,
        "message": "Internal Service Error",
        "error": {"code": 3010010, "name": "packed_transaction_type_exception", "what": "Invalid packed transaction", "details": []}
    });
    let node = Arc::new(MockNode {
        reject: Some((Endpoint::GetRequiredKeys, raw.clone())),
        ..Default::default()
    });
    let keys = Arc::new(CountingKeyStore::new(wallets([alice_key()]).await));
    let recorder = RecordingObserver::new();
    let pipeline = Pipeline::with_observer(node.clone(), keys.clone(), recorder.clone());

    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyResolutionFailed);
    assert_eq!(err.stage(), Stage::GetRequiredKeys);
    assert_eq!(err.raw_response(), Some(&raw));
    assert!(err.to_string().contains("packed_transaction_type_exception"));
    assert_eq!(keys.signed(), 0);
    assert!(!node.calls().contains(&Endpoint::PushTransaction));

    let run = only_run(&recorder);
    let states = recorder.states_for(run);
    assert_eq!(states[states.len() - 2], PipelineState::ResolvingKeys);
    assert_eq!(states.last(), Some(&PipelineState::Failed));
    assert!(recorder.events_for(run).iter().any(|e| matches!(
        e,
        PipelineEvent::Response { stage: Stage::GetRequiredKeys, payload, .. } if *payload == raw
    )));
}

#[tokio::test]
async fn undecodable_response_fails_its_stage() {
    let expected = [
        (Endpoint::AbiJsonToBin, ErrorKind::EncodingFailed),
        (Endpoint::GetInfo, ErrorKind::ChainInfoUnavailable),
        (Endpoint::GetRequiredKeys, ErrorKind::KeyResolutionFailed),
        (Endpoint::PushTransaction, ErrorKind::BroadcastRejected),
    ];
    for (endpoint, kind) in expected {
        let node = Arc::new(MockNode {
            malformed: Some(endpoint),
            ..Default::default()
        });
        let keys = Arc::new(wallets([alice_key()]).await);
        let recorder = RecordingObserver::new();
        let pipeline =
            Pipeline::with_observer(node.clone(), keys, recorder.clone()).with_options(options());

        let err = pipeline.run(transfer("")).await.unwrap_err();
        assert_eq!(err.kind(), kind, "{endpoint}");
        assert_eq!(err.stage(), Stage::from(endpoint));
        let source = match &err {
            PipelineError::EncodingFailed(e)
            | PipelineError::ChainInfoUnavailable(e)
            | PipelineError::KeyResolutionFailed(e)
            | PipelineError::BroadcastRejected(e) => e,
            other => panic!("unexpected error {other:?}"),
        };
        assert!(matches!(source, RpcError::Decode { .. }), "{endpoint}");
        assert_eq!(err.raw_response(), Some(&json!({"unexpected": true})));
        assert_eq!(node.calls().last(), Some(&endpoint));

        let run = only_run(&recorder);
        assert_eq!(recorder.states_for(run).last(), Some(&PipelineState::Failed));
        // The undecodable body still reaches the observer, once.
        let responses = recorder
            .events_for(run)
            .into_iter()
            .filter(|e| matches!(e, PipelineEvent::Response { stage, .. } if *stage == Stage::from(endpoint)))
            .count();
        assert_eq!(responses, 1, "{endpoint}");
    }
}

#[tokio::test]
async fn wrong_chain_stops_before_signing() {
    let node = Arc::new(MockNode::default());
    let keys = Arc::new(CountingKeyStore::new(wallets([alice_key()]).await));
    let other = ChainId::from_str(common::OTHER_CHAIN_ID).unwrap();
    let pipeline = Pipeline::new(node.clone(), keys.clone()).with_options(PushOptions {
        chain_id: Some(other),
        ..options()
    });

    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainMismatch);
    assert_eq!(err.stage(), Stage::GetInfo);
    assert_eq!(
        err.raw_response().map(|raw| raw["chain_id"].clone()),
        Some(json!(common::CHAIN_ID))
    );
    assert_eq!(node.calls(), vec![Endpoint::AbiJsonToBin, Endpoint::GetInfo]);
    assert_eq!(keys.signed(), 0);

    // The configured chain matches.
    let pipeline = Pipeline::new(node, keys).with_options(PushOptions {
        chain_id: Some(chain_id()),
        ..options()
    });
    pipeline.run(transfer("")).await.unwrap();
}

#[tokio::test]
async fn empty_key_set_stops_before_resolver() {
    let node = Arc::new(MockNode::default());
    let pipeline = Pipeline::new(node.clone(), Arc::new(Void));

    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert!(matches!(err, PipelineError::EmptyKeySet));
    assert_eq!(node.calls(), vec![Endpoint::AbiJsonToBin, Endpoint::GetInfo]);
}

#[tokio::test]
async fn wallets_are_snapshotted_per_run() {
    let node = Arc::new(MockNode::default());
    let keys = Arc::new(wallets([alice_key()]).await);
    let pipeline = Pipeline::new(node.clone(), keys.clone()).with_options(options());

    pipeline.run(transfer("")).await.unwrap();

    keys.lock_all().await;
    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyKeySet);

    keys.unlock("default", "password").await.unwrap();
    pipeline.run(transfer("")).await.unwrap();
}

#[tokio::test]
async fn no_required_keys_never_signs() {
    let node = Arc::new(MockNode {
        required_keys: Some(vec![]),
        ..Default::default()
    });
    let keys = Arc::new(CountingKeyStore::new(wallets([alice_key()]).await));
    let pipeline = Pipeline::new(node.clone(), keys.clone());

    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoKeysRequired);
    assert_eq!(err.raw_response(), Some(&json!({"required_keys": []})));
    assert_eq!(keys.signed(), 0);
    assert!(!node.calls().contains(&Endpoint::PushTransaction));
}

#[tokio::test]
async fn missing_private_key_produces_nothing() {
    let stranger = random_private_key().public_key();
    let node = Arc::new(MockNode {
        required_keys: Some(vec![alice_key().public_key(), stranger]),
        ..Default::default()
    });
    let keys = Arc::new(wallets([alice_key()]).await);
    let recorder = RecordingObserver::new();
    let pipeline = Pipeline::with_observer(node.clone(), keys, recorder.clone());

    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert!(matches!(err, PipelineError::KeyNotFound(k) if k == stranger));
    assert!(!node.calls().contains(&Endpoint::PushTransaction));

    let run = only_run(&recorder);
    let states = recorder.states_for(run);
    assert_eq!(states[states.len() - 2], PipelineState::Signing);
    assert_eq!(states.last(), Some(&PipelineState::Failed));
}

#[tokio::test]
async fn broadcast_rejection_carries_payload() {
    let raw = json!({
        "code": 500,
        "message": "Internal Service Error",
        "error": {
            "code": 3090003,
            "name": "unsatisfied_authorization",
            "what": "Provided keys, permissions, and delays do not satisfy declared authorizations",
            "details": [{"message": "transaction declares authority '{\"actor\":\"alice\",\"permission\":\"active\"}'", "file": "authorization_manager.cpp", "line_number": 524, "method": "check_authorization"}]
        }
    });
    let node = Arc::new(MockNode {
        reject: Some((Endpoint::PushTransaction, raw.clone())),
        ..Default::default()
    });
    let keys = Arc::new(wallets([alice_key()]).await);
    let pipeline = Pipeline::new(node.clone(), keys).with_options(options());

    let err = pipeline.run(transfer("")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BroadcastRejected);
    assert_eq!(err.stage(), Stage::PushTransaction);
    assert_eq!(err.raw_response(), Some(&raw));
    assert!(err.to_string().contains("unsatisfied_authorization"));
}

#[tokio::test]
async fn packing_is_deterministic() {
    let node = Arc::new(MockNode::default());
    let keys = Arc::new(wallets([alice_key(), bob_key()]).await);
    let pipeline = Pipeline::new(node.clone(), keys.clone()).with_options(options());

    let first = pipeline.run(transfer("")).await.unwrap();
    let second = pipeline.run(transfer("")).await.unwrap();
    assert_ne!(first.run, second.run);
    assert_eq!(first.packed, second.packed);
    assert_eq!(first.transaction_id, second.transaction_id);
    // Both keys were required, in the order the node listed them.
    assert_eq!(first.packed.signatures.len(), 2);

    let zlib = Pipeline::new(node, keys)
        .with_options(PushOptions {
            compression: CompressionMode::Zlib,
            ..options()
        })
        .run(transfer(""))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&zlib.packed).unwrap()["compression"],
        "zlib"
    );
    assert_eq!(zlib.packed.unpacked_trx().unwrap(), first.packed.unpacked_trx().unwrap());
    assert_eq!(zlib.packed.signatures, first.packed.signatures);
    assert_eq!(zlib.transaction_id, first.transaction_id);
}

#[tokio::test]
async fn concurrent_runs_see_only_their_responses() {
    let node = Arc::new(MockNode::default());
    let keys = Arc::new(wallets([alice_key()]).await);
    let recorder = RecordingObserver::new();
    let pipeline = Pipeline::with_observer(node.clone(), keys, recorder.clone()).with_options(options());

    // The slow run's first response arrives after the fast run has moved on.
    let slow = ActionArgs::new(
        "token",
        "transfer",
        json!({"from": "alice", "to": "bob", "quantity": "1.0000 TOK", "memo": "slow", "delay_ms": 200}).to_string(),
    );
    let fast = transfer("fast");
    let (slow, fast) = tokio::join!(pipeline.run(slow), pipeline.run(fast));
    let (slow, fast) = (slow.unwrap(), fast.unwrap());

    assert_eq!(slow.packed.transaction().unwrap().actions[0].data.0, b"slow".to_vec());
    assert_eq!(fast.packed.transaction().unwrap().actions[0].data.0, b"fast".to_vec());
    assert_ne!(slow.transaction_id, fast.transaction_id);

    for (run, memo) in [(slow.run, "slow"), (fast.run, "fast")] {
        let binargs: Vec<Value> = recorder
            .events_for(run)
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::Response { stage: Stage::AbiJsonToBin, payload, .. } => {
                    Some(payload["binargs"].clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(binargs, vec![json!(hex::encode(memo))]);
        assert_eq!(recorder.states_for(run).last(), Some(&PipelineState::Succeeded));
    }

    // Requests interleaved on the wire.
    let events = recorder.events();
    let position = |run: RunId, stage: Stage| {
        events
            .iter()
            .position(|e| matches!(e, PipelineEvent::Response { run: r, stage: s, .. } if *r == run && *s == stage))
            .unwrap()
    };
    assert_gt!(
        position(slow.run, Stage::AbiJsonToBin),
        position(fast.run, Stage::GetInfo)
    );
}

#[tokio::test]
async fn timeout_fails_parked_run() {
    let node = Arc::new(MockNode {
        stall: Some(Endpoint::GetInfo),
        ..Default::default()
    });
    let keys = Arc::new(wallets([alice_key()]).await);
    let recorder = RecordingObserver::new();
    let pipeline = Pipeline::with_observer(node, keys, recorder.clone());

    let err = pipeline
        .run_with_timeout(transfer(""), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Timeout { stage: Stage::GetInfo, .. }
    ));

    let run = only_run(&recorder);
    assert_eq!(
        recorder.states_for(run),
        vec![
            PipelineState::Idle,
            PipelineState::Encoding,
            PipelineState::AwaitingChainInfo,
            PipelineState::Failed
        ]
    );
    assert!(matches!(
        recorder.events_for(run).last(),
        Some(PipelineEvent::Failure { kind: ErrorKind::Timeout, .. })
    ));
}
