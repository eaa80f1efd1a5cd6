mod common;

use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use buy_intent_relay::{
    codec::encode_intent,
    errors::RpcFailure,
    outcome::PENDING_HANDLE_PREFIX,
    signer::address_of,
    user_op::safe_op_digest,
    Deployment, IntentError, SubmissionOutcome, Sponsorship, FALLBACK_GAS_PRICE,
};
use buy_intent_types::abi::ISafe4337Module;
use common::{
    default_intent, owner, pipeline, pipeline_with, relay_tx_hash, MockBundler, MockChain,
};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

#[tokio::test(start_paused = true)]
async fn relay_answering_within_budget_is_confirmed() {
    let chain = Arc::new(MockChain::default());
    let bundler = Arc::new(MockBundler::default());
    let pipeline = pipeline(chain, bundler.clone());

    let report = pipeline
        .submit_report(owner(), &default_intent())
        .await
        .unwrap();

    assert!(report.success);
    assert!(!report.is_pending);
    assert_eq!(report.tx_hash, Some(format!("{:#x}", relay_tx_hash())));
    assert_eq!(bundler.send_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_relay_is_pending_and_keeps_delivering() {
    let chain = Arc::new(MockChain::default());
    let bundler = Arc::new(MockBundler {
        send_delay: Duration::from_secs(15),
        ..MockBundler::default()
    });
    let pipeline = pipeline(chain, bundler.clone());

    let attempt = pipeline.submit(owner(), &default_intent()).await.unwrap();
    let SubmissionOutcome::Pending { account_address, pseudo_handle } = &attempt.outcome else {
        panic!("expected pending, got {:?}", attempt.outcome);
    };
    assert_eq!(*account_address, attempt.account_address);
    assert!(pseudo_handle.starts_with(PENDING_HANDLE_PREFIX));
    assert!(!bundler.delivered.load(Ordering::SeqCst));

    let report = attempt.into_report().unwrap();
    assert!(report.success);
    assert!(report.is_pending);

    // Not waiting any more does not cancel the relay call.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(bundler.delivered.load(Ordering::SeqCst));
    assert_eq!(bundler.send_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_gas_estimation_counts_against_the_wait_budget() {
    let chain = Arc::new(MockChain::default());
    let bundler = Arc::new(MockBundler {
        estimate_delay: Duration::from_secs(15),
        ..MockBundler::default()
    });
    let pipeline = pipeline(chain, bundler.clone());

    let started = tokio::time::Instant::now();
    let attempt = pipeline.submit(owner(), &default_intent()).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(11));
    assert!(
        attempt.outcome.is_pending(),
        "expected pending, got {:?}",
        attempt.outcome
    );
    assert_eq!(bundler.send_calls.load(Ordering::SeqCst), 0);

    // Estimation finishes at 15s; the detached attempt then signs and sends.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(bundler.send_calls.load(Ordering::SeqCst), 1);
    assert!(bundler.delivered.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn unanswered_gas_price_falls_back_and_still_submits() {
    let chain = Arc::new(MockChain::default());
    let bundler = Arc::new(MockBundler {
        gas_price_delay: Duration::from_secs(3600),
        ..MockBundler::default()
    });
    let pipeline = pipeline(chain, bundler.clone());

    let attempt = tokio::time::timeout(
        Duration::from_secs(60),
        pipeline.submit(owner(), &default_intent()),
    )
    .await
    .expect("submission must not hang on the gas price")
    .unwrap();
    assert!(matches!(attempt.outcome, SubmissionOutcome::Confirmed { .. }));
    assert_eq!(bundler.gas_price_calls.load(Ordering::SeqCst), 1);

    let op = bundler.last_op();
    assert_eq!(op.max_fee_per_gas, FALLBACK_GAS_PRICE.max_fee_per_gas);
}

#[tokio::test(start_paused = true)]
async fn malformed_gas_price_uses_fallback_and_still_submits() {
    let chain = Arc::new(MockChain::default());
    let bundler = Arc::new(MockBundler {
        gas_price: Err(RpcFailure::Malformed("missing field `fast`".into())),
        ..MockBundler::default()
    });
    let pipeline = pipeline(chain, bundler.clone());

    let attempt = pipeline.submit(owner(), &default_intent()).await.unwrap();
    assert!(matches!(attempt.outcome, SubmissionOutcome::Confirmed { .. }));
    assert_eq!(bundler.gas_price_calls.load(Ordering::SeqCst), 1);

    let op = bundler.last_op();
    assert_eq!(op.max_fee_per_gas, FALLBACK_GAS_PRICE.max_fee_per_gas);
    assert_eq!(op.max_priority_fee_per_gas, FALLBACK_GAS_PRICE.max_priority_fee_per_gas);
}

#[tokio::test(start_paused = true)]
async fn relay_rejection_is_a_hard_error_with_details() {
    let chain = Arc::new(MockChain::default());
    let bundler = Arc::new(MockBundler {
        send: Err(RpcFailure::Rejected {
            code: -32500,
            message: "AA21 didn't pay prefund".into(),
            details: Some("sender balance too low".into()),
        }),
        ..MockBundler::default()
    });
    let pipeline = pipeline(chain, bundler);

    let err = pipeline
        .submit_report(owner(), &default_intent())
        .await
        .unwrap_err();
    let IntentError::SubmissionRejected(reason) = &err else {
        panic!("expected a rejection, got {err:?}");
    };
    assert_eq!(reason.short_message, "AA21 didn't pay prefund");
    assert_eq!(
        err.to_string(),
        "AA21 didn't pay prefund Details: sender balance too low"
    );
}

#[tokio::test(start_paused = true)]
async fn balance_failure_stops_before_the_relay() {
    let chain = Arc::new(MockChain {
        balance: Err(RpcFailure::Transport("connection refused".into())),
        ..MockChain::default()
    });
    let bundler = Arc::new(MockBundler::default());
    let pipeline = pipeline(chain, bundler.clone());

    let err = pipeline
        .submit(owner(), &default_intent())
        .await
        .unwrap_err();
    assert!(matches!(err, IntentError::NetworkUnavailable(_)));
    assert_eq!(bundler.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn wrong_chain_is_a_configuration_error() {
    let chain = Arc::new(MockChain {
        chain_id: Ok(1),
        ..MockChain::default()
    });
    let bundler = Arc::new(MockBundler::default());
    let pipeline = pipeline(chain, bundler.clone());

    let err = pipeline
        .submit(owner(), &default_intent())
        .await
        .unwrap_err();
    assert!(matches!(err, IntentError::Configuration(_)));
    assert_eq!(bundler.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn account_address_is_stable_across_resolutions() {
    let chain = Arc::new(MockChain::default());
    let pipeline = pipeline(chain, Arc::new(MockBundler::default()));
    let signer = owner();

    let first = pipeline.resolve_account(&*signer).await.unwrap();
    let second = pipeline.resolve_account(&*signer).await.unwrap();
    assert_eq!(first.address, second.address);
    assert_eq!(first.owner, signer.address());
    assert!(!first.deployed);
}

#[tokio::test(start_paused = true)]
async fn factory_is_attached_only_until_deployment() {
    let undeployed = Arc::new(MockBundler::default());
    pipeline(Arc::new(MockChain::default()), undeployed.clone())
        .submit(owner(), &default_intent())
        .await
        .unwrap();
    let op = undeployed.last_op();
    assert_eq!(op.factory, Some(Deployment::default().proxy_factory));
    assert!(op.factory_data.is_some());

    let deployed = Arc::new(MockBundler::default());
    let chain = Arc::new(MockChain {
        code: Bytes::from(vec![0x60, 0x80]),
        nonce: U256::from(3u64),
        ..MockChain::default()
    });
    pipeline(chain, deployed.clone())
        .submit(owner(), &default_intent())
        .await
        .unwrap();
    let op = deployed.last_op();
    assert_eq!(op.factory, None);
    assert!(op.init_code().is_empty());
    assert_eq!(op.nonce, U256::from(3u64));
}

#[tokio::test(start_paused = true)]
async fn gateway_call_carries_max_eth_in_and_encoded_intent() {
    let bundler = Arc::new(MockBundler::default());
    let intent = default_intent();
    pipeline(Arc::new(MockChain::default()), bundler.clone())
        .submit(owner(), &intent)
        .await
        .unwrap();

    let op = bundler.last_op();
    let call = ISafe4337Module::executeUserOpCall::abi_decode(&op.call_data, true).unwrap();
    assert_eq!(call.to, Deployment::default().intent_gateway);
    assert_eq!(call.value, intent.max_eth_in());
    assert_eq!(call.data, encode_intent(&intent));
    assert_eq!(call.operation, 0);
    assert_eq!(op.call_gas_limit, common::gas_estimate().call_gas_limit);
}

#[tokio::test(start_paused = true)]
async fn operation_signature_recovers_to_owner() {
    let bundler = Arc::new(MockBundler::default());
    let signer = owner();
    pipeline(Arc::new(MockChain::default()), bundler.clone())
        .submit(signer.clone(), &default_intent())
        .await
        .unwrap();

    let op = bundler.last_op();
    assert_eq!(op.signature.len(), 77);
    assert_eq!(&op.signature[..12], &[0u8; 12]);

    let deployment = Deployment::default();
    let digest = safe_op_digest(
        &op,
        10143,
        deployment.safe_4337_module,
        deployment.entry_point,
        0,
        0,
    );
    let rsv = &op.signature[12..];
    let signature = Signature::from_slice(&rsv[..64]).unwrap();
    let recid = RecoveryId::from_byte(rsv[64] - 27).unwrap();
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recid).unwrap();
    assert_eq!(address_of(&key), signer.address());
}

#[tokio::test(start_paused = true)]
async fn paymaster_sponsorship_replaces_estimation() {
    let bundler = Arc::new(MockBundler::default());
    pipeline_with(
        Arc::new(MockChain::default()),
        bundler.clone(),
        Sponsorship::Paymaster {
            policy_id: Some("sp_test".into()),
        },
    )
    .submit(owner(), &default_intent())
    .await
    .unwrap();

    assert_eq!(bundler.sponsor_calls.load(Ordering::SeqCst), 1);
    assert_eq!(bundler.estimate_calls.load(Ordering::SeqCst), 0);
    let op = bundler.last_op();
    assert_eq!(op.paymaster, Some(Address::repeat_byte(0x99)));
    assert_eq!(op.paymaster_and_data().len(), 20 + 32 + 8);
}
