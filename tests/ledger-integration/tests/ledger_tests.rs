//! End-to-end wallet and transfer flows over HTTP.

use fundry_common::wallet::Transaction;
use fundry_ledger_integration::harness::TestNode;
use serde_json::json;

#[tokio::test]
async fn deposit_updates_balance_and_history() {
    let node = TestNode::start().await;
    node.open_wallet("alice", 5_000).await;

    let (status, tx) = node
        .post("/wallets/alice/deposit", json!({ "amount": 1_000 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(tx["amount"], 1_000);
    assert_eq!(tx["type"], "deposit");
    assert_eq!(tx["status"], "completed");
    assert_eq!(node.balance_of("alice").await, 6_000);

    let (status, history) = node.get("/wallets/alice/transactions").await;
    assert_eq!(status, 200);
    // Opening-balance entry plus the deposit, newest first.
    let history = history.as_array().unwrap().clone();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["amount"], 1_000);
    assert_eq!(history[1]["amount"], 5_000);
}

#[tokio::test]
async fn withdraw_beyond_balance_is_a_conflict() {
    let node = TestNode::start().await;
    node.open_wallet("alice", 100).await;

    let (status, body) = node
        .post("/wallets/alice/withdraw", json!({ "amount": 500 }))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["kind"], "InsufficientFunds");
    assert_eq!(node.balance_of("alice").await, 100);

    let (_, history) = node.get("/wallets/alice/transactions").await;
    assert_eq!(history.as_array().unwrap().len(), 1, "no entry was posted");
}

#[tokio::test]
async fn transfer_moves_money_as_a_balanced_pair() {
    let node = TestNode::start().await;
    node.open_wallet("alice", 6_000).await;
    node.open_wallet("bob", 0).await;

    let (status, pair) = node
        .post(
            "/transfers",
            json!({ "fromUserId": "alice", "toUserId": "bob", "amount": 2_000 }),
        )
        .await;
    assert_eq!(status, 200);
    let pair = pair.as_array().unwrap().clone();
    assert_eq!(pair.len(), 2);
    assert_eq!(pair[0]["amount"], -2_000);
    assert_eq!(pair[1]["amount"], 2_000);
    assert_eq!(
        pair[0]["metadata"]["reference"],
        pair[1]["metadata"]["reference"]
    );
    assert_eq!(pair[0]["senderId"], "alice");
    assert_eq!(pair[1]["receiverId"], "bob");

    // The wire form round-trips into the domain type.
    let typed: Vec<Transaction> =
        serde_json::from_value(serde_json::Value::Array(pair.clone())).unwrap();
    assert_eq!(typed[0].amount + typed[1].amount, 0);
    assert_eq!(typed[0].metadata.reference, typed[1].metadata.reference);

    assert_eq!(node.balance_of("alice").await, 4_000);
    assert_eq!(node.balance_of("bob").await, 2_000);

    let (_, bob_history) = node.get("/wallets/bob/transactions").await;
    let bob_history = bob_history.as_array().unwrap().clone();
    assert_eq!(bob_history.len(), 1);
    assert_eq!(bob_history[0]["type"], "transfer");
}

#[tokio::test]
async fn transfer_to_unknown_user_is_not_found() {
    let node = TestNode::start().await;
    node.open_wallet("alice", 1_000).await;

    let (status, body) = node
        .post(
            "/transfers",
            json!({ "fromUserId": "alice", "toUserId": "ghost", "amount": 100 }),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["kind"], "NotFound");
    assert_eq!(node.balance_of("alice").await, 1_000);
}

#[tokio::test]
async fn transfer_replay_with_same_reference_posts_once() {
    let node = TestNode::start().await;
    node.open_wallet("alice", 6_000).await;
    node.open_wallet("bob", 0).await;

    let body = json!({
        "fromUserId": "alice",
        "toUserId": "bob",
        "amount": 2_000,
        "reference": "TRF-form-submit-1",
    });
    let (status, first) = node.post("/transfers", body.clone()).await;
    assert_eq!(status, 200);
    let (status, replay) = node.post("/transfers", body).await;
    assert_eq!(status, 200);
    assert_eq!(first, replay);

    assert_eq!(node.balance_of("alice").await, 4_000);
    assert_eq!(node.balance_of("bob").await, 2_000);
}

#[tokio::test]
async fn non_positive_amounts_are_unprocessable() {
    let node = TestNode::start().await;
    node.open_wallet("alice", 1_000).await;

    let (status, body) = node
        .post("/wallets/alice/deposit", json!({ "amount": 0 }))
        .await;
    assert_eq!(status, 422);
    assert_eq!(body["kind"], "ValidationError");
}

#[tokio::test]
async fn a_user_gets_exactly_one_wallet() {
    let node = TestNode::start().await;
    node.open_wallet("alice", 0).await;

    let (status, body) = node
        .post("/wallets", json!({ "userId": "alice" }))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["kind"], "WalletExists");
}

#[tokio::test]
async fn history_filter_by_type() {
    let node = TestNode::start().await;
    node.open_wallet("alice", 1_000).await;
    node.post("/wallets/alice/deposit", json!({ "amount": 200 }))
        .await;
    node.post("/wallets/alice/withdraw", json!({ "amount": 50 }))
        .await;

    let (status, withdrawals) = node
        .get("/wallets/alice/transactions?type=withdraw")
        .await;
    assert_eq!(status, 200);
    let withdrawals = withdrawals.as_array().unwrap().clone();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0]["amount"], -50);
}

#[tokio::test]
async fn health_reports_consistent_balances() {
    let node = TestNode::start_seeded().await;

    let (status, health) = node.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["wallets"], 4);
    assert_eq!(health["balancesConsistent"], true);

    // The demo deal already moved 1.5M from i1 to e1.
    assert_eq!(node.balance_of("i1").await, 3_500_000);
    assert_eq!(node.balance_of("e1").await, 1_550_000);
}
