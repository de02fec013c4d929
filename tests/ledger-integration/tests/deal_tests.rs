//! Funding deal lifecycle over HTTP: state machine plus the paired posting
//! on completion.

use fundry_ledger_integration::harness::TestNode;
use serde_json::json;

#[tokio::test]
async fn deal_lifecycle_moves_the_money_once() {
    let node = TestNode::start().await;
    node.open_wallet("ivy", 5_000_000).await;
    node.open_wallet("eva", 50_000).await;

    let deal_id = node.create_deal("ivy", "eva", 1_500_000, 15.0).await;

    let (status, deal) = node.get(&format!("/deals/{deal_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(deal["status"], "pending");

    let (status, deal) = node
        .post(&format!("/deals/{deal_id}/approve"), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(deal["status"], "approved");

    let (status, deal) = node
        .post(&format!("/deals/{deal_id}/complete"), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(deal["status"], "completed");

    assert_eq!(node.balance_of("ivy").await, 3_500_000);
    assert_eq!(node.balance_of("eva").await, 1_550_000);

    // Both sides carry a funding entry tagged with the deal id, summing to zero.
    let (_, ivy_history) = node.get("/wallets/ivy/transactions?type=funding").await;
    let (_, eva_history) = node.get("/wallets/eva/transactions?type=funding").await;
    let ivy_history = ivy_history.as_array().unwrap().clone();
    let eva_history = eva_history.as_array().unwrap().clone();
    assert_eq!(ivy_history.len(), 1);
    assert_eq!(eva_history.len(), 1);
    assert_eq!(ivy_history[0]["metadata"]["dealId"], deal_id.as_str());
    assert_eq!(eva_history[0]["metadata"]["dealId"], deal_id.as_str());
    assert_eq!(
        ivy_history[0]["amount"].as_i64().unwrap() + eva_history[0]["amount"].as_i64().unwrap(),
        0
    );
}

#[tokio::test]
async fn completing_twice_is_rejected() {
    let node = TestNode::start().await;
    node.open_wallet("ivy", 5_000_000).await;
    node.open_wallet("eva", 0).await;

    let deal_id = node.create_deal("ivy", "eva", 1_500_000, 15.0).await;
    node.post(&format!("/deals/{deal_id}/approve"), json!({}))
        .await;
    node.post(&format!("/deals/{deal_id}/complete"), json!({}))
        .await;

    let (status, body) = node
        .post(&format!("/deals/{deal_id}/complete"), json!({}))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["kind"], "InvalidTransition");

    // The money moved exactly once.
    assert_eq!(node.balance_of("ivy").await, 3_500_000);
    assert_eq!(node.balance_of("eva").await, 1_500_000);
}

#[tokio::test]
async fn completion_requires_approval_first() {
    let node = TestNode::start().await;
    node.open_wallet("ivy", 5_000_000).await;
    node.open_wallet("eva", 0).await;

    let deal_id = node.create_deal("ivy", "eva", 1_500_000, 15.0).await;
    let (status, body) = node
        .post(&format!("/deals/{deal_id}/complete"), json!({}))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["kind"], "InvalidTransition");
    assert_eq!(node.balance_of("ivy").await, 5_000_000);
}

#[tokio::test]
async fn cancelled_deals_are_terminal() {
    let node = TestNode::start().await;
    node.open_wallet("ivy", 5_000_000).await;
    node.open_wallet("eva", 0).await;

    let deal_id = node.create_deal("ivy", "eva", 1_500_000, 15.0).await;
    let (status, deal) = node
        .post(&format!("/deals/{deal_id}/cancel"), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(deal["status"], "cancelled");

    let (status, _) = node
        .post(&format!("/deals/{deal_id}/approve"), json!({}))
        .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn completion_without_funds_leaves_the_deal_approved() {
    let node = TestNode::start().await;
    node.open_wallet("ivy", 100).await;
    node.open_wallet("eva", 0).await;

    let deal_id = node.create_deal("ivy", "eva", 1_500_000, 15.0).await;
    node.post(&format!("/deals/{deal_id}/approve"), json!({}))
        .await;

    let (status, body) = node
        .post(&format!("/deals/{deal_id}/complete"), json!({}))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["kind"], "InsufficientFunds");

    let (_, deal) = node.get(&format!("/deals/{deal_id}")).await;
    assert_eq!(deal["status"], "approved");
    assert_eq!(node.balance_of("ivy").await, 100);
}

#[tokio::test]
async fn equity_outside_the_open_interval_is_rejected() {
    let node = TestNode::start().await;
    node.open_wallet("ivy", 5_000_000).await;
    node.open_wallet("eva", 0).await;

    for equity in [0.0, 101.0, -3.0] {
        let (status, body) = node
            .post(
                "/deals",
                json!({
                    "investorId": "ivy",
                    "entrepreneurId": "eva",
                    "amount": 1_000,
                    "equity": equity,
                    "description": "bad equity",
                }),
            )
            .await;
        assert_eq!(status, 422);
        assert_eq!(body["kind"], "ValidationError");
    }
}

#[tokio::test]
async fn deals_are_listed_for_both_parties() {
    let node = TestNode::start().await;
    node.open_wallet("ivy", 5_000_000).await;
    node.open_wallet("eva", 0).await;
    node.open_wallet("outsider", 0).await;

    let deal_id = node.create_deal("ivy", "eva", 1_500_000, 15.0).await;

    for user in ["ivy", "eva"] {
        let (status, deals) = node.get(&format!("/users/{user}/deals")).await;
        assert_eq!(status, 200);
        let deals = deals.as_array().unwrap().clone();
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0]["id"], deal_id.as_str());
    }

    let (status, deals) = node.get("/users/outsider/deals").await;
    assert_eq!(status, 200);
    assert_eq!(deals.as_array().unwrap().len(), 0);
}
