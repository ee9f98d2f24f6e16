pub mod common;

use laundry_tracker::api;
use reqwest::StatusCode;

#[tokio::test]
async fn creates_pending_ticket() {
    let alice = common::student_client().await;

    let laundry = alice.add_laundry(3, 2, 1, 0, 1).await.unwrap();
    assert_eq!(laundry.shirts, 3);
    assert_eq!(laundry.bottoms, 2);
    assert_eq!(laundry.towels, 1);
    assert_eq!(laundry.bedsheets, 0);
    assert_eq!(laundry.others, 1);
    assert_eq!(laundry.total_items, 7);
    assert_eq!(laundry.status, api::laundry::Status::Pending);
    assert_eq!(laundry.issue, None);
    assert_eq!(laundry.delivery_date, None);
    assert_eq!(laundry.bag_number, "B-17");
    assert_eq!(laundry.student.name, "Alice");
    assert_eq!(laundry.student.bag_number, "B-17");
    assert_eq!(laundry.student.gender, "female");
}

#[tokio::test]
async fn rejects_empty_ticket() {
    let alice = common::student_client().await;
    let status = alice.add_laundry(0, 0, 0, 0, 0).await.unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
