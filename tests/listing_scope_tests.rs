// Listing: role scoping, filters, ordering and pagination.

mod fixtures;

use chrono::NaiveDate;
use fixtures::{order_input, Floor};
use work_order_tracker::{Denial, TrackerError, WorkOrderFilter, WorkOrderStatus, PAGE_SIZE};

async fn seed(floor: &Floor, count: usize) {
    for i in 0..count {
        let operator = if i % 3 == 0 { &floor.o2 } else { &floor.o1 };
        let mut input = order_input(operator);
        input.product_name = format!("Part {i:02}");
        input.deadline = format!("2025-04-{:02}", (i % 28) + 1);
        floor.service.create_work_order(input, &floor.manager).await.unwrap();
        floor.tick();
    }
}

#[tokio::test]
async fn test_manager_sees_everything_newest_first() {
    let floor = Floor::new().await;
    seed(&floor, 12).await;

    let first = floor
        .service
        .list_work_orders(&floor.manager, WorkOrderFilter::default(), 1)
        .await
        .unwrap();
    assert_eq!(first.total, 12);
    assert_eq!(first.items.len(), PAGE_SIZE as usize);
    assert_eq!(first.last_page, 2);
    assert_eq!(first.items[0].product_name, "Part 11");
    assert!(first
        .items
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));

    let second = floor
        .service
        .list_work_orders(&floor.manager, WorkOrderFilter::default(), 2)
        .await
        .unwrap();
    assert_eq!(second.items.len(), 2);
    assert_eq!(second.items[1].product_name, "Part 00");
    assert!(!second.has_more());
}

#[tokio::test]
async fn test_operator_only_sees_own_orders_whatever_the_filter() {
    let floor = Floor::new().await;
    seed(&floor, 9).await;

    let filters = [
        WorkOrderFilter::default(),
        WorkOrderFilter {
            search: Some("Part 00".to_string()),
            ..Default::default()
        },
        WorkOrderFilter {
            status: Some(WorkOrderStatus::Pending),
            deadline_from: NaiveDate::from_ymd_opt(2025, 4, 1),
            ..Default::default()
        },
    ];
    for filter in filters {
        let page = floor.service.list_work_orders(&floor.o1, filter, 1).await.unwrap();
        assert!(page.items.iter().all(|o| o.operator_id == floor.o1.id));
    }

    let page = floor
        .service
        .list_work_orders(&floor.o2, WorkOrderFilter::default(), 1)
        .await
        .unwrap();
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn test_filters_combine() {
    let floor = Floor::new().await;
    seed(&floor, 6).await;
    let order = floor
        .service
        .list_work_orders(
            &floor.manager,
            WorkOrderFilter {
                search: Some("part 04".to_string()),
                ..Default::default()
            },
            1,
        )
        .await
        .unwrap()
        .items
        .remove(0);
    floor
        .service
        .transition_status(order.id, WorkOrderStatus::InProgress, 3, None, &floor.o1)
        .await
        .unwrap();

    let page = floor
        .service
        .list_work_orders(
            &floor.manager,
            WorkOrderFilter {
                status: Some(WorkOrderStatus::InProgress),
                deadline_from: NaiveDate::from_ymd_opt(2025, 4, 5),
                deadline_to: NaiveDate::from_ymd_opt(2025, 4, 5),
                ..Default::default()
            },
            1,
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, order.id);

    let by_number = floor
        .service
        .list_work_orders(
            &floor.manager,
            WorkOrderFilter {
                search: Some(order.number.to_string().to_lowercase()),
                ..Default::default()
            },
            1,
        )
        .await
        .unwrap();
    assert_eq!(by_number.items.len(), 1);
}

#[tokio::test]
async fn test_roleless_user_cannot_list() {
    let floor = Floor::new().await;
    let err = floor
        .service
        .list_work_orders(&floor.nobody, WorkOrderFilter::default(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::Authorization { denial: Denial::NoRole, .. }));
}

#[tokio::test]
async fn test_page_zero_is_treated_as_first_page() {
    let floor = Floor::new().await;
    seed(&floor, 2).await;
    let page = floor
        .service
        .list_work_orders(&floor.manager, WorkOrderFilter::default(), 0)
        .await
        .unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.items.len(), 2);
}
