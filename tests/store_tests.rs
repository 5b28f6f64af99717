// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::{category, dec, record};
use fynance::audit::AuditStore;
use fynance::db::Store;
use fynance::error::StoreError;
use fynance::models::{AuditEntry, AuditStatus, Month, Notification, RecordId};
use fynance::store::{
    Gateway, LedgerGateway, SqliteAuditStore, SqliteGateway, ensure_user, find_user,
};

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

#[tokio::test]
async fn record_crud_round_trip() {
    let gw = SqliteGateway::income(store());
    let mut r = record("Salary", Month::Jan, "2024", "1200.50");
    gw.insert(&r).await.unwrap();

    let found = gw.find_by_id(r.id).await.unwrap();
    assert_eq!(found.category, "Salary");
    assert_eq!(found.month, Month::Jan);
    assert_eq!(found.amount, dec("1200.50"));

    r.amount = dec("1300");
    r.month = Month::Sept;
    gw.update(&r).await.unwrap();
    let found = gw.find_by_id(r.id).await.unwrap();
    assert_eq!(found.amount, dec("1300"));
    assert_eq!(found.month, Month::Sept);

    gw.delete(r.id).await.unwrap();
    assert!(matches!(
        gw.find_by_id(r.id).await,
        Err(StoreError::NotFound { collection: "income", .. })
    ));
}

#[tokio::test]
async fn missing_ids_are_not_found() {
    let gw = SqliteGateway::expenses(store());
    let ghost = record("Rent", Month::May, "2024", "1");
    assert!(matches!(gw.update(&ghost).await, Err(StoreError::NotFound { .. })));
    assert!(matches!(gw.delete(ghost.id).await, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn pages_follow_insertion_order() {
    let gw = SqliteGateway::expenses(store());
    for i in 1..=12 {
        gw.insert(&record(&format!("E{:02}", i), Month::Feb, "2024", "1"))
            .await
            .unwrap();
    }
    assert_eq!(gw.count().await.unwrap(), 12);
    let page: Vec<String> = gw
        .find_page(10, 5)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.category)
        .collect();
    assert_eq!(page, ["E11", "E12"]);
    assert!(gw.find_page(20, 5).await.unwrap().is_empty());
    assert_eq!(gw.find_all().await.unwrap().len(), 12);
}

#[tokio::test]
async fn search_is_case_insensitive_substring() {
    let gw = SqliteGateway::expenses(store());
    gw.insert(&record("Rent", Month::March, "2024", "900")).await.unwrap();
    gw.insert(&record("Groceries", Month::March, "2024", "80")).await.unwrap();
    gw.insert(&record("50% off", Month::Jan, "2024", "5")).await.unwrap();
    gw.insert(&record("500 club", Month::Jan, "2024", "5")).await.unwrap();

    let hits = gw.search_by_text("RENT").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(gw.search_by_text("mar").await.unwrap().len(), 2);
    // '%' matches literally
    let hits = gw.search_by_text("0%").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].category, "50% off");
    assert!(gw.search_by_text("  ").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_folds_non_ascii_case() {
    let gw = SqliteGateway::expenses(store());
    gw.insert(&record("Épicerie", Month::May, "2024", "42")).await.unwrap();
    gw.insert(&record("ÜBER", Month::May, "2024", "17")).await.unwrap();
    gw.insert(&record("Rent", Month::May, "2024", "900")).await.unwrap();

    for q in ["épicerie", "ÉPICERIE", "Épicerie", "über", "ÜB"] {
        let hits = gw.search_by_text(q).await.unwrap();
        assert_eq!(hits.len(), 1, "query {q}");
    }

    let cats = SqliteGateway::income_categories(store());
    cats.insert(&category("Prämie")).await.unwrap();
    assert_eq!(cats.search_by_text("PRÄMIE").await.unwrap().len(), 1);
}

#[tokio::test]
async fn categories_use_their_own_columns() {
    let db = store();
    let income = SqliteGateway::income_categories(db.clone());
    let expense = SqliteGateway::expense_categories(db);
    income.insert(&category("Salary")).await.unwrap();
    income.insert(&category("Salary")).await.unwrap();
    expense.insert(&category("Utilities")).await.unwrap();

    assert_eq!(income.count().await.unwrap(), 2);
    assert_eq!(expense.count().await.unwrap(), 1);
    assert_eq!(income.search_by_text("sal").await.unwrap().len(), 2);
    assert!(expense.search_by_text("sal").await.unwrap().is_empty());
}

#[tokio::test]
async fn sums_are_exact_and_zero_when_empty() {
    let gw = SqliteGateway::income(store());
    gw.insert(&record("Salary", Month::Jan, "2024", "0.1")).await.unwrap();
    gw.insert(&record("Salary", Month::Jan, "2024", "0.2")).await.unwrap();
    gw.insert(&record("Bonus", Month::Jan, "2023", "99")).await.unwrap();
    gw.insert(&record("Bonus", Month::Feb, "2024", "10")).await.unwrap();

    let jan = gw.sum_by_month("2024", Month::Jan).await.unwrap();
    assert_eq!(jan.total, dec("0.3"));
    let dec_total = gw.sum_by_month("2024", Month::Dec).await.unwrap();
    assert_eq!(dec_total.total, dec("0"));
    assert_eq!(gw.sum_by_year("2024").await.unwrap(), dec("10.3"));

    let by_cat = gw.totals_by_category("2024").await.unwrap();
    assert_eq!(
        by_cat,
        vec![("Bonus".to_string(), dec("10")), ("Salary".to_string(), dec("0.3"))]
    );
}

#[tokio::test]
async fn users_are_found_or_created_once() {
    let db = store();
    let a = ensure_user(&db, "alice").await.unwrap();
    let again = ensure_user(&db, " alice ").await.unwrap();
    assert_eq!(a.id, again.id);
    assert_eq!(find_user(&db, a.id).await.unwrap().username, "alice");
    assert!(matches!(
        find_user(&db, RecordId::new()).await,
        Err(StoreError::NotFound { collection: "users", .. })
    ));
}

#[tokio::test]
async fn notifications_count_and_mark_read() {
    let db = store();
    let audit = SqliteAuditStore::new(db.clone());
    let alice = ensure_user(&db, "alice").await.unwrap();
    let bob = ensure_user(&db, "bob").await.unwrap();

    for (who, msg) in [(&alice, "one"), (&alice, "two"), (&bob, "three")] {
        audit
            .push_notification(&Notification {
                id: RecordId::new(),
                user_id: who.id,
                message: msg.to_string(),
                is_read: false,
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
    }
    audit
        .append_log(&AuditEntry {
            id: RecordId::new(),
            timestamp: chrono::Utc::now(),
            details: "alice added Income Salary".into(),
            status: AuditStatus::Success,
        })
        .await
        .unwrap();

    assert_eq!(audit.unread_count(alice.id).await.unwrap(), 2);
    let list = audit.notifications(alice.id).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].message, "two");

    assert_eq!(audit.mark_all_read(alice.id).await.unwrap(), 2);
    assert_eq!(audit.unread_count(alice.id).await.unwrap(), 0);
    assert_eq!(audit.unread_count(bob.id).await.unwrap(), 1);
}

#[test]
fn file_store_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("fynance.sqlite");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let r = record("Salary", Month::Jan, "2024", "1");
    {
        let gw = SqliteGateway::income(Store::open(&path).unwrap());
        rt.block_on(gw.insert(&r)).unwrap();
    }
    let gw = SqliteGateway::income(Store::open(&path).unwrap());
    assert_eq!(rt.block_on(gw.find_by_id(r.id)).unwrap().category, "Salary");
}
