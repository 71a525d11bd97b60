//! End-to-end scenarios S1-S4 and S6 (spec.md §8), exercised directly
//! against a real Postgres instance rather than the full process tree.

mod common;

use chrono::{Duration, Utc};
use hrwsi_protocol::ProductType;

use common::{allow_tile, insert_raw_input, store, yyyymmdd, RawInputFixture};

#[tokio::test]
async fn s1_l1c_init_path_fires_cc_tc_alone() {
    let store = store().await;
    let pool = store.pool();
    allow_tile(pool, ProductType::S2Msi1c, "31TCH").await;

    let today = yyyymmdd(Utc::now().date_naive());
    let mut l1c = RawInputFixture::new("L1C_31TCH", ProductType::S2Msi1c, "31TCH", today);
    l1c.is_partial = false;
    insert_raw_input(pool, &l1c).await;

    hrwsi_triggerer::rules::cc::run_cycle(&store).await.unwrap();

    let validations: Vec<(i64,)> =
        sqlx::query_as("SELECT id FROM hrwsi.trigger_validation WHERE triggering_condition = 'CC_TC'")
            .fetch_all(pool)
            .await
            .unwrap();
    assert_eq!(validations.len(), 1);

    let edges: Vec<(i64,)> = sqlx::query_as(
        "SELECT raw_input_id FROM hrwsi.raw2valid WHERE trigger_validation_id = $1",
    )
    .bind(validations[0].0)
    .fetch_all(pool)
    .await
    .unwrap();
    assert_eq!(edges.len(), 1);

    let (is_nrt,): (bool,) =
        sqlx::query_as("SELECT is_nrt FROM hrwsi.trigger_validation WHERE id = $1")
            .bind(validations[0].0)
            .fetch_one(pool)
            .await
            .unwrap();
    assert!(is_nrt, "a fresh L1C with no bookmark classifies as NRT");

    hrwsi_triggerer::rules::cc::run_cycle(&store).await.unwrap();
    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM hrwsi.trigger_validation WHERE triggering_condition = 'CC_TC'")
            .fetch_one(pool)
            .await
            .unwrap();
    assert_eq!(count, 1, "a second cycle must not duplicate the CC_TC validation");
}

#[tokio::test]
async fn s2_l1c_nominal_pairs_with_prior_l2a() {
    let store = store().await;
    let pool = store.pool();
    allow_tile(pool, ProductType::S2Msi1c, "31TCH").await;

    let today = Utc::now().date_naive();
    let l2a_day = yyyymmdd(today - Duration::days(5));
    let mut l2a = RawInputFixture::new("L2A_31TCH", ProductType::S2MajaL2a, "31TCH", l2a_day);
    l2a.publishing_date = Utc::now() - Duration::days(5);
    insert_raw_input(pool, &l2a).await;

    let l1c = RawInputFixture::new("L1C_31TCH", ProductType::S2Msi1c, "31TCH", yyyymmdd(today));
    insert_raw_input(pool, &l1c).await;

    hrwsi_triggerer::rules::cc::run_cycle(&store).await.unwrap();

    let (validation_id,): (i64,) =
        sqlx::query_as("SELECT id FROM hrwsi.trigger_validation WHERE triggering_condition = 'CC_TC'")
            .fetch_one(pool)
            .await
            .unwrap();
    let mut edge_ids: Vec<i64> = sqlx::query_as::<_, (i64,)>(
        "SELECT raw_input_id FROM hrwsi.raw2valid WHERE trigger_validation_id = $1 ORDER BY raw_input_id",
    )
    .bind(validation_id)
    .fetch_all(pool)
    .await
    .unwrap()
    .into_iter()
    .map(|(id,)| id)
    .collect();
    edge_ids.sort_unstable();
    assert_eq!(edge_ids.len(), 2, "NOMINAL mode pairs the L1C with the prior L2A");
}

#[tokio::test]
async fn s3_partial_grdh_pair_fires_one_validation_with_two_edges() {
    let store = store().await;
    let pool = store.pool();

    let day = yyyymmdd(Utc::now().date_naive());
    let mut first = RawInputFixture::new("GRDH_A", ProductType::IwGrdh1s, "18TWL", day);
    first.is_partial = true;
    first.relative_orbit = Some(44);
    let mut second = RawInputFixture::new("GRDH_B", ProductType::IwGrdh1s, "18TWL", day);
    second.is_partial = true;
    second.relative_orbit = Some(44);
    second.measurement_start = first.measurement_start + Duration::seconds(120);

    insert_raw_input(pool, &first).await;
    insert_raw_input(pool, &second).await;

    hrwsi_triggerer::rules::grdh::run_cycle(&store).await.unwrap();

    let (count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM hrwsi.trigger_validation WHERE triggering_condition = 'Backscatter_10m_TC'",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(count, 1);

    let (edge_count,): (i64,) = sqlx::query_as("SELECT count(*) FROM hrwsi.raw2valid").fetch_one(pool).await.unwrap();
    assert_eq!(edge_count, 2);
}

#[tokio::test]
async fn s4_grdh_orphan_fires_alone_once_and_only_once() {
    let store = store().await;
    let pool = store.pool();

    let day = yyyymmdd(Utc::now().date_naive());
    let mut lone = RawInputFixture::new("GRDH_LONE", ProductType::IwGrdh1s, "18TWL", day);
    lone.is_partial = true;
    lone.relative_orbit = Some(9);
    lone.harvesting_date = Utc::now() - Duration::hours(3);
    insert_raw_input(pool, &lone).await;

    hrwsi_triggerer::rules::grdh::run_cycle(&store).await.unwrap();
    hrwsi_triggerer::rules::grdh::run_cycle(&store).await.unwrap();

    let (count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM hrwsi.trigger_validation WHERE triggering_condition = 'Backscatter_10m_TC'",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(count, 1, "a lone partial orphaned past the timeout fires once, not per cycle");
}

#[tokio::test]
async fn s4_grdh_fresh_partial_does_not_fire_before_orphan_timeout() {
    let store = store().await;
    let pool = store.pool();

    let day = yyyymmdd(Utc::now().date_naive());
    let mut fresh = RawInputFixture::new("GRDH_FRESH", ProductType::IwGrdh1s, "18TWL", day);
    fresh.is_partial = true;
    fresh.relative_orbit = Some(9);
    insert_raw_input(pool, &fresh).await;

    hrwsi_triggerer::rules::grdh::run_cycle(&store).await.unwrap();

    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM hrwsi.trigger_validation").fetch_one(pool).await.unwrap();
    assert_eq!(count, 0, "an unpaired partial within the orphan window must wait");
}

#[tokio::test]
async fn s6_gfsc_gating_blocks_bookmark_while_a_day_has_an_unfinished_fsc_task() {
    let store = store().await;
    let pool = store.pool();
    allow_tile(pool, ProductType::S2FscL2b, "31TCH").await;

    let today = Utc::now().date_naive();
    let blocked_day = today - Duration::days(1);
    let blocked_day_code = yyyymmdd(blocked_day);

    let fsc_input = RawInputFixture::new("FSC_31TCH", ProductType::S2FscL2b, "31TCH", blocked_day_code);
    let fsc_input_id = insert_raw_input(pool, &fsc_input).await;

    let validation_id: i64 = sqlx::query_as::<_, (i64,)>(
        "INSERT INTO hrwsi.trigger_validation (triggering_condition, is_nrt) VALUES ('FSC_TC', true) RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap()
    .0;
    sqlx::query("INSERT INTO hrwsi.raw2valid (trigger_validation_id, raw_input_id) VALUES ($1, $2)")
        .bind(validation_id)
        .bind(fsc_input_id)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO hrwsi.processing_tasks (trigger_validation_id, processing_date, has_ended) VALUES ($1, $2, FALSE)",
    )
    .bind(validation_id)
    .bind(blocked_day_code)
    .execute(pool)
    .await
    .unwrap();

    hrwsi_triggerer::rules::gfsc::run_cycle(&store).await.unwrap();

    let bookmark: Option<(chrono::NaiveDate,)> =
        sqlx::query_as("SELECT last_processing_date FROM systemparams.gfsc_bookmark WHERE id")
            .fetch_optional(pool)
            .await
            .unwrap();
    assert!(
        bookmark.is_none() || bookmark.unwrap().0 < blocked_day,
        "bookmark must not advance past a day with an unfinished FSC/SWS task"
    );

    let (gfsc_count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM hrwsi.trigger_validation WHERE triggering_condition = 'GFSC_TC'",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(gfsc_count, 0, "no GFSC_TC validation is created for a blocked day");
}
