use chrono::{DateTime, Utc};
use hrwsi_db::test_support::test_pool;
use hrwsi_db::Store;
use hrwsi_protocol::ProductType;
use sqlx::PgPool;

pub async fn store() -> Store {
    Store::new(test_pool().await)
}

pub struct RawInputFixture {
    pub identifier: String,
    pub product_type: ProductType,
    pub measurement_start: DateTime<Utc>,
    pub publishing_date: DateTime<Utc>,
    pub tile: String,
    pub measurement_day: i32,
    pub relative_orbit: Option<i32>,
    pub is_partial: bool,
    pub harvesting_date: DateTime<Utc>,
}

impl RawInputFixture {
    pub fn new(identifier: &str, product_type: ProductType, tile: &str, measurement_day: i32) -> Self {
        let now = Utc::now();
        Self {
            identifier: identifier.to_string(),
            product_type,
            measurement_start: now,
            publishing_date: now,
            tile: tile.to_string(),
            measurement_day,
            relative_orbit: None,
            is_partial: false,
            harvesting_date: now,
        }
    }
}

pub async fn insert_raw_input(pool: &PgPool, fixture: &RawInputFixture) -> i64 {
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO hrwsi.raw_inputs
            (identifier, product_type, measurement_start, publishing_date, tile,
             measurement_day, relative_orbit, input_path, is_partial, harvesting_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(&fixture.identifier)
    .bind(fixture.product_type)
    .bind(fixture.measurement_start)
    .bind(fixture.publishing_date)
    .bind(&fixture.tile)
    .bind(fixture.measurement_day)
    .bind(fixture.relative_orbit)
    .bind(format!("s3://inputs/{}", fixture.identifier))
    .bind(fixture.is_partial)
    .bind(fixture.harvesting_date)
    .fetch_one(pool)
    .await
    .expect("insert raw_input fixture");
    row.0
}

pub async fn allow_tile(pool: &PgPool, product_type: ProductType, tile: &str) {
    sqlx::query(
        r#"
        INSERT INTO systemparams.system_params
            (product_type, collection, max_day_since_publication_date, max_day_since_measurement_date, tiles)
        VALUES ($1, 'test-collection', 7, 30, ARRAY[$2])
        ON CONFLICT (product_type) DO UPDATE SET tiles = array_append(systemparams.system_params.tiles, $2)
        "#,
    )
    .bind(product_type)
    .bind(tile)
    .execute(pool)
    .await
    .expect("seed system_params tile");
}

pub fn yyyymmdd(date: chrono::NaiveDate) -> i32 {
    date.format("%Y%m%d").to_string().parse().unwrap()
}
