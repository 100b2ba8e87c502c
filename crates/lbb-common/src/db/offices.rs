use async_trait::async_trait;
use deadpool_postgres::PoolError;
use tokio_postgres::{Error as PgError, Row};
use tracing::instrument;

use crate::db::{PgPool, util::timed_query_cached};
use crate::office::Office;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map office row: {0}")]
    Mapping(String),
}

/// Batch lookup of employer records. Results come back in no particular order.
#[async_trait]
pub trait OfficeStore: Send + Sync {
    async fn offices_by_ids(&self, ids: &[String]) -> Result<Vec<Office>, StoreError>;
}

/// Office records held in Postgres, with locality names from a commune table.
#[derive(Clone)]
pub struct PgOfficeStore {
    pool: PgPool,
    select_by_ids: String,
}

fn is_sql_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

impl PgOfficeStore {
    pub fn new(pool: PgPool, office_table: &str, commune_table: &str) -> Result<Self, StoreError> {
        for table in [office_table, commune_table] {
            if !is_sql_identifier(table) {
                return Err(StoreError::Mapping(format!("invalid table name: {table:?}")));
            }
        }

        let select_by_ids = format!(
            "SELECT \
                o.siret,\
                o.raisonsociale,\
                o.enseigne,\
                o.codenaf,\
                o.numerorue,\
                o.libellerue,\
                o.codecommune,\
                o.codepostal,\
                c.name AS city,\
                o.email,\
                o.tel,\
                o.website,\
                o.flag_alternance,\
                o.flag_junior,\
                o.flag_senior,\
                o.flag_handicap,\
                o.departement,\
                o.trancheeffectif,\
                o.score,\
                o.coordinates_x,\
                o.coordinates_y \
            FROM {office_table} o \
            LEFT JOIN {commune_table} c ON c.code = o.codecommune \
            WHERE o.siret = ANY($1)"
        );

        Ok(Self {
            pool,
            select_by_ids,
        })
    }
}

fn opt_text(row: &Row, column: &str) -> Result<String, StoreError> {
    row.try_get::<_, Option<String>>(column)
        .map(Option::unwrap_or_default)
        .map_err(|e| StoreError::Mapping(format!("{column}: {e}")))
}

fn map_office_row(row: &Row) -> Result<Office, StoreError> {
    let flag = |column: &str| -> Result<bool, StoreError> {
        row.try_get::<_, Option<bool>>(column)
            .map(Option::unwrap_or_default)
            .map_err(|e| StoreError::Mapping(format!("{column}: {e}")))
    };

    let siret: String = row
        .try_get("siret")
        .map_err(|e| StoreError::Mapping(format!("siret: {e}")))?;

    Ok(Office {
        company_name: opt_text(row, "raisonsociale")?,
        office_name: opt_text(row, "enseigne")?,
        naf: opt_text(row, "codenaf")?,
        street_number: opt_text(row, "numerorue")?,
        street_name: opt_text(row, "libellerue")?,
        city_code: opt_text(row, "codecommune")?,
        zipcode: opt_text(row, "codepostal")?,
        city: row
            .try_get("city")
            .map_err(|e| StoreError::Mapping(format!("city: {e}")))?,
        email: opt_text(row, "email")?,
        tel: opt_text(row, "tel")?,
        website: opt_text(row, "website")?,
        flag_alternance: flag("flag_alternance")?,
        flag_junior: flag("flag_junior")?,
        flag_senior: flag("flag_senior")?,
        flag_handicap: flag("flag_handicap")?,
        departement: opt_text(row, "departement")?,
        headcount: row
            .try_get("trancheeffectif")
            .map_err(|e| StoreError::Mapping(format!("trancheeffectif: {e}")))?,
        score: row
            .try_get::<_, Option<i32>>("score")
            .map_err(|e| StoreError::Mapping(format!("score: {e}")))?
            .unwrap_or_default(),
        longitude: row
            .try_get("coordinates_x")
            .map_err(|e| StoreError::Mapping(format!("coordinates_x: {e}")))?,
        latitude: row
            .try_get("coordinates_y")
            .map_err(|e| StoreError::Mapping(format!("coordinates_y: {e}")))?,
        siret,
    })
}

#[async_trait]
impl OfficeStore for PgOfficeStore {
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    async fn offices_by_ids(&self, ids: &[String]) -> Result<Vec<Office>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.pool.get().await?;
        let rows =
            timed_query_cached(&client, &self.select_by_ids, &[&ids], "offices_by_ids").await?;

        rows.iter().map(map_office_row).collect()
    }
}
