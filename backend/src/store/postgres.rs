//! PostgreSQL-backed plan store and harvest ledger

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::{HarvestLedger, PlanStore};
use crate::error::{AppError, AppResult};
use shared::models::{HarvestDestination, HarvestRecord, Plan, PlanStatus, UnitOfMeasure};
use shared::types::AreaRef;

/// Plan store over the `planejamento` table
#[derive(Clone)]
pub struct PgPlanStore {
    db: PgPool,
}

/// Harvest ledger over the `colheita` table
#[derive(Clone)]
pub struct PgHarvestLedger {
    db: PgPool,
}

/// Database row for a plan
#[derive(Debug, Clone, sqlx::FromRow)]
struct PlanRow {
    pub id: Uuid,
    pub property_id: Uuid,
    pub cultivar_id: Uuid,
    pub sector_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
    pub bed_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub expected_end_date: NaiveDate,
    pub planted_area_ha: Option<Decimal>,
    pub expected_yield_per_ha: Option<Decimal>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PlanRow> for Plan {
    type Error = AppError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let area = AreaRef::from_columns(row.sector_id, row.lot_id, row.bed_id).ok_or_else(|| {
            AppError::Internal(format!("Plan {} must reference exactly one area", row.id))
        })?;
        let status = row
            .status
            .parse::<PlanStatus>()
            .map_err(|e| AppError::Internal(format!("Plan {}: {}", row.id, e)))?;

        Ok(Plan {
            id: row.id,
            property_id: row.property_id,
            cultivar_id: row.cultivar_id,
            area,
            start_date: row.start_date,
            expected_end_date: row.expected_end_date,
            planted_area_ha: row.planted_area_ha,
            expected_yield_per_ha: row.expected_yield_per_ha,
            status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for a harvest
#[derive(Debug, Clone, sqlx::FromRow)]
struct HarvestRow {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub sector_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
    pub bed_id: Option<Uuid>,
    pub harvest_date: NaiveDate,
    pub quantity: Decimal,
    pub unit: String,
    pub destination: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<HarvestRow> for HarvestRecord {
    type Error = AppError;

    fn try_from(row: HarvestRow) -> Result<Self, Self::Error> {
        let area = match (row.sector_id, row.lot_id, row.bed_id) {
            (None, None, None) => None,
            (s, l, b) => Some(AreaRef::from_columns(s, l, b).ok_or_else(|| {
                AppError::Internal(format!("Harvest {} references more than one area", row.id))
            })?),
        };
        let unit = UnitOfMeasure::parse(&row.unit).ok_or_else(|| {
            AppError::Internal(format!("Harvest {}: unknown unit {}", row.id, row.unit))
        })?;
        let destination = HarvestDestination::parse(&row.destination).ok_or_else(|| {
            AppError::Internal(format!(
                "Harvest {}: unknown destination {}",
                row.id, row.destination
            ))
        })?;
        if row.quantity <= Decimal::ZERO {
            return Err(AppError::Internal(format!(
                "Harvest {} has non-positive quantity",
                row.id
            )));
        }

        Ok(HarvestRecord {
            id: row.id,
            plan_id: row.plan_id,
            area,
            harvest_date: row.harvest_date,
            quantity: row.quantity,
            unit,
            destination,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

/// Connection-level failures mean the store is unavailable
fn store_error(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Io(e) => AppError::StorageError(e.to_string()),
        sqlx::Error::PoolTimedOut => AppError::StorageError("connection pool timed out".into()),
        sqlx::Error::PoolClosed => AppError::StorageError("connection pool closed".into()),
        other => AppError::DatabaseError(other),
    }
}

const PLAN_COLUMNS: &str = r#"
    id, propriedade_id AS property_id, cultivar_id,
    setor_id AS sector_id, lote_id AS lot_id, canteiro_id AS bed_id,
    data_inicio AS start_date, data_fim_prevista AS expected_end_date,
    area_plantada AS planted_area_ha, produtividade_esperada AS expected_yield_per_ha,
    status, observacoes AS notes, created_at, updated_at
"#;

const HARVEST_COLUMNS: &str = r#"
    id, planejamento_id AS plan_id,
    setor_id AS sector_id, lote_id AS lot_id, canteiro_id AS bed_id,
    data_colheita AS harvest_date, quantidade_colhida AS quantity,
    unidade_medida AS unit, destino AS destination, observacoes AS notes, created_at
"#;

impl PgPlanStore {
    /// Create a new PgPlanStore instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn get_plan(&self, id: Uuid) -> AppResult<Plan> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {} FROM planejamento WHERE id = $1",
            PLAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(store_error)?
        .ok_or_else(|| AppError::NotFound("Plan".to_string()))?;

        Plan::try_from(row)
    }

    async fn set_plan_status(&self, id: Uuid, status: PlanStatus) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE planejamento SET status = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Plan".to_string()));
        }
        Ok(())
    }

    async fn insert_plan(&self, plan: Plan) -> AppResult<Plan> {
        let (sector_id, lot_id, bed_id) = plan.area.to_columns();

        let row = sqlx::query_as::<_, PlanRow>(&format!(
            r#"
            INSERT INTO planejamento (id, propriedade_id, cultivar_id, setor_id, lote_id, canteiro_id,
                                      data_inicio, data_fim_prevista, area_plantada,
                                      produtividade_esperada, status, observacoes,
                                      created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            PLAN_COLUMNS
        ))
        .bind(plan.id)
        .bind(plan.property_id)
        .bind(plan.cultivar_id)
        .bind(sector_id)
        .bind(lot_id)
        .bind(bed_id)
        .bind(plan.start_date)
        .bind(plan.expected_end_date)
        .bind(plan.planted_area_ha)
        .bind(plan.expected_yield_per_ha)
        .bind(plan.status.as_str())
        .bind(&plan.notes)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(store_error)?;

        Plan::try_from(row)
    }

    async fn list_plans(&self, property_id: Uuid) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {} FROM planejamento WHERE propriedade_id = $1 ORDER BY data_inicio DESC, id",
            PLAN_COLUMNS
        ))
        .bind(property_id)
        .fetch_all(&self.db)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(Plan::try_from).collect()
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

impl PgHarvestLedger {
    /// Create a new PgHarvestLedger instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HarvestLedger for PgHarvestLedger {
    async fn list_harvests_for_plan(&self, plan_id: Uuid) -> AppResult<Vec<HarvestRecord>> {
        let rows = sqlx::query_as::<_, HarvestRow>(&format!(
            "SELECT {} FROM colheita WHERE planejamento_id = $1 ORDER BY created_at, id",
            HARVEST_COLUMNS
        ))
        .bind(plan_id)
        .fetch_all(&self.db)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(HarvestRecord::try_from).collect()
    }

    async fn append_harvest(&self, record: HarvestRecord) -> AppResult<HarvestRecord> {
        let (sector_id, lot_id, bed_id) = match record.area {
            Some(area) => area.to_columns(),
            None => (None, None, None),
        };

        let row = sqlx::query_as::<_, HarvestRow>(&format!(
            r#"
            INSERT INTO colheita (id, planejamento_id, setor_id, lote_id, canteiro_id,
                                  data_colheita, quantidade_colhida, unidade_medida, destino,
                                  observacoes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            HARVEST_COLUMNS
        ))
        .bind(record.id)
        .bind(record.plan_id)
        .bind(sector_id)
        .bind(lot_id)
        .bind(bed_id)
        .bind(record.harvest_date)
        .bind(record.quantity)
        .bind(record.unit.as_str())
        .bind(record.destination.as_str())
        .bind(&record.notes)
        .bind(record.created_at)
        .fetch_one(&self.db)
        .await
        .map_err(store_error)?;

        HarvestRecord::try_from(row)
    }
}
