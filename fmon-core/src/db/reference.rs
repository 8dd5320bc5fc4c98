//! Reference data lookups

use super::SqliteStore;
use crate::logbook::model::{GearCode, Port, Species};
use crate::reporting::model::Infraction;
use crate::repositories::ReferenceDataRepository;
use crate::Result;
use async_trait::async_trait;
use sqlx::Row;

#[async_trait]
impl ReferenceDataRepository for SqliteStore {
    async fn find_species(&self, code: &str) -> Result<Option<Species>> {
        let row = sqlx::query("SELECT code, name FROM species WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Species {
                code: row.try_get("code")?,
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }

    async fn find_gear(&self, code: &str) -> Result<Option<GearCode>> {
        let row = sqlx::query("SELECT code, name, category FROM gears WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(GearCode {
                code: row.try_get("code")?,
                name: row.try_get("name")?,
                category: row.try_get("category")?,
            })),
            None => Ok(None),
        }
    }

    async fn find_port(&self, locode: &str) -> Result<Option<Port>> {
        let row = sqlx::query("SELECT locode, name, facade FROM ports WHERE locode = ?")
            .bind(locode)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Port {
                locode: row.try_get("locode")?,
                name: row.try_get("name")?,
                facade: row.try_get("facade")?,
            })),
            None => Ok(None),
        }
    }

    async fn find_infraction(&self, natinf_code: i32) -> Result<Option<Infraction>> {
        let row = sqlx::query(
            r#"
            SELECT natinf_code, regulation, infraction_category, infraction
            FROM infractions
            WHERE natinf_code = ?
            "#,
        )
        .bind(natinf_code)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Infraction {
                natinf_code: row.try_get("natinf_code")?,
                regulation: row.try_get("regulation")?,
                infraction_category: row.try_get("infraction_category")?,
                infraction: row.try_get("infraction")?,
            })),
            None => Ok(None),
        }
    }
}
