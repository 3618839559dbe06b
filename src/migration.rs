//! Apply the catalog to the database: one table per resource, any missing columns, then foreign keys.
//! Every statement is idempotent, so an existing schema only gains what the catalog adds.

use crate::config::{ResolvedModel, ResolvedResource};
use crate::error::{AppError, ConfigError};
use crate::sql::quoted;
use sqlx::PgPool;

/// CREATE TABLE for one resource: SERIAL key, catalog columns, NOW() defaults.
pub fn create_table_sql(resource: &ResolvedResource) -> String {
    let mut col_defs = vec![format!("{} SERIAL PRIMARY KEY", quoted(&resource.pk_column))];
    for c in &resource.columns {
        let mut def = format!("{} {}", quoted(&c.column), c.type_.sql_type());
        if c.default_now {
            def.push_str(" DEFAULT NOW()");
        }
        col_defs.push(def);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(&resource.table),
        col_defs.join(",\n  ")
    )
}

/// ALTER TABLE ... ADD COLUMN IF NOT EXISTS for every catalog column, for tables that predate it.
pub fn add_columns_sql(resource: &ResolvedResource) -> Vec<String> {
    resource
        .columns
        .iter()
        .map(|c| {
            let mut sql = format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
                quoted(&resource.table),
                quoted(&c.column),
                c.type_.sql_type()
            );
            if c.default_now {
                sql.push_str(" DEFAULT NOW()");
            }
            sql
        })
        .collect()
}

/// ALTER TABLE ... ADD CONSTRAINT for every column with a reference.
pub fn foreign_key_sql(resource: &ResolvedResource, model: &ResolvedModel) -> Result<Vec<String>, AppError> {
    let mut out = Vec::new();
    for c in &resource.columns {
        let Some(target_id) = &c.references else { continue };
        let target = model.resource(target_id).ok_or_else(|| {
            AppError::Config(ConfigError::MissingReference {
                kind: "resource",
                id: target_id.clone(),
            })
        })?;
        let constraint = format!("fk_{}_{}", resource.table.to_lowercase(), c.column);
        out.push(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quoted(&resource.table),
            quoted(&constraint),
            quoted(&c.column),
            quoted(&target.table),
            quoted(&target.pk_column)
        ));
    }
    Ok(out)
}

/// Create every table, add columns missing from existing ones, then add foreign keys. Constraint failures (usually "already exists")
/// are logged and skipped.
pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    for r in &model.resources {
        let sql = create_table_sql(r);
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(&sql).execute(pool).await?;
        for sql in add_columns_sql(r) {
            sqlx::query(&sql).execute(pool).await?;
        }
    }
    for r in &model.resources {
        for sql in foreign_key_sql(r, model)? {
            if let Err(e) = sqlx::query(&sql).execute(pool).await {
                tracing::debug!(table = %r.table, error = %e, "foreign key skipped");
            }
        }
    }
    tracing::info!(tables = model.resources.len(), "migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{embedded_catalog, resolve};

    #[test]
    fn user_table_ddl() {
        let model = resolve(&embedded_catalog().unwrap()).unwrap();
        let sql = create_table_sql(model.resource("user").unwrap());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"User\""));
        assert!(sql.contains("\"user_id\" SERIAL PRIMARY KEY"));
        assert!(sql.contains("\"password\" TEXT"));
        assert!(sql.contains("\"createdat\" TIMESTAMP DEFAULT NOW()"));
    }

    #[test]
    fn references_become_foreign_keys() {
        let model = resolve(&embedded_catalog().unwrap()).unwrap();
        let fks = foreign_key_sql(model.resource("harvest_batch").unwrap(), &model).unwrap();
        assert_eq!(fks.len(), 3);
        assert_eq!(
            fks[0],
            "ALTER TABLE \"harvestbatch\" ADD CONSTRAINT \"fk_harvestbatch_forestid\" \
             FOREIGN KEY (\"forestid\") REFERENCES \"forest\" (\"forestid\")"
        );
    }

    #[test]
    fn existing_tables_gain_new_columns() {
        let model = resolve(&embedded_catalog().unwrap()).unwrap();
        let product = model.resource("product_type").unwrap();
        let sql = add_columns_sql(product);
        assert_eq!(sql.len(), product.columns.len());
        assert!(sql.contains(
            &"ALTER TABLE \"producttype\" ADD COLUMN IF NOT EXISTS \"unitprice\" DOUBLE PRECISION".to_string()
        ));
        let users = add_columns_sql(model.resource("user").unwrap());
        assert!(users.contains(
            &"ALTER TABLE \"User\" ADD COLUMN IF NOT EXISTS \"createdat\" TIMESTAMP DEFAULT NOW()".to_string()
        ));
    }

    #[test]
    fn every_table_has_ddl() {
        let model = resolve(&embedded_catalog().unwrap()).unwrap();
        for r in &model.resources {
            assert!(create_table_sql(r).contains("PRIMARY KEY"));
            assert!(foreign_key_sql(r, &model).is_ok());
        }
    }
}
