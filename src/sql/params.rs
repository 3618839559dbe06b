//! Convert serde_json::Value to types that sqlx can bind.

use crate::config::ColumnType;
use crate::error::AppError;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value that can be bound to a PostgreSQL query. Nulls keep the column type so the
/// server sees a correctly typed parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null(ColumnType),
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
}

impl PgBindValue {
    /// Convert an already-decoded value for a column of type `ty`.
    pub fn from_json(v: &Value, ty: ColumnType) -> Result<Self, AppError> {
        Ok(match (v, ty) {
            (Value::Null, _) => PgBindValue::Null(ty),
            (Value::Bool(b), ColumnType::Boolean) => PgBindValue::Bool(*b),
            (Value::Number(n), ColumnType::Integer) => {
                PgBindValue::I64(n.as_i64().ok_or_else(AppError::invalid_body)?)
            }
            (Value::Number(n), ColumnType::Float) => {
                PgBindValue::F64(n.as_f64().ok_or_else(AppError::invalid_body)?)
            }
            (Value::String(s), ColumnType::Text | ColumnType::Date | ColumnType::Timestamp) => {
                PgBindValue::String(s.clone())
            }
            _ => return Err(AppError::invalid_body()),
        })
    }

    fn pg_type(&self) -> PgTypeInfo {
        match self {
            PgBindValue::Null(ColumnType::Integer) | PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::Null(ColumnType::Float) | PgBindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            PgBindValue::Null(ColumnType::Boolean) | PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::Null(_) | PgBindValue::String(_) => <String as Type<Postgres>>::type_info(),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null(_) => IsNull::Yes,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(self.pg_type())
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}
