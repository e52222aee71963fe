use super::{DbType, TypeMapper, normalize_type_name};
use crate::error::{OrmError, OrmResult};

const DIALECT: &str = "PostgreSQL";

/// PostgreSQL column types.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresTypeMapper;

impl TypeMapper for PostgresTypeMapper {
    fn column_type(
        &self,
        db_type: DbType,
        length: Option<u32>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> OrmResult<String> {
        let sql = match db_type {
            DbType::String => match length {
                Some(l) => format!("varchar({l})"),
                None => "text".to_string(),
            },
            DbType::FixedString => format!("character({})", length.unwrap_or(1)),
            DbType::Text => "text".to_string(),
            DbType::Boolean => "boolean".to_string(),
            DbType::Int16 => "smallint".to_string(),
            DbType::Int32 => "integer".to_string(),
            DbType::Int64 => "bigint".to_string(),
            DbType::Float32 => "real".to_string(),
            DbType::Float64 => "double precision".to_string(),
            DbType::Currency => "money".to_string(),
            DbType::Decimal | DbType::Numeric => {
                format!("numeric({},{})", precision.unwrap_or(18), scale.unwrap_or(0))
            }
            DbType::Date => "date".to_string(),
            DbType::Time => "time".to_string(),
            DbType::DateTime => "timestamp".to_string(),
            DbType::DateTimeOffset => "timestamp with time zone".to_string(),
            DbType::Guid => "uuid".to_string(),
            DbType::Binary => "bytea".to_string(),
            DbType::Xml => "xml".to_string(),
            DbType::Object => return Err(OrmError::type_not_supported(db_type, DIALECT)),
        };
        Ok(sql)
    }

    fn auto_increment_type(&self, db_type: DbType) -> OrmResult<String> {
        match db_type {
            DbType::Int16 => Ok("smallserial".to_string()),
            DbType::Int32 => Ok("serial".to_string()),
            DbType::Int64 => Ok("bigserial".to_string()),
            other => Err(OrmError::type_not_supported(
                format!("auto-increment {other}"),
                DIALECT,
            )),
        }
    }

    fn map_data_type(&self, data_type: &str) -> DbType {
        match normalize_type_name(data_type).as_str() {
            "character" | "char" | "bpchar" => DbType::FixedString,
            "character varying" | "varchar" => DbType::String,
            "text" | "name" => DbType::Text,
            "boolean" | "bool" | "bit" => DbType::Boolean,
            "uuid" => DbType::Guid,
            "smallint" | "int2" => DbType::Int16,
            "integer" | "int4" => DbType::Int32,
            "bigint" | "int8" => DbType::Int64,
            "real" | "float4" => DbType::Float32,
            "double precision" | "float8" => DbType::Float64,
            "numeric" | "decimal" => DbType::Decimal,
            "money" => DbType::Currency,
            "bytea" => DbType::Binary,
            "xml" => DbType::Xml,
            "time" | "time without time zone" => DbType::Time,
            "date" => DbType::Date,
            "timestamp" | "timestamp without time zone" => DbType::DateTime,
            "timestamptz" | "timestamp with time zone" => DbType::DateTimeOffset,
            _ => DbType::Object,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_with_and_without_length() {
        let m = PostgresTypeMapper;
        assert_eq!(m.column_type(DbType::String, Some(50), None, None).unwrap(), "varchar(50)");
        assert_eq!(m.column_type(DbType::String, None, None, None).unwrap(), "text");
        assert_eq!(m.column_type(DbType::FixedString, Some(3), None, None).unwrap(), "character(3)");
    }

    #[test]
    fn decimal_defaults() {
        let m = PostgresTypeMapper;
        assert_eq!(m.column_type(DbType::Decimal, None, None, None).unwrap(), "numeric(18,0)");
        assert_eq!(m.column_type(DbType::Numeric, None, Some(10), Some(2)).unwrap(), "numeric(10,2)");
    }

    #[test]
    fn object_is_not_supported() {
        let err = PostgresTypeMapper.column_type(DbType::Object, None, None, None).unwrap_err();
        assert!(matches!(err, OrmError::TypeNotSupported { ref db_type, .. } if db_type == "Object"));
    }

    #[test]
    fn serial_types() {
        let m = PostgresTypeMapper;
        assert_eq!(m.auto_increment_type(DbType::Int32).unwrap(), "serial");
        assert_eq!(m.auto_increment_type(DbType::Int64).unwrap(), "bigserial");
        assert!(m.auto_increment_type(DbType::Guid).is_err());
    }

    #[test]
    fn catalog_names() {
        let m = PostgresTypeMapper;
        assert_eq!(m.map_data_type("character varying"), DbType::String);
        assert_eq!(m.map_data_type("character"), DbType::FixedString);
        assert_eq!(m.map_data_type("timestamp with time zone"), DbType::DateTimeOffset);
        assert_eq!(m.map_data_type("jsonb"), DbType::Object);
    }
}
