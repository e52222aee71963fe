use super::{DbType, TypeMapper, normalize_type_name};
use crate::error::{OrmError, OrmResult};

const DIALECT: &str = "SQL Server";
const DEFAULT_LENGTH: u32 = 4000;

/// SQL Server column types.
#[derive(Debug, Clone, Copy)]
pub struct SqlServerTypeMapper {
    /// `NVARCHAR`/`NCHAR` instead of `VARCHAR`/`CHAR`.
    pub use_unicode: bool,
    /// `datetime2` instead of `datetime`.
    pub use_datetime2: bool,
}

impl Default for SqlServerTypeMapper {
    fn default() -> Self {
        Self {
            use_unicode: true,
            use_datetime2: false,
        }
    }
}

impl TypeMapper for SqlServerTypeMapper {
    fn column_type(
        &self,
        db_type: DbType,
        length: Option<u32>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> OrmResult<String> {
        let l = length.unwrap_or(DEFAULT_LENGTH);
        let sql = match db_type {
            DbType::FixedString => {
                if self.use_unicode {
                    format!("NCHAR({l})")
                } else {
                    format!("CHAR({l})")
                }
            }
            // Object columns are stored as text so null handling stays uniform.
            DbType::String | DbType::Object => {
                if self.use_unicode {
                    format!("NVARCHAR({l})")
                } else {
                    format!("VARCHAR({})", l.saturating_mul(2))
                }
            }
            DbType::Text => {
                if self.use_unicode {
                    "NVARCHAR(MAX)".to_string()
                } else {
                    "VARCHAR(MAX)".to_string()
                }
            }
            DbType::Binary => match length {
                Some(l) => format!("VARBINARY({l})"),
                None => "VARBINARY(MAX)".to_string(),
            },
            DbType::Boolean => "BIT".to_string(),
            DbType::Int16 => "smallint".to_string(),
            DbType::Int32 => "integer".to_string(),
            DbType::Int64 => "bigint".to_string(),
            DbType::Float32 => "FLOAT".to_string(),
            DbType::Float64 => "double precision".to_string(),
            DbType::Currency => "money".to_string(),
            DbType::Decimal => {
                format!("decimal({},{})", precision.unwrap_or(18), scale.unwrap_or(0))
            }
            DbType::Numeric => {
                format!("numeric({}, {})", precision.unwrap_or(18), scale.unwrap_or(0))
            }
            DbType::Date => "DATE".to_string(),
            DbType::DateTime => {
                if self.use_datetime2 {
                    "datetime2".to_string()
                } else {
                    "datetime".to_string()
                }
            }
            DbType::DateTimeOffset => "DATETIMEOFFSET".to_string(),
            DbType::Time => "TIME".to_string(),
            DbType::Guid => "UniqueIdentifier".to_string(),
            DbType::Xml => "xml".to_string(),
        };
        Ok(sql)
    }

    fn auto_increment_type(&self, db_type: DbType) -> OrmResult<String> {
        if !db_type.is_integer() {
            return Err(OrmError::type_not_supported(
                format!("auto-increment {db_type}"),
                DIALECT,
            ));
        }
        let base = self.column_type(db_type, None, None, None)?;
        Ok(format!("{base} IDENTITY(1,1)"))
    }

    fn map_data_type(&self, data_type: &str) -> DbType {
        match normalize_type_name(data_type).as_str() {
            "nvarchar" | "varchar" => DbType::String,
            "nchar" | "char" => DbType::FixedString,
            "ntext" | "text" => DbType::Text,
            "bit" => DbType::Boolean,
            "tinyint" | "smallint" => DbType::Int16,
            "int" | "integer" => DbType::Int32,
            "bigint" => DbType::Int64,
            "real" => DbType::Float32,
            "float" | "double precision" => DbType::Float64,
            "money" | "smallmoney" => DbType::Currency,
            "decimal" => DbType::Decimal,
            "numeric" => DbType::Numeric,
            "date" => DbType::Date,
            "time" => DbType::Time,
            "datetime" | "datetime2" | "smalldatetime" => DbType::DateTime,
            "datetimeoffset" => DbType::DateTimeOffset,
            "uniqueidentifier" => DbType::Guid,
            "varbinary" | "binary" | "image" => DbType::Binary,
            "xml" => DbType::Xml,
            _ => DbType::Object,
        }
    }
}
