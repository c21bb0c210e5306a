use std::fmt;
use std::sync::OnceLock;

use bitflags::bitflags;
use regex::Regex;

use crate::error::{KitError, KitResult};
use crate::text::ensure_quoted;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeTraits: u8 {
        /// Written as `TYPE(length)`.
        const SIZED = 1 << 0;
        /// Written as `TYPE(length,precision)`.
        const SCALED = 1 << 1;
        /// Accepts CHARACTER SET; literal defaults are quoted.
        const CHARACTER = 1 << 2;
        /// TEXT family: MySQL rejects a DEFAULT on these.
        const LONG_TEXT = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Char,
    Varchar,
    Decimal,
    Numeric,
    Int,
    Date,
    Time,
    Timestamp,
    Text,
    MediumText,
    LongText,
    Other(String),
}

impl DataType {
    /// `name` is expected upper-case; anything unrecognised is kept as [`DataType::Other`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "CHAR" => DataType::Char,
            "VARCHAR" => DataType::Varchar,
            "DECIMAL" => DataType::Decimal,
            "NUMERIC" => DataType::Numeric,
            "INT" => DataType::Int,
            "DATE" => DataType::Date,
            "TIME" => DataType::Time,
            "TIMESTAMP" => DataType::Timestamp,
            "TEXT" => DataType::Text,
            "MEDIUMTEXT" => DataType::MediumText,
            "LONGTEXT" => DataType::LongText,
            other => DataType::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DataType::Char => "CHAR",
            DataType::Varchar => "VARCHAR",
            DataType::Decimal => "DECIMAL",
            DataType::Numeric => "NUMERIC",
            DataType::Int => "INT",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Text => "TEXT",
            DataType::MediumText => "MEDIUMTEXT",
            DataType::LongText => "LONGTEXT",
            DataType::Other(name) => name,
        }
    }

    pub fn traits(&self) -> TypeTraits {
        match self {
            DataType::Char | DataType::Varchar => TypeTraits::SIZED | TypeTraits::CHARACTER,
            DataType::Decimal | DataType::Numeric => TypeTraits::SCALED,
            DataType::Text | DataType::MediumText | DataType::LongText => {
                TypeTraits::CHARACTER | TypeTraits::LONG_TEXT
            }
            _ => TypeTraits::empty(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn definition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Z]+)(?:\(\s*(\d+)\s*(?:,\s*(\d+))?\s*\))?")
            .expect("valid data definition regex")
    })
}

/// A column's SQL type: `VARCHAR(25)`, `DECIMAL(7,2)`, `TIMESTAMP`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    data_type: DataType,
    length: Option<u32>,
    precision: Option<u32>,
}

impl ColumnType {
    /// Validates the length/precision rules of `data_type`. Length and
    /// precision are dropped for types that do not take them.
    pub fn new(
        data_type: DataType,
        length: Option<u32>,
        precision: Option<u32>,
    ) -> KitResult<Self> {
        let (column_type, err) = Self::checked(data_type, length, precision);
        match err {
            Some(err) => Err(err),
            None => Ok(column_type),
        }
    }

    pub fn plain(data_type: DataType) -> Self {
        Self {
            data_type,
            length: None,
            precision: None,
        }
    }

    pub fn varchar(length: u32) -> Self {
        Self {
            data_type: DataType::Varchar,
            length: Some(length),
            precision: None,
        }
    }

    pub fn decimal(length: u32, precision: u32) -> Self {
        Self {
            data_type: DataType::Decimal,
            length: Some(length),
            precision: Some(precision),
        }
    }

    pub fn parse(text: &str) -> KitResult<Self> {
        match Self::parse_partial(text) {
            (column_type, None) => Ok(column_type),
            (_, Some(err)) => Err(err),
        }
    }

    /// Best-effort parse: always yields a descriptor, plus the validation
    /// error if the definition is incomplete.
    pub fn parse_partial(text: &str) -> (Self, Option<KitError>) {
        let upper = text.trim().to_uppercase();
        let Some(caps) = definition_regex().captures(&upper) else {
            return (
                Self::plain(DataType::Other(upper.clone())),
                Some(KitError::Validation(format!(
                    "unrecognized data definition: '{}'",
                    text.trim()
                ))),
            );
        };

        let data_type = DataType::from_name(&caps[1]);
        let length = caps.get(2).and_then(|m| m.as_str().parse().ok());
        let precision = caps.get(3).and_then(|m| m.as_str().parse().ok());
        Self::checked(data_type, length, precision)
    }

    fn checked(
        data_type: DataType,
        length: Option<u32>,
        precision: Option<u32>,
    ) -> (Self, Option<KitError>) {
        let traits = data_type.traits();
        let (length, precision) = if traits.contains(TypeTraits::SCALED) {
            (length, Some(precision.unwrap_or(0)))
        } else if traits.contains(TypeTraits::SIZED) {
            (length, None)
        } else {
            (None, None)
        };
        let err = (traits.intersects(TypeTraits::SIZED | TypeTraits::SCALED) && length.is_none())
            .then(|| {
                KitError::Validation(format!("data definition length missing: {data_type}"))
            });
        (
            Self {
                data_type,
                length,
                precision,
            },
            err,
        )
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn length(&self) -> Option<u32> {
        self.length
    }

    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    pub fn traits(&self) -> TypeTraits {
        self.data_type.traits()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let traits = self.traits();
        match (self.length, self.precision) {
            (Some(len), Some(prec)) if traits.contains(TypeTraits::SCALED) => {
                write!(f, "{}({len},{prec})", self.data_type)
            }
            (Some(len), _) if traits.contains(TypeTraits::SIZED) => {
                write!(f, "{}({len})", self.data_type)
            }
            _ => write!(f, "{}", self.data_type),
        }
    }
}

/// Loosely typed column options, resolved by [`ColumnSpec::from_options`].
#[derive(Debug, Clone, Default)]
pub struct ColumnOptions {
    /// Bare type name, `char` when absent.
    pub data_type: Option<String>,
    /// Full definition text such as `varchar(50)`; wins over the other type fields.
    pub definition: Option<String>,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub not_null: bool,
    /// Catalog-style nullability; overrides `not_null` when set.
    pub nullable: Option<bool>,
    pub default: Option<String>,
    pub character_set: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
    /// SQL text, used verbatim apart from quoting for character types.
    pub default: Option<String>,
    pub character_set: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
            default: None,
            character_set: None,
        }
    }

    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn character_set(mut self, charset: impl Into<String>) -> Self {
        self.character_set = Some(charset.into());
        self
    }

    pub fn from_options(name: impl Into<String>, options: &ColumnOptions) -> KitResult<Self> {
        let definition = options
            .definition
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let column_type = match definition {
            Some(text) => ColumnType::parse(text)?,
            None => {
                let name = options
                    .data_type
                    .as_deref()
                    .unwrap_or("char")
                    .trim()
                    .to_uppercase();
                ColumnType::new(
                    DataType::from_name(&name),
                    Some(options.length.unwrap_or(10)),
                    Some(options.precision.unwrap_or(0)),
                )?
            }
        };
        let not_null = match options.nullable {
            Some(nullable) => !nullable,
            None => options.not_null,
        };
        Ok(Self {
            name: name.into(),
            column_type,
            not_null,
            default: options.default.clone().filter(|d| !d.is_empty()),
            character_set: options.character_set.clone().filter(|c| !c.is_empty()),
        })
    }

    fn quoted_default(&self) -> Option<String> {
        let default = self.default.as_deref()?;
        if self.column_type.traits().contains(TypeTraits::CHARACTER) {
            Some(ensure_quoted(default, '\''))
        } else {
            Some(default.to_string())
        }
    }

    fn charset(&self) -> Option<&str> {
        self.character_set
            .as_deref()
            .filter(|_| self.column_type.traits().contains(TypeTraits::CHARACTER))
    }

    /// `name TYPE [NOT NULL] [DEFAULT v] [CHARACTER SET s]`, as used by ADD COLUMN.
    pub(crate) fn add_fragment(&self) -> String {
        let mut out = format!("{} {}", self.name, self.column_type);
        if self.not_null {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = self.quoted_default() {
            out.push_str(&format!(" DEFAULT {default}"));
        }
        if let Some(charset) = self.charset() {
            out.push_str(&format!(" CHARACTER SET {charset}"));
        }
        out
    }

    /// `name TYPE [CHARACTER SET s] [NOT NULL] [DEFAULT v]`, as used by CHANGE.
    /// The TEXT family never gets a DEFAULT.
    pub(crate) fn change_fragment(&self) -> String {
        let mut out = format!("{} {}", self.name, self.column_type);
        if let Some(charset) = self.charset() {
            out.push_str(&format!(" CHARACTER SET {charset}"));
        }
        if self.not_null {
            out.push_str(" NOT NULL");
        }
        if !self.column_type.traits().contains(TypeTraits::LONG_TEXT) {
            if let Some(default) = self.quoted_default() {
                out.push_str(&format!(" DEFAULT {default}"));
            }
        }
        out
    }
}
