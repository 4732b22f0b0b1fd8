//! Entity descriptor types: table, fields, constraints and exposed operations.

/// Column every entity carries, assigned by the store on insert.
pub const REGISTERED_AT_COLUMN: &str = "fecha_registro";

/// Total digits of every decimal column.
pub const DECIMAL_PRECISION: u32 = 12;

/// Storage kind of a field. Drives validation, DDL and wire encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
    Boolean,
    /// Calendar date, `YYYY-MM-DD` on the wire.
    Date,
    /// Fixed-point number: `precision` total digits, `scale` of them fractional. Travels as a string.
    Decimal { precision: u32, scale: u32 },
}

impl FieldKind {
    /// PostgreSQL type used for the column and for parameter casts.
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldKind::Integer => "int4",
            FieldKind::Text => "text",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Decimal { .. } => "numeric",
        }
    }
}

/// Store-side default applied when the field is omitted on create.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnDefault {
    Bool(bool),
    Text(&'static str),
    CurrentDate,
}

impl ColumnDefault {
    pub fn sql(&self) -> String {
        match self {
            ColumnDefault::Bool(b) => if *b { "TRUE".into() } else { "FALSE".into() },
            ColumnDefault::Text(s) => format!("'{}'", s.replace('\'', "''")),
            ColumnDefault::CurrentDate => "CURRENT_DATE".into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationRule {
    /// Maximum length in characters for text fields.
    pub max_length: Option<u32>,
    /// Inclusive lower bound.
    pub minimum: Option<f64>,
    /// Exclusive lower bound.
    pub exclusive_minimum: Option<f64>,
    /// Inclusive upper bound.
    pub maximum: Option<f64>,
}

impl ValidationRule {
    pub fn is_empty(&self) -> bool {
        *self == ValidationRule::default()
    }
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub default: Option<ColumnDefault>,
    pub unique: bool,
    /// Table name of the referenced entity (foreign key to its primary key).
    pub references: Option<&'static str>,
    /// Whether the field is part of the update shape.
    pub updatable: bool,
    pub rule: ValidationRule,
}

impl FieldDef {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldDef {
            name,
            kind,
            nullable: false,
            default: None,
            unique: false,
            references: None,
            updatable: true,
            rule: ValidationRule::default(),
        }
    }

    /// Text column; `max_length` in characters, `None` for unbounded TEXT.
    pub fn text(name: &'static str, max_length: Option<u32>) -> Self {
        let mut f = Self::new(name, FieldKind::Text);
        f.rule.max_length = max_length;
        f
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn date(name: &'static str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn decimal(name: &'static str, scale: u32) -> Self {
        Self::new(
            name,
            FieldKind::Decimal {
                precision: DECIMAL_PRECISION,
                scale,
            },
        )
    }

    /// Integer foreign key to `table`'s primary key.
    pub fn foreign_key(name: &'static str, table: &'static str) -> Self {
        let mut f = Self::new(name, FieldKind::Integer);
        f.references = Some(table);
        f
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn immutable(mut self) -> Self {
        self.updatable = false;
        self
    }

    pub fn minimum(mut self, n: f64) -> Self {
        self.rule.minimum = Some(n);
        self
    }

    pub fn exclusive_minimum(mut self, n: f64) -> Self {
        self.rule.exclusive_minimum = Some(n);
        self
    }

    pub fn maximum(mut self, n: f64) -> Self {
        self.rule.maximum = Some(n);
        self
    }

    /// Required on create: not nullable and no store default.
    pub fn required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }
}

/// CRUD operations an entity may expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    List,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::List,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::List => "list",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// One entity: its table, API path segment, fields and operations.
/// The primary key is `<table>_id`; `fecha_registro` is implicit.
#[derive(Clone, Debug)]
pub struct EntityDef {
    /// Display name (e.g. "Student"), used in messages and OpenAPI schema names.
    pub name: &'static str,
    pub table: &'static str,
    pub path_segment: &'static str,
    pub fields: Vec<FieldDef>,
    pub operations: Vec<Operation>,
}

impl EntityDef {
    pub fn new(name: &'static str, table: &'static str, path_segment: &'static str, fields: Vec<FieldDef>) -> Self {
        EntityDef {
            name,
            table,
            path_segment,
            fields,
            operations: Operation::ALL.to_vec(),
        }
    }

    pub fn without(mut self, op: Operation) -> Self {
        self.operations.retain(|o| *o != op);
        self
    }

    pub fn pk_column(&self) -> String {
        pk_column_for(self.table)
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn updatable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.updatable)
    }
}

/// Primary key column name for a table.
pub fn pk_column_for(table: &str) -> String {
    format!("{}_id", table)
}
