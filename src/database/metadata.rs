//! Declarative description of the tables the service owns.
//!
//! `schema.rs` is what diesel queries against; this module is what the
//! migration tool renders and compares against a live database. Both
//! describe the same two tables and are kept in step by the tests below.

use std::fmt::{self, Display};

use diesel::sql_types::{Integer, Nullable, Text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// Auto-incrementing `INTEGER`
    Serial,
    Integer,
    Varchar(Option<u32>),
    Text,
    Timestamp,
    Boolean,
}

impl Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Serial => f.write_str("SERIAL"),
            SqlType::Integer => f.write_str("INTEGER"),
            SqlType::Varchar(None) => f.write_str("VARCHAR"),
            SqlType::Varchar(Some(len)) => write!(f, "VARCHAR({})", len),
            SqlType::Text => f.write_str("TEXT"),
            SqlType::Timestamp => f.write_str("TIMESTAMP"),
            SqlType::Boolean => f.write_str("BOOLEAN"),
        }
    }
}

impl SqlType {
    /// `data_type` and `character_maximum_length` as PostgreSQL reports them
    /// in `information_schema.columns`
    pub fn catalog_type(&self) -> (&'static str, Option<i32>) {
        match self {
            SqlType::Serial | SqlType::Integer => ("integer", None),
            SqlType::Varchar(len) => ("character varying", len.map(|l| l as i32)),
            SqlType::Text => ("text", None),
            SqlType::Timestamp => ("timestamp without time zone", None),
            SqlType::Boolean => ("boolean", None),
        }
    }
}

fn describe_type(data_type: &str, max_length: Option<i32>) -> String {
    match max_length {
        Some(len) => format!("{}({})", data_type, len),
        None => data_type.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub index: bool,
    pub default: Option<&'static str>,
    pub references: Option<ForeignKey>,
}

impl Column {
    /// A nullable column with no constraints
    pub fn new(name: &'static str, sql_type: SqlType) -> Self {
        Column {
            name,
            sql_type,
            nullable: true,
            primary_key: false,
            unique: false,
            index: false,
            default: None,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn server_default(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }

    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignKey { table, column });
        self
    }

    fn definition(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(expr) = self.default {
            sql.push_str(&format!(" DEFAULT {}", expr));
        }
        // unique + index becomes a unique index instead of a constraint
        if self.unique && !self.index {
            sql.push_str(" UNIQUE");
        }
        if let Some(fk) = &self.references {
            sql.push_str(&format!(" REFERENCES {} ({})", fk.table, fk.column));
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: &'static str, columns: Vec<Column>) -> Self {
        Table { name, columns }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `CREATE TABLE` followed by one `CREATE INDEX` per indexed column
    pub fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.definition()))
            .collect::<Vec<_>>()
            .join(",\n");
        let mut sql = format!("CREATE TABLE {} (\n{}\n);\n", self.name, columns);

        for column in self.columns.iter().filter(|c| c.index) {
            let unique = if column.unique { "UNIQUE " } else { "" };
            sql.push_str(&format!(
                "CREATE {}INDEX ix_{}_{} ON {} ({});\n",
                unique, self.name, column.name, self.name, column.name
            ));
        }
        sql
    }
}

/// A column as reported by `information_schema.columns`
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(QueryableByName)]
pub struct LiveColumn {
    #[sql_type = "Text"]
    pub table_name: String,
    #[sql_type = "Text"]
    pub column_name: String,
    #[sql_type = "Text"]
    pub is_nullable: String,
    #[sql_type = "Text"]
    pub data_type: String,
    #[sql_type = "Nullable<Integer>"]
    pub character_maximum_length: Option<i32>,
}

impl LiveColumn {
    pub fn nullable(&self) -> bool {
        self.is_nullable.eq_ignore_ascii_case("YES")
    }
}

/// A difference between the declared and the live schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDrift {
    MissingTable(&'static str),
    MissingColumn { table: &'static str, column: &'static str },
    UnexpectedColumn { table: String, column: String },
    Nullability { table: &'static str, column: &'static str, declared: bool, live: bool },
    Type { table: &'static str, column: &'static str, declared: String, live: String },
}

impl Display for SchemaDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaDrift::MissingTable(table) => write!(f, "table `{}` does not exist", table),
            SchemaDrift::MissingColumn { table, column } => {
                write!(f, "column `{}.{}` does not exist", table, column)
            }
            SchemaDrift::UnexpectedColumn { table, column } => {
                write!(f, "column `{}.{}` is not declared", table, column)
            }
            SchemaDrift::Nullability { table, column, declared, live } => write!(
                f,
                "column `{}.{}` is declared {} but is {}",
                table,
                column,
                if *declared { "nullable" } else { "not null" },
                if *live { "nullable" } else { "not null" },
            ),
            SchemaDrift::Type { table, column, declared, live } => write!(
                f,
                "column `{}.{}` is declared {} but is {}",
                table, column, declared, live
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaData {
    tables: Vec<Table>,
}

impl MetaData {
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// DDL for every table, referenced tables first
    pub fn create_all_sql(&self) -> String {
        self.tables
            .iter()
            .map(Table::create_sql)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Compares live columns of the declared tables against the declaration:
    /// presence, nullability, data type and character length.
    ///
    /// Constraints and indexes (primary key, unique, foreign key) are not
    /// compared. Columns of tables that are not declared here are ignored.
    pub fn diff(&self, live: &[LiveColumn]) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for table in &self.tables {
            let live_columns: Vec<&LiveColumn> =
                live.iter().filter(|c| c.table_name == table.name).collect();
            if live_columns.is_empty() {
                drift.push(SchemaDrift::MissingTable(table.name));
                continue;
            }

            for column in &table.columns {
                match live_columns.iter().find(|c| c.column_name == column.name) {
                    None => drift.push(SchemaDrift::MissingColumn {
                        table: table.name,
                        column: column.name,
                    }),
                    Some(found) => {
                        if found.nullable() != column.nullable {
                            drift.push(SchemaDrift::Nullability {
                                table: table.name,
                                column: column.name,
                                declared: column.nullable,
                                live: found.nullable(),
                            });
                        }
                        let (data_type, max_length) = column.sql_type.catalog_type();
                        if found.data_type != data_type
                            || found.character_maximum_length != max_length
                        {
                            drift.push(SchemaDrift::Type {
                                table: table.name,
                                column: column.name,
                                declared: describe_type(data_type, max_length),
                                live: describe_type(
                                    &found.data_type,
                                    found.character_maximum_length,
                                ),
                            });
                        }
                    }
                }
            }

            for found in live_columns {
                if table.column(&found.column_name).is_none() {
                    drift.push(SchemaDrift::UnexpectedColumn {
                        table: found.table_name.clone(),
                        column: found.column_name.clone(),
                    });
                }
            }
        }

        drift
    }
}

/// The tables owned by this service
pub fn metadata() -> MetaData {
    let users = Table::new(
        "users",
        vec![
            Column::new("id", SqlType::Serial).primary_key().index(),
            Column::new("email", SqlType::Varchar(None)).unique().index(),
            Column::new("name", SqlType::Varchar(None)),
        ],
    );

    let blogs = Table::new(
        "blogs",
        vec![
            Column::new("id", SqlType::Serial).primary_key().index(),
            Column::new("title", SqlType::Varchar(Some(100))).not_null(),
            Column::new("content", SqlType::Text).not_null(),
            Column::new("author_id", SqlType::Integer).references("users", "id"),
            // created_at and is_published are NOT NULL on top of their server
            // defaults rather than nullable, see DESIGN.md
            Column::new("created_at", SqlType::Timestamp)
                .not_null()
                .server_default("(now() AT TIME ZONE 'utc')"),
            Column::new("is_published", SqlType::Boolean)
                .not_null()
                .server_default("false"),
            Column::new("slug", SqlType::Varchar(Some(100))).unique(),
        ],
    );

    MetaData {
        tables: vec![users, blogs],
    }
}
