//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::DomainError;

/// Tables of the storage contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Students,
    Teachers,
    Courses,
    Enrollments,
    Marks,
    TeachingAssignments,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Students => "students",
            Table::Teachers => "teachers",
            Table::Courses => "courses",
            Table::Enrollments => "enrollments",
            Table::Marks => "marks",
            Table::TeachingAssignments => "teaching_assignments",
        }
    }

    /// Pure link tables: a row is nothing but its unique pair.
    pub fn is_link(self) -> bool {
        matches!(self, Table::Enrollments | Table::TeachingAssignments)
    }

    /// Columns forming the table's primary key or unique pair.
    pub fn unique_columns(self) -> &'static [&'static str] {
        match self {
            Table::Students => &["roll_number"],
            Table::Teachers => &["name"],
            Table::Courses => &["course_code"],
            Table::Enrollments => &["student_roll", "course_code"],
            Table::Marks => &["student_roll", "subject"],
            Table::TeachingAssignments => &["teacher_name", "course_code"],
        }
    }
}

/// Storage-neutral cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// `(column name, value)`. Column names are compile-time constants, never user input.
pub type Column = (&'static str, SqlValue);

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRow {
    pub roll_number: i64,
    pub name: String,
    pub age: i64,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeacherRow {
    pub name: String,
    pub age: i64,
    /// Subject display name.
    pub specialization: String,
    pub email: String,
    pub phone: String,
    pub salary: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseRow {
    pub course_code: String,
    /// Subject display name.
    pub subject: String,
    pub credits: i64,
    pub fee: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkRow {
    pub subject: String,
    pub marks: f64,
}

/// Storage port for academic records.
///
/// Row primitives are keyed by explicit column lists so one upsert routine serves
/// every table. Each call is independent: no transaction spans two calls.
#[async_trait::async_trait]
pub trait SchoolStore: Send + Sync {
    /// Number of rows in `table` matching every `key` column.
    async fn count(&self, table: Table, key: &[Column]) -> Result<u64, DomainError>;

    async fn insert(&self, table: Table, columns: &[Column]) -> Result<(), DomainError>;

    /// Set `fields` on rows matching `key`. Returns rows affected.
    async fn update(
        &self,
        table: Table,
        key: &[Column],
        fields: &[Column],
    ) -> Result<u64, DomainError>;

    /// Delete rows matching `key`. An empty key is rejected. Returns rows affected.
    async fn delete(&self, table: Table, key: &[Column]) -> Result<u64, DomainError>;

    async fn load_students(&self) -> Result<Vec<StudentRow>, DomainError>;

    async fn load_teachers(&self) -> Result<Vec<TeacherRow>, DomainError>;

    async fn load_courses(&self) -> Result<Vec<CourseRow>, DomainError>;

    /// Courses joined through `enrollments` for one student, in enrollment order.
    async fn load_enrolled_courses(&self, roll_number: i64) -> Result<Vec<CourseRow>, DomainError>;

    /// Courses joined through `teaching_assignments` for one teacher, in assignment order.
    async fn load_assigned_courses(&self, teacher_name: &str)
    -> Result<Vec<CourseRow>, DomainError>;

    async fn load_marks(&self, roll_number: i64) -> Result<Vec<MarkRow>, DomainError>;
}
