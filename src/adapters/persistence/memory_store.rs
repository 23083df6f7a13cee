//! In-memory SchoolStore for tests and dry runs.
//!
//! Keeps rows per table, enforces the same unique keys as the SQLite schema, and
//! journals every applied write so callers can assert on order and count.
//! Can be switched offline to simulate a storage outage.

use crate::domain::DomainError;
use crate::ports::{
    Column, CourseRow, MarkRow, SchoolStore, SqlValue, StudentRow, Table, TeacherRow,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

type Row = Vec<Column>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Insert,
    Update,
    Delete,
}

/// One applied write.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub op: StoreOp,
    pub table: Table,
    pub key: Vec<Column>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Table, Vec<Row>>,
    journal: Vec<JournalEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with `DomainError::Repo`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn journal(&self) -> Vec<JournalEntry> {
        self.state.read().await.journal.clone()
    }

    pub async fn clear_journal(&self) {
        self.state.write().await.journal.clear();
    }

    pub async fn rows(&self, table: Table) -> Vec<Row> {
        self.state
            .read()
            .await
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), DomainError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DomainError::Repo("storage offline".into()));
        }
        Ok(())
    }

    fn cell<'a>(row: &'a [Column], name: &str) -> Option<&'a SqlValue> {
        row.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    fn matches(row: &[Column], key: &[Column]) -> bool {
        key.iter()
            .all(|(name, value)| Self::cell(row, name) == Some(value))
    }

    fn text(row: &[Column], name: &str) -> String {
        match Self::cell(row, name) {
            Some(SqlValue::Text(s)) => s.clone(),
            _ => String::new(),
        }
    }

    fn integer(row: &[Column], name: &str) -> i64 {
        match Self::cell(row, name) {
            Some(SqlValue::Integer(i)) => *i,
            _ => 0,
        }
    }

    fn real(row: &[Column], name: &str) -> f64 {
        match Self::cell(row, name) {
            Some(SqlValue::Real(r)) => *r,
            Some(SqlValue::Integer(i)) => *i as f64,
            _ => 0.0,
        }
    }

    fn course_row(row: &[Column]) -> CourseRow {
        CourseRow {
            course_code: Self::text(row, "course_code"),
            subject: Self::text(row, "subject"),
            credits: Self::integer(row, "credits"),
            fee: Self::real(row, "fee"),
        }
    }

    /// Courses referenced by `link` rows whose `owner_col` equals `owner`, in link order.
    async fn joined_courses(&self, link: Table, owner_col: &str, owner: SqlValue) -> Vec<CourseRow> {
        let state = self.state.read().await;
        let courses = state.tables.get(&Table::Courses);
        state
            .tables
            .get(&link)
            .into_iter()
            .flatten()
            .filter(|r| Self::cell(r, owner_col) == Some(&owner))
            .filter_map(|r| {
                let code = Self::cell(r, "course_code")?;
                courses?
                    .iter()
                    .find(|c| Self::cell(c, "course_code") == Some(code))
                    .map(|c| Self::course_row(c))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SchoolStore for MemoryStore {
    async fn count(&self, table: Table, key: &[Column]) -> Result<u64, DomainError> {
        self.check_online()?;
        let state = self.state.read().await;
        let n = state
            .tables
            .get(&table)
            .map(|rows| rows.iter().filter(|r| Self::matches(r, key)).count())
            .unwrap_or(0);
        Ok(n as u64)
    }

    async fn insert(&self, table: Table, columns: &[Column]) -> Result<(), DomainError> {
        self.check_online()?;
        let unique: Vec<Column> = table
            .unique_columns()
            .iter()
            .filter_map(|name| Self::cell(columns, name).map(|v| (*name, v.clone())))
            .collect();
        let mut state = self.state.write().await;
        let rows = state.tables.entry(table).or_default();
        if rows.iter().any(|r| Self::matches(r, &unique)) {
            return Err(DomainError::Constraint(format!(
                "UNIQUE constraint failed: {}",
                table.name()
            )));
        }
        rows.push(columns.to_vec());
        state.journal.push(JournalEntry {
            op: StoreOp::Insert,
            table,
            key: unique,
        });
        Ok(())
    }

    async fn update(
        &self,
        table: Table,
        key: &[Column],
        fields: &[Column],
    ) -> Result<u64, DomainError> {
        self.check_online()?;
        if key.is_empty() {
            return Err(DomainError::invalid("key", "refusing unkeyed update"));
        }
        let mut state = self.state.write().await;
        let mut changed = 0u64;
        for row in state.tables.entry(table).or_default().iter_mut() {
            if !Self::matches(row, key) {
                continue;
            }
            for (name, value) in fields {
                match row.iter_mut().find(|(n, _)| n == name) {
                    Some(cell) => cell.1 = value.clone(),
                    None => row.push((*name, value.clone())),
                }
            }
            changed += 1;
        }
        state.journal.push(JournalEntry {
            op: StoreOp::Update,
            table,
            key: key.to_vec(),
        });
        Ok(changed)
    }

    async fn delete(&self, table: Table, key: &[Column]) -> Result<u64, DomainError> {
        self.check_online()?;
        if key.is_empty() {
            return Err(DomainError::invalid("key", "refusing unkeyed delete"));
        }
        let mut state = self.state.write().await;
        let rows = state.tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|r| !Self::matches(r, key));
        let removed = (before - rows.len()) as u64;
        state.journal.push(JournalEntry {
            op: StoreOp::Delete,
            table,
            key: key.to_vec(),
        });
        Ok(removed)
    }

    async fn load_students(&self) -> Result<Vec<StudentRow>, DomainError> {
        self.check_online()?;
        let mut students: Vec<StudentRow> = self
            .rows(Table::Students)
            .await
            .iter()
            .map(|r| StudentRow {
                roll_number: Self::integer(r, "roll_number"),
                name: Self::text(r, "name"),
                age: Self::integer(r, "age"),
                email: Self::text(r, "email"),
                phone: Self::text(r, "phone"),
            })
            .collect();
        students.sort_by_key(|s| s.roll_number);
        Ok(students)
    }

    async fn load_teachers(&self) -> Result<Vec<TeacherRow>, DomainError> {
        self.check_online()?;
        let mut teachers: Vec<TeacherRow> = self
            .rows(Table::Teachers)
            .await
            .iter()
            .map(|r| TeacherRow {
                name: Self::text(r, "name"),
                age: Self::integer(r, "age"),
                specialization: Self::text(r, "specialization"),
                email: Self::text(r, "email"),
                phone: Self::text(r, "phone"),
                salary: Self::real(r, "salary"),
            })
            .collect();
        teachers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teachers)
    }

    async fn load_courses(&self) -> Result<Vec<CourseRow>, DomainError> {
        self.check_online()?;
        let mut courses: Vec<CourseRow> = self
            .rows(Table::Courses)
            .await
            .iter()
            .map(|r| Self::course_row(r))
            .collect();
        courses.sort_by(|a, b| a.course_code.cmp(&b.course_code));
        Ok(courses)
    }

    async fn load_enrolled_courses(&self, roll_number: i64) -> Result<Vec<CourseRow>, DomainError> {
        self.check_online()?;
        Ok(self
            .joined_courses(
                Table::Enrollments,
                "student_roll",
                SqlValue::Integer(roll_number),
            )
            .await)
    }

    async fn load_assigned_courses(
        &self,
        teacher_name: &str,
    ) -> Result<Vec<CourseRow>, DomainError> {
        self.check_online()?;
        Ok(self
            .joined_courses(
                Table::TeachingAssignments,
                "teacher_name",
                SqlValue::Text(teacher_name.to_string()),
            )
            .await)
    }

    async fn load_marks(&self, roll_number: i64) -> Result<Vec<MarkRow>, DomainError> {
        self.check_online()?;
        let key = [("student_roll", SqlValue::Integer(roll_number))];
        Ok(self
            .rows(Table::Marks)
            .await
            .iter()
            .filter(|r| Self::matches(r, &key))
            .map(|r| MarkRow {
                subject: Self::text(r, "subject"),
                marks: Self::real(r, "marks"),
            })
            .collect())
    }
}
