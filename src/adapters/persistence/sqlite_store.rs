//! SQLite-backed store via libsql. Implements SchoolStore.
//!
//! One database file in the data directory holds all six tables. Every call opens
//! its own connection; statements are parameterized, and table/column names come
//! from `Table` and compile-time constants only.

use crate::domain::DomainError;
use crate::ports::{
    Column, CourseRow, MarkRow, SchoolStore, SqlValue, StudentRow, Table, TeacherRow,
};
use libsql::{Database, Value, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const STUDENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS students (
    roll_number INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER,
    email TEXT,
    phone TEXT
)"#;

const TEACHERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS teachers (
    name TEXT PRIMARY KEY,
    age INTEGER,
    specialization TEXT,
    email TEXT,
    phone TEXT,
    salary REAL
)"#;

const COURSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    course_code TEXT PRIMARY KEY,
    subject TEXT NOT NULL,
    credits INTEGER,
    fee REAL
)"#;

const ENROLLMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS enrollments (
    student_roll INTEGER NOT NULL REFERENCES students (roll_number),
    course_code TEXT NOT NULL REFERENCES courses (course_code),
    UNIQUE (student_roll, course_code)
)"#;

const TEACHING_ASSIGNMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS teaching_assignments (
    teacher_name TEXT NOT NULL REFERENCES teachers (name),
    course_code TEXT NOT NULL REFERENCES courses (course_code),
    UNIQUE (teacher_name, course_code)
)"#;

const MARKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS marks (
    student_roll INTEGER NOT NULL REFERENCES students (roll_number),
    subject TEXT NOT NULL,
    marks REAL,
    UNIQUE (student_roll, subject)
)"#;

const SCHEMA: [&str; 6] = [
    STUDENTS_TABLE,
    TEACHERS_TABLE,
    COURSES_TABLE,
    ENROLLMENTS_TABLE,
    TEACHING_ASSIGNMENTS_TABLE,
    MARKS_TABLE,
];

/// Constraint failures are permanent; everything else may clear up on retry.
fn write_error(e: libsql::Error) -> DomainError {
    let msg = e.to_string();
    if msg.contains("constraint failed") {
        DomainError::Constraint(msg)
    } else {
        DomainError::Repo(msg)
    }
}

/// SQLite store. One database file in the given base directory.
pub struct SqliteStore {
    db: Database,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Connect to (or create) the database file and ensure the schema exists.
    /// Call this once at startup; the returned store is safe to share via Arc.
    pub async fn connect(
        base_dir: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::Repo(e.to_string()))?;
        let db_path = base.join(file_name);
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let conn = db.connect().map_err(|e| DomainError::Repo(e.to_string()))?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DomainError::Repo(format!("WAL pragma failed: {}", e)))?;
        while wal_rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
            .is_some()
        {}

        for ddl in SCHEMA {
            conn.execute(ddl, ())
                .await
                .map_err(|e| DomainError::Repo(e.to_string()))?;
        }

        info!(path = %db_path.display(), "SQLite connected, schema ready");

        Ok(Self { db, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<libsql::Connection, DomainError> {
        self.db
            .connect()
            .map_err(|e| DomainError::Repo(e.to_string()))
    }

    fn to_value(v: &SqlValue) -> Value {
        match v {
            SqlValue::Integer(i) => Value::Integer(*i),
            SqlValue::Real(r) => Value::Real(*r),
            SqlValue::Text(s) => Value::Text(s.clone()),
        }
    }

    /// `a = ?n AND b = ?n+1 ...`, numbering placeholders from `first`.
    fn predicate(columns: &[Column], first: usize, sep: &str) -> String {
        columns
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = ?{}", name, first + i))
            .collect::<Vec<_>>()
            .join(sep)
    }

    fn values<'a>(columns: impl IntoIterator<Item = &'a Column>) -> Vec<Value> {
        columns.into_iter().map(|(_, v)| Self::to_value(v)).collect()
    }

    async fn course_rows(
        &self,
        sql: &str,
        param: Value,
    ) -> Result<Vec<CourseRow>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(sql, vec![param])
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let mut courses = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            courses.push(CourseRow {
                course_code: row.get(0).map_err(|e| DomainError::Repo(e.to_string()))?,
                subject: row.get::<String>(1).unwrap_or_default(),
                credits: row.get::<i64>(2).unwrap_or_default(),
                fee: row.get::<f64>(3).unwrap_or_default(),
            });
        }
        Ok(courses)
    }
}

#[async_trait::async_trait]
impl SchoolStore for SqliteStore {
    async fn count(&self, table: Table, key: &[Column]) -> Result<u64, DomainError> {
        let sql = if key.is_empty() {
            format!("SELECT COUNT(*) FROM {}", table.name())
        } else {
            format!(
                "SELECT COUNT(*) FROM {} WHERE {}",
                table.name(),
                Self::predicate(key, 1, " AND ")
            )
        };
        let conn = self.conn()?;
        let mut rows = conn
            .query(&sql, Self::values(key))
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let count = match rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| DomainError::Repo(e.to_string()))?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, table: Table, columns: &[Column]) -> Result<(), DomainError> {
        let names: Vec<&str> = columns.iter().map(|(n, _)| *n).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            names.join(", "),
            placeholders.join(", ")
        );
        debug!(table = table.name(), "insert");
        self.conn()?
            .execute(&sql, Self::values(columns))
            .await
            .map_err(write_error)?;
        Ok(())
    }

    async fn update(
        &self,
        table: Table,
        key: &[Column],
        fields: &[Column],
    ) -> Result<u64, DomainError> {
        if key.is_empty() {
            return Err(DomainError::invalid(
                "key",
                format!("refusing unkeyed update on {}", table.name()),
            ));
        }
        if fields.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            table.name(),
            Self::predicate(fields, 1, ", "),
            Self::predicate(key, fields.len() + 1, " AND ")
        );
        debug!(table = table.name(), "update");
        self.conn()?
            .execute(&sql, Self::values(fields.iter().chain(key)))
            .await
            .map_err(write_error)
    }

    async fn delete(&self, table: Table, key: &[Column]) -> Result<u64, DomainError> {
        if key.is_empty() {
            return Err(DomainError::invalid(
                "key",
                format!("refusing unkeyed delete on {}", table.name()),
            ));
        }
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            table.name(),
            Self::predicate(key, 1, " AND ")
        );
        debug!(table = table.name(), "delete");
        self.conn()?
            .execute(&sql, Self::values(key))
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))
    }

    async fn load_students(&self) -> Result<Vec<StudentRow>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT roll_number, name, age, email, phone FROM students ORDER BY roll_number",
                (),
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let mut students = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            students.push(StudentRow {
                roll_number: row.get(0).map_err(|e| DomainError::Repo(e.to_string()))?,
                name: row.get::<String>(1).unwrap_or_default(),
                age: row.get::<i64>(2).unwrap_or_default(),
                email: row.get::<String>(3).unwrap_or_default(),
                phone: row.get::<String>(4).unwrap_or_default(),
            });
        }
        Ok(students)
    }

    async fn load_teachers(&self) -> Result<Vec<TeacherRow>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT name, age, specialization, email, phone, CAST(salary AS REAL)
                FROM teachers
                ORDER BY name
                "#,
                (),
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let mut teachers = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            teachers.push(TeacherRow {
                name: row.get(0).map_err(|e| DomainError::Repo(e.to_string()))?,
                age: row.get::<i64>(1).unwrap_or_default(),
                specialization: row.get::<String>(2).unwrap_or_default(),
                email: row.get::<String>(3).unwrap_or_default(),
                phone: row.get::<String>(4).unwrap_or_default(),
                salary: row.get::<f64>(5).unwrap_or_default(),
            });
        }
        Ok(teachers)
    }

    async fn load_courses(&self) -> Result<Vec<CourseRow>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT course_code, subject, credits, CAST(fee AS REAL)
                FROM courses
                ORDER BY course_code
                "#,
                (),
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let mut courses = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            courses.push(CourseRow {
                course_code: row.get(0).map_err(|e| DomainError::Repo(e.to_string()))?,
                subject: row.get::<String>(1).unwrap_or_default(),
                credits: row.get::<i64>(2).unwrap_or_default(),
                fee: row.get::<f64>(3).unwrap_or_default(),
            });
        }
        Ok(courses)
    }

    async fn load_enrolled_courses(&self, roll_number: i64) -> Result<Vec<CourseRow>, DomainError> {
        self.course_rows(
            r#"
            SELECT c.course_code, c.subject, c.credits, CAST(c.fee AS REAL)
            FROM enrollments e
            JOIN courses c ON e.course_code = c.course_code
            WHERE e.student_roll = ?1
            ORDER BY e.rowid
            "#,
            Value::Integer(roll_number),
        )
        .await
    }

    async fn load_assigned_courses(
        &self,
        teacher_name: &str,
    ) -> Result<Vec<CourseRow>, DomainError> {
        self.course_rows(
            r#"
            SELECT c.course_code, c.subject, c.credits, CAST(c.fee AS REAL)
            FROM teaching_assignments ta
            JOIN courses c ON ta.course_code = c.course_code
            WHERE ta.teacher_name = ?1
            ORDER BY ta.rowid
            "#,
            Value::Text(teacher_name.to_string()),
        )
        .await
    }

    async fn load_marks(&self, roll_number: i64) -> Result<Vec<MarkRow>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT subject, CAST(marks AS REAL) FROM marks WHERE student_roll = ?1",
                params![roll_number],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let mut marks = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            marks.push(MarkRow {
                subject: row.get::<String>(0).unwrap_or_default(),
                marks: row.get::<f64>(1).unwrap_or_default(),
            });
        }
        Ok(marks)
    }
}
