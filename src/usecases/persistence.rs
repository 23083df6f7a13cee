//! Persistence synchronizer: mirrors registry mutations into the SchoolStore.
//!
//! - One check-then-act upsert routine for every keyed table (students, teachers,
//!   courses, marks)
//! - Plain inserts/deletes for the enrollment and teaching-assignment relations
//! - Hydration of students/teachers with their relations at load time
//! - Writes that fail are kept in an ordered queue and replayed later; the
//!   in-memory state is never rolled back

use crate::domain::{Course, DomainError, Person, Student, Subject, Teacher};
use crate::ports::{Column, CourseRow, SchoolStore, SqlValue, Table};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A record with a natural identity that can be upserted.
pub trait Upsertable {
    const TABLE: Table;

    /// Identity columns (the WHERE clause of the existence check and the update).
    fn identity(&self) -> Vec<Column>;

    /// Every non-identity column.
    fn fields(&self) -> Vec<Column>;
}

impl Upsertable for Student {
    const TABLE: Table = Table::Students;

    fn identity(&self) -> Vec<Column> {
        vec![("roll_number", self.roll_number.into())]
    }

    fn fields(&self) -> Vec<Column> {
        vec![
            ("name", self.person.name.as_str().into()),
            ("age", self.person.age.into()),
            ("email", self.person.email.as_str().into()),
            ("phone", self.person.phone.as_str().into()),
        ]
    }
}

impl Upsertable for Teacher {
    const TABLE: Table = Table::Teachers;

    fn identity(&self) -> Vec<Column> {
        vec![("name", self.person.name.as_str().into())]
    }

    fn fields(&self) -> Vec<Column> {
        vec![
            ("age", self.person.age.into()),
            ("specialization", self.specialization.display_name().into()),
            ("email", self.person.email.as_str().into()),
            ("phone", self.person.phone.as_str().into()),
            ("salary", self.salary.into()),
        ]
    }
}

impl Upsertable for Course {
    const TABLE: Table = Table::Courses;

    fn identity(&self) -> Vec<Column> {
        vec![("course_code", self.course_code.as_str().into())]
    }

    fn fields(&self) -> Vec<Column> {
        vec![
            ("subject", self.subject.display_name().into()),
            ("credits", self.credits.into()),
            ("fee", self.fee.into()),
        ]
    }
}

/// One row of the `marks` table. Identity is `(student_roll, subject)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkRecord {
    pub roll_number: i64,
    pub subject: Subject,
    pub marks: f64,
}

impl Upsertable for MarkRecord {
    const TABLE: Table = Table::Marks;

    fn identity(&self) -> Vec<Column> {
        vec![
            ("student_roll", self.roll_number.into()),
            ("subject", self.subject.display_name().into()),
        ]
    }

    fn fields(&self) -> Vec<Column> {
        vec![("marks", self.marks.into())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A single storage write, self-contained so it can be queued and replayed.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Upsert {
        table: Table,
        identity: Vec<Column>,
        fields: Vec<Column>,
    },
    Insert {
        table: Table,
        columns: Vec<Column>,
    },
    Delete {
        table: Table,
        key: Vec<Column>,
    },
}

impl WriteOp {
    pub fn upsert<R: Upsertable>(record: &R) -> Self {
        WriteOp::Upsert {
            table: R::TABLE,
            identity: record.identity(),
            fields: record.fields(),
        }
    }

    pub fn enroll(roll_number: i64, course_code: &str) -> Self {
        WriteOp::Insert {
            table: Table::Enrollments,
            columns: enrollment_key(roll_number, course_code),
        }
    }

    pub fn withdraw(roll_number: i64, course_code: &str) -> Self {
        WriteOp::Delete {
            table: Table::Enrollments,
            key: enrollment_key(roll_number, course_code),
        }
    }

    pub fn assign(teacher_name: &str, course_code: &str) -> Self {
        WriteOp::Insert {
            table: Table::TeachingAssignments,
            columns: vec![
                ("teacher_name", teacher_name.into()),
                ("course_code", course_code.into()),
            ],
        }
    }

    /// Student removal, dependents before the parent row.
    pub fn remove_student(roll_number: i64) -> Vec<Self> {
        vec![
            WriteOp::Delete {
                table: Table::Enrollments,
                key: vec![("student_roll", roll_number.into())],
            },
            WriteOp::Delete {
                table: Table::Marks,
                key: vec![("student_roll", roll_number.into())],
            },
            WriteOp::Delete {
                table: Table::Students,
                key: vec![("roll_number", roll_number.into())],
            },
        ]
    }

    pub fn table(&self) -> Table {
        match self {
            WriteOp::Upsert { table, .. }
            | WriteOp::Insert { table, .. }
            | WriteOp::Delete { table, .. } => *table,
        }
    }
}

fn enrollment_key(roll_number: i64, course_code: &str) -> Vec<Column> {
    vec![
        ("student_roll", SqlValue::Integer(roll_number)),
        ("course_code", course_code.into()),
    ]
}

/// Result of a registry mutation as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do (duplicate add, repeated enrollment, ...).
    Unchanged,
    /// Applied in memory and written to storage.
    Persisted,
    /// Applied in memory; the storage write is queued for retry.
    Deferred,
    /// Applied in memory; storage refused at least one write permanently and
    /// it was dropped. Later writes went through.
    Rejected,
}

/// Counts from a bulk load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub students: usize,
    pub teachers: usize,
    pub courses: usize,
    /// Rows dropped because of unknown subjects or constraint violations.
    pub skipped: usize,
}

pub struct PersistenceSync {
    store: Arc<dyn SchoolStore>,
    pending: VecDeque<WriteOp>,
}

impl PersistenceSync {
    pub fn new(store: Arc<dyn SchoolStore>) -> Self {
        Self {
            store,
            pending: VecDeque::new(),
        }
    }

    /// Writes waiting for storage to come back.
    pub fn pending(&self) -> impl Iterator<Item = &WriteOp> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Existence check by identity, then update or insert.
    ///
    /// Not atomic: a concurrent writer could insert between the check and the write.
    pub async fn upsert<R: Upsertable + Sync>(&self, record: &R) -> Result<UpsertOutcome, DomainError> {
        self.upsert_row(R::TABLE, &record.identity(), &record.fields())
            .await
    }

    async fn upsert_row(
        &self,
        table: Table,
        identity: &[Column],
        fields: &[Column],
    ) -> Result<UpsertOutcome, DomainError> {
        if self.store.count(table, identity).await? > 0 {
            self.store.update(table, identity, fields).await?;
            Ok(UpsertOutcome::Updated)
        } else {
            let columns: Vec<Column> = identity.iter().chain(fields).cloned().collect();
            self.store.insert(table, &columns).await?;
            Ok(UpsertOutcome::Inserted)
        }
    }

    pub async fn execute(&self, op: &WriteOp) -> Result<(), DomainError> {
        match op {
            WriteOp::Upsert {
                table,
                identity,
                fields,
            } => {
                let outcome = self.upsert_row(*table, identity, fields).await?;
                debug!(table = table.name(), ?outcome, "upsert");
            }
            WriteOp::Insert { table, columns } => match self.store.insert(*table, columns).await {
                Ok(()) => {}
                // The pair is already stored, which is the state the insert asked for.
                Err(DomainError::Constraint(reason)) if table.is_link() => {
                    debug!(table = table.name(), %reason, "link already stored");
                }
                Err(e) => return Err(e),
            },
            WriteOp::Delete { table, key } => {
                let removed = self.store.delete(*table, key).await?;
                debug!(table = table.name(), removed, "delete");
            }
        }
        Ok(())
    }

    /// Queue `ops` behind any pending writes and flush.
    ///
    /// Order is preserved: a new write never overtakes a queued one.
    pub async fn submit(&mut self, ops: impl IntoIterator<Item = WriteOp>) -> Outcome {
        self.pending.extend(ops);
        self.flush().await
    }

    /// Replay queued writes in order.
    ///
    /// A retriable failure stops the replay and leaves the rest queued. A write
    /// storage refuses outright is logged and dropped so it cannot block the queue.
    pub async fn flush(&mut self) -> Outcome {
        let mut rejected = 0usize;
        while let Some(op) = self.pending.front() {
            match self.execute(op).await {
                Ok(()) => {}
                Err(e) if e.is_retriable() => {
                    error!(
                        table = op.table().name(),
                        pending = self.pending.len(),
                        error = %e,
                        "storage write failed; keeping in-memory change and queueing for retry"
                    );
                    return Outcome::Deferred;
                }
                Err(e) => {
                    error!(
                        table = op.table().name(),
                        error = %e,
                        "storage refused write; dropping it"
                    );
                    rejected += 1;
                }
            }
            self.pending.pop_front();
        }
        if rejected > 0 {
            Outcome::Rejected
        } else {
            Outcome::Persisted
        }
    }

    fn course_from_row(row: CourseRow) -> Option<Course> {
        match Subject::lookup(&row.subject) {
            Ok(subject) => Some(Course::new(row.course_code, subject, row.credits, row.fee)),
            Err(e) => {
                warn!(course_code = %row.course_code, error = %e, "skipping course row");
                None
            }
        }
    }

    pub async fn load_courses(&self, stats: &mut LoadStats) -> Result<Vec<Course>, DomainError> {
        let rows = self.store.load_courses().await?;
        let total = rows.len();
        let courses: Vec<Course> = rows.into_iter().filter_map(Self::course_from_row).collect();
        stats.skipped += total - courses.len();
        stats.courses = courses.len();
        Ok(courses)
    }

    /// Students with their enrolled courses and marks.
    pub async fn load_students(&self, stats: &mut LoadStats) -> Result<Vec<Student>, DomainError> {
        let rows = self.store.load_students().await?;
        let mut students = Vec::with_capacity(rows.len());
        for row in rows {
            let mut student = Student::new(
                row.roll_number,
                Person::new(row.name, row.age, row.email, row.phone),
            );
            for course_row in self.store.load_enrolled_courses(row.roll_number).await? {
                match Self::course_from_row(course_row) {
                    Some(course) => {
                        student.enroll(course);
                    }
                    None => stats.skipped += 1,
                }
            }
            for mark in self.store.load_marks(row.roll_number).await? {
                match Subject::lookup(&mark.subject) {
                    Ok(subject) => {
                        student.record_mark(subject, mark.marks);
                    }
                    Err(e) => {
                        warn!(roll_number = row.roll_number, error = %e, "skipping mark row");
                        stats.skipped += 1;
                    }
                }
            }
            students.push(student);
        }
        stats.students = students.len();
        Ok(students)
    }

    /// Teachers with their assigned courses. Stored assignments that break the
    /// specialization rule are dropped, not loaded.
    pub async fn load_teachers(&self, stats: &mut LoadStats) -> Result<Vec<Teacher>, DomainError> {
        let rows = self.store.load_teachers().await?;
        let mut teachers = Vec::with_capacity(rows.len());
        for row in rows {
            let specialization = match Subject::lookup(&row.specialization) {
                Ok(s) => s,
                Err(e) => {
                    warn!(teacher = %row.name, error = %e, "skipping teacher row");
                    stats.skipped += 1;
                    continue;
                }
            };
            let mut teacher = Teacher::new(
                Person::new(row.name, row.age, row.email, row.phone),
                specialization,
                row.salary,
            );
            for course_row in self.store.load_assigned_courses(teacher.name()).await? {
                let Some(course) = Self::course_from_row(course_row) else {
                    stats.skipped += 1;
                    continue;
                };
                if let Err(e) = teacher.assign(course) {
                    warn!(error = %e, "skipping stored teaching assignment");
                    stats.skipped += 1;
                }
            }
            teachers.push(teacher);
        }
        stats.teachers = teachers.len();
        info!(teachers = teachers.len(), "teachers hydrated");
        Ok(teachers)
    }
}
