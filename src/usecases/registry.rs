//! Registry: the in-memory set of students, teachers and courses.
//!
//! Every mutation is applied in memory first and then handed to the
//! PersistenceSync. Storage failures never fail the operation. Transient ones
//! surface as `Outcome::Deferred` and stay queued until `retry_pending` or
//! `save_all`; writes storage refuses outright surface as `Outcome::Rejected`.
//!
//! Single writer: operations take `&mut self`. Sharing a registry between tasks
//! needs an external mutex around every call.

use crate::domain::{Course, DomainError, Student, Teacher, input};
use crate::usecases::persistence::{LoadStats, MarkRecord, Outcome, PersistenceSync, WriteOp};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Salary disbursement for one teacher.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSlip {
    pub teacher: String,
    pub amount: f64,
}

pub struct Registry {
    students: BTreeMap<i64, Student>,
    teachers: BTreeMap<String, Teacher>,
    courses: BTreeMap<String, Course>,
    sync: PersistenceSync,
}

impl Registry {
    /// Empty registry. Call [`Registry::load_all`] to populate it from storage.
    pub fn new(sync: PersistenceSync) -> Self {
        Self {
            students: BTreeMap::new(),
            teachers: BTreeMap::new(),
            courses: BTreeMap::new(),
            sync,
        }
    }

    /// Construct and populate from storage in one step.
    pub async fn load(sync: PersistenceSync) -> Result<(Self, LoadStats), DomainError> {
        let mut registry = Self::new(sync);
        let stats = registry.load_all().await?;
        Ok((registry, stats))
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    pub fn teachers(&self) -> impl Iterator<Item = &Teacher> {
        self.teachers.values()
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    pub fn student(&self, roll_number: i64) -> Option<&Student> {
        self.students.get(&roll_number)
    }

    pub fn teacher(&self, name: &str) -> Option<&Teacher> {
        self.teachers.get(name)
    }

    pub fn course(&self, course_code: &str) -> Option<&Course> {
        self.courses.get(course_code)
    }

    pub fn pending_writes(&self) -> usize {
        self.sync.pending_len()
    }

    /// Replace the in-memory collections with what storage holds.
    pub async fn load_all(&mut self) -> Result<LoadStats, DomainError> {
        let mut stats = LoadStats::default();
        let courses = self.sync.load_courses(&mut stats).await?;
        let students = self.sync.load_students(&mut stats).await?;
        let teachers = self.sync.load_teachers(&mut stats).await?;

        self.courses = courses
            .into_iter()
            .map(|c| (c.course_code.clone(), c))
            .collect();
        self.students = students.into_iter().map(|s| (s.roll_number, s)).collect();
        self.teachers = teachers
            .into_iter()
            .map(|t| (t.name().to_string(), t))
            .collect();

        info!(
            students = stats.students,
            teachers = stats.teachers,
            courses = stats.courses,
            skipped = stats.skipped,
            "registry loaded"
        );
        Ok(stats)
    }

    /// Upsert every entity, then replay anything still queued.
    pub async fn save_all(&mut self) -> Outcome {
        let ops: Vec<WriteOp> = self
            .students
            .values()
            .map(WriteOp::upsert)
            .chain(self.teachers.values().map(WriteOp::upsert))
            .chain(self.courses.values().map(WriteOp::upsert))
            .collect();
        let count = ops.len();
        let outcome = self.sync.submit(ops).await;
        info!(entities = count, ?outcome, "save all");
        outcome
    }

    pub async fn retry_pending(&mut self) -> Outcome {
        self.sync.flush().await
    }

    pub async fn add_student(&mut self, student: Student) -> Outcome {
        if self.students.contains_key(&student.roll_number) {
            debug!(roll_number = student.roll_number, "student already registered");
            return Outcome::Unchanged;
        }
        let op = WriteOp::upsert(&student);
        info!(roll_number = student.roll_number, name = %student.name(), "adding student");
        self.students.insert(student.roll_number, student);
        self.sync.submit([op]).await
    }

    pub async fn add_teacher(&mut self, teacher: Teacher) -> Outcome {
        if self.teachers.contains_key(teacher.name()) {
            debug!(teacher = %teacher.name(), "teacher already registered");
            return Outcome::Unchanged;
        }
        let op = WriteOp::upsert(&teacher);
        info!(teacher = %teacher.name(), specialization = %teacher.specialization, "adding teacher");
        self.teachers.insert(teacher.name().to_string(), teacher);
        self.sync.submit([op]).await
    }

    pub async fn add_course(&mut self, course: Course) -> Outcome {
        if self.courses.contains_key(&course.course_code) {
            debug!(course_code = %course.course_code, "course already registered");
            return Outcome::Unchanged;
        }
        let op = WriteOp::upsert(&course);
        info!(course_code = %course.course_code, subject = %course.subject, "adding course");
        self.courses.insert(course.course_code.clone(), course);
        self.sync.submit([op]).await
    }

    /// Remove a student and cascade to their enrollment and mark rows.
    pub async fn remove_student(&mut self, roll_number: i64) -> Result<Outcome, DomainError> {
        let student = self
            .students
            .remove(&roll_number)
            .ok_or_else(|| DomainError::NotFound(format!("student with roll number {}", roll_number)))?;
        info!(roll_number, name = %student.name(), "removing student");
        Ok(self.sync.submit(WriteOp::remove_student(roll_number)).await)
    }

    fn lookup_course(&self, course_code: &str) -> Result<Course, DomainError> {
        self.courses
            .get(course_code)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("course {}", course_code)))
    }

    fn lookup_student_mut(&mut self, roll_number: i64) -> Result<&mut Student, DomainError> {
        self.students
            .get_mut(&roll_number)
            .ok_or_else(|| DomainError::NotFound(format!("student with roll number {}", roll_number)))
    }

    pub async fn enroll_student(
        &mut self,
        roll_number: i64,
        course_code: &str,
    ) -> Result<Outcome, DomainError> {
        let course = self.lookup_course(course_code)?;
        let student = self.lookup_student_mut(roll_number)?;
        if !student.enroll(course) {
            debug!(roll_number, course_code, "already enrolled");
            return Ok(Outcome::Unchanged);
        }
        info!(roll_number, course_code, "enrolled");
        Ok(self.sync.submit([WriteOp::enroll(roll_number, course_code)]).await)
    }

    pub async fn withdraw_student(
        &mut self,
        roll_number: i64,
        course_code: &str,
    ) -> Result<Outcome, DomainError> {
        let student = self.lookup_student_mut(roll_number)?;
        if student.withdraw(course_code).is_none() {
            return Ok(Outcome::Unchanged);
        }
        info!(roll_number, course_code, "withdrawn");
        Ok(self.sync.submit([WriteOp::withdraw(roll_number, course_code)]).await)
    }

    /// Record a 0-100 mark for the subject of an enrolled course. Latest write wins.
    pub async fn record_mark(
        &mut self,
        roll_number: i64,
        course_code: &str,
        marks: f64,
    ) -> Result<Outcome, DomainError> {
        let marks = input::check_marks(marks)?;
        let course = self.lookup_course(course_code)?;
        let student = self.lookup_student_mut(roll_number)?;
        if !student.is_enrolled_in(course_code) {
            return Err(DomainError::NotEnrolled {
                roll_number,
                course_code: course_code.to_string(),
            });
        }
        student.record_mark(course.subject, marks);
        info!(roll_number, subject = %course.subject, marks, "mark recorded");
        let record = MarkRecord {
            roll_number,
            subject: course.subject,
            marks,
        };
        Ok(self.sync.submit([WriteOp::upsert(&record)]).await)
    }

    /// Bind a course to a teacher whose specialization matches its subject.
    pub async fn assign_teacher(
        &mut self,
        teacher_name: &str,
        course_code: &str,
    ) -> Result<Outcome, DomainError> {
        let course = self.lookup_course(course_code)?;
        let teacher = self
            .teachers
            .get_mut(teacher_name)
            .ok_or_else(|| DomainError::NotFound(format!("teacher {}", teacher_name)))?;
        match teacher.assign(course) {
            Ok(true) => {
                info!(teacher = teacher_name, course_code, "course assigned");
                Ok(self.sync.submit([WriteOp::assign(teacher_name, course_code)]).await)
            }
            Ok(false) => Ok(Outcome::Unchanged),
            Err(e) => {
                warn!(error = %e, "assignment rejected");
                Err(e)
            }
        }
    }

    pub fn process_payment(&self, teacher_name: &str) -> Result<PaymentSlip, DomainError> {
        let teacher = self
            .teachers
            .get(teacher_name)
            .ok_or_else(|| DomainError::NotFound(format!("teacher {}", teacher_name)))?;
        info!(teacher = teacher_name, amount = teacher.salary, "processing payment");
        Ok(PaymentSlip {
            teacher: teacher.name().to_string(),
            amount: teacher.salary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::memory_store::{MemoryStore, StoreOp};
    use crate::domain::{Person, Subject};
    use crate::ports::{SchoolStore, SqlValue, Table};
    use std::sync::Arc;

    fn registry() -> (Arc<MemoryStore>, Registry) {
        let store = Arc::new(MemoryStore::new());
        let registry = Registry::new(PersistenceSync::new(store.clone()));
        (store, registry)
    }

    fn student(roll: i64) -> Student {
        Student::new(roll, Person::new("Sam", 19, "sam@school.edu", "555-0101"))
    }

    fn teacher(name: &str, specialization: Subject) -> Teacher {
        Teacher::new(Person::new(name, 40, "", ""), specialization, 50_000.0)
    }

    async fn writes(store: &MemoryStore) -> Vec<(StoreOp, Table)> {
        store
            .journal()
            .await
            .iter()
            .map(|e| (e.op, e.table))
            .collect()
    }

    #[tokio::test]
    async fn add_student_twice_writes_once() {
        let (store, mut registry) = registry();
        assert_eq!(registry.add_student(student(1)).await, Outcome::Persisted);
        assert_eq!(registry.add_student(student(1)).await, Outcome::Unchanged);

        assert_eq!(registry.students().count(), 1);
        assert_eq!(writes(&store).await, [(StoreOp::Insert, Table::Students)]);
    }

    #[tokio::test]
    async fn mismatched_assignment_is_rejected_without_writes() {
        let (store, mut registry) = registry();
        registry
            .add_teacher(teacher("Ada", Subject::Mathematics))
            .await;
        registry
            .add_course(Course::new("HIS201", Subject::History, 3, 700.0))
            .await;
        store.clear_journal().await;

        let err = registry.assign_teacher("Ada", "HIS201").await.unwrap_err();
        assert!(matches!(err, DomainError::SpecializationMismatch { .. }));
        assert!(registry.teacher("Ada").unwrap().assigned_courses().is_empty());
        assert!(writes(&store).await.is_empty());
    }

    #[tokio::test]
    async fn matching_assignment_persists_once() {
        let (store, mut registry) = registry();
        registry
            .add_teacher(teacher("Ada", Subject::Mathematics))
            .await;
        registry
            .add_course(Course::new("MATH101", Subject::Mathematics, 4, 1000.0))
            .await;
        store.clear_journal().await;

        assert_eq!(
            registry.assign_teacher("Ada", "MATH101").await.unwrap(),
            Outcome::Persisted
        );
        assert_eq!(
            registry.assign_teacher("Ada", "MATH101").await.unwrap(),
            Outcome::Unchanged
        );
        assert_eq!(
            writes(&store).await,
            [(StoreOp::Insert, Table::TeachingAssignments)]
        );
    }

    #[tokio::test]
    async fn enrollment_is_idempotent() {
        let (store, mut registry) = registry();
        registry.add_student(student(1)).await;
        registry
            .add_course(Course::new("ENG101", Subject::English, 3, 800.0))
            .await;

        assert_eq!(
            registry.enroll_student(1, "ENG101").await.unwrap(),
            Outcome::Persisted
        );
        assert_eq!(
            registry.enroll_student(1, "ENG101").await.unwrap(),
            Outcome::Unchanged
        );
        assert_eq!(store.rows(Table::Enrollments).await.len(), 1);
        assert!(matches!(
            registry.enroll_student(1, "NOPE").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_student_cascades_dependents_first() {
        let (store, mut registry) = registry();
        registry.add_student(student(1)).await;
        registry
            .add_course(Course::new("SCI200", Subject::Science, 5, 1500.0))
            .await;
        registry.enroll_student(1, "SCI200").await.unwrap();
        registry.record_mark(1, "SCI200", 91.0).await.unwrap();
        store.clear_journal().await;

        registry.remove_student(1).await.unwrap();

        assert!(registry.student(1).is_none());
        assert_eq!(
            writes(&store).await,
            [
                (StoreOp::Delete, Table::Enrollments),
                (StoreOp::Delete, Table::Marks),
                (StoreOp::Delete, Table::Students),
            ]
        );
        assert!(store.rows(Table::Enrollments).await.is_empty());
        assert!(store.rows(Table::Marks).await.is_empty());
        assert!(store.rows(Table::Students).await.is_empty());
        assert!(matches!(
            registry.remove_student(1).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn record_mark_requires_enrollment_and_valid_range() {
        let (_store, mut registry) = registry();
        registry.add_student(student(1)).await;
        registry
            .add_course(Course::new("MATH101", Subject::Mathematics, 4, 1000.0))
            .await;

        assert!(matches!(
            registry.record_mark(1, "MATH101", 80.0).await,
            Err(DomainError::NotEnrolled { .. })
        ));
        registry.enroll_student(1, "MATH101").await.unwrap();
        assert!(matches!(
            registry.record_mark(1, "MATH101", 120.0).await,
            Err(DomainError::InvalidInput { field: "marks", .. })
        ));
        registry.record_mark(1, "MATH101", 80.0).await.unwrap();
        registry.record_mark(1, "MATH101", 85.0).await.unwrap();
        assert_eq!(
            registry.student(1).unwrap().mark_for(Subject::Mathematics),
            Some(85.0)
        );
    }

    #[tokio::test]
    async fn storage_outage_keeps_memory_and_defers_writes() {
        let (store, mut registry) = registry();
        store.set_offline(true);

        assert_eq!(registry.add_student(student(7)).await, Outcome::Deferred);
        assert!(registry.student(7).is_some());
        assert_eq!(registry.pending_writes(), 1);

        store.set_offline(false);
        assert_eq!(registry.retry_pending().await, Outcome::Persisted);
        assert_eq!(registry.pending_writes(), 0);
        assert_eq!(store.load_students().await.unwrap()[0].roll_number, 7);
    }

    #[tokio::test]
    async fn load_reports_unreachable_storage() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let err = Registry::load(PersistenceSync::new(store.clone()))
            .await
            .err()
            .unwrap();
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn withdraw_deletes_enrollment_once() {
        let (store, mut registry) = registry();
        registry.add_student(student(1)).await;
        registry
            .add_course(Course::new("ENG101", Subject::English, 3, 600.0))
            .await;
        registry.enroll_student(1, "ENG101").await.unwrap();
        store.clear_journal().await;

        assert_eq!(
            registry.withdraw_student(1, "ENG101").await.unwrap(),
            Outcome::Persisted
        );
        assert_eq!(writes(&store).await, [(StoreOp::Delete, Table::Enrollments)]);
        assert!(store.rows(Table::Enrollments).await.is_empty());
        assert!(!registry.student(1).unwrap().is_enrolled_in("ENG101"));

        assert_eq!(
            registry.withdraw_student(1, "ENG101").await.unwrap(),
            Outcome::Unchanged
        );
        assert_eq!(writes(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn stored_rows_hidden_at_load_do_not_block_later_writes() {
        let (store, mut registry) = registry();
        store
            .insert(
                Table::Students,
                &[
                    ("roll_number", SqlValue::Integer(1)),
                    ("name", "Sam".into()),
                    ("age", SqlValue::Integer(19)),
                    ("email", "sam@school.edu".into()),
                    ("phone", "555-0101".into()),
                ],
            )
            .await
            .unwrap();
        // Legacy subject name: the course is skipped at load, its enrollment is not.
        store
            .insert(
                Table::Courses,
                &[
                    ("course_code", "MATH101".into()),
                    ("subject", "Maths".into()),
                    ("credits", SqlValue::Integer(4)),
                    ("fee", SqlValue::Real(1000.0)),
                ],
            )
            .await
            .unwrap();
        store
            .insert(
                Table::Enrollments,
                &[
                    ("student_roll", SqlValue::Integer(1)),
                    ("course_code", "MATH101".into()),
                ],
            )
            .await
            .unwrap();

        let stats = registry.load_all().await.unwrap();
        assert_eq!((stats.students, stats.courses), (1, 0));

        registry
            .add_course(Course::new("MATH101", Subject::Mathematics, 4, 1000.0))
            .await;
        assert_eq!(
            registry.enroll_student(1, "MATH101").await.unwrap(),
            Outcome::Persisted
        );
        assert_eq!(registry.add_student(student(2)).await, Outcome::Persisted);
        assert_eq!(registry.retry_pending().await, Outcome::Persisted);
        assert_eq!(registry.save_all().await, Outcome::Persisted);
        assert_eq!(registry.pending_writes(), 0);

        let rolls: Vec<i64> = store
            .load_students()
            .await
            .unwrap()
            .iter()
            .map(|s| s.roll_number)
            .collect();
        assert_eq!(rolls, [1, 2]);
        assert_eq!(store.rows(Table::Enrollments).await.len(), 1);
        let courses = store.load_courses().await.unwrap();
        assert_eq!(courses[0].subject, "Math");
    }

    #[tokio::test]
    async fn save_all_then_load_all_round_trips_relations() {
        let (store, mut registry) = registry();
        registry.add_student(student(1)).await;
        registry
            .add_teacher(teacher("Ada", Subject::Mathematics))
            .await;
        registry
            .add_course(Course::new("MATH101", Subject::Mathematics, 4, 1000.0))
            .await;
        registry.enroll_student(1, "MATH101").await.unwrap();
        registry.record_mark(1, "MATH101", 85.0).await.unwrap();
        registry.assign_teacher("Ada", "MATH101").await.unwrap();
        assert_eq!(registry.save_all().await, Outcome::Persisted);
        assert_eq!(store.rows(Table::Students).await.len(), 1);

        let (fresh, stats) = Registry::load(PersistenceSync::new(store.clone()))
            .await
            .unwrap();
        assert_eq!((stats.students, stats.teachers, stats.courses), (1, 1, 1));
        let s = fresh.student(1).unwrap();
        assert!(s.is_enrolled_in("MATH101"));
        assert_eq!(s.mark_for(Subject::Mathematics), Some(85.0));
        assert!(fresh.teacher("Ada").unwrap().is_assigned_to("MATH101"));
    }

    #[tokio::test]
    async fn payment_uses_teacher_salary() {
        let (_store, mut registry) = registry();
        registry
            .add_teacher(teacher("Ada", Subject::Mathematics))
            .await;
        let slip = registry.process_payment("Ada").unwrap();
        assert_eq!(slip.amount, 50_000.0);
        assert!(registry.process_payment("Nobody").is_err());
    }
}
