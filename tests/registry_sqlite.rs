use school_records::adapters::persistence::SqliteStore;
use school_records::domain::{Course, DomainError, Person, Student, Subject, Teacher};
use school_records::ports::{SchoolStore, SqlValue, Table};
use school_records::usecases::report_service::generate_report;
use school_records::usecases::{Outcome, PersistenceSync, Registry};
use std::sync::Arc;

async fn open(dir: &tempfile::TempDir) -> (Arc<SqliteStore>, Registry) {
    let store = Arc::new(
        SqliteStore::connect(dir.path(), "school.db")
            .await
            .expect("connect sqlite"),
    );
    let registry = Registry::new(PersistenceSync::new(store.clone()));
    (store, registry)
}

async fn seed(registry: &mut Registry) {
    registry
        .add_course(Course::new("MATH101", Subject::Mathematics, 4, 1000.0))
        .await;
    registry
        .add_course(Course::new("SCI200", Subject::Science, 5, 1500.0))
        .await;
    registry
        .add_student(Student::new(
            1,
            Person::new("Sam", 19, "sam@school.edu", "555-0101"),
        ))
        .await;
    registry
        .add_teacher(Teacher::new(
            Person::new("Ada", 40, "ada@school.edu", "555-0100"),
            Subject::Mathematics,
            52_000.0,
        ))
        .await;
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (_store, mut registry) = open(&dir).await;
        seed(&mut registry).await;
        registry.enroll_student(1, "MATH101").await.unwrap();
        registry.enroll_student(1, "SCI200").await.unwrap();
        registry.record_mark(1, "MATH101", 85.0).await.unwrap();
        registry.assign_teacher("Ada", "MATH101").await.unwrap();
        assert_eq!(registry.pending_writes(), 0);
    }

    let (_store, mut registry) = open(&dir).await;
    let stats = registry.load_all().await.unwrap();
    assert_eq!((stats.students, stats.teachers, stats.courses), (1, 1, 2));
    assert_eq!(stats.skipped, 0);

    let student = registry.student(1).unwrap();
    let codes: Vec<&str> = student
        .enrolled_courses()
        .iter()
        .map(|c| c.course_code.as_str())
        .collect();
    assert_eq!(codes, ["MATH101", "SCI200"]);
    assert_eq!(student.mark_for(Subject::Mathematics), Some(85.0));
    assert!(registry.teacher("Ada").unwrap().is_assigned_to("MATH101"));

    let report = generate_report(student);
    assert_eq!(report.total_fees, 2500.0);
    // MATH101: A (3.7 x 4), SCI200: no mark -> F (0 x 5)
    assert!((report.gpa - 14.8 / 9.0).abs() < 1e-12);
}

#[tokio::test]
async fn save_all_updates_rows_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut registry) = open(&dir).await;
    seed(&mut registry).await;

    assert_eq!(registry.save_all().await, Outcome::Persisted);
    assert_eq!(registry.save_all().await, Outcome::Persisted);

    assert_eq!(store.count(Table::Students, &[]).await.unwrap(), 1);
    assert_eq!(store.count(Table::Teachers, &[]).await.unwrap(), 1);
    assert_eq!(store.count(Table::Courses, &[]).await.unwrap(), 2);
}

#[tokio::test]
async fn remove_student_clears_dependent_rows() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut registry) = open(&dir).await;
    seed(&mut registry).await;
    registry.enroll_student(1, "SCI200").await.unwrap();
    registry.record_mark(1, "SCI200", 64.0).await.unwrap();

    assert_eq!(
        registry.remove_student(1).await.unwrap(),
        Outcome::Persisted
    );

    let roll = [("student_roll", SqlValue::Integer(1))];
    assert_eq!(store.count(Table::Enrollments, &roll).await.unwrap(), 0);
    assert_eq!(store.count(Table::Marks, &roll).await.unwrap(), 0);
    assert!(store.load_students().await.unwrap().is_empty());
}

#[tokio::test]
async fn mismatched_assignment_leaves_storage_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut registry) = open(&dir).await;
    seed(&mut registry).await;

    let err = registry.assign_teacher("Ada", "SCI200").await.unwrap_err();
    assert!(matches!(err, DomainError::SpecializationMismatch { .. }));
    assert_eq!(
        store.count(Table::TeachingAssignments, &[]).await.unwrap(),
        0
    );
}
