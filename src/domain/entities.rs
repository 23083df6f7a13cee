//! Domain entities. Pure data structures for the core business.
//!
//! No storage types here; adapters map rows into these.

use crate::domain::{DomainError, Subject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Capability shared by everything the display port can print.
pub trait Displayable {
    fn describe(&self) -> String;
}

/// Contact and identity fields shared by students and teachers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: i64,
    pub email: String,
    pub phone: String,
}

impl Person {
    pub fn new(
        name: impl Into<String>,
        age: i64,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            age,
            email: email.into(),
            phone: phone.into(),
        }
    }
}

/// A course offering. Identity is `course_code`; immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_code: String,
    pub subject: Subject,
    pub credits: i64,
    pub fee: f64,
}

impl Course {
    pub fn new(course_code: impl Into<String>, subject: Subject, credits: i64, fee: f64) -> Self {
        Self {
            course_code: course_code.into(),
            subject,
            credits,
            fee,
        }
    }
}

impl Displayable for Course {
    fn describe(&self) -> String {
        format!(
            "Course Code: {}\nSubject: {}\nCredits: {}\nFee: {:.2}",
            self.course_code, self.subject, self.credits, self.fee
        )
    }
}

/// A student. Identity is `roll_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub roll_number: i64,
    pub person: Person,
    enrolled_courses: Vec<Course>,
    subject_marks: BTreeMap<Subject, f64>,
}

impl Student {
    pub fn new(roll_number: i64, person: Person) -> Self {
        Self {
            roll_number,
            person,
            enrolled_courses: Vec::new(),
            subject_marks: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.person.name
    }

    /// Enrolled courses in enrollment order, unique by course code.
    pub fn enrolled_courses(&self) -> &[Course] {
        &self.enrolled_courses
    }

    pub fn subject_marks(&self) -> &BTreeMap<Subject, f64> {
        &self.subject_marks
    }

    pub fn mark_for(&self, subject: Subject) -> Option<f64> {
        self.subject_marks.get(&subject).copied()
    }

    pub fn is_enrolled_in(&self, course_code: &str) -> bool {
        self.enrolled_courses
            .iter()
            .any(|c| c.course_code == course_code)
    }

    /// Adds the course unless already enrolled. Returns true if it was added.
    pub fn enroll(&mut self, course: Course) -> bool {
        if self.is_enrolled_in(&course.course_code) {
            return false;
        }
        self.enrolled_courses.push(course);
        true
    }

    /// Drops the enrollment for `course_code`, returning the removed course.
    pub fn withdraw(&mut self, course_code: &str) -> Option<Course> {
        let idx = self
            .enrolled_courses
            .iter()
            .position(|c| c.course_code == course_code)?;
        Some(self.enrolled_courses.remove(idx))
    }

    /// Records a mark for the subject; the latest write wins. Returns the previous mark.
    pub fn record_mark(&mut self, subject: Subject, marks: f64) -> Option<f64> {
        self.subject_marks.insert(subject, marks)
    }
}

impl Displayable for Student {
    fn describe(&self) -> String {
        let p = &self.person;
        format!(
            "Name: {}\nAge: {}\nRoll Number: {}\nEmail: {}\nPhone Number: {}",
            p.name, p.age, self.roll_number, p.email, p.phone
        )
    }
}

/// A teacher. Identity is the person's name.
///
/// Every assigned course matches `specialization`; [`Teacher::assign`] is the only way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub person: Person,
    pub specialization: Subject,
    pub salary: f64,
    assigned_courses: Vec<Course>,
}

impl Teacher {
    pub fn new(person: Person, specialization: Subject, salary: f64) -> Self {
        Self {
            person,
            specialization,
            salary,
            assigned_courses: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.person.name
    }

    pub fn assigned_courses(&self) -> &[Course] {
        &self.assigned_courses
    }

    pub fn is_assigned_to(&self, course_code: &str) -> bool {
        self.assigned_courses
            .iter()
            .any(|c| c.course_code == course_code)
    }

    pub fn can_teach(&self, course: &Course) -> bool {
        self.specialization == course.subject
    }

    /// Binds the course to this teacher. Returns `Ok(false)` if it was already assigned.
    ///
    /// # Errors
    /// [`DomainError::SpecializationMismatch`] when the course subject differs from the
    /// specialization; the teacher is left untouched.
    pub fn assign(&mut self, course: Course) -> Result<bool, DomainError> {
        if !self.can_teach(&course) {
            return Err(DomainError::SpecializationMismatch {
                teacher: self.person.name.clone(),
                course_code: course.course_code,
                subject: course.subject,
                specialization: self.specialization,
            });
        }
        if self.is_assigned_to(&course.course_code) {
            return Ok(false);
        }
        self.assigned_courses.push(course);
        Ok(true)
    }
}

impl Displayable for Teacher {
    fn describe(&self) -> String {
        let p = &self.person;
        let mut out = format!(
            "Name: {}\nAge: {}\nSpecialization: {}\nEmail: {}\nPhone Number: {}\nSalary: {:.2}",
            p.name, p.age, self.specialization, p.email, p.phone, self.salary
        );
        if self.assigned_courses.is_empty() {
            out.push_str("\nNo courses assigned.");
        } else {
            out.push_str("\nAssigned Courses:");
            for c in &self.assigned_courses {
                out.push_str(&format!("\n- {}: {}", c.course_code, c.subject));
            }
        }
        out
    }
}
