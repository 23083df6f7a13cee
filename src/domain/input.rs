//! Raw form input -> validated entities.
//!
//! The display port collects strings; nothing reaches the registry until these
//! conversions succeed.

use crate::domain::{Course, DomainError, Person, Student, Subject, Teacher};

/// Inclusive range accepted for a mark.
pub const MARKS_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

pub fn parse_integer(field: &'static str, raw: &str) -> Result<i64, DomainError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| DomainError::invalid(field, format!("'{}' is not a whole number", raw.trim())))
}

/// Non-negative finite amount (fee, salary).
pub fn parse_amount(field: &'static str, raw: &str) -> Result<f64, DomainError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| DomainError::invalid(field, format!("'{}' is not a number", raw.trim())))?;
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::invalid(field, "must be a non-negative amount"));
    }
    Ok(value)
}

pub fn parse_marks(raw: &str) -> Result<f64, DomainError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| DomainError::invalid("marks", format!("'{}' is not a number", raw.trim())))?;
    check_marks(value)
}

pub fn check_marks(value: f64) -> Result<f64, DomainError> {
    if !MARKS_RANGE.contains(&value) {
        return Err(DomainError::invalid("marks", "must be between 0 and 100"));
    }
    Ok(value)
}

fn required(field: &'static str, raw: &str) -> Result<String, DomainError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DomainError::invalid(field, "must not be empty"));
    }
    Ok(value.to_string())
}

fn parse_age(raw: &str) -> Result<i64, DomainError> {
    let age = parse_integer("age", raw)?;
    if age < 0 {
        return Err(DomainError::invalid("age", "must not be negative"));
    }
    Ok(age)
}

fn person(name: &str, age: &str, email: &str, phone: &str) -> Result<Person, DomainError> {
    Ok(Person::new(
        required("name", name)?,
        parse_age(age)?,
        email.trim(),
        phone.trim(),
    ))
}

/// Raw text collected by the "add student" form.
#[derive(Debug, Default, Clone)]
pub struct StudentForm {
    pub name: String,
    pub age: String,
    pub email: String,
    pub phone: String,
    pub roll_number: String,
}

impl TryFrom<StudentForm> for Student {
    type Error = DomainError;

    fn try_from(form: StudentForm) -> Result<Self, Self::Error> {
        let person = person(&form.name, &form.age, &form.email, &form.phone)?;
        let roll_number = parse_integer("roll number", &form.roll_number)?;
        Ok(Student::new(roll_number, person))
    }
}

/// Raw text collected by the "add teacher" form.
#[derive(Debug, Default, Clone)]
pub struct TeacherForm {
    pub name: String,
    pub age: String,
    pub email: String,
    pub phone: String,
    pub specialization: String,
    pub salary: String,
}

impl TryFrom<TeacherForm> for Teacher {
    type Error = DomainError;

    fn try_from(form: TeacherForm) -> Result<Self, Self::Error> {
        let person = person(&form.name, &form.age, &form.email, &form.phone)?;
        let specialization = Subject::lookup(form.specialization.trim())?;
        let salary = parse_amount("salary", &form.salary)?;
        Ok(Teacher::new(person, specialization, salary))
    }
}

/// Raw text collected by the "add course" form.
#[derive(Debug, Default, Clone)]
pub struct CourseForm {
    pub course_code: String,
    pub subject: String,
    pub credits: String,
    pub fee: String,
}

impl TryFrom<CourseForm> for Course {
    type Error = DomainError;

    fn try_from(form: CourseForm) -> Result<Self, Self::Error> {
        let code = required("course code", &form.course_code)?;
        let subject = Subject::lookup(form.subject.trim())?;
        let credits = parse_integer("credits", &form.credits)?;
        if credits < 0 {
            return Err(DomainError::invalid("credits", "must not be negative"));
        }
        let fee = parse_amount("fee", &form.fee)?;
        Ok(Course::new(code, subject, credits, fee))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student_form() -> StudentForm {
        StudentForm {
            name: " Sam ".into(),
            age: "19".into(),
            email: "sam@school.edu".into(),
            phone: "555-0101".into(),
            roll_number: "42".into(),
        }
    }

    #[test]
    fn valid_student_form() {
        let s = Student::try_from(student_form()).unwrap();
        assert_eq!(s.roll_number, 42);
        assert_eq!(s.name(), "Sam");
        assert_eq!(s.person.age, 19);
    }

    #[test]
    fn non_numeric_age_is_rejected() {
        let form = StudentForm {
            age: "nineteen".into(),
            ..student_form()
        };
        let err = Student::try_from(form).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { field: "age", .. }));
    }

    #[test]
    fn empty_name_is_rejected() {
        let form = StudentForm {
            name: "   ".into(),
            ..student_form()
        };
        assert!(matches!(
            Student::try_from(form),
            Err(DomainError::InvalidInput { field: "name", .. })
        ));
    }

    #[test]
    fn teacher_form_needs_known_subject() {
        let form = TeacherForm {
            name: "Ada".into(),
            age: "40".into(),
            specialization: "Alchemy".into(),
            salary: "50000".into(),
            ..Default::default()
        };
        assert!(matches!(
            Teacher::try_from(form),
            Err(DomainError::UnknownSubject(_))
        ));
    }

    #[test]
    fn course_form_rejects_bad_fee() {
        let form = CourseForm {
            course_code: "MATH101".into(),
            subject: "Math".into(),
            credits: "4".into(),
            fee: "ten".into(),
        };
        assert!(matches!(
            Course::try_from(form.clone()),
            Err(DomainError::InvalidInput { field: "fee", .. })
        ));
        let ok = Course::try_from(CourseForm {
            fee: "1000".into(),
            ..form
        })
        .unwrap();
        assert_eq!(ok.fee, 1000.0);
        assert_eq!(ok.subject, Subject::Mathematics);
    }

    #[test]
    fn marks_must_be_in_range() {
        assert_eq!(parse_marks("85").unwrap(), 85.0);
        assert_eq!(parse_marks(" 0 ").unwrap(), 0.0);
        assert!(parse_marks("100.5").is_err());
        assert!(parse_marks("-1").is_err());
        assert!(parse_marks("abc").is_err());
    }
}
