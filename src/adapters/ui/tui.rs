//! Implements InputPort. Inquire-based interactive menu over the Registry.
//!
//! Forms collect raw text and convert it through `domain::input`; malformed
//! values are reported and never reach the registry.

use crate::adapters::ui::progress::spinner;
use crate::domain::{
    Course, CourseForm, Displayable, DomainError, Student, StudentForm, Subject, Teacher,
    TeacherForm, input,
};
use crate::ports::InputPort;
use crate::usecases::report_service::{self, ReportService};
use crate::usecases::{Outcome, Registry};
use async_trait::async_trait;
use inquire::error::InquireError;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Confirm, Select, Text};
use std::fmt;
use tracing::warn;

/// Prompt prefix and highlight colors for every inquire prompt.
pub fn apply_theme() {
    let config = RenderConfig::default_colored()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightCyan))
        .with_highlighted_option_prefix(Styled::new("▸").with_fg(Color::LightYellow));
    inquire::set_global_render_config(config);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    ListStudents,
    ListTeachers,
    ListCourses,
    AddStudent,
    AddTeacher,
    AddCourse,
    RemoveStudent,
    Enroll,
    Withdraw,
    AssignTeacher,
    RecordMarks,
    Report,
    Payroll,
    SaveAll,
    Exit,
}

impl Action {
    const ALL: [Action; 15] = [
        Action::ListStudents,
        Action::ListTeachers,
        Action::ListCourses,
        Action::AddStudent,
        Action::AddTeacher,
        Action::AddCourse,
        Action::RemoveStudent,
        Action::Enroll,
        Action::Withdraw,
        Action::AssignTeacher,
        Action::RecordMarks,
        Action::Report,
        Action::Payroll,
        Action::SaveAll,
        Action::Exit,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::ListStudents => "List students",
            Action::ListTeachers => "List teachers",
            Action::ListCourses => "List courses",
            Action::AddStudent => "Add student",
            Action::AddTeacher => "Add teacher",
            Action::AddCourse => "Add course",
            Action::RemoveStudent => "Remove student",
            Action::Enroll => "Enroll student in course",
            Action::Withdraw => "Withdraw student from course",
            Action::AssignTeacher => "Assign teacher to course",
            Action::RecordMarks => "Record marks",
            Action::Report => "Student report",
            Action::Payroll => "Process payroll",
            Action::SaveAll => "Save all",
            Action::Exit => "Save and exit",
        };
        f.write_str(label)
    }
}

/// Select option carrying a key behind its label.
struct Pick<K> {
    key: K,
    label: String,
}

impl<K> fmt::Display for Pick<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Esc / Ctrl-C on a sub-prompt backs out to the menu.
fn prompt_err(e: InquireError) -> DomainError {
    if is_cancel(&e) {
        DomainError::Cancelled
    } else {
        DomainError::Ui(e.to_string())
    }
}

fn is_cancel(e: &InquireError) -> bool {
    matches!(
        e,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

fn text(message: &str) -> Result<String, DomainError> {
    Text::new(message).prompt().map_err(prompt_err)
}

fn pick<K>(message: &str, options: Vec<Pick<K>>) -> Result<K, DomainError> {
    if options.is_empty() {
        return Err(DomainError::NotFound(format!("nothing to choose for '{}'", message)));
    }
    Select::new(message, options)
        .prompt()
        .map(|p| p.key)
        .map_err(prompt_err)
}

fn pick_subject(message: &str) -> Result<String, DomainError> {
    let options = Subject::ALL
        .into_iter()
        .map(|s| Pick {
            key: s.display_name().to_string(),
            label: format!("{} ({} credit hours)", s, s.credit_hours()),
        })
        .collect();
    pick(message, options)
}

fn print_outcome(what: &str, outcome: Outcome, pending: usize) {
    match outcome {
        Outcome::Persisted => println!("✓ {}", what),
        Outcome::Unchanged => println!("· {}: nothing to change", what),
        Outcome::Deferred => println!(
            "! {}: applied, but storage is unavailable ({} write(s) queued)",
            what, pending
        ),
        Outcome::Rejected => println!(
            "! {}: applied, but storage refused a write (see log)",
            what
        ),
    }
}

/// TUI adapter. Owns the registry for the lifetime of the session.
pub struct TuiInputPort {
    registry: Registry,
    reports: ReportService,
}

impl TuiInputPort {
    pub fn new(registry: Registry, reports: ReportService) -> Self {
        Self { registry, reports }
    }

    fn student_picks(&self) -> Vec<Pick<i64>> {
        self.registry
            .students()
            .map(|s| Pick {
                key: s.roll_number,
                label: format!("{} - {}", s.roll_number, s.name()),
            })
            .collect()
    }

    fn course_picks<'a>(courses: impl Iterator<Item = &'a Course>) -> Vec<Pick<String>> {
        courses
            .map(|c| Pick {
                key: c.course_code.clone(),
                label: format!("{} - {} ({} credits, fee {:.2})", c.course_code, c.subject, c.credits, c.fee),
            })
            .collect()
    }

    fn teacher_picks(&self) -> Vec<Pick<String>> {
        self.registry
            .teachers()
            .map(|t| Pick {
                key: t.name().to_string(),
                label: format!("{} ({})", t.name(), t.specialization),
            })
            .collect()
    }

    fn list_students(&self) {
        let mut any = false;
        for s in self.registry.students() {
            any = true;
            println!("{}", s.describe());
            let codes: Vec<&str> = s
                .enrolled_courses()
                .iter()
                .map(|c| c.course_code.as_str())
                .collect();
            println!("Courses: {}", if codes.is_empty() { "-".to_string() } else { codes.join(", ") });
            println!("Total Fees: {:.2}\n", report_service::total_fees(s));
        }
        if !any {
            println!("No students.");
        }
    }

    fn list_teachers(&self) {
        let mut any = false;
        for t in self.registry.teachers() {
            any = true;
            println!("{}\n", t.describe());
        }
        if !any {
            println!("No teachers.");
        }
    }

    fn list_courses(&self) {
        let mut any = false;
        for c in self.registry.courses() {
            any = true;
            println!("{}\n", c.describe());
        }
        if !any {
            println!("No courses.");
        }
    }

    async fn add_student(&mut self) -> Result<(), DomainError> {
        let form = StudentForm {
            name: text("Name:")?,
            age: text("Age:")?,
            email: text("Email:")?,
            phone: text("Phone:")?,
            roll_number: text("Roll number:")?,
        };
        let student = Student::try_from(form)?;
        let label = format!("student {}", student.roll_number);
        let outcome = self.registry.add_student(student).await;
        print_outcome(&label, outcome, self.registry.pending_writes());
        Ok(())
    }

    async fn add_teacher(&mut self) -> Result<(), DomainError> {
        let form = TeacherForm {
            name: text("Name:")?,
            age: text("Age:")?,
            email: text("Email:")?,
            phone: text("Phone:")?,
            specialization: pick_subject("Specialization:")?,
            salary: text("Salary:")?,
        };
        let teacher = Teacher::try_from(form)?;
        let label = format!("teacher {}", teacher.name());
        let outcome = self.registry.add_teacher(teacher).await;
        print_outcome(&label, outcome, self.registry.pending_writes());
        Ok(())
    }

    async fn add_course(&mut self) -> Result<(), DomainError> {
        let form = CourseForm {
            course_code: text("Course code:")?,
            subject: pick_subject("Subject:")?,
            credits: text("Credits:")?,
            fee: text("Fee:")?,
        };
        let course = Course::try_from(form)?;
        let label = format!("course {}", course.course_code);
        let outcome = self.registry.add_course(course).await;
        print_outcome(&label, outcome, self.registry.pending_writes());
        Ok(())
    }

    async fn remove_student(&mut self) -> Result<(), DomainError> {
        let roll = pick("Student to remove:", self.student_picks())?;
        let confirmed = Confirm::new(&format!("Remove student {} and all their records?", roll))
            .with_default(false)
            .prompt()
            .map_err(prompt_err)?;
        if !confirmed {
            return Ok(());
        }
        let outcome = self.registry.remove_student(roll).await?;
        print_outcome(&format!("removed student {}", roll), outcome, self.registry.pending_writes());
        Ok(())
    }

    async fn enroll(&mut self) -> Result<(), DomainError> {
        let roll = pick("Student:", self.student_picks())?;
        let code = pick("Course:", Self::course_picks(self.registry.courses()))?;
        let outcome = self.registry.enroll_student(roll, &code).await?;
        print_outcome(&format!("enrolled {} in {}", roll, code), outcome, self.registry.pending_writes());
        Ok(())
    }

    async fn withdraw(&mut self) -> Result<(), DomainError> {
        let roll = pick("Student:", self.student_picks())?;
        let enrolled = self
            .registry
            .student(roll)
            .map(|s| Self::course_picks(s.enrolled_courses().iter()))
            .unwrap_or_default();
        let code = pick("Course to withdraw from:", enrolled)?;
        let outcome = self.registry.withdraw_student(roll, &code).await?;
        print_outcome(&format!("withdrew {} from {}", roll, code), outcome, self.registry.pending_writes());
        Ok(())
    }

    async fn assign_teacher(&mut self) -> Result<(), DomainError> {
        let name = pick("Teacher:", self.teacher_picks())?;
        let code = pick("Course:", Self::course_picks(self.registry.courses()))?;
        let outcome = self.registry.assign_teacher(&name, &code).await?;
        print_outcome(&format!("assigned {} to {}", code, name), outcome, self.registry.pending_writes());
        Ok(())
    }

    async fn record_marks(&mut self) -> Result<(), DomainError> {
        let roll = pick("Student:", self.student_picks())?;
        let enrolled = self
            .registry
            .student(roll)
            .map(|s| Self::course_picks(s.enrolled_courses().iter()))
            .unwrap_or_default();
        if enrolled.is_empty() {
            println!("This student is not enrolled in any courses");
            return Ok(());
        }
        let code = pick("Course:", enrolled)?;
        let marks = input::parse_marks(&text("Marks (0-100):")?)?;
        let outcome = self.registry.record_mark(roll, &code, marks).await?;
        print_outcome(&format!("marks {} for {} in {}", marks, roll, code), outcome, self.registry.pending_writes());
        Ok(())
    }

    async fn report(&self) -> Result<(), DomainError> {
        let roll = pick("Student:", self.student_picks())?;
        let student = self
            .registry
            .student(roll)
            .ok_or_else(|| DomainError::NotFound(format!("student with roll number {}", roll)))?;
        let report = report_service::generate_report(student);
        println!("\n{}\n", report);
        let export = Confirm::new("Export as Markdown and JSON?")
            .with_default(false)
            .prompt()
            .map_err(prompt_err)?;
        if export {
            let (md, json) = self.reports.export(&report).await?;
            println!("✓ wrote {} and {}", md.display(), json.display());
        }
        Ok(())
    }

    fn payroll(&self) -> Result<(), DomainError> {
        let name = pick("Teacher:", self.teacher_picks())?;
        let slip = self.registry.process_payment(&name)?;
        println!("✓ Processed payment of {:.2} for {}", slip.amount, slip.teacher);
        Ok(())
    }

    async fn save_all(&mut self) {
        let pb = spinner("Saving all records...");
        let outcome = self.registry.save_all().await;
        pb.finish_and_clear();
        print_outcome("all data saved", outcome, self.registry.pending_writes());
    }

    async fn handle(&mut self, action: Action) -> Result<(), DomainError> {
        match action {
            Action::ListStudents => self.list_students(),
            Action::ListTeachers => self.list_teachers(),
            Action::ListCourses => self.list_courses(),
            Action::AddStudent => self.add_student().await?,
            Action::AddTeacher => self.add_teacher().await?,
            Action::AddCourse => self.add_course().await?,
            Action::RemoveStudent => self.remove_student().await?,
            Action::Enroll => self.enroll().await?,
            Action::Withdraw => self.withdraw().await?,
            Action::AssignTeacher => self.assign_teacher().await?,
            Action::RecordMarks => self.record_marks().await?,
            Action::Report => self.report().await?,
            Action::Payroll => self.payroll()?,
            Action::SaveAll | Action::Exit => self.save_all().await,
        }
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&mut self) -> Result<(), DomainError> {
        loop {
            let action = match Select::new("What next?", Action::ALL.to_vec())
                .with_page_size(Action::ALL.len())
                .prompt()
            {
                Ok(a) => a,
                Err(e) if is_cancel(&e) => Action::Exit,
                Err(e) => return Err(prompt_err(e)),
            };

            match self.handle(action).await {
                Ok(()) | Err(DomainError::Cancelled) => {}
                Err(e) => {
                    warn!(%action, error = %e, "action failed");
                    println!("✗ {}", e);
                }
            }

            if action == Action::Exit {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_a_prompt_is_a_cancel_not_a_failure() {
        assert!(matches!(
            prompt_err(InquireError::OperationCanceled),
            DomainError::Cancelled
        ));
        assert!(matches!(
            prompt_err(InquireError::OperationInterrupted),
            DomainError::Cancelled
        ));
        assert!(matches!(
            prompt_err(InquireError::InvalidConfiguration("no options".into())),
            DomainError::Ui(_)
        ));
    }
}
