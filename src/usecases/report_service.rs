//! Academic reports: grades, GPA and fees computed from in-memory student state.
//!
//! Computation never touches storage. `ReportService` only adds file export
//! (Markdown + JSON) on top of the pure functions.

use crate::domain::{DomainError, Grade, Student, Subject};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

/// One enrolled course on the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLine {
    pub course_code: String,
    pub subject: Subject,
    pub credits: i64,
    /// `None` when no mark has been recorded; graded as 0.
    pub marks: Option<f64>,
    pub grade: Grade,
    pub grade_points: f64,
}

impl ReportLine {
    /// Two decimals, or "-" when no mark is recorded.
    pub fn marks_text(&self) -> String {
        self.marks
            .map(|m| format!("{:.2}", m))
            .unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcademicReport {
    pub roll_number: i64,
    pub student_name: String,
    pub lines: Vec<ReportLine>,
    pub total_credits: i64,
    pub gpa: f64,
    pub total_fees: f64,
    pub generated_at: DateTime<Utc>,
}

/// Sum of fees over enrolled courses.
pub fn total_fees(student: &Student) -> f64 {
    student.enrolled_courses().iter().map(|c| c.fee).sum()
}

/// Credit-weighted GPA over enrolled courses. Zero credits gives 0.0.
pub fn generate_report(student: &Student) -> AcademicReport {
    let mut total_credits = 0i64;
    let mut weighted_points = 0.0f64;
    let lines: Vec<ReportLine> = student
        .enrolled_courses()
        .iter()
        .map(|course| {
            let marks = student.mark_for(course.subject);
            let grade = Grade::from_score(marks.unwrap_or(0.0));
            total_credits += course.credits;
            weighted_points += grade.points() * course.credits as f64;
            ReportLine {
                course_code: course.course_code.clone(),
                subject: course.subject,
                credits: course.credits,
                marks,
                grade,
                grade_points: grade.points(),
            }
        })
        .collect();

    let gpa = if total_credits > 0 {
        weighted_points / total_credits as f64
    } else {
        0.0
    };

    AcademicReport {
        roll_number: student.roll_number,
        student_name: student.name().to_string(),
        lines,
        total_credits,
        gpa,
        total_fees: total_fees(student),
        generated_at: Utc::now(),
    }
}

impl fmt::Display for AcademicReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Academic Report for {} (Roll No: {})",
            self.student_name, self.roll_number
        )?;
        writeln!(f, "{}", "=".repeat(62))?;
        if self.lines.is_empty() {
            return writeln!(f, "No courses enrolled.");
        }
        writeln!(
            f,
            "{:<10} {:<20} {:<8} {:<10} {:<6}",
            "Code", "Subject", "Credits", "Marks", "Grade"
        )?;
        writeln!(f, "{}", "-".repeat(62))?;
        for line in &self.lines {
            let marks = line.marks_text();
            writeln!(
                f,
                "{:<10} {:<20} {:<8} {:<10} {:<6}",
                line.course_code,
                line.subject.display_name(),
                line.credits,
                marks,
                line.grade
            )?;
        }
        writeln!(f, "{}", "-".repeat(62))?;
        writeln!(f, "Total Credits: {}", self.total_credits)?;
        writeln!(f, "GPA: {:.2}", self.gpa)?;
        write!(f, "Total Fees: {:.2}", self.total_fees)
    }
}

/// Writes reports to the reports directory.
pub struct ReportService {
    reports_dir: PathBuf,
}

impl ReportService {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    /// Write `report_<roll>.md` and `report_<roll>.json`. Returns both paths.
    pub async fn export(
        &self,
        report: &AcademicReport,
    ) -> Result<(PathBuf, PathBuf), DomainError> {
        fs::create_dir_all(&self.reports_dir)
            .await
            .map_err(|e| DomainError::Repo(format!("Failed to create reports dir: {}", e)))?;

        let md_path = self
            .reports_dir
            .join(format!("report_{}.md", report.roll_number));
        fs::write(&md_path, Self::to_markdown(report))
            .await
            .map_err(|e| DomainError::Repo(format!("Failed to write report: {}", e)))?;

        let json_path = self
            .reports_dir
            .join(format!("report_{}.json", report.roll_number));
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| DomainError::Repo(format!("Failed to encode report: {}", e)))?;
        fs::write(&json_path, json)
            .await
            .map_err(|e| DomainError::Repo(format!("Failed to write report: {}", e)))?;

        info!(path = %md_path.display(), "report generated");
        Ok((md_path, json_path))
    }

    pub fn to_markdown(report: &AcademicReport) -> String {
        let mut md = String::new();
        md.push_str(&format!("# Academic Report: {}\n\n", report.student_name));
        md.push_str(&format!(
            "**Roll No:** {} | **Generated:** {}\n\n",
            report.roll_number,
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));

        if report.lines.is_empty() {
            md.push_str("No courses enrolled.\n");
            return md;
        }

        md.push_str("| Code | Subject | Credits | Marks | Grade | Points |\n");
        md.push_str("|------|---------|--------:|------:|:-----:|-------:|\n");
        for line in &report.lines {
            let marks = line.marks_text();
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {:.1} |\n",
                line.course_code, line.subject, line.credits, marks, line.grade, line.grade_points
            ));
        }
        md.push('\n');
        md.push_str(&format!("**Total Credits:** {}  \n", report.total_credits));
        md.push_str(&format!("**GPA:** {:.2}  \n", report.gpa));
        md.push_str(&format!("**Total Fees:** {:.2}\n", report.total_fees));
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Course, Person};

    fn student() -> Student {
        Student::new(3, Person::new("Riya", 20, "riya@school.edu", "555-0199"))
    }

    #[test]
    fn single_course_gpa_is_exact() {
        let mut s = student();
        s.enroll(Course::new("MATH101", Subject::Mathematics, 4, 1000.0));
        s.record_mark(Subject::Mathematics, 85.0);

        let report = generate_report(&s);
        assert_eq!(report.lines[0].grade, Grade::A);
        assert_eq!(report.gpa, 3.7);
        assert_eq!(report.total_credits, 4);
    }

    #[test]
    fn no_courses_gives_zero_gpa() {
        let report = generate_report(&student());
        assert_eq!(report.gpa, 0.0);
        assert!(!report.gpa.is_nan());
        assert_eq!(report.total_fees, 0.0);
        assert!(report.to_string().contains("No courses enrolled."));
    }

    #[test]
    fn fees_sum_over_enrollments() {
        let mut s = student();
        s.enroll(Course::new("MATH101", Subject::Mathematics, 4, 1000.0));
        s.enroll(Course::new("SCI200", Subject::Science, 5, 1500.0));
        assert_eq!(total_fees(&s), 2500.0);
    }

    #[test]
    fn missing_mark_grades_as_f_but_stays_distinguishable() {
        let mut s = student();
        s.enroll(Course::new("MATH101", Subject::Mathematics, 4, 1000.0));
        s.enroll(Course::new("ENG101", Subject::English, 2, 500.0));
        s.record_mark(Subject::Mathematics, 95.0);

        let report = generate_report(&s);
        let eng = &report.lines[1];
        assert_eq!(eng.marks, None);
        assert_eq!(eng.grade, Grade::F);
        // (4 * 4.0 + 2 * 0.0) / 6
        assert!((report.gpa - 16.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn missing_mark_renders_the_same_in_console_and_markdown() {
        let mut s = student();
        s.enroll(Course::new("ENG101", Subject::English, 2, 500.0));
        let report = generate_report(&s);

        let console = report.to_string();
        let eng_row = console.lines().find(|l| l.starts_with("ENG101")).unwrap();
        assert_eq!(eng_row.split_whitespace().nth(3), Some("-"));
        let md = ReportService::to_markdown(&report);
        assert!(md.contains("| ENG101 | English | 2 | - | F | 0.0 |"));
    }

    #[test]
    fn markdown_contains_table_and_gpa() {
        let mut s = student();
        s.enroll(Course::new("SCI200", Subject::Science, 5, 1500.0));
        s.record_mark(Subject::Science, 72.0);
        let md = ReportService::to_markdown(&generate_report(&s));
        assert!(md.contains("| SCI200 | Science | 5 | 72.00 | B+ | 3.3 |"));
        assert!(md.contains("**GPA:** 3.30"));
    }

    #[tokio::test]
    async fn export_writes_markdown_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let service = ReportService::new(dir.path().join("reports"));
        let report = generate_report(&student());
        let (md, json) = service.export(&report).await.unwrap();
        assert!(md.exists());
        let body = std::fs::read_to_string(json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["roll_number"], 3);
    }
}
