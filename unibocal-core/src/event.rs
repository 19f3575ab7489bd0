use std::fmt::Write as _;

use chrono::{DateTime, Duration, Utc};

use crate::{
    CalendarEvent, Exam, TimetableEvent,
    identity::{exam_uid, lecture_uid},
};

/// 可以映射为日历事件的原始记录
#[derive(Debug, Clone, Copy)]
pub enum SourceRecord<'a> {
    Lecture(&'a TimetableEvent),
    Exam(&'a Exam),
}

impl<'a> From<&'a TimetableEvent> for SourceRecord<'a> {
    fn from(event: &'a TimetableEvent) -> Self {
        SourceRecord::Lecture(event)
    }
}

impl<'a> From<&'a Exam> for SourceRecord<'a> {
    fn from(exam: &'a Exam) -> Self {
        SourceRecord::Exam(exam)
    }
}

/// 将课表/考试记录映射为日历事件
#[derive(Debug, Clone)]
pub struct EventMapper {
    exam_duration: Duration,
}

impl EventMapper {
    pub fn new(exam_duration: Duration) -> Self {
        Self { exam_duration }
    }

    pub fn exam_duration(&self) -> Duration {
        self.exam_duration
    }

    /// 映射单条记录，`stamp` 为本次生成时间
    pub fn map(&self, record: SourceRecord<'_>, stamp: DateTime<Utc>) -> CalendarEvent {
        match record {
            SourceRecord::Lecture(event) => self.map_lecture(event, stamp),
            SourceRecord::Exam(exam) => self.map_exam(exam, stamp),
        }
    }

    pub fn map_lecture(&self, event: &TimetableEvent, stamp: DateTime<Utc>) -> CalendarEvent {
        let location = event.classrooms.first().map(|c| c.description.clone());

        CalendarEvent {
            uid: lecture_uid(event),
            organizer: event.teacher.clone(),
            summary: event.title.clone(),
            start: event.start,
            end: event.end,
            description: build_lecture_description(event, location.as_deref()),
            location,
            stamp,
        }
    }

    pub fn map_exam(&self, exam: &Exam, stamp: DateTime<Utc>) -> CalendarEvent {
        let location = Some(exam.location.clone()).filter(|l| !l.is_empty());

        CalendarEvent {
            uid: exam_uid(exam),
            organizer: exam.teacher.clone(),
            summary: exam.subject_name.clone(),
            start: exam.date,
            end: exam.date + self.exam_duration,
            description: build_exam_description(exam, location.as_deref()),
            location,
            stamp,
        }
    }
}

impl Default for EventMapper {
    fn default() -> Self {
        Self::new(Duration::hours(2))
    }
}

/// 课程描述：教师、教室、学分、学期、模块代码
pub fn build_lecture_description(event: &TimetableEvent, classroom: Option<&str>) -> String {
    let mut b = String::new();
    let _ = writeln!(b, "Docente: {}", event.teacher);
    if let Some(classroom) = classroom {
        let _ = writeln!(b, "Aula: {}", classroom);
    }
    let _ = writeln!(b, "Cfu: {}", event.credit_units);
    let _ = writeln!(b, "Periodo: {}", event.period);
    let _ = writeln!(b, "Codice modulo: {}", event.module_code);
    b
}

/// 考试描述：教师、教室、科目代码、考试类型
pub fn build_exam_description(exam: &Exam, location: Option<&str>) -> String {
    let mut b = String::new();
    let _ = writeln!(b, "Docente: {}", exam.teacher);
    if let Some(location) = location {
        let _ = writeln!(b, "Aula: {}", location);
    }
    let _ = writeln!(b, "Codice: {}", exam.subject_code);
    let _ = writeln!(b, "Tipo: {}", exam.exam_type);
    b
}
