use chrono::{NaiveDateTime, Utc};

use crate::{
    CalendarEvent, Course, Exam, IcsOptions, Result, TimetableEvent,
    event::{EventMapper, SourceRecord},
};

#[cfg(test)]
mod tests;

/// 日历文件的 Content-Type
pub const ICS_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// RFC 5545 建议的单行最大字节数
const MAX_LINE_OCTETS: usize = 75;

/// 生成好的日历文档
#[derive(Debug, Clone)]
pub struct CalendarDocument {
    pub name: String,
    pub description: String,
    pub events: Vec<CalendarEvent>,
    options: IcsOptions,
}

impl CalendarDocument {
    /// 序列化为 ICS 文本
    pub fn to_ics(&self) -> String {
        let mut ics = IcsWriter::default();

        ics.line("BEGIN:VCALENDAR");
        ics.line("VERSION:2.0");
        ics.property("PRODID", &self.options.product_id);
        ics.line("CALSCALE:GREGORIAN");
        ics.property("METHOD", &self.options.method);
        ics.text("NAME", &self.name);
        ics.text("X-WR-CALNAME", &self.name);
        ics.text("DESCRIPTION", &self.description);
        ics.text("X-WR-CALDESC", &self.description);
        if let Some(ref timezone) = self.options.timezone {
            ics.property("X-WR-TIMEZONE", timezone);
        }

        for event in &self.events {
            ics.event(event);
        }

        ics.line("END:VCALENDAR");
        ics.finish()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_ics().into_bytes()
    }
}

/// ICS日历生成器
#[derive(Debug, Clone)]
pub struct IcsGenerator {
    options: IcsOptions,
    mapper: EventMapper,
}

impl IcsGenerator {
    pub fn new(options: IcsOptions, mapper: EventMapper) -> Self {
        Self { options, mapper }
    }

    pub fn mapper(&self) -> &EventMapper {
        &self.mapper
    }

    /// 按输入顺序生成日历，所有事件共用同一个 DTSTAMP
    pub fn synthesize<'a, I>(
        &self,
        records: I,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<CalendarDocument>
    where
        I: IntoIterator<Item = SourceRecord<'a>>,
    {
        let stamp = Utc::now();
        let events = records
            .into_iter()
            .map(|record| self.mapper.map(record, stamp))
            .collect();

        Ok(CalendarDocument {
            name: title.into(),
            description: description.into(),
            events,
            options: self.options.clone(),
        })
    }

    /// 生成某课程某学年的课表日历
    pub fn lecture_calendar(
        &self,
        timetable: &[TimetableEvent],
        course: &Course,
        year: u32,
    ) -> Result<CalendarDocument> {
        self.synthesize(
            timetable.iter().map(SourceRecord::Lecture),
            lecture_calendar_title(course, year),
            lecture_calendar_description(course, year),
        )
    }

    /// 生成考试日历
    pub fn exam_calendar(
        &self,
        exams: &[Exam],
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<CalendarDocument> {
        self.synthesize(exams.iter().map(SourceRecord::Exam), title, description)
    }
}

impl Default for IcsGenerator {
    fn default() -> Self {
        Self::new(IcsOptions::default(), EventMapper::default())
    }
}

pub fn lecture_calendar_title(course: &Course, year: u32) -> String {
    format!("{} - {} year", course.description, year)
}

pub fn lecture_calendar_description(course: &Course, year: u32) -> String {
    format!(
        "Orario delle lezioni del {} anno del corso di {}",
        year, course.description
    )
}

/// 转义ICS文本内容
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// 按 75 字节折行，不拆分 UTF-8 字符
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            folded.push_str("\r\n ");
            // 续行开头的空格也计入长度
            width = 1;
        }
        folded.push(ch);
        width += len;
    }
    folded
}

fn format_local(time: &NaiveDateTime) -> String {
    time.format("%Y%m%dT%H%M%S").to_string()
}

#[derive(Default)]
struct IcsWriter {
    buf: String,
}

impl IcsWriter {
    fn line(&mut self, line: &str) {
        self.buf.push_str(&fold_line(line));
        self.buf.push_str("\r\n");
    }

    fn property(&mut self, name: &str, value: &str) {
        self.line(&format!("{}:{}", name, value));
    }

    fn text(&mut self, name: &str, value: &str) {
        self.property(name, &escape_text(value));
    }

    fn event(&mut self, event: &CalendarEvent) {
        self.line("BEGIN:VEVENT");
        self.property("UID", &event.uid);
        self.property(
            "DTSTAMP",
            &event.stamp.format("%Y%m%dT%H%M%SZ").to_string(),
        );
        if !event.organizer.is_empty() {
            self.text("ORGANIZER", &event.organizer);
        }
        self.text("SUMMARY", &event.summary);
        self.property("DTSTART", &format_local(&event.start));
        self.property("DTEND", &format_local(&event.end));
        if let Some(ref location) = event.location {
            self.text("LOCATION", location);
        }
        self.text("DESCRIPTION", &event.description);
        self.line("END:VEVENT");
    }

    fn finish(self) -> String {
        self.buf
    }
}
