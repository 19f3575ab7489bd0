use super::*;
use crate::{Classroom, Course, Exam, TimetableEvent, identity::identify};
use chrono::{NaiveDate, NaiveDateTime};
use ical::parser::ical::{IcalParser, component::IcalEvent};
use std::io::BufReader;

fn at(day: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 10, day)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn course() -> Course {
    Course {
        academic_year: "2024/2025".to_string(),
        enrollable: "SI".to_string(),
        code: 8005,
        description: "Ingegneria Informatica".to_string(),
        url: "https://www.unibo.it/it/studiare/lauree/8005".to_string(),
        campus: "Bologna".to_string(),
        site: "Bologna".to_string(),
        scope: "Ingegneria".to_string(),
        course_type: "Laurea".to_string(),
        duration_years: 3,
        international: false,
        international_title: String::new(),
        international_language: String::new(),
        languages: "italiano".to_string(),
        access: "libero".to_string(),
    }
}

fn lecture(code: &str, title: &str, start: NaiveDateTime, end: NaiveDateTime) -> TimetableEvent {
    TimetableEvent {
        module_code: code.to_string(),
        title: title.to_string(),
        teacher: "A. Rossi".to_string(),
        credit_units: 6,
        period: "I".to_string(),
        start,
        end,
        classrooms: vec![Classroom {
            description: "Aula 5.7, Via Terracini".to_string(),
        }],
        calendar_period: String::new(),
        split_code: String::new(),
        external_code: String::new(),
        remote: false,
        teams: None,
    }
}

fn parse_events(ics: &str) -> Vec<IcalEvent> {
    let mut parser = IcalParser::new(BufReader::new(ics.as_bytes()));
    let calendar = parser.next().expect("没有日历").expect("ICS解析失败");
    assert!(parser.next().is_none());
    calendar.events
}

fn property<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a str> {
    event
        .properties
        .iter()
        .find(|p| p.name == name)
        .and_then(|p| p.value.as_deref())
}

#[test]
fn test_lecture_calendar_format() {
    let generator = IcsGenerator::default();
    let timetable = vec![lecture("04642", "ANALISI MATEMATICA", at(1, 9), at(1, 11))];

    let document = generator
        .lecture_calendar(&timetable, &course(), 1)
        .expect("生成ICS失败");
    let ics = document.to_ics();

    println!("{}", ics);

    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.ends_with("END:VCALENDAR\r\n"));
    assert!(ics.contains("METHOD:REQUEST\r\n"));
    assert!(ics.contains("X-WR-CALNAME:Ingegneria Informatica - 1 year\r\n"));
    assert!(ics.contains(
        "X-WR-CALDESC:Orario delle lezioni del 1 anno del corso di Ingegneria Informatica\r\n"
    ));

    let events = parse_events(&ics);
    assert_eq!(events.len(), 1);

    let event = &events[0];
    assert_eq!(
        property(event, "UID"),
        Some(identify(&["04642", "2024-10-01T09:00:00", "2024-10-01T11:00:00"]).as_str())
    );
    assert_eq!(property(event, "DTSTART"), Some("20241001T090000"));
    assert_eq!(property(event, "DTEND"), Some("20241001T110000"));
    assert_eq!(property(event, "SUMMARY"), Some("ANALISI MATEMATICA"));
    assert_eq!(property(event, "ORGANIZER"), Some("A. Rossi"));
    assert_eq!(
        property(event, "LOCATION"),
        Some("Aula 5.7\\, Via Terracini")
    );
    assert_eq!(
        property(event, "DESCRIPTION"),
        Some(
            "Docente: A. Rossi\\nAula: Aula 5.7\\, Via Terracini\\nCfu: 6\\nPeriodo: I\\nCodice modulo: 04642\\n"
        )
    );
    assert!(property(event, "DTSTAMP").is_some_and(|s| s.ends_with('Z')));
}

#[test]
fn test_events_keep_input_order() {
    let generator = IcsGenerator::default();
    let timetable = vec![
        lecture("00003", "C", at(3, 9), at(3, 11)),
        lecture("00001", "A", at(1, 9), at(1, 11)),
        lecture("00002", "B", at(2, 9), at(2, 11)),
    ];

    let ics = generator
        .lecture_calendar(&timetable, &course(), 2)
        .unwrap()
        .to_ics();

    let summaries: Vec<_> = parse_events(&ics)
        .iter()
        .map(|e| property(e, "SUMMARY").unwrap_or_default().to_string())
        .collect();
    assert_eq!(summaries, vec!["C", "A", "B"]);
}

#[test]
fn test_resynthesis_differs_only_in_stamp() {
    let generator = IcsGenerator::default();
    let timetable = vec![
        lecture("04642", "ANALISI MATEMATICA", at(1, 9), at(1, 11)),
        lecture("00013", "FISICA", at(2, 14), at(2, 16)),
    ];

    let first = generator
        .lecture_calendar(&timetable, &course(), 1)
        .unwrap();
    let second = generator
        .lecture_calendar(&timetable, &course(), 1)
        .unwrap();

    assert!(first.events.iter().all(|e| e.stamp == first.events[0].stamp));

    let without_stamp = |ics: String| -> Vec<String> {
        ics.lines()
            .filter(|l| !l.starts_with("DTSTAMP:"))
            .map(str::to_string)
            .collect()
    };
    assert_eq!(
        without_stamp(first.to_ics()),
        without_stamp(second.to_ics())
    );
}

#[test]
fn test_exam_calendar() {
    let generator = IcsGenerator::default();
    let exams = vec![Exam {
        subject_code: "04642_2".to_string(),
        subject_name: "ANALISI MATEMATICA".to_string(),
        date: at(20, 9),
        location: "Aula Magna".to_string(),
        teacher: "A. Rossi".to_string(),
        exam_type: "Scritto".to_string(),
    }];

    let document = generator
        .exam_calendar(&exams, "Esami", "Appelli d'esame; sessione invernale")
        .unwrap();
    let ics = document.to_ics();

    assert!(ics.contains("X-WR-CALNAME:Esami\r\n"));
    assert!(ics.contains("X-WR-CALDESC:Appelli d'esame\\; sessione invernale\r\n"));

    let events = parse_events(&ics);
    assert_eq!(events.len(), 1);
    assert_eq!(property(&events[0], "DTSTART"), Some("20241020T090000"));
    assert_eq!(property(&events[0], "DTEND"), Some("20241020T110000"));
    assert_eq!(property(&events[0], "LOCATION"), Some("Aula Magna"));
    assert_eq!(
        property(&events[0], "UID"),
        Some(identify(&["ANALISI MATEMATICA", "2024-10-20T09:00:00", "Aula Magna", "A. Rossi"]).as_str())
    );
}

#[test]
fn test_empty_calendar() {
    let ics = IcsGenerator::default()
        .lecture_calendar(&[], &course(), 3)
        .unwrap()
        .to_ics();

    assert!(!ics.contains("BEGIN:VEVENT"));
    assert!(parse_events(&ics).is_empty());
}

#[test]
fn test_escape_text() {
    assert_eq!(escape_text("a,b;c"), "a\\,b\\;c");
    assert_eq!(escape_text("riga1\nriga2\r\n"), "riga1\\nriga2\\n");
    assert_eq!(escape_text("C:\\path"), "C:\\\\path");
}

#[test]
fn test_fold_long_lines() {
    let long = format!("DESCRIPTION:{}", "Università di Bologna ".repeat(10));
    let folded = fold_line(&long);

    for (i, physical) in folded.split("\r\n").enumerate() {
        assert!(physical.len() <= 75, "第{}行过长: {}", i, physical.len());
        if i > 0 {
            assert!(physical.starts_with(' '));
        }
    }

    let unfolded = folded.replace("\r\n ", "");
    assert_eq!(unfolded, long);
}

#[test]
fn test_long_summary_survives_parsing() {
    let title = "LABORATORIO DI AMMINISTRAZIONE DI SISTEMI E RETI DI CALCOLATORI AVANZATI (MODULO 2)";
    let timetable = vec![lecture("99999", title, at(4, 9), at(4, 11))];

    let ics = IcsGenerator::default()
        .lecture_calendar(&timetable, &course(), 1)
        .unwrap()
        .to_ics();

    let events = parse_events(&ics);
    assert_eq!(property(&events[0], "SUMMARY"), Some(title));
}
