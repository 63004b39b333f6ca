#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use boardsync::canvas::CanvasClient;
use boardsync::canvas::dto::{CanvasAssignment, CanvasCourse, CanvasSubmission, CanvasUser};
use boardsync::config::SyncConfig;
use boardsync::error::{AppError, AppResult};
use boardsync::jira::{IssueTracker, MoveOutcome};
use boardsync::moodle::{MoodleClient, MoodleCourse};
use boardsync::models::{
    AssignmentBatch, AssignmentKind, Board, CacheSnapshot, Card, GeoLocation, Grade, List,
    RemoteAssignment, SourceSystem,
};
use boardsync::sunset::{SunsetDay, SunsetProvider};
use boardsync::trello::{BoardClient, NewCard};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

pub const SCHOOL: &str = "Makai School";
pub const WEEKLY: &str = "l-weekly";
pub const DAILY: &str = "l-daily";
pub const SUNDOWN: &str = "l-sundown";
pub const TODO: &str = "l-todo";
pub const DOING: &str = "l-doing";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 15, 12, 0, 0).unwrap()
}

pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("boardsync-test-{}", uuid::Uuid::new_v4()))
        .join(name)
}

pub fn location() -> GeoLocation {
    GeoLocation {
        latitude: 40.2969,
        longitude: -111.6946,
    }
}

pub fn sync_config() -> SyncConfig {
    SyncConfig {
        school_board: SCHOOL.into(),
        weekly_list: "Weekly".into(),
        daily_list: "Daily".into(),
        jira_board: "Mac".into(),
        sundown_board: SCHOOL.into(),
        sundown_list: "Sundown Notification (DO NOT ALTER)".into(),
        sundown_mention: Some("@family".into()),
        jira_browse_url: Some("https://acme.atlassian.net/browse".into()),
        board_cache_file: PathBuf::from("unused.json"),
        sunset_cache_file: PathBuf::from("unused.json"),
        subjects_file: PathBuf::from("unused.json"),
        location: location(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { list_id: String, title: String },
    Due { card_id: String, due: Option<DateTime<Utc>>, complete: bool },
    Description { card_id: String },
    Title { card_id: String, title: String },
    MoveTop(String),
    Delete(String),
    Comment { card_id: String, text: String },
    Label { card_id: String, color: String },
}

/// Board service held in memory. Cards keep their list order; moving a card
/// to the top puts it first.
pub struct FakeBoard {
    pub boards: Vec<Board>,
    pub lists: Vec<List>,
    cards: Mutex<Vec<Card>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicUsize,
    failing_titles: Mutex<Vec<String>>,
}

fn board(id: &str, name: &str) -> Board {
    Board {
        id: id.into(),
        name: name.into(),
        url: format!("https://trello.example/b/{}", id),
    }
}

fn list(id: &str, name: &str, board_id: &str) -> List {
    List {
        id: id.into(),
        name: name.into(),
        board_id: board_id.into(),
    }
}

impl FakeBoard {
    pub fn new() -> Self {
        Self {
            boards: vec![board("b-school", SCHOOL), board("b-mac", "Mac")],
            lists: vec![
                list(WEEKLY, "Weekly", "b-school"),
                list(DAILY, "Daily", "b-school"),
                list(SUNDOWN, "Sundown Notification (DO NOT ALTER)", "b-school"),
                list(TODO, "To Do", "b-mac"),
                list(DOING, "Doing", "b-mac"),
            ],
            cards: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            failing_titles: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            boards: self.boards.clone(),
            lists: self.lists.clone(),
        }
    }

    pub fn seed(&self, list_id: &str, title: &str, description: &str, due: Option<DateTime<Utc>>) -> String {
        let id = format!("seed-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.cards.lock().unwrap().push(Card {
            id: id.clone(),
            title: title.into(),
            description: description.into(),
            url: String::new(),
            is_closed: false,
            list_id: list_id.into(),
            due_at: due,
            due_complete: true,
        });
        id
    }

    /// Creating a card whose title contains `fragment` fails.
    pub fn fail_creates_containing(&self, fragment: &str) {
        self.failing_titles.lock().unwrap().push(fragment.into());
    }

    pub fn cards(&self) -> Vec<Card> {
        self.cards.lock().unwrap().clone()
    }

    pub fn card(&self, id: &str) -> Card {
        self.cards().into_iter().find(|c| c.id == id).unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn with_card<R>(&self, id: &str, f: impl FnOnce(&mut Card) -> R) -> AppResult<R> {
        let mut cards = self.cards.lock().unwrap();
        let card = cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::not_found(format!("card {}", id)))?;
        Ok(f(card))
    }
}

#[async_trait]
impl BoardClient for FakeBoard {
    async fn list_boards(&self) -> AppResult<Vec<Board>> {
        Ok(self.boards.clone())
    }

    async fn list_lists(&self, board_id: &str) -> AppResult<Vec<List>> {
        Ok(self.lists.iter().filter(|l| l.board_id == board_id).cloned().collect())
    }

    async fn list_cards_in_list(&self, list_id: &str) -> AppResult<Vec<Card>> {
        Ok(self.cards().into_iter().filter(|c| c.list_id == list_id).collect())
    }

    async fn list_all_cards_on_board(&self, board_id: &str) -> AppResult<Vec<Card>> {
        let list_ids: Vec<&str> = self
            .lists
            .iter()
            .filter(|l| l.board_id == board_id)
            .map(|l| l.id.as_str())
            .collect();
        Ok(self
            .cards()
            .into_iter()
            .filter(|c| list_ids.contains(&c.list_id.as_str()))
            .collect())
    }

    async fn create_card(&self, new: &NewCard) -> AppResult<Card> {
        let failing = self.failing_titles.lock().unwrap().clone();
        if failing.iter().any(|f| new.title.contains(f.as_str())) {
            return Err(AppError::Api {
                service: "Trello",
                status: 500,
                body: "boom".into(),
            });
        }
        self.record(Call::Create {
            list_id: new.list_id.clone(),
            title: new.title.clone(),
        });
        let card = Card {
            id: format!("card-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            title: new.title.clone(),
            description: new.description.clone(),
            url: String::new(),
            is_closed: false,
            list_id: new.list_id.clone(),
            due_at: new.due,
            due_complete: false,
        };
        self.cards.lock().unwrap().push(card.clone());
        Ok(card)
    }

    async fn update_card_due(&self, card_id: &str, due: Option<DateTime<Utc>>, complete: bool) -> AppResult<()> {
        self.record(Call::Due {
            card_id: card_id.into(),
            due,
            complete,
        });
        self.with_card(card_id, |c| {
            c.due_at = due;
            c.due_complete = complete;
        })
    }

    async fn update_card_description(&self, card_id: &str, description: &str) -> AppResult<()> {
        self.record(Call::Description {
            card_id: card_id.into(),
        });
        self.with_card(card_id, |c| c.description = description.into())
    }

    async fn update_card_title(&self, card_id: &str, title: &str) -> AppResult<()> {
        self.record(Call::Title {
            card_id: card_id.into(),
            title: title.into(),
        });
        self.with_card(card_id, |c| c.title = title.into())
    }

    async fn move_card_to_top(&self, card_id: &str) -> AppResult<()> {
        self.record(Call::MoveTop(card_id.into()));
        let mut cards = self.cards.lock().unwrap();
        let pos = cards
            .iter()
            .position(|c| c.id == card_id)
            .ok_or_else(|| AppError::not_found(format!("card {}", card_id)))?;
        let card = cards.remove(pos);
        cards.insert(0, card);
        Ok(())
    }

    async fn delete_card(&self, card_id: &str) -> AppResult<()> {
        self.record(Call::Delete(card_id.into()));
        self.cards.lock().unwrap().retain(|c| c.id != card_id);
        Ok(())
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> AppResult<()> {
        self.record(Call::Comment {
            card_id: card_id.into(),
            text: text.into(),
        });
        Ok(())
    }

    async fn add_label(&self, card_id: &str, color: &str) -> AppResult<()> {
        self.record(Call::Label {
            card_id: card_id.into(),
            color: color.into(),
        });
        Ok(())
    }
}

pub fn canvas_assignment(id: u64, title: &str, due: &str) -> RemoteAssignment {
    RemoteAssignment {
        source: SourceSystem::Canvas,
        kind: AssignmentKind::Assignment,
        source_id: id,
        title: title.into(),
        description: format!("Instructions for {}", title),
        course_id: 123,
        due_at: DateTime::parse_from_rfc3339(due).ok().map(|d| d.with_timezone(&Utc)),
        due_raw: due.into(),
        source_url: format!("https://canvas.example/courses/123/assignments/{}", id),
    }
}

pub fn graded(score: f64) -> Grade {
    Grade {
        score,
        max_score: 100.0,
        graded: true,
    }
}

pub fn biology_batch(score: Option<f64>) -> AssignmentBatch {
    let mut batch = AssignmentBatch {
        assignments: vec![canvas_assignment(12345, "Biology Test 1", "2025-09-20T18:00:00Z")],
        course_names: HashMap::from([(123, "Biology".to_string())]),
        grades: HashMap::new(),
    };
    if let Some(s) = score {
        batch.insert_grade(AssignmentKind::Assignment, 12345, graded(s));
    }
    batch
}

/// Canvas account with one course and a fixed set of assignments.
pub struct FakeCanvas {
    pub assignments: Vec<CanvasAssignment>,
    pub submissions: HashMap<u64, CanvasSubmission>,
    pub failing_course: Option<u64>,
}

impl FakeCanvas {
    pub fn assignment(id: u64, name: &str, due: Option<&str>, points: Option<f64>) -> CanvasAssignment {
        CanvasAssignment {
            id,
            name: name.into(),
            description: Some(format!("<p>{}</p>", name)),
            due_at: due.map(str::to_string),
            course_id: 123,
            html_url: format!("https://canvas.example/courses/123/assignments/{}", id),
            points_possible: points,
        }
    }
}

#[async_trait]
impl CanvasClient for FakeCanvas {
    async fn current_user(&self) -> AppResult<CanvasUser> {
        Ok(CanvasUser {
            id: 77,
            name: "Student".into(),
            email: None,
            login_id: None,
        })
    }

    async fn list_courses(&self) -> AppResult<Vec<CanvasCourse>> {
        Ok(vec![
            CanvasCourse {
                id: 123,
                name: "Biology".into(),
                code: "BIO".into(),
            },
            CanvasCourse {
                id: 456,
                name: "Art".into(),
                code: "ART".into(),
            },
        ])
    }

    async fn list_assignments(&self, course_id: u64) -> AppResult<Vec<CanvasAssignment>> {
        if self.failing_course == Some(course_id) {
            return Err(AppError::Api {
                service: "Canvas",
                status: 403,
                body: "forbidden".into(),
            });
        }
        Ok(self
            .assignments
            .iter()
            .filter(|a| a.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn get_submission(&self, _course_id: u64, assignment_id: u64, user_id: u64) -> AppResult<CanvasSubmission> {
        assert_eq!(user_id, 77);
        self.submissions
            .get(&assignment_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("submission {}", assignment_id)))
    }
}

pub fn moodle_item(kind: AssignmentKind, id: u64, title: &str, course_id: u64, due: Option<DateTime<Utc>>) -> RemoteAssignment {
    RemoteAssignment {
        source: SourceSystem::Moodle,
        kind,
        source_id: id,
        title: title.into(),
        description: format!("  <p>{}</p>\n", title),
        course_id,
        due_at: due,
        due_raw: due.map(|d| d.to_rfc3339()).unwrap_or_default(),
        source_url: format!("https://moodle.example/mod/{}/view.php?id={}", kind.label().to_lowercase(), id),
    }
}

fn moodle_course(id: u64, name: &str) -> MoodleCourse {
    MoodleCourse {
        id,
        full_name: name.into(),
        short_name: String::new(),
    }
}

/// Moodle site for user 3. `response_names` are the course names the
/// assignment listing carries; `courses` is the enrolment listing.
#[derive(Default)]
pub struct FakeMoodle {
    pub courses: Vec<(u64, String)>,
    pub response_names: HashMap<u64, String>,
    pub assignments: Vec<RemoteAssignment>,
    pub quizzes: Vec<RemoteAssignment>,
    pub quizzes_fail: bool,
    pub grades: Vec<(AssignmentKind, u64, Grade)>,
    pub grade_calls: AtomicUsize,
}

impl FakeMoodle {
    pub fn grade_calls(&self) -> usize {
        self.grade_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MoodleClient for FakeMoodle {
    async fn site_info(&self) -> AppResult<u64> {
        Ok(3)
    }

    async fn list_courses(&self, user_id: u64) -> AppResult<Vec<MoodleCourse>> {
        assert_eq!(user_id, 3);
        Ok(self.courses.iter().map(|(id, name)| moodle_course(*id, name)).collect())
    }

    async fn list_assignments(&self, _course_ids: &[u64]) -> AppResult<(Vec<RemoteAssignment>, HashMap<u64, String>)> {
        Ok((self.assignments.clone(), self.response_names.clone()))
    }

    async fn list_quizzes(&self, _course_ids: &[u64]) -> AppResult<Vec<RemoteAssignment>> {
        if self.quizzes_fail {
            return Err(AppError::Api {
                service: "Moodle",
                status: 200,
                body: r#"{"exception":"moodle_exception","errorcode":"nopermissions"}"#.into(),
            });
        }
        Ok(self.quizzes.clone())
    }

    async fn get_grade(&self, item_id: u64, _course_id: u64, user_id: u64, kind: AssignmentKind) -> AppResult<Option<Grade>> {
        assert_eq!(user_id, 3);
        self.grade_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .grades
            .iter()
            .find(|(k, id, _)| *k == kind && *id == item_id)
            .map(|(_, _, g)| *g))
    }
}

/// Returns `sunset` for every requested day except `missing`.
pub struct FakeSunset {
    pub sunset: String,
    pub missing: Option<NaiveDate>,
    calls: AtomicUsize,
}

impl FakeSunset {
    pub fn new(sunset: &str) -> Self {
        Self {
            sunset: sunset.into(),
            missing: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SunsetProvider for FakeSunset {
    async fn sunset_window(&self, _location: GeoLocation, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<SunsetDay>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut days = Vec::new();
        let mut date = start;
        while date <= end {
            if Some(date) != self.missing {
                days.push(SunsetDay {
                    date: date.format("%Y-%m-%d").to_string(),
                    sunset: self.sunset.clone(),
                });
            }
            date += Duration::days(1);
        }
        Ok(days)
    }
}

/// Accepts only the states in `accepted`; refusals list `offered`.
pub struct FakeTracker {
    pub accepted: Vec<String>,
    pub offered: Vec<String>,
    moves: Mutex<Vec<(String, String)>>,
}

impl FakeTracker {
    pub fn new(accepted: &[&str], offered: &[&str]) -> Self {
        Self {
            accepted: accepted.iter().map(|s| s.to_string()).collect(),
            offered: offered.iter().map(|s| s.to_string()).collect(),
            moves: Mutex::new(Vec::new()),
        }
    }

    pub fn moves(&self) -> Vec<(String, String)> {
        self.moves.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn move_issue(&self, issue_id: &str, state: &str) -> AppResult<MoveOutcome> {
        self.moves.lock().unwrap().push((issue_id.into(), state.into()));
        let success = self.accepted.iter().any(|s| s == state);
        Ok(MoveOutcome {
            success,
            available_states: if success { Vec::new() } else { self.offered.clone() },
        })
    }
}
